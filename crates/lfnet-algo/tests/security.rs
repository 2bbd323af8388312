//! Screening runner over contingencies and operator strategies.

use lfnet_algo::{
    generate_n1, ActionSpec, ApplicationStage, OperatorStrategy, ScreeningInput, SecurityAnalysis,
    SecurityAnalysisConfig,
};
use lfnet_core::slack::FirstBusSelector;
use lfnet_core::state::NetworkState;
use lfnet_core::{BranchSpec, BusSpec, CaseData, LfNetwork, TopologyConfig};

const CASE: &str = r#"{
    "buses": [{"id": "B1"}, {"id": "B2"}, {"id": "B3"}, {"id": "B4"}],
    "branches": [
        {"id": "L12", "bus1": "B1", "bus2": "B2", "r": 0.01, "x": 0.1},
        {"id": "L23", "bus1": "B2", "bus2": "B3", "r": 0.01, "x": 0.1},
        {"id": "L34", "bus1": "B3", "bus2": "B4", "r": 0.01, "x": 0.1},
        {"id": "S14", "kind": "switch", "bus1": "B1", "bus2": "B4", "disabled": true}
    ]
}"#;

fn case() -> LfNetwork {
    CaseData::from_json_str(CASE)
        .unwrap()
        .into_network(TopologyConfig::default(), &FirstBusSelector)
        .unwrap()
}

fn input() -> ScreeningInput {
    ScreeningInput::from_json_str(
        r#"{
            "contingencies": [
                {"id": "L23", "branch_ids": ["L23"]},
                {"id": "elsewhere", "branch_ids": ["X99"]}
            ],
            "strategies": [
                {"id": "close-S14", "contingency_id": "L23",
                 "actions": [{"type": "switch", "switch_id": "S14", "open": false}]}
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn strategy_restores_buses_lost_to_the_contingency() {
    let mut network = case();
    let baseline = NetworkState::save(&network);
    let results = SecurityAnalysis::new(SecurityAnalysisConfig::default())
        .run(&mut network, &input())
        .unwrap();

    assert_eq!(results.total_contingencies, 2);
    assert_eq!(results.total_strategies, 1);
    assert_eq!(results.reports.len(), 3);
    assert!(results.reports.iter().all(|r| r.stage == ApplicationStage::RolledBack));

    let lost = &results.reports[0];
    assert_eq!(lost.contingency_id, "L23");
    assert_eq!(lost.disabled_buses, vec!["B3".to_string(), "B4".to_string()]);
    assert_eq!(lost.energized_buses, 2);

    let rescued = &results.reports[1];
    assert_eq!(rescued.strategy_id.as_deref(), Some("close-S14"));
    assert_eq!(rescued.contingency_disabled_buses, vec!["B3".to_string(), "B4".to_string()]);
    assert!(rescued.disabled_buses.is_empty());
    assert_eq!(rescued.enabled_branches, vec!["L34".to_string(), "S14".to_string()]);
    assert_eq!(rescued.zero_impedance_networks_ac, 1);

    // unknown branch: warned, contingency evaluated as a no-op
    let elsewhere = &results.reports[2];
    assert!(elsewhere.disabled_buses.is_empty());
    assert_eq!(results.diagnostics.warning_count(), 1);

    assert_eq!(NetworkState::save(&network), baseline);
    assert!(results.summary().contains("1/2 contingencies disconnect buses"));
}

#[test]
fn n1_screening_of_a_ring_disconnects_nothing() {
    let mut network = case();
    let s14 = network.branch_by_id("S14").unwrap().num();
    network.set_branch_disabled(s14, false).unwrap();
    let input = ScreeningInput {
        contingencies: generate_n1(&network),
        strategies: Vec::new(),
    };
    assert_eq!(input.contingencies.len(), 4);

    let results = SecurityAnalysis::new(SecurityAnalysisConfig::default())
        .run(&mut network, &input)
        .unwrap();
    assert!(results.reports.iter().all(|r| !r.disconnects_buses()));
    assert!(!results.diagnostics.has_issues());
}

#[test]
fn max_contingencies_bounds_the_run() {
    let mut network = case();
    let config: SecurityAnalysisConfig = toml::from_str("max_contingencies = 1").unwrap();
    let results = SecurityAnalysis::new(config).run(&mut network, &input()).unwrap();
    assert_eq!(results.total_contingencies, 1);
    assert_eq!(results.reports.len(), 2);
}

#[test]
fn independent_networks_run_in_parallel() {
    let radial = {
        let mut builder = lfnet_core::LfNetworkBuilder::new();
        builder.add_bus(BusSpec::new("B1")).unwrap();
        builder.add_bus(BusSpec::new("B2")).unwrap();
        builder.add_branch(BranchSpec::line("L23", "B1", "B2", 0.01, 0.1)).unwrap();
        builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap()
    };
    let input = ScreeningInput {
        contingencies: input().contingencies,
        strategies: vec![OperatorStrategy {
            id: "noop".into(),
            contingency_id: "L23".into(),
            actions: vec![ActionSpec::Switch {
                switch_id: "missing".into(),
                open: true,
            }],
        }],
    };

    let all = SecurityAnalysis::new(SecurityAnalysisConfig::default())
        .run_parallel(vec![case(), radial], &input)
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].reports[0].disabled_buses.len(), 2);
    assert_eq!(all[1].reports[0].disabled_buses, vec!["B2".to_string()]);
    // missing switch and missing X99 on each network
    assert!(all.iter().all(|r| r.diagnostics.warning_count() == 2));
}

#[test]
fn screening_input_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.json");
    std::fs::write(&path, serde_json::to_string(&input()).unwrap()).unwrap();
    let loaded = ScreeningInput::load(&path).unwrap();
    assert_eq!(loaded.contingencies.len(), 2);
    assert_eq!(loaded.strategies[0].id, "close-S14");

    let err = ScreeningInput::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, lfnet_core::TopoError::Io(_)));
}

#[test]
fn strategy_touching_a_dangling_side_is_screened() {
    let mut network = CaseData::from_json_str(
        r#"{
            "buses": [{"id": "B1"}, {"id": "B2"}],
            "branches": [
                {"id": "L12", "bus1": "B1", "bus2": "B2", "r": 0.01, "x": 0.1},
                {"id": "D2", "bus1": "B2", "x": 0.2}
            ]
        }"#,
    )
    .unwrap()
    .into_network(TopologyConfig::default(), &FirstBusSelector)
    .unwrap();
    let baseline = NetworkState::save(&network);
    let input = ScreeningInput::from_json_str(
        r#"{
            "contingencies": [{"id": "L12", "branch_ids": ["L12"]}],
            "strategies": [
                {"id": "keep-D2", "contingency_id": "L12",
                 "actions": [{"type": "branch-connection", "branch_id": "D2", "side1": true, "side2": false}]}
            ]
        }"#,
    )
    .unwrap();

    let results = SecurityAnalysis::new(SecurityAnalysisConfig::default())
        .run(&mut network, &input)
        .unwrap();
    assert_eq!(results.reports.len(), 2);
    let strategy = &results.reports[1];
    assert_eq!(strategy.strategy_id.as_deref(), Some("keep-D2"));
    assert_eq!(strategy.stage, ApplicationStage::RolledBack);
    assert_eq!(strategy.disabled_buses, vec!["B2".to_string()]);
    assert!(!results.diagnostics.has_issues());
    assert_eq!(NetworkState::save(&network), baseline);
}
