use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const CASE: &str = r#"{
    "buses": [{"id": "B1"}, {"id": "B2"}, {"id": "B3"}],
    "branches": [
        {"id": "L12", "bus1": "B1", "bus2": "B2", "r": 0.01, "x": 0.1},
        {"id": "L23", "bus1": "B2", "bus2": "B3", "r": 0.01, "x": 0.1},
        {"id": "S13", "kind": "switch", "bus1": "B1", "bus2": "B3", "disabled": true}
    ]
}"#;

const CONTINGENCIES: &str = r#"{
    "contingencies": [{"id": "L23", "branch_ids": ["L23"]}],
    "strategies": [
        {"id": "close-S13", "contingency_id": "L23",
         "actions": [{"type": "switch", "switch_id": "S13", "open": false}]}
    ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("case.json"), CASE).unwrap();
        fs::write(dir.path().join("contingencies.json"), CONTINGENCIES).unwrap();
        fs::write(
            dir.path().join("lfnet.toml"),
            "[topology]\nslack_bus_selection = \"first\"\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn lfnet() -> Command {
    Command::cargo_bin("lfnet").unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn graph_stats_reports_energized_topology() {
    let fx = Fixture::new();
    lfnet()
        .args(["graph", "stats", arg(&fx.path("case.json"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes         : 3"))
        .stdout(predicate::str::contains("Edges         : 2"))
        .stdout(predicate::str::contains("Disabled      : 0 bus(es), 1 branch(es)"));
}

#[test]
fn graph_export_writes_dot_file() {
    let fx = Fixture::new();
    let out = fx.path("case.dot");
    lfnet()
        .args(["graph", "export", arg(&fx.path("case.json")), "-o", arg(&out)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph exported to"));
    let dot = fs::read_to_string(out).unwrap();
    assert!(dot.starts_with("graph lfnet {"));
}

#[test]
fn screen_with_strategy_writes_json() {
    let fx = Fixture::new();
    let out = fx.path("results.json");
    lfnet()
        .args([
            "screen",
            arg(&fx.path("case.json")),
            "--contingencies",
            arg(&fx.path("contingencies.json")),
            "--config",
            arg(&fx.path("lfnet.toml")),
            "--out",
            arg(&out),
            "--threads",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 contingencies disconnect buses"))
        .stdout(predicate::str::contains("close-S13"))
        .stdout(predicate::str::contains("Results written to"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    let reports = json[0]["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["disabled_buses"], serde_json::json!(["B3"]));
    assert_eq!(reports[1]["enabled_buses"], serde_json::json!(["B3"]));
    assert_eq!(reports[1]["stage"], "rolled-back");
}

#[test]
fn screen_n1_over_two_cases() {
    let fx = Fixture::new();
    let case = fx.path("case.json");
    lfnet()
        .args(["screen", arg(&case), arg(&case), "--n1", "--config", arg(&fx.path("lfnet.toml"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("2/2 contingencies disconnect buses").count(2));
}

#[test]
fn screen_without_contingency_source_fails() {
    let fx = Fixture::new();
    lfnet()
        .args(["screen", arg(&fx.path("case.json"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contingencies"));
}

#[test]
fn snapshot_prints_bus_state() {
    let fx = Fixture::new();
    lfnet()
        .args(["snapshot", arg(&fx.path("case.json"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"B3\""));
}

#[test]
fn config_show_prints_effective_config() {
    let fx = Fixture::new();
    lfnet()
        .args(["config", "show", "--config", arg(&fx.path("lfnet.toml"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("slack_bus_selection = \"first\""))
        .stdout(predicate::str::contains("check_consistency = true"));
}

#[test]
fn missing_case_is_reported() {
    let fx = Fixture::new();
    lfnet()
        .args(["graph", "islands", arg(&fx.path("nope.json"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading case"));
}
