//! Zero-impedance network maintenance through the network mutation API.

use std::collections::BTreeSet;

use lfnet_core::slack::FirstBusSelector;
use lfnet_core::state::{NetworkState, RestorableState};
use lfnet_core::{BranchNum, BranchSpec, BusNum, BusSpec, LfNetwork, LfNetworkBuilder, LossModel, TopologyConfig};
use proptest::prelude::*;

/// Switches b_a (1-2) and b_b (2-3).
fn chain() -> LfNetwork {
    let mut builder = LfNetworkBuilder::new();
    for id in ["1", "2", "3"] {
        builder.add_bus(BusSpec::new(id)).unwrap();
    }
    builder.add_branch(BranchSpec::switch("b_a", "1", "2", false)).unwrap();
    builder.add_branch(BranchSpec::switch("b_b", "2", "3", false)).unwrap();
    builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap()
}

fn edge_sets(network: &LfNetwork, model: LossModel) -> BTreeSet<BTreeSet<BranchNum>> {
    network
        .zero_impedance_networks(model)
        .unwrap()
        .iter()
        .map(|z| z.branches().clone())
        .collect()
}

#[test]
fn disabling_a_tree_edge_splits_and_enabling_merges_back() {
    let mut network = chain();
    let b_a = network.branch_by_id("b_a").unwrap().num();
    let b_b = network.branch_by_id("b_b").unwrap().num();

    for model in LossModel::ALL {
        let zin = network.zero_impedance_networks(model).unwrap();
        assert_eq!(zin.len(), 1);
        let tree = zin.iter().next().unwrap().spanning_tree_edges().clone();
        assert_eq!(tree, BTreeSet::from([b_a, b_b]));
    }
    let original = edge_sets(&network, LossModel::Ac);

    network.set_branch_disabled(b_a, true).unwrap();
    network.check_consistency().unwrap();
    let zin = network.zero_impedance_networks(LossModel::Ac).unwrap();
    let sizes: Vec<(usize, usize)> = zin.iter().map(|z| (z.buses().len(), z.spanning_tree_edges().len())).collect();
    assert_eq!(sizes, vec![(2, 1)]);
    assert!(network.bus_by_id("1").unwrap().zero_impedance_network(LossModel::Ac).is_none());
    assert!(!network.branch(b_a).unwrap().is_spanning_tree_edge(LossModel::Ac));

    network.set_branch_disabled(b_a, false).unwrap();
    network.check_consistency().unwrap();
    let zin = network.zero_impedance_networks(LossModel::Ac).unwrap();
    assert_eq!(zin.len(), 1);
    assert_eq!(zin.iter().next().unwrap().spanning_tree_edges().len(), 2);
    assert_eq!(edge_sets(&network, LossModel::Ac), original);
}

#[test]
fn loop_keeps_one_network_and_drops_a_tree_edge() {
    let mut builder = LfNetworkBuilder::new();
    for id in ["1", "2", "3"] {
        builder.add_bus(BusSpec::new(id)).unwrap();
    }
    builder.add_branch(BranchSpec::switch("s12", "1", "2", false)).unwrap();
    builder.add_branch(BranchSpec::switch("s23", "2", "3", false)).unwrap();
    builder.add_branch(BranchSpec::switch("s31", "3", "1", false)).unwrap();
    let mut network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();

    let zin = network.zero_impedance_networks(LossModel::Dc).unwrap();
    let tree = zin.iter().next().unwrap().spanning_tree_edges().clone();
    // lowest branch nums win ties
    assert_eq!(tree, BTreeSet::from([BranchNum::new(0), BranchNum::new(1)]));

    network.set_branch_disabled(BranchNum::new(0), true).unwrap();
    let zin = network.zero_impedance_networks(LossModel::Dc).unwrap();
    assert_eq!(zin.len(), 1);
    let tree = zin.iter().next().unwrap().spanning_tree_edges().clone();
    assert_eq!(tree, BTreeSet::from([BranchNum::new(1), BranchNum::new(2)]));
    network.check_consistency().unwrap();
}

#[test]
fn thresholds_differ_per_model() {
    let mut builder = LfNetworkBuilder::new();
    builder.add_bus(BusSpec::new("1")).unwrap();
    builder.add_bus(BusSpec::new("2")).unwrap();
    // resistive but reactance-free: zero impedance in DC only
    builder.add_branch(BranchSpec::line("r", "1", "2", 0.05, 0.0)).unwrap();
    let network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
    assert!(network.zero_impedance_networks(LossModel::Ac).unwrap().is_empty());
    assert_eq!(network.zero_impedance_networks(LossModel::Dc).unwrap().len(), 1);
}

fn mesh_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<usize>)> {
    (2usize..7)
        .prop_flat_map(|n| {
            let edge = (0..n, 0..n).prop_filter("no self-loop", |(a, b)| a != b);
            (Just(n), prop::collection::vec(edge, 1..10))
        })
        .prop_flat_map(|(n, edges)| {
            let count = edges.len();
            (Just(n), Just(edges), prop::collection::vec(0..count, 0..30))
        })
}

fn mesh(n: usize, edges: &[(usize, usize)]) -> LfNetwork {
    mesh_with_open(n, edges, &vec![false; edges.len()])
}

fn mesh_with_open(n: usize, edges: &[(usize, usize)], open: &[bool]) -> LfNetwork {
    let mut builder = LfNetworkBuilder::new();
    for i in 0..n {
        builder.add_bus(BusSpec::new(format!("B{i}"))).unwrap();
    }
    for (i, (&(a, b), &open)) in edges.iter().zip(open).enumerate() {
        builder
            .add_branch(BranchSpec::switch(format!("S{i}"), &format!("B{a}"), &format!("B{b}"), open))
            .unwrap();
    }
    builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap()
}

fn bus_partition(network: &LfNetwork, model: LossModel) -> BTreeSet<BTreeSet<BusNum>> {
    network
        .zero_impedance_networks(model)
        .unwrap()
        .iter()
        .map(|z| z.buses().clone())
        .collect()
}

#[test]
fn split_leaves_lone_buses_outside_any_network() {
    let mut network = chain();
    let b_a = network.branch_by_id("b_a").unwrap().num();
    let b_b = network.branch_by_id("b_b").unwrap().num();
    network.set_branch_disabled(b_a, true).unwrap();
    network.set_branch_disabled(b_b, true).unwrap();
    network.check_consistency().unwrap();
    assert!(network.zero_impedance_networks(LossModel::Ac).unwrap().is_empty());
    assert!(network.buses().iter().all(|bus| bus.zero_impedance_network(LossModel::Dc).is_none()));

    network.set_branch_disabled(b_b, false).unwrap();
    network.check_consistency().unwrap();
    let fresh = mesh_with_open(3, &[(0, 1), (1, 2)], &[true, false]);
    for model in LossModel::ALL {
        assert_eq!(bus_partition(&network, model), bus_partition(&fresh, model));
    }
}

proptest! {
    #[test]
    fn spanning_trees_stay_valid_under_toggles((n, edges, toggles) in mesh_strategy()) {
        let mut network = mesh(n, &edges);
        let baseline = NetworkState::save(&network);
        let original = edge_sets(&network, LossModel::Ac);

        for i in toggles {
            let num = BranchNum::new(i);
            let disabled = network.branch(num).unwrap().is_disabled();
            network.set_branch_disabled(num, !disabled).unwrap();
            prop_assert!(network.check_consistency().is_ok());
            let open: Vec<bool> = (0..edges.len())
                .map(|i| network.branch(BranchNum::new(i)).unwrap().is_disabled())
                .collect();
            let fresh = mesh_with_open(n, &edges, &open);
            for model in LossModel::ALL {
                prop_assert_eq!(bus_partition(&network, model), bus_partition(&fresh, model));
            }
            for model in LossModel::ALL {
                for z in network.zero_impedance_networks(model).unwrap().iter() {
                    prop_assert_eq!(z.spanning_tree_edges().len() + 1, z.buses().len());
                    for &branch in z.spanning_tree_edges() {
                        prop_assert!(!network.branch(branch).unwrap().is_disabled());
                    }
                }
            }
        }

        baseline.restore(&mut network).unwrap();
        prop_assert!(network.check_consistency().is_ok());
        prop_assert_eq!(NetworkState::save(&network), baseline);
        // same enabled-edge partition, ids may differ
        prop_assert_eq!(edge_sets(&network, LossModel::Ac), original);
        let fresh = mesh(n, &edges);
        for model in LossModel::ALL {
            prop_assert_eq!(
                network.zero_impedance_networks(model).unwrap().len(),
                fresh.zero_impedance_networks(model).unwrap().len()
            );
        }
    }
}
