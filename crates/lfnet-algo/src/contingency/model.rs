//! Contingency definitions and their resolution against one network.

use lfnet_core::{BranchNum, Diagnostics, LfNetwork};
use serde::{Deserialize, Serialize};

/// A contingency: one or more branches out of service, named by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contingency {
    pub id: String,
    /// Branch ids that are out in this contingency
    pub branch_ids: Vec<String>,
}

impl Contingency {
    pub fn new(id: impl Into<String>, branch_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            branch_ids,
        }
    }

    /// N-1 contingency named after its branch.
    pub fn single(branch_id: &str) -> Self {
        Self::new(branch_id, vec![branch_id.to_string()])
    }

    /// N-2 contingency named `first+second`.
    pub fn double(first: &str, second: &str) -> Self {
        Self::new(
            format!("{first}+{second}"),
            vec![first.to_string(), second.to_string()],
        )
    }

    /// Order of this contingency (k in N-k).
    pub fn order(&self) -> usize {
        self.branch_ids.len()
    }
}

/// Branches that currently carry current: enabled, closed at both sides, between enabled buses.
fn energized_branch_ids(network: &LfNetwork) -> Vec<&str> {
    network
        .branches()
        .iter()
        .filter(|branch| network.connectivity_edge(branch.num()).is_some())
        .map(|branch| branch.id())
        .collect()
}

/// Generate one contingency per energized branch.
pub fn generate_n1(network: &LfNetwork) -> Vec<Contingency> {
    energized_branch_ids(network)
        .into_iter()
        .map(Contingency::single)
        .collect()
}

/// Generate every pair of energized branches.
pub fn generate_n2(network: &LfNetwork) -> Vec<Contingency> {
    let ids = energized_branch_ids(network);
    let mut contingencies = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            contingencies.push(Contingency::double(ids[i], ids[j]));
        }
    }
    contingencies
}

/// A contingency resolved to branch nums of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfContingency {
    id: String,
    branches: Vec<BranchNum>,
}

impl LfContingency {
    /// Resolve branch ids. Ids unknown to this network are skipped and recorded
    /// as warnings: the branch may belong to another network instance.
    pub fn create(network: &LfNetwork, contingency: &Contingency, diagnostics: &mut Diagnostics) -> Self {
        let mut branches = Vec::with_capacity(contingency.branch_ids.len());
        for branch_id in &contingency.branch_ids {
            match network.branch_by_id(branch_id) {
                Some(branch) if !branches.contains(&branch.num()) => branches.push(branch.num()),
                Some(_) => {}
                None => {
                    tracing::warn!(contingency = %contingency.id, branch = %branch_id, "branch not found, skipped");
                    diagnostics.add_warning_with_entity(
                        "contingency",
                        &format!("branch not found in network, skipped from '{}'", contingency.id),
                        branch_id,
                    );
                }
            }
        }
        Self {
            id: contingency.id.clone(),
            branches,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn branches(&self) -> &[BranchNum] {
        &self.branches
    }

    /// No branch of the contingency lives in this network.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfnet_core::slack::FirstBusSelector;
    use lfnet_core::{BranchSpec, BusSpec, LfNetworkBuilder, TopologyConfig};

    fn create_test_network() -> LfNetwork {
        let mut builder = LfNetworkBuilder::new();
        for id in ["B1", "B2", "B3"] {
            builder.add_bus(BusSpec::new(id)).unwrap();
        }
        builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.0, 0.1)).unwrap();
        builder.add_branch(BranchSpec::line("L23", "B2", "B3", 0.0, 0.1)).unwrap();
        builder.add_branch(BranchSpec::line("L13", "B1", "B3", 0.0, 0.2)).unwrap();
        builder
            .add_branch(BranchSpec::switch("S13", "B1", "B3", true))
            .unwrap();
        builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap()
    }

    #[test]
    fn test_generate_n1_skips_open_branches() {
        let network = create_test_network();
        let n1 = generate_n1(&network);
        assert_eq!(n1.len(), 3);
        assert!(n1.iter().all(|c| c.order() == 1));
        assert!(!n1.iter().any(|c| c.id == "S13"));
    }

    #[test]
    fn test_generate_n2_contingencies() {
        let network = create_test_network();
        let n2 = generate_n2(&network);
        // C(3,2) = 3 combinations
        assert_eq!(n2.len(), 3);
        assert!(n2.iter().all(|c| c.order() == 2));
        assert_eq!(n2[0].id, "L12+L23");
    }

    #[test]
    fn test_unknown_branches_are_skipped() {
        let network = create_test_network();
        let mut diagnostics = Diagnostics::new();
        let contingency = Contingency::new("c1", vec!["L12".into(), "X99".into(), "L12".into()]);
        let resolved = LfContingency::create(&network, &contingency, &mut diagnostics);
        assert_eq!(resolved.branches(), &[BranchNum::new(0)]);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.issues[0].entity.as_deref(), Some("X99"));
    }
}
