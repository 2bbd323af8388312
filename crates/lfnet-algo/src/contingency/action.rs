//! Remedial actions.
//!
//! An [`ActionSpec`] names elements by id. [`LfAction::create`] resolves and
//! validates it before any connectivity frame is opened, so a rejected action
//! never leaves a transaction half applied.

use lfnet_core::{BranchKind, BranchNum, Diagnostics, LfNetwork, Side, TopoError, TopoResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionSpec {
    /// Open or close a switch
    Switch { switch_id: String, open: bool },
    /// Move a tap changer to a step
    TapPosition { branch_id: String, position: usize },
    /// Set the connection status of each side of a branch
    BranchConnection {
        branch_id: String,
        side1: bool,
        side2: bool,
    },
}

impl ActionSpec {
    pub fn element_id(&self) -> &str {
        match self {
            ActionSpec::Switch { switch_id, .. } => switch_id,
            ActionSpec::TapPosition { branch_id, .. } | ActionSpec::BranchConnection { branch_id, .. } => branch_id,
        }
    }
}

/// A validated action bound to one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfAction {
    Switch { branch: BranchNum, open: bool },
    TapPosition { branch: BranchNum, position: usize },
    BranchConnection { branch: BranchNum, side1: bool, side2: bool },
}

impl LfAction {
    /// Resolve an action. Unknown element ids yield `Ok(None)` with a warning;
    /// actions the element cannot carry are rejected.
    pub fn create(network: &LfNetwork, spec: &ActionSpec, diagnostics: &mut Diagnostics) -> TopoResult<Option<Self>> {
        let Some(branch) = network.branch_by_id(spec.element_id()) else {
            tracing::warn!(element = spec.element_id(), "action element not found, skipped");
            diagnostics.add_warning_with_entity("action", "element not found in network, action skipped", spec.element_id());
            return Ok(None);
        };

        let action = match *spec {
            ActionSpec::Switch { open, .. } => {
                if branch.kind() != BranchKind::Switch {
                    return Err(TopoError::UnsupportedAction(format!(
                        "switch action on '{}' which is a {:?}",
                        branch.id(),
                        branch.kind()
                    )));
                }
                if !open && (branch.bus1().is_none() || branch.bus2().is_none()) {
                    return Err(TopoError::InvalidAction(format!(
                        "switch '{}' cannot be closed: it is not attached at both sides",
                        branch.id()
                    )));
                }
                LfAction::Switch {
                    branch: branch.num(),
                    open,
                }
            }
            ActionSpec::TapPosition { position, .. } => {
                let tap = branch.tap().ok_or_else(|| {
                    TopoError::UnsupportedAction(format!("branch '{}' has no tap changer", branch.id()))
                })?;
                if tap.step(position).is_none() {
                    return Err(TopoError::InvalidAction(format!(
                        "tap position {position} of branch '{}' is outside 0..{}",
                        branch.id(),
                        tap.steps.len()
                    )));
                }
                LfAction::TapPosition {
                    branch: branch.num(),
                    position,
                }
            }
            ActionSpec::BranchConnection { side1, side2, .. } => {
                for (side, connected) in [(Side::One, side1), (Side::Two, side2)] {
                    if connected && branch.bus(side).is_none() {
                        return Err(TopoError::InvalidAction(format!(
                            "branch '{}' has no bus to connect on side {side:?}",
                            branch.id()
                        )));
                    }
                }
                LfAction::BranchConnection {
                    branch: branch.num(),
                    side1,
                    side2,
                }
            }
        };
        Ok(Some(action))
    }

    /// Resolve a list of actions, failing on the first rejected one.
    pub fn create_all(network: &LfNetwork, specs: &[ActionSpec], diagnostics: &mut Diagnostics) -> TopoResult<Vec<Self>> {
        let mut actions = Vec::with_capacity(specs.len());
        for spec in specs {
            if let Some(action) = Self::create(network, spec, diagnostics)? {
                actions.push(action);
            }
        }
        Ok(actions)
    }

    pub fn branch(&self) -> BranchNum {
        match *self {
            LfAction::Switch { branch, .. }
            | LfAction::TapPosition { branch, .. }
            | LfAction::BranchConnection { branch, .. } => branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfnet_core::slack::FirstBusSelector;
    use lfnet_core::{BranchSpec, BusSpec, LfNetworkBuilder, Radians, TapChanger, TapStep, TopologyConfig};

    fn network() -> LfNetwork {
        let mut builder = LfNetworkBuilder::new();
        builder.add_bus(BusSpec::new("B1")).unwrap();
        builder.add_bus(BusSpec::new("B2")).unwrap();
        builder.add_branch(BranchSpec::line("L", "B1", "B2", 0.0, 0.1)).unwrap();
        builder.add_branch(BranchSpec::switch("S", "B1", "B2", true)).unwrap();
        let tap = TapChanger::new(0, vec![TapStep { ratio: 1.0, alpha: Radians(0.0) }; 3]);
        builder
            .add_branch(BranchSpec::transformer("T", "B1", "B2", 0.0, 0.1, tap))
            .unwrap();
        builder.add_branch(BranchSpec::dangling("D", "B2", 0.0, 0.1)).unwrap();
        builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap()
    }

    #[test]
    fn test_valid_actions_resolve() {
        let network = network();
        let mut diag = Diagnostics::new();
        let specs = vec![
            ActionSpec::Switch { switch_id: "S".into(), open: false },
            ActionSpec::TapPosition { branch_id: "T".into(), position: 2 },
            ActionSpec::BranchConnection { branch_id: "L".into(), side1: true, side2: false },
            ActionSpec::Switch { switch_id: "missing".into(), open: true },
        ];
        let actions = LfAction::create_all(&network, &specs, &mut diag).unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[1], LfAction::TapPosition { branch: BranchNum::new(2), position: 2 });
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_invalid_actions_are_rejected_eagerly() {
        let network = network();
        let mut diag = Diagnostics::new();
        let reject = |spec: ActionSpec, diag: &mut Diagnostics| LfAction::create(&network, &spec, diag).unwrap_err();

        let err = reject(ActionSpec::TapPosition { branch_id: "L".into(), position: 0 }, &mut diag);
        assert!(matches!(err, TopoError::UnsupportedAction(_)));
        let err = reject(ActionSpec::TapPosition { branch_id: "T".into(), position: 3 }, &mut diag);
        assert!(matches!(err, TopoError::InvalidAction(_)));
        let err = reject(ActionSpec::Switch { switch_id: "L".into(), open: true }, &mut diag);
        assert!(matches!(err, TopoError::UnsupportedAction(_)));
        let err = reject(
            ActionSpec::BranchConnection { branch_id: "D".into(), side1: true, side2: true },
            &mut diag,
        );
        assert!(matches!(err, TopoError::InvalidAction(_)));
        assert!(!diag.has_issues());
    }

    #[test]
    fn test_action_spec_json_shape() {
        let json = r#"[
            {"type": "switch", "switch_id": "S", "open": false},
            {"type": "tap-position", "branch_id": "T", "position": 1}
        ]"#;
        let specs: Vec<ActionSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs[0].element_id(), "S");
        assert!(matches!(specs[1], ActionSpec::TapPosition { position: 1, .. }));
    }
}
