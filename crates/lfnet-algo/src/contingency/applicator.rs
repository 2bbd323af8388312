//! Contingency and remedial-action application.
//!
//! One call walks through
//!
//! ```text
//! Baseline -> ContingencyApplied -> ActionsApplied -> Classified -> Committed | RolledBack
//! ```
//!
//! 1. open a connectivity frame and cut every contingency branch,
//! 2. open a nested frame and apply the actions: switches and connection
//!    changes update the tracker, tap moves go straight to the network,
//! 3. read the main-component deltas of both frames and classify which buses
//!    and branches end up de-energized,
//! 4. close both frames, whatever happened,
//! 5. write the classification to the `disabled` flags.
//!
//! The tracker must mirror the network topology when a call starts. After a
//! committed application it no longer does: build a new one with
//! [`LfNetwork::create_connectivity`].

use std::collections::{BTreeMap, BTreeSet};

use lfnet_core::state::{BranchState, BusState, ElementState, RestorableState};
use lfnet_core::{BranchNum, BusNum, GraphConnectivity, LfNetwork, Side, TopoError, TopoResult};
use serde::Serialize;

use super::action::LfAction;
use super::model::LfContingency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStage {
    Baseline,
    ContingencyApplied,
    ActionsApplied,
    Classified,
    RolledBack,
    Committed,
}

/// Buses and branches to de-energize and re-energize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub disabled_buses: BTreeSet<BusNum>,
    pub disabled_branches: BTreeSet<BranchNum>,
    pub enabled_buses: BTreeSet<BusNum>,
    pub enabled_branches: BTreeSet<BranchNum>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.disabled_buses.is_empty()
            && self.disabled_branches.is_empty()
            && self.enabled_buses.is_empty()
            && self.enabled_branches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyOutcome {
    pub contingency_id: String,
    pub stage: ApplicationStage,
    /// What the contingency alone de-energizes, before any action
    pub contingency_stage: Classification,
    /// Final classification written to the network
    pub classification: Classification,
}

/// Branches with a connected end on a removed bus that are not already counted.
fn hanging_branches(
    network: &LfNetwork,
    removed_buses: &BTreeSet<BusNum>,
    counted: &BTreeSet<BranchNum>,
) -> BTreeSet<BranchNum> {
    let mut hanging = BTreeSet::new();
    for &bus in removed_buses {
        let Some(bus) = network.bus(bus) else { continue };
        for &num in bus.branches() {
            if counted.contains(&num) || hanging.contains(&num) {
                continue;
            }
            let Some(branch) = network.branch(num) else { continue };
            if !branch.is_disabled() && branch.connected_buses().any(|b| removed_buses.contains(&b)) {
                hanging.insert(num);
            }
        }
    }
    hanging
}

pub struct ContingencyApplicator<'a> {
    connectivity: &'a mut dyn GraphConnectivity,
}

impl<'a> ContingencyApplicator<'a> {
    pub fn new(connectivity: &'a mut dyn GraphConnectivity) -> Self {
        Self { connectivity }
    }

    /// Apply and keep the result as the new baseline.
    pub fn apply(
        &mut self,
        network: &mut LfNetwork,
        contingency: &LfContingency,
        actions: &[LfAction],
    ) -> TopoResult<ContingencyOutcome> {
        let span = tracing::debug_span!("contingency", id = %contingency.id());
        let _guard = span.enter();

        let (contingency_stage, classification) = self.classify(network, contingency, actions)?;
        write_classification(network, &classification)?;
        tracing::debug!(
            disabled_buses = classification.disabled_buses.len(),
            disabled_branches = classification.disabled_branches.len(),
            "committed"
        );
        Ok(ContingencyOutcome {
            contingency_id: contingency.id().to_string(),
            stage: ApplicationStage::Committed,
            contingency_stage,
            classification,
        })
    }

    /// Apply, hand the modified network to `inspect`, then restore every
    /// touched element. The tracker stays valid for the next call.
    pub fn evaluate<R>(
        &mut self,
        network: &mut LfNetwork,
        contingency: &LfContingency,
        actions: &[LfAction],
        inspect: impl FnOnce(&LfNetwork, &ContingencyOutcome) -> R,
    ) -> TopoResult<(ContingencyOutcome, R)> {
        let span = tracing::debug_span!("contingency", id = %contingency.id());
        let _guard = span.enter();

        let mut saved: Vec<ElementState> = Vec::new();
        for action in actions {
            if let Some(branch) = network.branch(action.branch()) {
                saved.push(BranchState::save(branch).into());
            }
        }

        let classified = self.classify(network, contingency, actions);
        let (contingency_stage, classification) = match classified {
            Ok(result) => result,
            Err(err) => {
                restore_reversed(&saved, network)?;
                return Err(err);
            }
        };

        for &num in classification.disabled_buses.iter().chain(&classification.enabled_buses) {
            if let Some(bus) = network.bus(num) {
                saved.push(BusState::save(bus).into());
            }
        }
        for &num in classification.disabled_branches.iter().chain(&classification.enabled_branches) {
            if let Some(branch) = network.branch(num) {
                saved.push(BranchState::save(branch).into());
            }
        }

        let written = write_classification(network, &classification);
        let outcome = ContingencyOutcome {
            contingency_id: contingency.id().to_string(),
            stage: ApplicationStage::Classified,
            contingency_stage,
            classification,
        };
        let result = written.map(|()| inspect(&*network, &outcome));
        restore_reversed(&saved, network)?;
        let result = result?;
        tracing::debug!(restored = saved.len(), "rolled back");
        Ok((
            ContingencyOutcome {
                stage: ApplicationStage::RolledBack,
                ..outcome
            },
            result,
        ))
    }

    /// Steps 1 to 4: returns the contingency-stage and final classifications.
    /// Tap and connection actions are already written to the network.
    pub fn classify(
        &mut self,
        network: &mut LfNetwork,
        contingency: &LfContingency,
        actions: &[LfAction],
    ) -> TopoResult<(Classification, Classification)> {
        let depth = self.connectivity.temporary_changes_depth();
        let mut opened = 0;
        let staged = self.stage(network, contingency, actions, &mut opened);
        let mut closed = Ok(());
        for _ in 0..opened {
            if let Err(err) = self.connectivity.undo_temporary_changes() {
                closed = Err(err);
                break;
            }
        }
        let result = staged?;
        closed?;
        if self.connectivity.temporary_changes_depth() != depth {
            return Err(TopoError::invariant(format!(
                "connectivity frames unbalanced after '{}': depth {} instead of {depth}",
                contingency.id(),
                self.connectivity.temporary_changes_depth()
            )));
        }
        Ok(result)
    }

    fn stage(
        &mut self,
        network: &mut LfNetwork,
        contingency: &LfContingency,
        actions: &[LfAction],
        opened: &mut usize,
    ) -> TopoResult<(Classification, Classification)> {
        let mut stage = ApplicationStage::Baseline;

        self.connectivity.start_temporary_changes();
        *opened += 1;
        for &num in contingency.branches() {
            self.connectivity.remove_edge(num);
        }
        advance(&mut stage, ApplicationStage::ContingencyApplied);

        let cut: BTreeSet<BranchNum> = contingency.branches().iter().copied().collect();
        let removed_buses = self.connectivity.vertices_removed_from_main_component();
        let mut removed_branches = self.connectivity.edges_removed_from_main_component();
        removed_branches.extend(cut.iter().copied());
        let mut contingency_branches = removed_branches.clone();
        contingency_branches.extend(hanging_branches(network, &removed_buses, &removed_branches));
        tracing::trace!(
            buses = removed_buses.len(),
            branches = contingency_branches.len(),
            "contingency stage classified"
        );
        let contingency_stage = Classification {
            disabled_buses: removed_buses.clone(),
            disabled_branches: contingency_branches,
            ..Classification::default()
        };

        self.connectivity.start_temporary_changes();
        *opened += 1;
        let mut edges = TrackedEdges {
            cut: &cut,
            overrides: BTreeMap::new(),
        };
        let mut opened_switches = BTreeSet::new();
        for action in actions {
            if let LfAction::Switch { branch, open } = *action {
                if open {
                    opened_switches.insert(branch);
                } else {
                    opened_switches.remove(&branch);
                }
            }
            self.apply_action(network, action, &mut edges)?;
        }
        advance(&mut stage, ApplicationStage::ActionsApplied);

        let removed_buses_2 = self.connectivity.vertices_removed_from_main_component();
        let enabled_buses = self.connectivity.vertices_added_to_main_component();
        let removed_branches_2 = self.connectivity.edges_removed_from_main_component();
        let enabled_branches = self.connectivity.edges_added_to_main_component();

        let disabled_buses: BTreeSet<BusNum> = removed_buses
            .union(&removed_buses_2)
            .filter(|bus| !enabled_buses.contains(bus))
            .copied()
            .collect();
        let mut disabled_branches: BTreeSet<BranchNum> = removed_branches
            .iter()
            .chain(&removed_branches_2)
            .chain(&opened_switches)
            .copied()
            .collect();
        let hanging = hanging_branches(network, &disabled_buses, &disabled_branches);
        disabled_branches.extend(hanging);
        disabled_branches.retain(|num| !enabled_branches.contains(num));
        advance(&mut stage, ApplicationStage::Classified);

        Ok((
            contingency_stage,
            Classification {
                disabled_buses,
                disabled_branches,
                enabled_buses,
                enabled_branches,
            },
        ))
    }

    /// Update the tracker for one action; tap and connection changes also go to the network.
    fn apply_action(&mut self, network: &mut LfNetwork, action: &LfAction, edges: &mut TrackedEdges<'_>) -> TopoResult<()> {
        match *action {
            LfAction::Switch { branch, open: true } => {
                self.connectivity.remove_edge(branch);
                edges.overrides.insert(branch, false);
            }
            LfAction::Switch { branch, open: false } => {
                let ends = network
                    .branch(branch)
                    .and_then(|b| b.closed_endpoints())
                    .ok_or_else(|| TopoError::invariant(format!("closed switch {branch} has no endpoints")))?;
                self.link(network, branch, ends, edges)?;
            }
            LfAction::TapPosition { branch, position } => {
                network.set_tap_position(branch, position)?;
            }
            LfAction::BranchConnection { branch, side1, side2 } => {
                let present = edges.is_present(network, branch);
                edges.overrides.insert(branch, present);
                for (side, connected) in [(Side::One, side1), (Side::Two, side2)] {
                    // a dangling side stays unconnected whatever is requested
                    if network.branch(branch).is_some_and(|b| b.bus(side).is_some()) {
                        network.set_branch_connected(branch, side, connected)?;
                    }
                }
                let energizable = network.branch(branch).filter(|b| !b.is_disabled()).and_then(|b| b.closed_endpoints());
                match energizable {
                    Some(ends) => self.link(network, branch, ends, edges)?,
                    None => {
                        self.connectivity.remove_edge(branch);
                        edges.overrides.insert(branch, false);
                    }
                }
            }
        }
        Ok(())
    }

    /// Add `branch` to the tracker unless it is already an edge there.
    fn link(
        &mut self,
        network: &LfNetwork,
        branch: BranchNum,
        (b1, b2): (BusNum, BusNum),
        edges: &mut TrackedEdges<'_>,
    ) -> TopoResult<()> {
        if edges.is_present(network, branch) {
            return Ok(());
        }
        self.connectivity.add_vertex(b1);
        self.connectivity.add_vertex(b2);
        self.connectivity.add_edge(b1, b2, branch)?;
        edges.overrides.insert(branch, true);
        Ok(())
    }
}

/// Tracker edge presence during the action frame.
struct TrackedEdges<'c> {
    cut: &'c BTreeSet<BranchNum>,
    /// Branches touched by an action, with their current presence
    overrides: BTreeMap<BranchNum, bool>,
}

impl TrackedEdges<'_> {
    fn is_present(&self, network: &LfNetwork, branch: BranchNum) -> bool {
        match self.overrides.get(&branch) {
            Some(&present) => present,
            None => network.connectivity_edge(branch).is_some() && !self.cut.contains(&branch),
        }
    }
}

fn advance(stage: &mut ApplicationStage, next: ApplicationStage) {
    tracing::trace!(from = ?*stage, to = ?next, "stage");
    *stage = next;
}

/// Step 5: disable first, then enable.
fn write_classification(network: &mut LfNetwork, classification: &Classification) -> TopoResult<()> {
    for &num in &classification.disabled_buses {
        network.set_bus_disabled(num, true)?;
    }
    for &num in &classification.disabled_branches {
        network.set_branch_disabled(num, true)?;
    }
    for &num in &classification.enabled_buses {
        network.set_bus_disabled(num, false)?;
    }
    for &num in &classification.enabled_branches {
        network.set_branch_disabled(num, false)?;
    }
    Ok(())
}

fn restore_reversed(states: &[ElementState], network: &mut LfNetwork) -> TopoResult<()> {
    for state in states.iter().rev() {
        state.restore(network)?;
    }
    Ok(())
}
