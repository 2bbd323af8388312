//! The network container and its mutation API.
//!
//! [`LfNetwork`] owns its buses, branches, per-model zero-impedance networks
//! and listeners. All mutable element fields go through the `set_*` methods
//! below, which
//!
//! 1. do nothing when the value is unchanged,
//! 2. update the field and notify listeners,
//! 3. keep the zero-impedance networks in sync (split, merge, spanning tree),
//!    notifying listeners of each resulting event.
//!
//! The network is not internally synchronized. It is `Send` so independent
//! instances can be processed on different threads.

use std::collections::HashMap;

use crate::config::TopologyConfig;
use crate::connectivity::{self, GraphConnectivity};
use crate::element::{Branch, BranchNum, Bus, BusNum, ElementRef, LossModel, Side};
use crate::error::{TopoError, TopoResult};
use crate::listener::NetworkListener;
use crate::units::{PerUnit, Radians};
use crate::zero_impedance::{ZeroImpedanceEvent, ZeroImpedanceNetworks};

/// Zero-impedance activity of a branch captured before a mutation.
#[derive(Debug, Clone, Copy)]
struct ZeroImpedanceStatus {
    active: [bool; 2],
    ends: Option<(BusNum, BusNum)>,
}

pub struct LfNetwork {
    buses: Vec<Bus>,
    branches: Vec<Branch>,
    bus_index: HashMap<String, BusNum>,
    branch_index: HashMap<String, BranchNum>,
    config: TopologyConfig,
    slack_bus: Option<BusNum>,
    zero_impedance: [Option<ZeroImpedanceNetworks>; 2],
    listeners: Vec<Box<dyn NetworkListener>>,
}

impl std::fmt::Debug for LfNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfNetwork")
            .field("buses", &self.buses.len())
            .field("branches", &self.branches.len())
            .field("slack_bus", &self.slack_bus)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LfNetwork {
    pub(crate) fn from_parts(
        buses: Vec<Bus>,
        branches: Vec<Branch>,
        bus_index: HashMap<String, BusNum>,
        branch_index: HashMap<String, BranchNum>,
        config: TopologyConfig,
        slack_bus: Option<BusNum>,
        zero_impedance: [Option<ZeroImpedanceNetworks>; 2],
    ) -> Self {
        Self {
            buses,
            branches,
            bus_index,
            branch_index,
            config,
            slack_bus,
            zero_impedance,
            listeners: Vec::new(),
        }
    }

    /// Independent copy of the network state. Listeners are not carried over.
    pub fn fork(&self) -> Self {
        Self {
            buses: self.buses.clone(),
            branches: self.branches.clone(),
            bus_index: self.bus_index.clone(),
            branch_index: self.branch_index.clone(),
            config: self.config.clone(),
            slack_bus: self.slack_bus,
            zero_impedance: self.zero_impedance.clone(),
            listeners: Vec::new(),
        }
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn bus(&self, num: BusNum) -> Option<&Bus> {
        self.buses.get(num.value())
    }

    pub fn branch(&self, num: BranchNum) -> Option<&Branch> {
        self.branches.get(num.value())
    }

    pub fn bus_by_id(&self, id: &str) -> Option<&Bus> {
        self.bus_index.get(id).map(|num| &self.buses[num.value()])
    }

    pub fn branch_by_id(&self, id: &str) -> Option<&Branch> {
        self.branch_index.get(id).map(|num| &self.branches[num.value()])
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn slack_bus(&self) -> Option<BusNum> {
        self.slack_bus
    }

    /// `None` when the model is not tracked by the configuration.
    pub fn zero_impedance_networks(&self, model: LossModel) -> Option<&ZeroImpedanceNetworks> {
        self.zero_impedance[model.index()].as_ref()
    }

    pub fn add_listener(&mut self, listener: Box<dyn NetworkListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn disabled_buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.iter().filter(|bus| bus.disabled)
    }

    pub fn disabled_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|branch| branch.disabled)
    }

    /// Validate the zero-impedance partition of every tracked model.
    pub fn check_consistency(&self) -> TopoResult<()> {
        for manager in self.zero_impedance.iter().flatten() {
            manager.check_consistency(&self.buses, &self.branches)?;
        }
        Ok(())
    }

    /// Endpoints of a branch as a connectivity edge: enabled, closed on both
    /// sides, and attached to two enabled buses.
    pub fn connectivity_edge(&self, num: BranchNum) -> Option<(BusNum, BusNum)> {
        let branch = self.branches.get(num.value())?;
        if branch.disabled {
            return None;
        }
        let (b1, b2) = branch.closed_endpoints()?;
        let enabled = |bus: BusNum| !self.buses[bus.value()].disabled;
        (enabled(b1) && enabled(b2)).then_some((b1, b2))
    }

    /// Build a connectivity tracker over the enabled topology, anchored at the slack bus.
    pub fn create_connectivity(&self) -> TopoResult<Box<dyn GraphConnectivity>> {
        let mut tracker = connectivity::create_connectivity(self.config.connectivity);
        for bus in self.buses.iter().filter(|bus| !bus.disabled) {
            tracker.add_vertex(bus.num);
        }
        for branch in &self.branches {
            if let Some((b1, b2)) = self.connectivity_edge(branch.num) {
                tracker.add_edge(b1, b2, branch.num)?;
            }
        }
        if let Some(slack) = self.slack_bus {
            tracker.set_main_component_vertex(slack);
        }
        tracing::debug!(
            algorithm = ?self.config.connectivity,
            components = tracker.nb_connected_components(),
            "created connectivity tracker"
        );
        Ok(tracker)
    }

    fn bus_mut(&mut self, num: BusNum) -> TopoResult<&mut Bus> {
        self.buses
            .get_mut(num.value())
            .ok_or_else(|| TopoError::unknown_bus(num.to_string()))
    }

    fn branch_mut(&mut self, num: BranchNum) -> TopoResult<&mut Branch> {
        self.branches
            .get_mut(num.value())
            .ok_or_else(|| TopoError::unknown_branch(num.to_string()))
    }

    pub fn set_bus_disabled(&mut self, num: BusNum, disabled: bool) -> TopoResult<()> {
        let bus = self.bus_mut(num)?;
        if bus.disabled == disabled {
            return Ok(());
        }
        bus.disabled = disabled;
        tracing::debug!(bus = %bus.id, disabled, "bus disable change");
        let bus = &self.buses[num.value()];
        for listener in &mut self.listeners {
            listener.on_disable_change(ElementRef::Bus(bus), disabled);
        }
        Ok(())
    }

    pub fn set_branch_disabled(&mut self, num: BranchNum, disabled: bool) -> TopoResult<()> {
        let before = self.zero_impedance_status(num)?;
        let branch = self.branch_mut(num)?;
        if branch.disabled == disabled {
            return Ok(());
        }
        branch.disabled = disabled;
        tracing::debug!(branch = %branch.id, disabled, "branch disable change");
        let branch = &self.branches[num.value()];
        for listener in &mut self.listeners {
            listener.on_disable_change(ElementRef::Branch(branch), disabled);
        }
        self.sync_zero_impedance(num, before)
    }

    /// Open or close one side of a branch. A branch open on a side is not a
    /// zero-impedance edge.
    pub fn set_branch_connected(&mut self, num: BranchNum, side: Side, connected: bool) -> TopoResult<()> {
        let before = self.zero_impedance_status(num)?;
        let branch = self.branch_mut(num)?;
        if branch.bus(side).is_none() {
            return Err(TopoError::InvalidAction(format!(
                "branch '{}' has no bus on side {side:?}",
                branch.id
            )));
        }
        let slot = match side {
            Side::One => &mut branch.connected_side1,
            Side::Two => &mut branch.connected_side2,
        };
        if *slot == connected {
            return Ok(());
        }
        *slot = connected;
        tracing::debug!(branch = %branch.id, ?side, connected, "branch connection change");
        let branch = &self.branches[num.value()];
        for listener in &mut self.listeners {
            listener.on_branch_connection_status_change(branch, side, connected);
        }
        self.sync_zero_impedance(num, before)
    }

    /// Move a tap changer, updating the branch ratio and phase shift.
    pub fn set_tap_position(&mut self, num: BranchNum, position: usize) -> TopoResult<()> {
        let branch = self.branch_mut(num)?;
        let id = branch.id.clone();
        let tap = branch
            .tap
            .as_mut()
            .ok_or_else(|| TopoError::InvalidAction(format!("branch '{id}' has no tap changer")))?;
        let step = *tap.step(position).ok_or_else(|| {
            TopoError::InvalidAction(format!(
                "tap position {position} of branch '{id}' is outside 0..{}",
                tap.steps.len()
            ))
        })?;
        let old = tap.position;
        if old == position {
            return Ok(());
        }
        tap.position = position;
        branch.r1 = step.ratio;
        branch.a1 = step.alpha;
        tracing::debug!(branch = %id, old, new = position, "tap position change");
        let branch = &self.branches[num.value()];
        for listener in &mut self.listeners {
            listener.on_tap_position_change(branch, old, position);
        }
        Ok(())
    }

    /// Change series impedance and reclassify the branch for every tracked model.
    pub fn set_branch_impedance(&mut self, num: BranchNum, r: f64, x: f64) -> TopoResult<()> {
        if !r.is_finite() || !x.is_finite() {
            return Err(TopoError::InvalidAction(format!("non-finite impedance ({r}, {x}) for {num}")));
        }
        let before = self.zero_impedance_status(num)?;
        let config = &self.config;
        let branch = self
            .branches
            .get_mut(num.value())
            .ok_or_else(|| TopoError::unknown_branch(num.to_string()))?;
        if branch.r == r && branch.x == x {
            return Ok(());
        }
        branch.r = r;
        branch.x = x;
        for model in LossModel::ALL {
            branch.zero_impedance[model.index()] =
                config.tracks_zero_impedance(model) && branch.impedance_below(model, config.threshold(model));
        }
        tracing::debug!(branch = %branch.id, r, x, zero_impedance = ?branch.zero_impedance, "branch impedance change");
        self.sync_zero_impedance(num, before)
    }

    pub fn set_branch_ratio(&mut self, num: BranchNum, r1: f64) -> TopoResult<()> {
        let branch = self.branch_mut(num)?;
        if branch.r1 != r1 {
            tracing::trace!(branch = %branch.id, old = branch.r1, new = r1, "ratio change");
            branch.r1 = r1;
        }
        Ok(())
    }

    pub fn set_branch_phase_shift(&mut self, num: BranchNum, a1: Radians) -> TopoResult<()> {
        let branch = self.branch_mut(num)?;
        if branch.a1 != a1 {
            tracing::trace!(branch = %branch.id, old = %branch.a1, new = %a1, "phase shift change");
            branch.a1 = a1;
        }
        Ok(())
    }

    pub fn set_bus_voltage(&mut self, num: BusNum, v: PerUnit) -> TopoResult<()> {
        let bus = self.bus_mut(num)?;
        let old = bus.v;
        if old == v {
            return Ok(());
        }
        bus.v = v;
        let bus = &self.buses[num.value()];
        for listener in &mut self.listeners {
            listener.on_voltage_change(ElementRef::Bus(bus), old, v);
        }
        Ok(())
    }

    pub fn set_bus_angle(&mut self, num: BusNum, angle: Radians) -> TopoResult<()> {
        let bus = self.bus_mut(num)?;
        let old = bus.angle;
        if old == angle {
            return Ok(());
        }
        bus.angle = angle;
        let bus = &self.buses[num.value()];
        for listener in &mut self.listeners {
            listener.on_angle_change(ElementRef::Bus(bus), old, angle);
        }
        Ok(())
    }

    fn zero_impedance_status(&self, num: BranchNum) -> TopoResult<ZeroImpedanceStatus> {
        let branch = self
            .branches
            .get(num.value())
            .ok_or_else(|| TopoError::unknown_branch(num.to_string()))?;
        Ok(ZeroImpedanceStatus {
            active: LossModel::ALL.map(|model| branch.is_active_zero_impedance(model)),
            ends: branch.closed_endpoints(),
        })
    }

    /// Bring each tracked model's zero-impedance networks in line with the
    /// branch's current activity.
    fn sync_zero_impedance(&mut self, num: BranchNum, before: ZeroImpedanceStatus) -> TopoResult<()> {
        for model in LossModel::ALL {
            let m = model.index();
            let Some(manager) = self.zero_impedance[m].as_mut() else {
                continue;
            };
            let branch = &self.branches[num.value()];
            let after = branch.is_active_zero_impedance(model);
            let ends_after = branch.closed_endpoints();
            let events = match (before.active[m], after) {
                (true, false) => {
                    let ends = before.ends.ok_or_else(|| {
                        TopoError::invariant(format!("{num} was an active zero-impedance edge without endpoints"))
                    })?;
                    manager.remove_branch_and_try_split(num, ends, &mut self.buses, &mut self.branches)?
                }
                (false, true) => {
                    let ends = ends_after.ok_or_else(|| {
                        TopoError::invariant(format!("{num} is an active zero-impedance edge without endpoints"))
                    })?;
                    manager.add_branch_and_merge(num, ends, &mut self.buses, &mut self.branches)?
                }
                _ => continue,
            };
            self.dispatch_zero_impedance(model, events);
        }
        Ok(())
    }

    fn dispatch_zero_impedance(&mut self, model: LossModel, events: Vec<ZeroImpedanceEvent>) {
        for event in events {
            match event {
                ZeroImpedanceEvent::Split { original, parts } => {
                    for listener in &mut self.listeners {
                        listener.on_zero_impedance_network_split(model, &original, &parts);
                    }
                }
                ZeroImpedanceEvent::Merge { first, second, merged } => {
                    for listener in &mut self.listeners {
                        listener.on_zero_impedance_network_merge(model, &first, &second, &merged);
                    }
                }
                ZeroImpedanceEvent::SpanningTreeChange {
                    branch,
                    spanning_tree_edge,
                } => {
                    let branch = &self.branches[branch.value()];
                    for listener in &mut self.listeners {
                        listener.on_zero_impedance_network_spanning_tree_change(branch, model, spanning_tree_edge);
                    }
                }
            }
        }
    }
}
