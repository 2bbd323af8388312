//! Element-state snapshot and restore.
//!
//! A state is a plain value captured from one element. Restoring writes the
//! captured fields back through the [`LfNetwork`] setters, so listeners and the
//! zero-impedance networks see a restore exactly like a live change. Restoring
//! a state twice is the same as restoring it once, and restores on distinct
//! elements commute.
//!
//! ```
//! use lfnet_core::{BranchSpec, BusSpec, LfNetworkBuilder, TopologyConfig};
//! use lfnet_core::slack::FirstBusSelector;
//! use lfnet_core::state::{BranchState, RestorableState};
//!
//! let mut builder = LfNetworkBuilder::new();
//! builder.add_bus(BusSpec::new("B1")).unwrap();
//! builder.add_bus(BusSpec::new("B2")).unwrap();
//! let line = builder.add_branch(BranchSpec::line("L", "B1", "B2", 0.0, 0.1)).unwrap();
//! let mut network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
//!
//! let saved = BranchState::save(network.branch(line).unwrap());
//! network.set_branch_disabled(line, true).unwrap();
//! saved.restore(&mut network).unwrap();
//! assert!(!network.branch(line).unwrap().is_disabled());
//! ```

use serde::{Deserialize, Serialize};

use crate::element::{Branch, BranchNum, Bus, BusNum, ElementRef, Side};
use crate::error::TopoResult;
use crate::network::LfNetwork;
use crate::units::{PerUnit, Radians};

/// A state that can be written back onto the element it was taken from.
pub trait RestorableState {
    fn restore(&self, network: &mut LfNetwork) -> TopoResult<()>;
}

/// Identifies the element a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "num", rename_all = "lowercase")]
pub enum ElementKey {
    Bus(BusNum),
    Branch(BranchNum),
}

/// Fields shared by every element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledState {
    pub disabled: bool,
}

impl DisabledState {
    pub fn save(element: ElementRef<'_>) -> Self {
        let disabled = match element {
            ElementRef::Bus(bus) => bus.is_disabled(),
            ElementRef::Branch(branch) => branch.is_disabled(),
        };
        Self { disabled }
    }

    pub fn restore(&self, key: ElementKey, network: &mut LfNetwork) -> TopoResult<()> {
        match key {
            ElementKey::Bus(num) => network.set_bus_disabled(num, self.disabled),
            ElementKey::Branch(num) => network.set_branch_disabled(num, self.disabled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusState {
    pub num: BusNum,
    #[serde(flatten)]
    pub base: DisabledState,
    pub v: PerUnit,
    pub angle: Radians,
}

impl BusState {
    pub fn save(bus: &Bus) -> Self {
        Self {
            num: bus.num(),
            base: DisabledState::save(ElementRef::Bus(bus)),
            v: bus.v(),
            angle: bus.angle(),
        }
    }
}

impl RestorableState for BusState {
    fn restore(&self, network: &mut LfNetwork) -> TopoResult<()> {
        self.base.restore(ElementKey::Bus(self.num), network)?;
        network.set_bus_voltage(self.num, self.v)?;
        network.set_bus_angle(self.num, self.angle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchState {
    pub num: BranchNum,
    #[serde(flatten)]
    pub base: DisabledState,
    pub connected_side1: bool,
    pub connected_side2: bool,
    pub tap_position: Option<usize>,
    pub r1: f64,
    pub a1: Radians,
}

impl BranchState {
    pub fn save(branch: &Branch) -> Self {
        Self {
            num: branch.num(),
            base: DisabledState::save(ElementRef::Branch(branch)),
            connected_side1: branch.is_connected(Side::One),
            connected_side2: branch.is_connected(Side::Two),
            tap_position: branch.tap().map(|tap| tap.position),
            r1: branch.r1(),
            a1: branch.a1(),
        }
    }
}

impl RestorableState for BranchState {
    fn restore(&self, network: &mut LfNetwork) -> TopoResult<()> {
        self.base.restore(ElementKey::Branch(self.num), network)?;
        let attached = network
            .branch(self.num)
            .map(|branch| [branch.bus1().is_some(), branch.bus2().is_some()])
            .unwrap_or_default();
        for (side, connected, attached) in [
            (Side::One, self.connected_side1, attached[0]),
            (Side::Two, self.connected_side2, attached[1]),
        ] {
            if attached {
                network.set_branch_connected(self.num, side, connected)?;
            }
        }
        if let Some(position) = self.tap_position {
            network.set_tap_position(self.num, position)?;
        }
        // Ratio and shift last: they may have been set apart from the tap.
        network.set_branch_ratio(self.num, self.r1)?;
        network.set_branch_phase_shift(self.num, self.a1)
    }
}

/// State of any element kind, for heterogeneous collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementState {
    Bus(BusState),
    Branch(BranchState),
}

impl ElementState {
    pub fn key(&self) -> ElementKey {
        match self {
            ElementState::Bus(state) => ElementKey::Bus(state.num),
            ElementState::Branch(state) => ElementKey::Branch(state.num),
        }
    }
}

impl RestorableState for ElementState {
    fn restore(&self, network: &mut LfNetwork) -> TopoResult<()> {
        match self {
            ElementState::Bus(state) => state.restore(network),
            ElementState::Branch(state) => state.restore(network),
        }
    }
}

impl From<BusState> for ElementState {
    fn from(state: BusState) -> Self {
        ElementState::Bus(state)
    }
}

impl From<BranchState> for ElementState {
    fn from(state: BranchState) -> Self {
        ElementState::Branch(state)
    }
}

/// Capture one state per item, in iteration order.
pub fn save_all<T, S>(items: impl IntoIterator<Item = T>, save: impl Fn(T) -> S) -> Vec<S> {
    items.into_iter().map(save).collect()
}

/// Restore states in capture order, stopping at the first invariant violation.
pub fn restore_all<S: RestorableState>(states: &[S], network: &mut LfNetwork) -> TopoResult<()> {
    for state in states {
        state.restore(network)?;
    }
    Ok(())
}

/// Snapshot of every bus and branch of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    pub buses: Vec<BusState>,
    pub branches: Vec<BranchState>,
}

impl NetworkState {
    pub fn save(network: &LfNetwork) -> Self {
        Self {
            buses: save_all(network.buses(), BusState::save),
            branches: save_all(network.branches(), BranchState::save),
        }
    }
}

impl RestorableState for NetworkState {
    fn restore(&self, network: &mut LfNetwork) -> TopoResult<()> {
        restore_all(&self.buses, network)?;
        restore_all(&self.branches, network)
    }
}
