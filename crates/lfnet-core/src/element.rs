//! Passive element records: buses (graph vertices) and branches (graph edges).
//!
//! Elements are created by [`crate::LfNetworkBuilder`] and owned by [`crate::LfNetwork`].
//! Their `num` is a dense 0-based index assigned once at construction and never
//! reused, so it can be used directly as an array offset. Mutable fields are only
//! changed through network methods so that listeners and the zero-impedance
//! manager see every change.

use serde::{Deserialize, Serialize};

use crate::units::{PerUnit, Radians};
use crate::zero_impedance::ZeroImpedanceNetworkId;

/// Dense bus index (0..N-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusNum(usize);

/// Dense branch index (0..M-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchNum(usize);

impl BusNum {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusNum(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl BranchNum {
    #[inline]
    pub fn new(value: usize) -> Self {
        BranchNum(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BusNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

impl std::fmt::Display for BranchNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "branch#{}", self.0)
    }
}

/// Equation model a zero-impedance classification applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossModel {
    Ac,
    Dc,
}

impl LossModel {
    pub const ALL: [LossModel; 2] = [LossModel::Ac, LossModel::Dc];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            LossModel::Ac => 0,
            LossModel::Dc => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LossModel::Ac => "ac",
            LossModel::Dc => "dc",
        }
    }
}

impl std::fmt::Display for LossModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    #[default]
    Line,
    Transformer,
    Switch,
}

/// One step of a ratio/phase tap changer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapStep {
    /// Ratio applied on side 1 (per unit)
    pub ratio: f64,
    /// Phase shift applied on side 1
    pub alpha: Radians,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapChanger {
    pub position: usize,
    pub steps: Vec<TapStep>,
}

impl TapChanger {
    pub fn new(position: usize, steps: Vec<TapStep>) -> Self {
        Self { position, steps }
    }

    pub fn step(&self, position: usize) -> Option<&TapStep> {
        self.steps.get(position)
    }

    pub fn current_step(&self) -> Option<&TapStep> {
        self.step(self.position)
    }
}

#[derive(Debug, Clone)]
pub struct Bus {
    pub(crate) num: BusNum,
    pub(crate) id: String,
    pub(crate) disabled: bool,
    /// Voltage magnitude in per-unit
    pub(crate) v: PerUnit,
    /// Voltage angle in radians
    pub(crate) angle: Radians,
    pub(crate) slack: bool,
    pub(crate) branches: Vec<BranchNum>,
    pub(crate) zero_impedance_network: [Option<ZeroImpedanceNetworkId>; 2],
}

impl Bus {
    pub(crate) fn new(num: BusNum, id: String) -> Self {
        Self {
            num,
            id,
            disabled: false,
            v: PerUnit(1.0),
            angle: Radians(0.0),
            slack: false,
            branches: Vec::new(),
            zero_impedance_network: [None, None],
        }
    }

    pub fn num(&self) -> BusNum {
        self.num
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn v(&self) -> PerUnit {
        self.v
    }

    pub fn angle(&self) -> Radians {
        self.angle
    }

    pub fn is_slack(&self) -> bool {
        self.slack
    }

    /// Incident branches, in construction order.
    pub fn branches(&self) -> &[BranchNum] {
        &self.branches
    }

    pub fn zero_impedance_network(&self, model: LossModel) -> Option<ZeroImpedanceNetworkId> {
        self.zero_impedance_network[model.index()]
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub(crate) num: BranchNum,
    pub(crate) id: String,
    pub(crate) kind: BranchKind,
    pub(crate) bus1: Option<BusNum>,
    pub(crate) bus2: Option<BusNum>,
    pub(crate) disabled: bool,
    pub(crate) connected_side1: bool,
    pub(crate) connected_side2: bool,
    /// Series resistance (per-unit)
    pub(crate) r: f64,
    /// Series reactance (per-unit)
    pub(crate) x: f64,
    /// Ratio on side 1 (per-unit)
    pub(crate) r1: f64,
    /// Phase shift on side 1
    pub(crate) a1: Radians,
    pub(crate) tap: Option<TapChanger>,
    pub(crate) zero_impedance: [bool; 2],
    pub(crate) spanning_tree_edge: [bool; 2],
}

impl Branch {
    pub fn num(&self) -> BranchNum {
        self.num
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    pub fn bus1(&self) -> Option<BusNum> {
        self.bus1
    }

    pub fn bus2(&self) -> Option<BusNum> {
        self.bus2
    }

    pub fn bus(&self, side: Side) -> Option<BusNum> {
        match side {
            Side::One => self.bus1,
            Side::Two => self.bus2,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_connected(&self, side: Side) -> bool {
        match side {
            Side::One => self.connected_side1,
            Side::Two => self.connected_side2,
        }
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn r1(&self) -> f64 {
        self.r1
    }

    pub fn a1(&self) -> Radians {
        self.a1
    }

    pub fn tap(&self) -> Option<&TapChanger> {
        self.tap.as_ref()
    }

    pub fn is_zero_impedance(&self, model: LossModel) -> bool {
        self.zero_impedance[model.index()]
    }

    pub fn is_spanning_tree_edge(&self, model: LossModel) -> bool {
        self.spanning_tree_edge[model.index()]
    }

    /// Buses attached on a connected side, in side order.
    pub fn connected_buses(&self) -> impl Iterator<Item = BusNum> + '_ {
        let side1 = self.bus1.filter(|_| self.connected_side1);
        let side2 = self.bus2.filter(|_| self.connected_side2);
        side1.into_iter().chain(side2)
    }

    /// Both endpoints, when the branch is attached and closed on both sides.
    pub fn closed_endpoints(&self) -> Option<(BusNum, BusNum)> {
        match (self.bus1, self.bus2) {
            (Some(b1), Some(b2)) if self.connected_side1 && self.connected_side2 => Some((b1, b2)),
            _ => None,
        }
    }

    /// Impedance classification against a model-specific threshold.
    ///
    /// AC compares the impedance magnitude, DC only the reactance.
    pub fn impedance_below(&self, model: LossModel, threshold: f64) -> bool {
        match model {
            LossModel::Ac => self.r.hypot(self.x) < threshold,
            LossModel::Dc => self.x.abs() < threshold,
        }
    }

    /// Whether the branch currently counts as an edge of a zero-impedance network.
    pub fn is_active_zero_impedance(&self, model: LossModel) -> bool {
        !self.disabled && self.zero_impedance[model.index()] && self.closed_endpoints().is_some()
    }
}

/// Borrowed view of either element kind, used in listener notifications.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Bus(&'a Bus),
    Branch(&'a Branch),
}

impl ElementRef<'_> {
    pub fn id(&self) -> &str {
        match self {
            ElementRef::Bus(bus) => bus.id(),
            ElementRef::Branch(branch) => branch.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ElementRef::Bus(_) => "bus",
            ElementRef::Branch(_) => "branch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(r: f64, x: f64) -> Branch {
        Branch {
            num: BranchNum::new(0),
            id: "b".into(),
            kind: BranchKind::Line,
            bus1: Some(BusNum::new(0)),
            bus2: Some(BusNum::new(1)),
            disabled: false,
            connected_side1: true,
            connected_side2: true,
            r,
            x,
            r1: 1.0,
            a1: Radians(0.0),
            tap: None,
            zero_impedance: [false; 2],
            spanning_tree_edge: [false; 2],
        }
    }

    #[test]
    fn test_impedance_classification_differs_per_model() {
        let b = branch(0.01, 1e-10);
        assert!(!b.impedance_below(LossModel::Ac, 1e-8));
        assert!(b.impedance_below(LossModel::Dc, 1e-8));
    }

    #[test]
    fn test_connected_buses_skip_open_side() {
        let mut b = branch(0.0, 0.1);
        assert_eq!(b.connected_buses().count(), 2);
        b.connected_side2 = false;
        let buses: Vec<_> = b.connected_buses().collect();
        assert_eq!(buses, vec![BusNum::new(0)]);
        assert!(b.closed_endpoints().is_none());
    }
}
