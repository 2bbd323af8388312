//! Network construction: the loader hands bus and branch records to
//! [`LfNetworkBuilder`], which assigns dense nums, validates topology and builds
//! the zero-impedance networks.
//!
//! ```
//! use lfnet_core::{BranchSpec, BusSpec, LfNetworkBuilder, TopologyConfig};
//! use lfnet_core::slack::FirstBusSelector;
//!
//! let mut builder = LfNetworkBuilder::new();
//! builder.add_bus(BusSpec::new("B1")).unwrap();
//! builder.add_bus(BusSpec::new("B2")).unwrap();
//! builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.01, 0.1)).unwrap();
//! let network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
//! assert_eq!(network.buses().len(), 2);
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TopologyConfig;
use crate::element::{Branch, BranchKind, BranchNum, Bus, BusNum, LossModel, TapChanger};
use crate::error::{TopoError, TopoResult};
use crate::network::LfNetwork;
use crate::slack::SlackBusSelector;
use crate::units::{PerUnit, Radians};
use crate::zero_impedance::ZeroImpedanceNetworks;

fn default_voltage() -> PerUnit {
    PerUnit(1.0)
}

fn default_true() -> bool {
    true
}

/// Bus record as provided by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSpec {
    pub id: String,
    #[serde(default = "default_voltage")]
    pub v: PerUnit,
    #[serde(default)]
    pub angle: Radians,
    #[serde(default)]
    pub disabled: bool,
}

impl BusSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            v: default_voltage(),
            angle: Radians(0.0),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Branch record as provided by the loader. A missing bus means the branch is
/// open at that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSpec {
    pub id: String,
    #[serde(default)]
    pub kind: BranchKind,
    pub bus1: Option<String>,
    pub bus2: Option<String>,
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_true")]
    pub connected_side1: bool,
    #[serde(default = "default_true")]
    pub connected_side2: bool,
    #[serde(default)]
    pub tap: Option<TapChanger>,
}

impl BranchSpec {
    pub fn line(id: impl Into<String>, bus1: &str, bus2: &str, r: f64, x: f64) -> Self {
        Self {
            id: id.into(),
            kind: BranchKind::Line,
            bus1: Some(bus1.to_string()),
            bus2: Some(bus2.to_string()),
            r,
            x,
            disabled: false,
            connected_side1: true,
            connected_side2: true,
            tap: None,
        }
    }

    /// Zero-impedance switch; an open switch is a disabled branch.
    pub fn switch(id: impl Into<String>, bus1: &str, bus2: &str, open: bool) -> Self {
        Self {
            kind: BranchKind::Switch,
            disabled: open,
            ..Self::line(id, bus1, bus2, 0.0, 0.0)
        }
    }

    pub fn transformer(id: impl Into<String>, bus1: &str, bus2: &str, r: f64, x: f64, tap: TapChanger) -> Self {
        Self {
            kind: BranchKind::Transformer,
            tap: Some(tap),
            ..Self::line(id, bus1, bus2, r, x)
        }
    }

    /// Branch attached on side 1 only.
    pub fn dangling(id: impl Into<String>, bus1: &str, r: f64, x: f64) -> Self {
        Self {
            bus2: None,
            ..Self::line(id, bus1, bus1, r, x)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Serialized case: the plain-data form consumed by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseData {
    pub buses: Vec<BusSpec>,
    pub branches: Vec<BranchSpec>,
}

impl CaseData {
    pub fn from_json_str(text: &str) -> TopoResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> TopoResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn into_network(self, config: TopologyConfig, selector: &dyn SlackBusSelector) -> TopoResult<LfNetwork> {
        let mut builder = LfNetworkBuilder::new();
        for bus in self.buses {
            builder.add_bus(bus)?;
        }
        for branch in self.branches {
            builder.add_branch(branch)?;
        }
        builder.build(config, selector)
    }
}

#[derive(Debug, Default)]
pub struct LfNetworkBuilder {
    buses: Vec<Bus>,
    branches: Vec<Branch>,
    bus_index: HashMap<String, BusNum>,
    branch_index: HashMap<String, BranchNum>,
}

impl LfNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, spec: BusSpec) -> TopoResult<BusNum> {
        if self.bus_index.contains_key(&spec.id) {
            return Err(TopoError::InvalidNetwork(format!("duplicate bus id '{}'", spec.id)));
        }
        let num = BusNum::new(self.buses.len());
        let mut bus = Bus::new(num, spec.id.clone());
        bus.v = spec.v;
        bus.angle = spec.angle;
        bus.disabled = spec.disabled;
        self.bus_index.insert(spec.id, num);
        self.buses.push(bus);
        Ok(num)
    }

    fn resolve_bus(&self, branch_id: &str, bus_id: Option<&String>) -> TopoResult<Option<BusNum>> {
        bus_id
            .map(|id| {
                self.bus_index.get(id).copied().ok_or_else(|| {
                    TopoError::InvalidNetwork(format!("branch '{branch_id}' references unknown bus '{id}'"))
                })
            })
            .transpose()
    }

    pub fn add_branch(&mut self, spec: BranchSpec) -> TopoResult<BranchNum> {
        if self.branch_index.contains_key(&spec.id) {
            return Err(TopoError::InvalidNetwork(format!("duplicate branch id '{}'", spec.id)));
        }
        let bus1 = self.resolve_bus(&spec.id, spec.bus1.as_ref())?;
        let bus2 = self.resolve_bus(&spec.id, spec.bus2.as_ref())?;
        if bus1.is_some() && bus1 == bus2 {
            return Err(TopoError::InvalidNetwork(format!(
                "branch '{}' connects bus '{}' to itself",
                spec.id,
                spec.bus1.as_deref().unwrap_or_default()
            )));
        }
        if bus1.is_none() && bus2.is_none() {
            return Err(TopoError::InvalidNetwork(format!("branch '{}' has no bus", spec.id)));
        }
        if !spec.r.is_finite() || !spec.x.is_finite() {
            return Err(TopoError::InvalidNetwork(format!("branch '{}' has a non-finite impedance", spec.id)));
        }

        let (r1, a1) = match &spec.tap {
            Some(tap) => {
                let step = tap.current_step().ok_or_else(|| {
                    TopoError::InvalidNetwork(format!(
                        "branch '{}' tap position {} is outside its {} steps",
                        spec.id,
                        tap.position,
                        tap.steps.len()
                    ))
                })?;
                (step.ratio, step.alpha)
            }
            None => (1.0, Radians(0.0)),
        };

        let num = BranchNum::new(self.branches.len());
        for bus in [bus1, bus2].into_iter().flatten() {
            self.buses[bus.value()].branches.push(num);
        }
        self.branch_index.insert(spec.id.clone(), num);
        self.branches.push(Branch {
            num,
            id: spec.id,
            kind: spec.kind,
            bus1,
            bus2,
            disabled: spec.disabled,
            connected_side1: spec.connected_side1,
            connected_side2: spec.connected_side2,
            r: spec.r,
            x: spec.x,
            r1,
            a1,
            tap: spec.tap,
            zero_impedance: [false; 2],
            spanning_tree_edge: [false; 2],
        });
        Ok(num)
    }

    pub fn build(mut self, config: TopologyConfig, selector: &dyn SlackBusSelector) -> TopoResult<LfNetwork> {
        config.validate()?;
        if self.buses.is_empty() {
            return Err(TopoError::InvalidNetwork("network has no bus".into()));
        }

        for branch in &mut self.branches {
            for model in LossModel::ALL {
                branch.zero_impedance[model.index()] =
                    config.tracks_zero_impedance(model) && branch.impedance_below(model, config.threshold(model));
            }
        }

        let mut zero_impedance = [None, None];
        for model in LossModel::ALL {
            if config.tracks_zero_impedance(model) {
                zero_impedance[model.index()] =
                    Some(ZeroImpedanceNetworks::create(model, &mut self.buses, &mut self.branches)?);
            }
        }

        let enabled: Vec<&Bus> = self.buses.iter().filter(|bus| !bus.disabled).collect();
        let slack = if enabled.is_empty() {
            None
        } else {
            Some(selector.select(&enabled)?)
        };
        if let Some(slack) = slack {
            self.buses[slack.value()].slack = true;
        }
        tracing::info!(
            buses = self.buses.len(),
            branches = self.branches.len(),
            slack = ?slack.map(|s| self.buses[s.value()].id.clone()),
            selector = selector.name(),
            "built network"
        );

        Ok(LfNetwork::from_parts(
            self.buses,
            self.branches,
            self.bus_index,
            self.branch_index,
            config,
            slack,
            zero_impedance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TapStep;
    use crate::slack::{FirstBusSelector, MostMeshedSelector, NameSelector};

    fn three_buses() -> LfNetworkBuilder {
        let mut builder = LfNetworkBuilder::new();
        for id in ["B1", "B2", "B3"] {
            builder.add_bus(BusSpec::new(id)).unwrap();
        }
        builder
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut builder = three_buses();
        let err = builder.add_branch(BranchSpec::line("L", "B1", "B1", 0.0, 0.1)).unwrap_err();
        assert!(matches!(err, TopoError::InvalidNetwork(_)));
    }

    #[test]
    fn test_unknown_bus_and_duplicates_rejected() {
        let mut builder = three_buses();
        assert!(builder.add_branch(BranchSpec::line("L", "B1", "B9", 0.0, 0.1)).is_err());
        assert!(builder.add_bus(BusSpec::new("B2")).is_err());
        builder.add_branch(BranchSpec::line("L", "B1", "B2", 0.0, 0.1)).unwrap();
        assert!(builder.add_branch(BranchSpec::line("L", "B2", "B3", 0.0, 0.1)).is_err());
    }

    #[test]
    fn test_nums_are_dense_in_insertion_order() {
        let mut builder = three_buses();
        builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.0, 0.1)).unwrap();
        builder.add_branch(BranchSpec::line("L23", "B2", "B3", 0.0, 0.1)).unwrap();
        let network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
        for (i, bus) in network.buses().iter().enumerate() {
            assert_eq!(bus.num().value(), i);
        }
        assert_eq!(network.branch_by_id("L23").unwrap().num().value(), 1);
        assert_eq!(network.bus_by_id("B2").unwrap().branches().len(), 2);
    }

    #[test]
    fn test_slack_selection_strategies() {
        let build = |selector: &dyn SlackBusSelector| {
            let mut builder = three_buses();
            builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.0, 0.1)).unwrap();
            builder.add_branch(BranchSpec::line("L23", "B2", "B3", 0.0, 0.1)).unwrap();
            let network = builder.build(TopologyConfig::default(), selector).unwrap();
            network.slack_bus().map(|s| network.bus(s).unwrap().id().to_string())
        };
        assert_eq!(build(&FirstBusSelector).as_deref(), Some("B1"));
        assert_eq!(build(&MostMeshedSelector).as_deref(), Some("B2"));
        assert_eq!(build(&NameSelector::new(vec!["B9".into(), "B3".into()])).as_deref(), Some("B3"));
    }

    #[test]
    fn test_tap_sets_ratio_and_shift() {
        let mut builder = three_buses();
        let tap = TapChanger::new(
            1,
            vec![
                TapStep { ratio: 0.95, alpha: Radians(0.0) },
                TapStep { ratio: 1.0, alpha: Radians(0.1) },
            ],
        );
        builder
            .add_branch(BranchSpec::transformer("T1", "B1", "B2", 0.0, 0.1, tap.clone()))
            .unwrap();
        let network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
        let t1 = network.branch_by_id("T1").unwrap();
        assert_eq!(t1.r1(), 1.0);
        assert_eq!(t1.a1(), Radians(0.1));

        let mut builder = three_buses();
        let bad = TapChanger { position: 5, ..tap };
        assert!(builder.add_branch(BranchSpec::transformer("T1", "B1", "B2", 0.0, 0.1, bad)).is_err());
    }

    #[test]
    fn test_case_data_from_json() {
        let json = r#"{
            "buses": [{"id": "B1"}, {"id": "B2", "v": 1.02}],
            "branches": [
                {"id": "S1", "kind": "switch", "bus1": "B1", "bus2": "B2", "disabled": true},
                {"id": "D1", "bus1": "B2", "bus2": null, "x": 0.2}
            ]
        }"#;
        let case = CaseData::from_json_str(json).unwrap();
        assert_eq!(case.buses[1].v, PerUnit(1.02));
        let network = case.into_network(TopologyConfig::default(), &FirstBusSelector).unwrap();
        let switch = network.branch_by_id("S1").unwrap();
        assert!(switch.is_disabled());
        assert_eq!(switch.kind(), BranchKind::Switch);
        assert!(network.branch_by_id("D1").unwrap().bus2().is_none());
    }
}
