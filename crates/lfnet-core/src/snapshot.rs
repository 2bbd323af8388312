//! JSON dump of the current bus and branch state, for debugging.

use serde::Serialize;

use crate::element::{BranchKind, BusNum, LossModel, Side};
use crate::network::LfNetwork;
use crate::units::{PerUnit, Radians};

#[derive(Debug, Clone, Serialize)]
pub struct BusSnapshot {
    pub num: usize,
    pub id: String,
    pub disabled: bool,
    pub slack: bool,
    pub v: PerUnit,
    pub angle: Radians,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_impedance_network_ac: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_impedance_network_dc: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchSnapshot {
    pub num: usize,
    pub id: String,
    pub kind: BranchKind,
    pub bus1: Option<String>,
    pub bus2: Option<String>,
    pub disabled: bool,
    pub connected_side1: bool,
    pub connected_side2: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap_position: Option<usize>,
    /// Models in which the branch is a zero-impedance edge
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zero_impedance: Vec<LossModel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spanning_tree: Vec<LossModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub buses: Vec<BusSnapshot>,
    pub branches: Vec<BranchSnapshot>,
}

impl NetworkSnapshot {
    pub fn capture(network: &LfNetwork) -> Self {
        let bus_id = |num: Option<BusNum>| {
            num.and_then(|n| network.bus(n)).map(|bus| bus.id().to_string())
        };
        let buses = network
            .buses()
            .iter()
            .map(|bus| BusSnapshot {
                num: bus.num().value(),
                id: bus.id().to_string(),
                disabled: bus.is_disabled(),
                slack: bus.is_slack(),
                v: bus.v(),
                angle: bus.angle(),
                zero_impedance_network_ac: bus.zero_impedance_network(LossModel::Ac).map(|id| id.value()),
                zero_impedance_network_dc: bus.zero_impedance_network(LossModel::Dc).map(|id| id.value()),
            })
            .collect();
        let branches = network
            .branches()
            .iter()
            .map(|branch| BranchSnapshot {
                num: branch.num().value(),
                id: branch.id().to_string(),
                kind: branch.kind(),
                bus1: bus_id(branch.bus1()),
                bus2: bus_id(branch.bus2()),
                disabled: branch.is_disabled(),
                connected_side1: branch.is_connected(Side::One),
                connected_side2: branch.is_connected(Side::Two),
                tap_position: branch.tap().map(|tap| tap.position),
                zero_impedance: LossModel::ALL
                    .into_iter()
                    .filter(|&model| branch.is_zero_impedance(model))
                    .collect(),
                spanning_tree: LossModel::ALL
                    .into_iter()
                    .filter(|&model| branch.is_spanning_tree_edge(model))
                    .collect(),
            })
            .collect();
        Self { buses, branches }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
