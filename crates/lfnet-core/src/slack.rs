//! Slack bus selection strategies.
//!
//! The slack bus anchors the main connected component. The caller passes the
//! strategy explicitly to [`crate::LfNetworkBuilder::build`].

use crate::element::{Bus, BusNum};
use crate::error::{TopoError, TopoResult};

pub trait SlackBusSelector {
    fn name(&self) -> &'static str;

    /// Pick the slack among the enabled buses. `buses` is never empty.
    fn select(&self, buses: &[&Bus]) -> TopoResult<BusNum>;
}

/// Lowest bus num.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstBusSelector;

impl SlackBusSelector for FirstBusSelector {
    fn name(&self) -> &'static str {
        "first"
    }

    fn select(&self, buses: &[&Bus]) -> TopoResult<BusNum> {
        buses
            .iter()
            .map(|bus| bus.num())
            .min()
            .ok_or_else(|| TopoError::InvalidNetwork("no bus to select as slack".into()))
    }
}

/// Bus with the most incident branches; ties go to the lowest num.
#[derive(Debug, Default, Clone, Copy)]
pub struct MostMeshedSelector;

impl SlackBusSelector for MostMeshedSelector {
    fn name(&self) -> &'static str {
        "most-meshed"
    }

    fn select(&self, buses: &[&Bus]) -> TopoResult<BusNum> {
        buses
            .iter()
            .max_by(|a, b| {
                a.branches()
                    .len()
                    .cmp(&b.branches().len())
                    .then_with(|| b.num().cmp(&a.num()))
            })
            .map(|bus| bus.num())
            .ok_or_else(|| TopoError::InvalidNetwork("no bus to select as slack".into()))
    }
}

/// First bus of a caller-provided preference list that exists in the network.
#[derive(Debug, Clone)]
pub struct NameSelector {
    ids: Vec<String>,
}

impl NameSelector {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl SlackBusSelector for NameSelector {
    fn name(&self) -> &'static str {
        "name"
    }

    fn select(&self, buses: &[&Bus]) -> TopoResult<BusNum> {
        self.ids
            .iter()
            .find_map(|id| buses.iter().find(|bus| bus.id() == id))
            .map(|bus| bus.num())
            .ok_or_else(|| {
                TopoError::InvalidNetwork(format!(
                    "none of the slack bus ids {:?} is an enabled bus",
                    self.ids
                ))
            })
    }
}
