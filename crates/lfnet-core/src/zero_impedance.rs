//! Zero-impedance sub-networks.
//!
//! Branches whose impedance is below a model-specific threshold are ideal
//! connectors: the buses they join share one voltage angle. The solver keeps one
//! angle-equality equation per spanning-tree edge, so for every connected set of
//! zero-impedance branches we maintain a [`ZeroImpedanceNetwork`] holding its
//! buses, its *enabled* branches and a spanning tree over them.
//!
//! Invariants (checked by [`ZeroImpedanceNetworks::check_consistency`]):
//!
//! - every active zero-impedance branch belongs to exactly one network, the one
//!   both of its endpoints point to; inactive branches belong to none
//! - every network holds at least one branch, a bus with no active
//!   zero-impedance branch belongs to no network
//! - a network's spanning tree only contains its current branches, is acyclic and
//!   spans all of its buses
//!
//! Enabling a branch may merge two networks, disabling one may split a network
//! into several. Networks are given a fresh id whenever they are split or merged.
//!
//! The spanning tree is computed with Kruskal's algorithm
//! (`petgraph::algo::min_spanning_tree`) weighted by branch num, so ties are
//! broken deterministically.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::min_spanning_tree;
use petgraph::data::Element;
use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::element::{Branch, BranchNum, Bus, BusNum, LossModel};
use crate::error::{TopoError, TopoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZeroImpedanceNetworkId(u64);

impl ZeroImpedanceNetworkId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ZeroImpedanceNetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "zin#{}", self.0)
    }
}

/// A connected set of buses joined by enabled zero-impedance branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroImpedanceNetwork {
    id: ZeroImpedanceNetworkId,
    model: LossModel,
    buses: BTreeSet<BusNum>,
    branches: BTreeSet<BranchNum>,
    spanning_tree: BTreeSet<BranchNum>,
}

impl ZeroImpedanceNetwork {
    pub fn id(&self) -> ZeroImpedanceNetworkId {
        self.id
    }

    pub fn model(&self) -> LossModel {
        self.model
    }

    pub fn buses(&self) -> &BTreeSet<BusNum> {
        &self.buses
    }

    pub fn branches(&self) -> &BTreeSet<BranchNum> {
        &self.branches
    }

    pub fn spanning_tree_edges(&self) -> &BTreeSet<BranchNum> {
        &self.spanning_tree
    }
}

/// Changes produced by the manager, dispatched to listeners by the network.
#[derive(Debug, Clone)]
pub(crate) enum ZeroImpedanceEvent {
    Split {
        original: ZeroImpedanceNetwork,
        parts: Vec<ZeroImpedanceNetwork>,
    },
    Merge {
        first: ZeroImpedanceNetwork,
        second: ZeroImpedanceNetwork,
        merged: ZeroImpedanceNetwork,
    },
    SpanningTreeChange {
        branch: BranchNum,
        spanning_tree_edge: bool,
    },
}

/// All zero-impedance networks of one loss model.
#[derive(Debug, Clone)]
pub struct ZeroImpedanceNetworks {
    model: LossModel,
    networks: BTreeMap<ZeroImpedanceNetworkId, ZeroImpedanceNetwork>,
    next_id: u64,
}

fn endpoints(branches: &[Branch], num: BranchNum) -> TopoResult<(BusNum, BusNum)> {
    branches
        .get(num.value())
        .and_then(Branch::closed_endpoints)
        .ok_or_else(|| {
            TopoError::invariant(format!("{num} has no closed endpoints but is a zero-impedance edge"))
        })
}

/// Kruskal over the given branches, weighted by branch num.
fn compute_spanning_tree(
    buses: &BTreeSet<BusNum>,
    edges: &BTreeSet<BranchNum>,
    branches: &[Branch],
) -> TopoResult<BTreeSet<BranchNum>> {
    let mut graph = UnGraph::<BusNum, BranchNum>::with_capacity(buses.len(), edges.len());
    let index: HashMap<BusNum, _> = buses.iter().map(|&bus| (bus, graph.add_node(bus))).collect();
    for &num in edges {
        let (b1, b2) = endpoints(branches, num)?;
        match (index.get(&b1), index.get(&b2)) {
            (Some(&n1), Some(&n2)) => {
                graph.add_edge(n1, n2, num);
            }
            _ => {
                return Err(TopoError::invariant(format!(
                    "{num} joins {b1} and {b2} which are not both in the zero-impedance network"
                )))
            }
        }
    }
    Ok(min_spanning_tree(&graph)
        .filter_map(|element| match element {
            Element::Edge { weight, .. } => Some(weight),
            Element::Node { .. } => None,
        })
        .collect())
}

/// Connected components of `edges` restricted to `buses`, ordered by lowest bus.
fn components(
    buses: &BTreeSet<BusNum>,
    edges: &BTreeSet<BranchNum>,
    branches: &[Branch],
) -> TopoResult<Vec<(BTreeSet<BusNum>, BTreeSet<BranchNum>)>> {
    let local: HashMap<BusNum, usize> = buses.iter().enumerate().map(|(i, &bus)| (bus, i)).collect();
    let mut sets = UnionFind::<usize>::new(buses.len());
    let mut local_edges = Vec::with_capacity(edges.len());
    for &num in edges {
        let (b1, b2) = endpoints(branches, num)?;
        let (i1, i2) = match (local.get(&b1), local.get(&b2)) {
            (Some(&i1), Some(&i2)) => (i1, i2),
            _ => {
                return Err(TopoError::invariant(format!(
                    "{num} leaves its zero-impedance network"
                )))
            }
        };
        sets.union(i1, i2);
        local_edges.push((num, i1));
    }

    let mut grouped: BTreeMap<usize, (BTreeSet<BusNum>, BTreeSet<BranchNum>)> = BTreeMap::new();
    for (&bus, &i) in &local {
        grouped.entry(sets.find(i)).or_default().0.insert(bus);
    }
    for (num, i) in local_edges {
        grouped.entry(sets.find(i)).or_default().1.insert(num);
    }
    let mut result: Vec<_> = grouped.into_values().collect();
    result.sort_by_key(|(buses, _)| buses.first().copied());
    Ok(result)
}

impl ZeroImpedanceNetworks {
    /// Partition the active zero-impedance branches of `model` and tag every
    /// bus and branch with its membership and spanning-tree status.
    pub(crate) fn create(model: LossModel, buses: &mut [Bus], branches: &mut [Branch]) -> TopoResult<Self> {
        let m = model.index();
        for bus in buses.iter_mut() {
            bus.zero_impedance_network[m] = None;
        }
        for branch in branches.iter_mut() {
            branch.spanning_tree_edge[m] = false;
        }

        let all_buses: BTreeSet<BusNum> = buses.iter().map(Bus::num).collect();
        let active: BTreeSet<BranchNum> = branches
            .iter()
            .filter(|branch| branch.is_active_zero_impedance(model))
            .map(Branch::num)
            .collect();

        let mut manager = Self {
            model,
            networks: BTreeMap::new(),
            next_id: 0,
        };
        for (component_buses, component_branches) in components(&all_buses, &active, branches)? {
            if component_branches.is_empty() {
                continue;
            }
            let mut events = Vec::new();
            manager.insert_network(component_buses, component_branches, buses, branches, &mut events)?;
        }
        tracing::debug!(%model, networks = manager.networks.len(), "created zero-impedance networks");
        Ok(manager)
    }

    pub fn model(&self) -> LossModel {
        self.model
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn get(&self, id: ZeroImpedanceNetworkId) -> Option<&ZeroImpedanceNetwork> {
        self.networks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZeroImpedanceNetwork> {
        self.networks.values()
    }

    fn allocate_id(&mut self) -> ZeroImpedanceNetworkId {
        let id = ZeroImpedanceNetworkId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a new network over `network_buses`, assign memberships and compute its tree.
    fn insert_network(
        &mut self,
        network_buses: BTreeSet<BusNum>,
        network_branches: BTreeSet<BranchNum>,
        buses: &mut [Bus],
        branches: &mut [Branch],
        events: &mut Vec<ZeroImpedanceEvent>,
    ) -> TopoResult<ZeroImpedanceNetworkId> {
        let id = self.allocate_id();
        for bus in &network_buses {
            let slot = buses
                .get_mut(bus.value())
                .ok_or_else(|| TopoError::invariant(format!("{bus} does not exist")))?;
            slot.zero_impedance_network[self.model.index()] = Some(id);
        }
        self.networks.insert(
            id,
            ZeroImpedanceNetwork {
                id,
                model: self.model,
                buses: network_buses,
                branches: network_branches,
                spanning_tree: BTreeSet::new(),
            },
        );
        self.update_spanning_tree(id, branches, events)?;
        Ok(id)
    }

    fn network_mut(&mut self, id: ZeroImpedanceNetworkId) -> TopoResult<&mut ZeroImpedanceNetwork> {
        self.networks
            .get_mut(&id)
            .ok_or_else(|| TopoError::invariant(format!("{id} is referenced but not registered")))
    }

    fn take_network(&mut self, id: ZeroImpedanceNetworkId) -> TopoResult<ZeroImpedanceNetwork> {
        self.networks
            .remove(&id)
            .ok_or_else(|| TopoError::invariant(format!("{id} is referenced but not registered")))
    }

    /// Recompute the spanning tree of one network over its current branches.
    pub(crate) fn update_spanning_tree(
        &mut self,
        id: ZeroImpedanceNetworkId,
        branches: &mut [Branch],
        events: &mut Vec<ZeroImpedanceEvent>,
    ) -> TopoResult<()> {
        let m = self.model.index();
        let network = self.network_mut(id)?;
        let tree = compute_spanning_tree(&network.buses, &network.branches, branches)?;
        for &num in &network.branches {
            let in_tree = tree.contains(&num);
            let branch = &mut branches[num.value()];
            if branch.spanning_tree_edge[m] != in_tree {
                branch.spanning_tree_edge[m] = in_tree;
                events.push(ZeroImpedanceEvent::SpanningTreeChange {
                    branch: num,
                    spanning_tree_edge: in_tree,
                });
            }
        }
        network.spanning_tree = tree;
        Ok(())
    }

    /// A zero-impedance branch stopped being active: drop it from its network and
    /// split the network if it is no longer connected.
    ///
    /// The split event reports every part; parts left without a branch are
    /// unregistered afterwards and their buses belong to no network.
    ///
    /// `ends` are the branch endpoints as they were while the branch was active.
    pub(crate) fn remove_branch_and_try_split(
        &mut self,
        num: BranchNum,
        ends: (BusNum, BusNum),
        buses: &mut [Bus],
        branches: &mut [Branch],
    ) -> TopoResult<Vec<ZeroImpedanceEvent>> {
        let m = self.model.index();
        let (b1, b2) = ends;
        let id = match (
            buses[b1.value()].zero_impedance_network[m],
            buses[b2.value()].zero_impedance_network[m],
        ) {
            (Some(z1), Some(z2)) if z1 == z2 => z1,
            (z1, z2) => {
                return Err(TopoError::invariant(format!(
                    "{} zero-impedance {num} joins {b1} ({z1:?}) and {b2} ({z2:?}) which are not in one network",
                    self.model
                )))
            }
        };

        let mut events = Vec::new();
        let network = self.network_mut(id)?;
        let original = network.clone();
        if !network.branches.remove(&num) {
            return Err(TopoError::invariant(format!("{num} is not an edge of {id}")));
        }
        network.spanning_tree.remove(&num);
        if branches[num.value()].spanning_tree_edge[m] {
            branches[num.value()].spanning_tree_edge[m] = false;
            events.push(ZeroImpedanceEvent::SpanningTreeChange {
                branch: num,
                spanning_tree_edge: false,
            });
        }

        let parts = components(&network.buses, &network.branches, branches)?;
        if parts.len() == 1 {
            self.update_spanning_tree(id, branches, &mut events)?;
            return Ok(events);
        }

        self.take_network(id)?;
        let mut part_ids = Vec::with_capacity(parts.len());
        for (part_buses, part_branches) in parts {
            part_ids.push(self.insert_network(part_buses, part_branches, buses, branches, &mut events)?);
        }
        let parts: Vec<ZeroImpedanceNetwork> = part_ids
            .iter()
            .filter_map(|part| self.networks.get(part).cloned())
            .collect();
        // a bus left without zero-impedance branches belongs to no network
        for part in parts.iter().filter(|part| part.branches.is_empty()) {
            self.take_network(part.id)?;
            for bus in &part.buses {
                buses[bus.value()].zero_impedance_network[m] = None;
            }
        }
        tracing::debug!(model = %self.model, %id, parts = parts.len(), "split zero-impedance network");
        events.push(ZeroImpedanceEvent::Split { original, parts });
        Ok(events)
    }

    /// A zero-impedance branch became active: attach it, merging the networks of
    /// its endpoints when they differ.
    pub(crate) fn add_branch_and_merge(
        &mut self,
        num: BranchNum,
        ends: (BusNum, BusNum),
        buses: &mut [Bus],
        branches: &mut [Branch],
    ) -> TopoResult<Vec<ZeroImpedanceEvent>> {
        let m = self.model.index();
        let (b1, b2) = ends;
        let mut events = Vec::new();
        let z1 = buses[b1.value()].zero_impedance_network[m];
        let z2 = buses[b2.value()].zero_impedance_network[m];

        match (z1, z2) {
            (Some(z1), Some(z2)) if z1 == z2 => {
                let network = self.network_mut(z1)?;
                if !network.branches.insert(num) {
                    return Err(TopoError::invariant(format!("{num} is already an edge of {z1}")));
                }
                self.update_spanning_tree(z1, branches, &mut events)?;
            }
            (Some(z1), Some(z2)) => {
                let first = self.take_network(z1)?;
                let second = self.take_network(z2)?;
                let merged_buses: BTreeSet<BusNum> = first.buses.union(&second.buses).copied().collect();
                let mut merged_branches: BTreeSet<BranchNum> =
                    first.branches.union(&second.branches).copied().collect();
                merged_branches.insert(num);
                let merged = self.insert_network(merged_buses, merged_branches, buses, branches, &mut events)?;
                let merged = self
                    .networks
                    .get(&merged)
                    .cloned()
                    .ok_or_else(|| TopoError::invariant(format!("{merged} vanished after merge")))?;
                tracing::debug!(model = %self.model, first = %z1, second = %z2, merged = %merged.id, "merged zero-impedance networks");
                events.push(ZeroImpedanceEvent::Merge { first, second, merged });
            }
            (Some(existing), None) | (None, Some(existing)) => {
                let joining = if z1.is_some() { b2 } else { b1 };
                let network = self.network_mut(existing)?;
                network.buses.insert(joining);
                network.branches.insert(num);
                buses[joining.value()].zero_impedance_network[m] = Some(existing);
                self.update_spanning_tree(existing, branches, &mut events)?;
            }
            (None, None) => {
                self.insert_network(
                    BTreeSet::from([b1, b2]),
                    BTreeSet::from([num]),
                    buses,
                    branches,
                    &mut events,
                )?;
            }
        }
        Ok(events)
    }

    /// Verify membership, partition and spanning-tree invariants.
    pub fn check_consistency(&self, buses: &[Bus], branches: &[Branch]) -> TopoResult<()> {
        let m = self.model.index();
        for (id, network) in &self.networks {
            if network.buses.is_empty() {
                return Err(TopoError::invariant(format!("{id} has no bus")));
            }
            if network.branches.is_empty() {
                return Err(TopoError::invariant(format!("{id} has no branch")));
            }
            for bus in &network.buses {
                if buses.get(bus.value()).and_then(|b| b.zero_impedance_network[m]) != Some(*id) {
                    return Err(TopoError::invariant(format!("{bus} is in {id} but does not point to it")));
                }
            }
            for num in &network.branches {
                let branch = &branches[num.value()];
                if !branch.is_active_zero_impedance(self.model) {
                    return Err(TopoError::invariant(format!("inactive {num} is an edge of {id}")));
                }
            }
            if !network.spanning_tree.is_subset(&network.branches) {
                return Err(TopoError::invariant(format!("{id} spanning tree holds a foreign edge")));
            }
            if network.spanning_tree.len() + 1 != network.buses.len() {
                return Err(TopoError::invariant(format!(
                    "{id} spanning tree has {} edges for {} buses",
                    network.spanning_tree.len(),
                    network.buses.len()
                )));
            }
            let tree_parts = components(&network.buses, &network.spanning_tree, branches)?;
            if tree_parts.len() != 1 {
                return Err(TopoError::invariant(format!("{id} spanning tree is not connected")));
            }
        }

        for branch in branches {
            let in_tree = branch.spanning_tree_edge[m];
            if !branch.is_active_zero_impedance(self.model) {
                if in_tree {
                    return Err(TopoError::invariant(format!(
                        "inactive {} is flagged as a spanning tree edge",
                        branch.num()
                    )));
                }
                continue;
            }
            let (b1, b2) = endpoints(branches, branch.num())?;
            let z1 = buses[b1.value()].zero_impedance_network[m];
            let z2 = buses[b2.value()].zero_impedance_network[m];
            let network = match (z1, z2) {
                (Some(z1), Some(z2)) if z1 == z2 => self
                    .networks
                    .get(&z1)
                    .ok_or_else(|| TopoError::invariant(format!("{z1} is referenced but not registered")))?,
                _ => {
                    return Err(TopoError::invariant(format!(
                        "zero-impedance {} joins buses of different networks ({z1:?}, {z2:?})",
                        branch.num()
                    )))
                }
            };
            if !network.branches.contains(&branch.num()) {
                return Err(TopoError::invariant(format!(
                    "zero-impedance {} is missing from {}",
                    branch.num(),
                    network.id
                )));
            }
            if network.spanning_tree.contains(&branch.num()) != in_tree {
                return Err(TopoError::invariant(format!(
                    "{} spanning tree flag disagrees with {}",
                    branch.num(),
                    network.id
                )));
            }
        }

        for bus in buses {
            if let Some(id) = bus.zero_impedance_network[m] {
                let member = self.networks.get(&id).is_some_and(|n| n.buses.contains(&bus.num()));
                if !member {
                    return Err(TopoError::invariant(format!("{} points to {id} which does not hold it", bus.num())));
                }
            }
        }
        Ok(())
    }
}
