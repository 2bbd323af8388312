//! Connectivity tracking under reversible edge cuts and restores.
//!
//! A [`GraphConnectivity`] holds the bus/branch graph of the energized network
//! and answers, after a batch of speculative changes, which vertices and edges
//! left or rejoined the *main component* (the component of the main vertex,
//! normally the slack bus).
//!
//! ## Transactions
//!
//! Changes are scoped by nested frames:
//!
//! ```text
//! start_temporary_changes()     push frame A
//!   remove_edge(b1)
//!   start_temporary_changes()   push frame B
//!     add_edge(..., b2)
//!   undo_temporary_changes()    revert B only
//! undo_temporary_changes()      revert A, back to baseline
//! ```
//!
//! Deltas (`vertices_removed_from_main_component` and friends) are relative to
//! the state when the innermost open frame was pushed, and are empty when no
//! frame is open. An undo without a matching start is an invariant violation.
//!
//! ## Implementations
//!
//! | Type | Cut | Query |
//! |------|-----|-------|
//! | [`NaiveGraphConnectivity`] | O(1) | O(V + E) recompute |
//! | [`IncrementalGraphConnectivity`] | interleaved search, O(smaller side) | O(changed vertices) |
//!
//! Both satisfy the same contract; the naive one is kept as a reference.

mod graph;
mod incremental;
mod naive;

use std::collections::{BTreeSet, HashMap};

use crate::config::ConnectivityAlgorithm;
use crate::element::{BranchNum, BusNum};
use crate::error::TopoResult;

pub use incremental::IncrementalGraphConnectivity;
pub use naive::NaiveGraphConnectivity;

pub trait GraphConnectivity: Send {
    /// Add an isolated vertex. Adding a present vertex is a no-op.
    fn add_vertex(&mut self, vertex: BusNum);

    /// Add or restore an edge. Fails if the edge is already present or an endpoint is missing.
    fn add_edge(&mut self, vertex1: BusNum, vertex2: BusNum, edge: BranchNum) -> TopoResult<()>;

    /// Cut an edge. Cutting an absent edge is a no-op.
    fn remove_edge(&mut self, edge: BranchNum);

    fn start_temporary_changes(&mut self);

    /// Revert the innermost frame exactly.
    fn undo_temporary_changes(&mut self) -> TopoResult<()>;

    /// Number of open frames.
    fn temporary_changes_depth(&self) -> usize;

    fn set_main_component_vertex(&mut self, vertex: BusNum);

    /// The vertex anchoring the main component: the configured one if present,
    /// otherwise the lowest present vertex.
    fn main_component_vertex(&self) -> Option<BusNum>;

    fn vertices_removed_from_main_component(&mut self) -> BTreeSet<BusNum>;

    fn vertices_added_to_main_component(&mut self) -> BTreeSet<BusNum>;

    /// Edges that were in the main component (present, both ends in it) and no longer are.
    fn edges_removed_from_main_component(&mut self) -> BTreeSet<BranchNum>;

    fn edges_added_to_main_component(&mut self) -> BTreeSet<BranchNum>;

    /// 0 for the main component, then by decreasing size and lowest vertex.
    fn component_number(&mut self, vertex: BusNum) -> Option<usize>;

    fn nb_connected_components(&mut self) -> usize;

    fn connected_component(&mut self, vertex: BusNum) -> BTreeSet<BusNum>;

    fn is_in_main_component(&mut self, vertex: BusNum) -> bool {
        self.component_number(vertex) == Some(0)
    }
}

/// Build the configured tracker.
pub fn create_connectivity(algorithm: ConnectivityAlgorithm) -> Box<dyn GraphConnectivity> {
    match algorithm {
        ConnectivityAlgorithm::Naive => Box::new(NaiveGraphConnectivity::new()),
        ConnectivityAlgorithm::Incremental => Box::new(IncrementalGraphConnectivity::new()),
    }
}

/// Cached result of a delta query.
#[derive(Debug, Clone, Default)]
pub(crate) struct MainComponentDelta {
    pub vertices_removed: BTreeSet<BusNum>,
    pub vertices_added: BTreeSet<BusNum>,
    pub edges_removed: BTreeSet<BranchNum>,
    pub edges_added: BTreeSet<BranchNum>,
}

/// Number components given a label per vertex: the main label first, then by
/// decreasing size and lowest member.
pub(crate) fn number_components(
    labelled: impl Iterator<Item = (BusNum, u64)>,
    main_label: Option<u64>,
) -> HashMap<u64, usize> {
    let mut stats: HashMap<u64, (usize, BusNum)> = HashMap::new();
    for (vertex, label) in labelled {
        let entry = stats.entry(label).or_insert((0, vertex));
        entry.0 += 1;
        entry.1 = entry.1.min(vertex);
    }
    let mut order: Vec<(u64, usize, BusNum)> = stats
        .into_iter()
        .map(|(label, (size, lowest))| (label, size, lowest))
        .collect();
    order.sort_by(|a, b| {
        let a_main = Some(a.0) == main_label;
        let b_main = Some(b.0) == main_label;
        b_main
            .cmp(&a_main)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(number, (label, _, _))| (label, number))
        .collect()
}
