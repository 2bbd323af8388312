//! Incremental tracker: component labels kept up to date on every change.
//!
//! - **Cut** `(u, v)`: two depth-first searches from `u` and `v` advance in
//!   lockstep. If they meet, nothing changes. Otherwise the search that runs out
//!   first has enumerated the smaller side, which gets a fresh label. The cost is
//!   bounded by the size of the smaller side.
//! - **Link** `(u, v)` across components: the smaller component takes the label
//!   of the larger one.
//! - **Undo**: every label change made inside a frame is logged with the previous
//!   label and replayed backwards.
//!
//! Deltas only look at vertices relabelled in the innermost frame, unless the
//! main vertex itself changed label, in which case all vertices are scanned.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::graph::{GraphOp, GraphStore};
use super::{number_components, GraphConnectivity, MainComponentDelta};
use crate::element::{BranchNum, BusNum};
use crate::error::TopoResult;

const NO_LABEL: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
struct IncrementalFrame {
    label_log_start: usize,
    main_label: u64,
}

#[derive(Debug, Default)]
struct Search {
    stack: Vec<BusNum>,
    visited: Vec<BusNum>,
}

enum SearchStep {
    Continue,
    Met,
    Exhausted,
}

impl Search {
    fn new(start: BusNum) -> Self {
        Self {
            stack: vec![start],
            visited: vec![start],
        }
    }

    /// Expand one vertex. `marks` tags visited vertices with `own` or `other`.
    fn step(&mut self, graph: &GraphStore, marks: &mut [u64], own: u64, other: u64) -> SearchStep {
        let Some(u) = self.stack.pop() else {
            return SearchStep::Exhausted;
        };
        for (_, w) in graph.neighbors(u) {
            let mark = &mut marks[w.value()];
            if *mark == other {
                return SearchStep::Met;
            }
            if *mark != own {
                *mark = own;
                self.visited.push(w);
                self.stack.push(w);
            }
        }
        SearchStep::Continue
    }
}

#[derive(Debug, Default)]
pub struct IncrementalGraphConnectivity {
    graph: GraphStore,
    labels: Vec<u64>,
    sizes: HashMap<u64, usize>,
    next_label: u64,
    /// (vertex, label before the change), recorded only inside frames
    label_log: Vec<(BusNum, u64)>,
    frames: Vec<IncrementalFrame>,
    main_vertex: Option<BusNum>,
    marks: Vec<u64>,
    epoch: u64,
    delta: Option<MainComponentDelta>,
}

impl IncrementalGraphConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_label(&mut self) -> u64 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn label(&self, v: BusNum) -> u64 {
        self.labels.get(v.value()).copied().unwrap_or(NO_LABEL)
    }

    fn write_label(&mut self, v: BusNum, label: u64) {
        let i = v.value();
        if i >= self.labels.len() {
            self.labels.resize(i + 1, NO_LABEL);
        }
        let old = self.labels[i];
        if old != NO_LABEL {
            if let Some(size) = self.sizes.get_mut(&old) {
                *size -= 1;
                if *size == 0 {
                    self.sizes.remove(&old);
                }
            }
        }
        if label != NO_LABEL {
            *self.sizes.entry(label).or_insert(0) += 1;
        }
        self.labels[i] = label;
    }

    fn set_label(&mut self, v: BusNum, label: u64) {
        let old = self.label(v);
        if old == label {
            return;
        }
        if !self.frames.is_empty() {
            self.label_log.push((v, old));
        }
        self.write_label(v, label);
    }

    fn current_main_label(&self) -> u64 {
        self.main_component_vertex()
            .map(|v| self.label(v))
            .unwrap_or(NO_LABEL)
    }

    fn next_epoch(&mut self) -> (u64, u64) {
        if self.marks.len() < self.graph.vertex_capacity() {
            self.marks.resize(self.graph.vertex_capacity(), 0);
        }
        self.epoch += 2;
        (self.epoch, self.epoch + 1)
    }

    /// Vertices reachable from `start` in the current graph.
    fn component_of(&mut self, start: BusNum) -> Vec<BusNum> {
        let (own, _) = self.next_epoch();
        self.marks[start.value()] = own;
        let mut search = Search::new(start);
        while let SearchStep::Continue = search.step(&self.graph, &mut self.marks, own, NO_LABEL) {}
        search.visited
    }

    /// After cutting `(v1, v2)`: the vertices of the side that got disconnected
    /// from the other, or `None` if both are still connected.
    fn disconnected_side(&mut self, v1: BusNum, v2: BusNum) -> Option<Vec<BusNum>> {
        let (mark1, mark2) = self.next_epoch();
        self.marks[v1.value()] = mark1;
        self.marks[v2.value()] = mark2;
        let mut side1 = Search::new(v1);
        let mut side2 = Search::new(v2);
        loop {
            match side1.step(&self.graph, &mut self.marks, mark1, mark2) {
                SearchStep::Met => return None,
                SearchStep::Exhausted => return Some(side1.visited),
                SearchStep::Continue => {}
            }
            match side2.step(&self.graph, &mut self.marks, mark2, mark1) {
                SearchStep::Met => return None,
                SearchStep::Exhausted => return Some(side2.visited),
                SearchStep::Continue => {}
            }
        }
    }

    fn compute_delta(&self) -> MainComponentDelta {
        let Some(frame) = self.frames.last() else {
            return MainComponentDelta::default();
        };

        let mut start_labels: HashMap<BusNum, u64> = HashMap::new();
        for &(v, previous) in &self.label_log[frame.label_log_start..] {
            start_labels.entry(v).or_insert(previous);
        }
        let label_at_start = |v: BusNum| start_labels.get(&v).copied().unwrap_or_else(|| self.label(v));
        let main_before = frame.main_label;
        let main_now = self.current_main_label();
        let was_main = |v: BusNum| main_before != NO_LABEL && label_at_start(v) == main_before;
        let is_main = |v: BusNum| main_now != NO_LABEL && self.label(v) == main_now;

        let candidates: Vec<BusNum> = if main_before == main_now {
            start_labels.keys().copied().collect()
        } else {
            (0..self.labels.len()).map(BusNum::new).collect()
        };

        let mut delta = MainComponentDelta::default();
        for v in candidates {
            match (was_main(v), is_main(v)) {
                (true, false) => {
                    delta.vertices_removed.insert(v);
                }
                (false, true) => {
                    delta.vertices_added.insert(v);
                }
                _ => {}
            }
        }

        // First operation on an edge inside the frame tells whether it existed at frame start.
        let mut present_at_start: HashMap<BranchNum, bool> = HashMap::new();
        for op in self.graph.frame_ops() {
            match *op {
                GraphOp::EdgeAdded { edge, .. } => {
                    present_at_start.entry(edge).or_insert(false);
                }
                GraphOp::EdgeRemoved(edge) => {
                    present_at_start.entry(edge).or_insert(true);
                }
                GraphOp::VertexAdded(_) => {}
            }
        }

        let mut edge_candidates: HashSet<BranchNum> = present_at_start.keys().copied().collect();
        for &v in delta.vertices_removed.iter().chain(&delta.vertices_added) {
            edge_candidates.extend(self.graph.neighbors(v).map(|(e, _)| e));
        }
        for e in edge_candidates {
            let Some(slot) = self.graph.edge(e) else {
                continue;
            };
            let existed = present_at_start.get(&e).copied().unwrap_or(slot.present);
            let was = existed && was_main(slot.v1) && was_main(slot.v2);
            let is = slot.present && is_main(slot.v1) && is_main(slot.v2);
            match (was, is) {
                (true, false) => {
                    delta.edges_removed.insert(e);
                }
                (false, true) => {
                    delta.edges_added.insert(e);
                }
                _ => {}
            }
        }
        delta
    }

    fn delta(&mut self) -> &MainComponentDelta {
        if self.delta.is_none() {
            self.delta = Some(self.compute_delta());
        }
        self.delta.get_or_insert_with(MainComponentDelta::default)
    }
}

impl GraphConnectivity for IncrementalGraphConnectivity {
    fn add_vertex(&mut self, vertex: BusNum) {
        if self.graph.add_vertex(vertex) {
            let label = self.fresh_label();
            self.set_label(vertex, label);
            self.delta = None;
        }
    }

    fn add_edge(&mut self, vertex1: BusNum, vertex2: BusNum, edge: BranchNum) -> TopoResult<()> {
        self.graph.check_edge_insertion(vertex1, vertex2, edge)?;
        let (l1, l2) = (self.label(vertex1), self.label(vertex2));
        if l1 != l2 {
            let size = |l: u64| self.sizes.get(&l).copied().unwrap_or(0);
            let (from, target) = if size(l1) < size(l2) {
                (vertex1, l2)
            } else {
                (vertex2, l1)
            };
            for v in self.component_of(from) {
                self.set_label(v, target);
            }
        }
        self.graph.add_edge(vertex1, vertex2, edge)?;
        self.delta = None;
        Ok(())
    }

    fn remove_edge(&mut self, edge: BranchNum) {
        let Some((v1, v2)) = self.graph.remove_edge(edge) else {
            return;
        };
        if let Some(side) = self.disconnected_side(v1, v2) {
            let label = self.fresh_label();
            tracing::trace!(%edge, split = side.len(), "cut disconnects a component");
            for v in side {
                self.set_label(v, label);
            }
        }
        self.delta = None;
    }

    fn start_temporary_changes(&mut self) {
        self.frames.push(IncrementalFrame {
            label_log_start: self.label_log.len(),
            main_label: self.current_main_label(),
        });
        self.graph.start_frame();
        self.delta = None;
    }

    fn undo_temporary_changes(&mut self) -> TopoResult<()> {
        self.graph.undo_frame()?;
        if let Some(frame) = self.frames.pop() {
            let entries: Vec<(BusNum, u64)> = self.label_log.drain(frame.label_log_start..).collect();
            for (v, previous) in entries.into_iter().rev() {
                self.write_label(v, previous);
            }
        }
        self.delta = None;
        Ok(())
    }

    fn temporary_changes_depth(&self) -> usize {
        self.frames.len()
    }

    fn set_main_component_vertex(&mut self, vertex: BusNum) {
        self.main_vertex = Some(vertex);
        self.delta = None;
    }

    fn main_component_vertex(&self) -> Option<BusNum> {
        self.main_vertex
            .filter(|&v| self.graph.has_vertex(v))
            .or_else(|| self.graph.vertices().next())
    }

    fn vertices_removed_from_main_component(&mut self) -> BTreeSet<BusNum> {
        self.delta().vertices_removed.clone()
    }

    fn vertices_added_to_main_component(&mut self) -> BTreeSet<BusNum> {
        self.delta().vertices_added.clone()
    }

    fn edges_removed_from_main_component(&mut self) -> BTreeSet<BranchNum> {
        self.delta().edges_removed.clone()
    }

    fn edges_added_to_main_component(&mut self) -> BTreeSet<BranchNum> {
        self.delta().edges_added.clone()
    }

    fn component_number(&mut self, vertex: BusNum) -> Option<usize> {
        if !self.graph.has_vertex(vertex) {
            return None;
        }
        let main_label = Some(self.current_main_label()).filter(|&l| l != NO_LABEL);
        let numbers = number_components(self.graph.vertices().map(|v| (v, self.label(v))), main_label);
        numbers.get(&self.label(vertex)).copied()
    }

    fn nb_connected_components(&mut self) -> usize {
        self.sizes.len()
    }

    fn connected_component(&mut self, vertex: BusNum) -> BTreeSet<BusNum> {
        if !self.graph.has_vertex(vertex) {
            return BTreeSet::new();
        }
        let label = self.label(vertex);
        self.graph.vertices().filter(|&v| self.label(v) == label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> BusNum {
        BusNum::new(i)
    }

    fn e(i: usize) -> BranchNum {
        BranchNum::new(i)
    }

    /// Ring 0-1-2-3-0 with a tail 3-4.
    fn ring_with_tail() -> IncrementalGraphConnectivity {
        let mut c = IncrementalGraphConnectivity::new();
        for i in 0..5 {
            c.add_vertex(v(i));
        }
        c.add_edge(v(0), v(1), e(0)).unwrap();
        c.add_edge(v(1), v(2), e(1)).unwrap();
        c.add_edge(v(2), v(3), e(2)).unwrap();
        c.add_edge(v(3), v(0), e(3)).unwrap();
        c.add_edge(v(3), v(4), e(4)).unwrap();
        c.set_main_component_vertex(v(0));
        c
    }

    #[test]
    fn test_cut_in_ring_keeps_single_component() {
        let mut c = ring_with_tail();
        c.start_temporary_changes();
        c.remove_edge(e(1));
        assert_eq!(c.nb_connected_components(), 1);
        assert!(c.vertices_removed_from_main_component().is_empty());
        assert_eq!(c.edges_removed_from_main_component(), BTreeSet::from([e(1)]));
        c.undo_temporary_changes().unwrap();
    }

    #[test]
    fn test_isolating_main_vertex_scans_everything() {
        let mut c = ring_with_tail();
        c.start_temporary_changes();
        c.remove_edge(e(0));
        c.remove_edge(e(3));
        // bus 0 is now alone, everything else left the main component
        assert_eq!(
            c.vertices_removed_from_main_component(),
            BTreeSet::from([v(1), v(2), v(3), v(4)])
        );
        assert_eq!(c.edges_removed_from_main_component().len(), 5);
        c.undo_temporary_changes().unwrap();
        assert_eq!(c.nb_connected_components(), 1);
        assert_eq!(c.connected_component(v(4)).len(), 5);
    }

    #[test]
    fn test_nested_frames_are_isolated() {
        let mut c = ring_with_tail();
        c.start_temporary_changes();
        c.remove_edge(e(4));
        assert_eq!(c.vertices_removed_from_main_component(), BTreeSet::from([v(4)]));

        c.start_temporary_changes();
        assert!(c.vertices_removed_from_main_component().is_empty());
        c.add_edge(v(4), v(2), e(9)).unwrap();
        assert_eq!(c.vertices_added_to_main_component(), BTreeSet::from([v(4)]));
        assert_eq!(c.edges_added_to_main_component(), BTreeSet::from([e(9)]));
        c.undo_temporary_changes().unwrap();

        assert_eq!(c.vertices_removed_from_main_component(), BTreeSet::from([v(4)]));
        assert!(!c.is_in_main_component(v(4)));
        c.undo_temporary_changes().unwrap();
        assert!(c.is_in_main_component(v(4)));
        assert_eq!(c.temporary_changes_depth(), 0);
    }

    #[test]
    fn test_vertex_added_in_frame_is_removed_on_undo() {
        let mut c = ring_with_tail();
        c.start_temporary_changes();
        c.add_vertex(v(5));
        c.add_edge(v(5), v(0), e(5)).unwrap();
        assert_eq!(c.vertices_added_to_main_component(), BTreeSet::from([v(5)]));
        c.undo_temporary_changes().unwrap();
        assert_eq!(c.component_number(v(5)), None);
        assert_eq!(c.nb_connected_components(), 1);
    }
}
