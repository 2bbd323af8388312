//! Reference tracker: recomputes components from scratch on demand.

use std::collections::{BTreeSet, VecDeque};

use super::graph::GraphStore;
use super::{number_components, GraphConnectivity, MainComponentDelta};
use crate::element::{BranchNum, BusNum};
use crate::error::TopoResult;

const NO_LABEL: u64 = u64::MAX;

#[derive(Debug, Clone)]
struct NaiveFrame {
    main_vertices: BTreeSet<BusNum>,
    main_edges: BTreeSet<BranchNum>,
}

/// Breadth-first recompute after every change; each frame snapshots the main component.
#[derive(Debug, Clone, Default)]
pub struct NaiveGraphConnectivity {
    graph: GraphStore,
    main_vertex: Option<BusNum>,
    frames: Vec<NaiveFrame>,
    labels: Option<Vec<u64>>,
    delta: Option<MainComponentDelta>,
}

impl NaiveGraphConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate(&mut self) {
        self.labels = None;
        self.delta = None;
    }

    fn labels(&mut self) -> &[u64] {
        if self.labels.is_none() {
            let mut labels = vec![NO_LABEL; self.graph.vertex_capacity()];
            let mut next = 0;
            let mut queue = VecDeque::new();
            for start in self.graph.vertices() {
                if labels[start.value()] != NO_LABEL {
                    continue;
                }
                labels[start.value()] = next;
                queue.push_back(start);
                while let Some(u) = queue.pop_front() {
                    for (_, w) in self.graph.neighbors(u) {
                        if labels[w.value()] == NO_LABEL {
                            labels[w.value()] = next;
                            queue.push_back(w);
                        }
                    }
                }
                next += 1;
            }
            tracing::trace!(components = next, "recomputed connected components");
            self.labels = Some(labels);
        }
        self.labels.as_deref().unwrap_or_default()
    }

    fn main_label(&mut self) -> Option<u64> {
        let main = self.main_component_vertex()?;
        Some(self.labels()[main.value()])
    }

    fn main_sets(&mut self) -> (BTreeSet<BusNum>, BTreeSet<BranchNum>) {
        let Some(main_label) = self.main_label() else {
            return (BTreeSet::new(), BTreeSet::new());
        };
        self.labels();
        let labels = self.labels.as_deref().unwrap_or_default();
        let in_main = |v: BusNum| labels.get(v.value()) == Some(&main_label);
        let vertices = self.graph.vertices().filter(|&v| in_main(v)).collect();
        let edges = self
            .graph
            .present_edges()
            .filter(|(_, slot)| in_main(slot.v1) && in_main(slot.v2))
            .map(|(e, _)| e)
            .collect();
        (vertices, edges)
    }

    fn delta(&mut self) -> &MainComponentDelta {
        if self.delta.is_none() {
            let delta = match self.frames.last().cloned() {
                None => MainComponentDelta::default(),
                Some(frame) => {
                    let (vertices, edges) = self.main_sets();
                    MainComponentDelta {
                        vertices_removed: frame.main_vertices.difference(&vertices).copied().collect(),
                        vertices_added: vertices.difference(&frame.main_vertices).copied().collect(),
                        edges_removed: frame.main_edges.difference(&edges).copied().collect(),
                        edges_added: edges.difference(&frame.main_edges).copied().collect(),
                    }
                }
            };
            self.delta = Some(delta);
        }
        self.delta.get_or_insert_with(MainComponentDelta::default)
    }
}

impl GraphConnectivity for NaiveGraphConnectivity {
    fn add_vertex(&mut self, vertex: BusNum) {
        if self.graph.add_vertex(vertex) {
            self.invalidate();
        }
    }

    fn add_edge(&mut self, vertex1: BusNum, vertex2: BusNum, edge: BranchNum) -> TopoResult<()> {
        self.graph.add_edge(vertex1, vertex2, edge)?;
        self.invalidate();
        Ok(())
    }

    fn remove_edge(&mut self, edge: BranchNum) {
        if self.graph.remove_edge(edge).is_some() {
            self.invalidate();
        }
    }

    fn start_temporary_changes(&mut self) {
        let (main_vertices, main_edges) = self.main_sets();
        self.frames.push(NaiveFrame {
            main_vertices,
            main_edges,
        });
        self.graph.start_frame();
        self.delta = None;
    }

    fn undo_temporary_changes(&mut self) -> TopoResult<()> {
        self.graph.undo_frame()?;
        self.frames.pop();
        self.invalidate();
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
        let main_label = self.main_label();
        self.labels();
        let labels = self.labels.as_deref().unwrap_or_default();
        let numbers = number_components(self.graph.vertices().map(|v| (v, labels[v.value()])), main_label);
        numbers.get(&labels[vertex.value()]).copied()
    }

    fn nb_connected_components(&mut self) -> usize {
        self.labels();
        let labels = self.labels.as_deref().unwrap_or_default();
        self.graph
            .vertices()
            .map(|v| labels[v.value()])
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn connected_component(&mut self, vertex: BusNum) -> BTreeSet<BusNum> {
        if !self.graph.has_vertex(vertex) {
            return BTreeSet::new();
        }
        self.labels();
        let labels = self.labels.as_deref().unwrap_or_default();
        let label = labels[vertex.value()];
        self.graph.vertices().filter(|v| labels[v.value()] == label).collect()
    }
}
