//! Adjacency storage with a per-frame undo log, shared by the connectivity trackers.

use crate::element::{BranchNum, BusNum};
use crate::error::{TopoError, TopoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeSlot {
    pub v1: BusNum,
    pub v2: BusNum,
    pub present: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum GraphOp {
    VertexAdded(BusNum),
    EdgeAdded {
        edge: BranchNum,
        previous: Option<EdgeSlot>,
    },
    EdgeRemoved(BranchNum),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GraphStore {
    vertices: Vec<bool>,
    adjacency: Vec<Vec<BranchNum>>,
    edges: Vec<Option<EdgeSlot>>,
    log: Vec<GraphOp>,
    frame_starts: Vec<usize>,
}

impl GraphStore {
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_vertex(&self, v: BusNum) -> bool {
        self.vertices.get(v.value()).copied().unwrap_or(false)
    }

    pub fn vertices(&self) -> impl Iterator<Item = BusNum> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, &present)| present)
            .map(|(i, _)| BusNum::new(i))
    }

    pub fn edge(&self, e: BranchNum) -> Option<EdgeSlot> {
        self.edges.get(e.value()).copied().flatten()
    }

    pub fn has_edge(&self, e: BranchNum) -> bool {
        self.edge(e).is_some_and(|slot| slot.present)
    }

    pub fn present_edges(&self) -> impl Iterator<Item = (BranchNum, EdgeSlot)> + '_ {
        self.edges.iter().enumerate().filter_map(|(i, slot)| match slot {
            Some(slot) if slot.present => Some((BranchNum::new(i), *slot)),
            _ => None,
        })
    }

    /// Incident edges of `v` with the vertex at the other end.
    pub fn neighbors(&self, v: BusNum) -> impl Iterator<Item = (BranchNum, BusNum)> + '_ {
        self.adjacency
            .get(v.value())
            .into_iter()
            .flatten()
            .filter_map(move |&e| {
                self.edge(e).map(|slot| {
                    let other = if slot.v1 == v { slot.v2 } else { slot.v1 };
                    (e, other)
                })
            })
    }

    /// Operations recorded since the innermost frame was opened.
    pub fn frame_ops(&self) -> &[GraphOp] {
        match self.frame_starts.last() {
            Some(&start) => &self.log[start..],
            None => &[],
        }
    }

    fn record(&mut self, op: GraphOp) {
        if !self.frame_starts.is_empty() {
            self.log.push(op);
        }
    }

    /// Returns false if the vertex was already present.
    pub fn add_vertex(&mut self, v: BusNum) -> bool {
        let i = v.value();
        if i >= self.vertices.len() {
            self.vertices.resize(i + 1, false);
            self.adjacency.resize_with(i + 1, Vec::new);
        }
        if self.vertices[i] {
            return false;
        }
        self.vertices[i] = true;
        self.record(GraphOp::VertexAdded(v));
        true
    }

    pub fn check_edge_insertion(&self, v1: BusNum, v2: BusNum, e: BranchNum) -> TopoResult<()> {
        if v1 == v2 {
            return Err(TopoError::invariant(format!("{e} is a self-loop on {v1}")));
        }
        for v in [v1, v2] {
            if !self.has_vertex(v) {
                return Err(TopoError::invariant(format!("{e} references missing vertex {v}")));
            }
        }
        if self.has_edge(e) {
            return Err(TopoError::invariant(format!("{e} is already in the graph")));
        }
        Ok(())
    }

    pub fn add_edge(&mut self, v1: BusNum, v2: BusNum, e: BranchNum) -> TopoResult<()> {
        self.check_edge_insertion(v1, v2, e)?;
        let i = e.value();
        if i >= self.edges.len() {
            self.edges.resize(i + 1, None);
        }
        let previous = self.edges[i];
        self.edges[i] = Some(EdgeSlot { v1, v2, present: true });
        self.adjacency[v1.value()].push(e);
        self.adjacency[v2.value()].push(e);
        self.record(GraphOp::EdgeAdded { edge: e, previous });
        Ok(())
    }

    /// Returns the endpoints of the removed edge, or `None` if it was not present.
    pub fn remove_edge(&mut self, e: BranchNum) -> Option<(BusNum, BusNum)> {
        let slot = self.edge(e).filter(|slot| slot.present)?;
        self.detach(e, slot);
        self.edges[e.value()] = Some(EdgeSlot { present: false, ..slot });
        self.record(GraphOp::EdgeRemoved(e));
        Some((slot.v1, slot.v2))
    }

    fn detach(&mut self, e: BranchNum, slot: EdgeSlot) {
        for v in [slot.v1, slot.v2] {
            let list = &mut self.adjacency[v.value()];
            if let Some(pos) = list.iter().position(|&x| x == e) {
                list.swap_remove(pos);
            }
        }
    }

    pub fn start_frame(&mut self) {
        self.frame_starts.push(self.log.len());
    }

    /// Revert every operation of the innermost frame, most recent first.
    pub fn undo_frame(&mut self) -> TopoResult<()> {
        let start = self
            .frame_starts
            .pop()
            .ok_or_else(|| TopoError::invariant("undo of temporary changes without a matching start"))?;
        let ops: Vec<GraphOp> = self.log.drain(start..).collect();
        for op in ops.into_iter().rev() {
            match op {
                GraphOp::VertexAdded(v) => {
                    self.vertices[v.value()] = false;
                }
                GraphOp::EdgeAdded { edge, previous } => {
                    if let Some(slot) = self.edge(edge) {
                        self.detach(edge, slot);
                    }
                    self.edges[edge.value()] = previous;
                }
                GraphOp::EdgeRemoved(edge) => {
                    if let Some(slot) = self.edge(edge) {
                        self.adjacency[slot.v1.value()].push(edge);
                        self.adjacency[slot.v2.value()].push(edge);
                        self.edges[edge.value()] = Some(EdgeSlot { present: true, ..slot });
                    }
                }
            }
        }
        Ok(())
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

    #[test]
    fn test_undo_restores_adjacency() {
        let mut g = GraphStore::default();
        for i in 0..3 {
            g.add_vertex(v(i));
        }
        g.add_edge(v(0), v(1), e(0)).unwrap();
        g.start_frame();
        g.add_edge(v(1), v(2), e(1)).unwrap();
        assert_eq!(g.remove_edge(e(0)), Some((v(0), v(1))));
        assert_eq!(g.neighbors(v(1)).count(), 1);
        g.undo_frame().unwrap();
        assert!(g.has_edge(e(0)));
        assert!(!g.has_edge(e(1)));
        assert!(g.edge(e(1)).is_none());
        assert_eq!(g.neighbors(v(1)).collect::<Vec<_>>(), vec![(e(0), v(0))]);
    }

    #[test]
    fn test_remove_absent_edge_is_noop() {
        let mut g = GraphStore::default();
        g.add_vertex(v(0));
        g.start_frame();
        assert_eq!(g.remove_edge(e(7)), None);
        assert!(g.frame_ops().is_empty());
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut g = GraphStore::default();
        g.add_vertex(v(0));
        g.add_vertex(v(1));
        g.add_edge(v(0), v(1), e(0)).unwrap();
        assert!(g.add_edge(v(0), v(1), e(0)).is_err());
        assert!(g.add_edge(v(0), v(0), e(1)).is_err());
    }

    #[test]
    fn test_unbalanced_undo_is_an_error() {
        let mut g = GraphStore::default();
        assert!(g.undo_frame().is_err());
    }
}
