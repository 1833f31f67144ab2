//! Directed weighted graph with caller-allocated dense vertex ids.
//!
//! The graph is a plain edge arena: edges are stored in insertion order and
//! addressed by their [`EdgeId`], with a per-vertex incidence list of
//! outgoing edges. Both vectors are exposed as parts so a snapshot can
//! restore the graph without rebuilding the adjacency.

use serde::{Deserialize, Serialize};

pub type VertexId = u32;
pub type EdgeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge<W> {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: W,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedWeightedGraph<W> {
    edges: Vec<Edge<W>>,
    incidence_lists: Vec<Vec<EdgeId>>,
}

impl<W> DirectedWeightedGraph<W> {
    /// Creates a graph over the fixed vertex range `[0, vertex_count)`.
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self {
            edges: Vec::new(),
            incidence_lists: vec![Vec::new(); vertex_count],
        }
    }

    /// Rebuilds a graph from previously extracted parts.
    #[must_use]
    pub fn from_parts(edges: Vec<Edge<W>>, incidence_lists: Vec<Vec<EdgeId>>) -> Self {
        Self {
            edges,
            incidence_lists,
        }
    }

    /// Appends an edge and records it in the incidence list of its source.
    pub fn add_edge(&mut self, edge: Edge<W>) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        self.incidence_lists[edge.from as usize].push(id);
        self.edges.push(edge);
        id
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> &Edge<W> {
        &self.edges[id as usize]
    }

    /// Ids of the edges leaving a vertex, in insertion order.
    pub fn edges_from(&self, vertex: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.incidence_lists[vertex as usize].iter().copied()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.incidence_lists.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge<W>] {
        &self.edges
    }

    #[must_use]
    pub fn incidence_lists(&self) -> &[Vec<EdgeId>] {
        &self.incidence_lists
    }
}
