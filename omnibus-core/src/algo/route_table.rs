//! All-pairs shortest paths with predecessor tracking.
//!
//! The table is built once over the sealed routing graph with a
//! Floyd-Warshall relaxation restricted to non-negative weights, keeping for
//! every reachable pair the last edge of the best path. Route reconstruction
//! then walks the predecessor chain backwards in linear time.
//!
//! For a fixed intermediate vertex the relaxation of different source rows
//! is independent, so each sweep runs over the rows in parallel with
//! [`rayon`] against a copy of the pivot row.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::graph::{DirectedWeightedGraph, EdgeId, VertexId};
use crate::Error;

/// Best known path from a source to one destination: its total weight and
/// the last edge on it. `prev_edge` is `None` only for the trivial
/// source-to-itself path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteInternalData {
    pub weight: f64,
    pub prev_edge: Option<EdgeId>,
}

/// Flat row-major table of `vertex_count * vertex_count` optional entries;
/// `None` marks an unreachable pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    vertex_count: usize,
    data: Vec<Option<RouteInternalData>>,
}

impl RouteTable {
    /// Precomputes the table for a graph.
    ///
    /// Ties are broken towards the first improvement, so edges added earlier
    /// win at equal cost. Fails with [`Error::InvalidWeight`] if any edge
    /// weight is negative or not finite.
    pub fn build(graph: &DirectedWeightedGraph<f64>) -> Result<Self, Error> {
        let n = graph.vertex_count();
        let mut data: Vec<Option<RouteInternalData>> = vec![None; n * n];

        for vertex in 0..n {
            data[vertex * n + vertex] = Some(RouteInternalData {
                weight: 0.0,
                prev_edge: None,
            });
        }

        for (id, edge) in graph.edges().iter().enumerate() {
            if !(edge.weight.is_finite() && edge.weight >= 0.0) {
                return Err(Error::InvalidWeight(edge.weight));
            }

            let cell = &mut data[edge.from as usize * n + edge.to as usize];
            if cell.map_or(true, |current| edge.weight < current.weight) {
                *cell = Some(RouteInternalData {
                    weight: edge.weight,
                    prev_edge: Some(id as EdgeId),
                });
            }
        }

        for k in 0..n {
            let pivot = data[k * n..(k + 1) * n].to_vec();

            data.par_chunks_mut(n).for_each(|row| {
                let Some(through) = row[k] else { return };

                for (cell, step) in row.iter_mut().zip(&pivot) {
                    let Some(step) = step else { continue };

                    let relaxed = through.weight + step.weight;
                    if cell.map_or(true, |current| relaxed < current.weight) {
                        *cell = Some(RouteInternalData {
                            weight: relaxed,
                            prev_edge: step.prev_edge,
                        });
                    }
                }
            });
        }

        log::debug!("route table sealed over {n} vertices");

        Ok(Self {
            vertex_count: n,
            data,
        })
    }

    /// Restores a table extracted from a snapshot.
    #[must_use]
    pub fn from_parts(vertex_count: usize, data: Vec<Option<RouteInternalData>>) -> Self {
        Self { vertex_count, data }
    }

    /// Total weight and edge sequence of the best path, or `None` when the
    /// destination is unreachable. The predecessor chain is acyclic and
    /// crosses fewer than `vertex_count` edges.
    #[must_use]
    pub fn route(
        &self,
        graph: &DirectedWeightedGraph<f64>,
        from: VertexId,
        to: VertexId,
    ) -> Option<(f64, Vec<EdgeId>)> {
        let n = self.vertex_count;
        let total = self
            .data
            .get(from as usize * n + to as usize)
            .copied()
            .flatten()?
            .weight;

        let mut edges = Vec::new();
        let mut current = to;
        while let Some(edge) =
            self.data[from as usize * n + current as usize].and_then(|data| data.prev_edge)
        {
            edges.push(edge);
            current = graph.edge(edge).from;
            debug_assert!(edges.len() < n);
        }
        edges.reverse();

        Some((total, edges))
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[must_use]
    pub fn data(&self) -> &[Option<RouteInternalData>] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn edge(from: VertexId, to: VertexId, weight: f64) -> Edge<f64> {
        Edge { from, to, weight }
    }

    #[test]
    fn relaxation_beats_the_direct_edge() {
        let mut graph = DirectedWeightedGraph::new(3);
        let hop_one = graph.add_edge(edge(0, 1, 1.5));
        let hop_two = graph.add_edge(edge(1, 2, 2.0));
        graph.add_edge(edge(0, 2, 10.0));

        let table = RouteTable::build(&graph).unwrap();
        let (weight, edges) = table.route(&graph, 0, 2).unwrap();

        assert!(approx::abs_diff_eq!(weight, 3.5));
        assert_eq!(edges, [hop_one, hop_two]);
    }

    #[test]
    fn unreachable_pair_yields_none() {
        let mut graph = DirectedWeightedGraph::new(3);
        graph.add_edge(edge(0, 1, 1.0));

        let table = RouteTable::build(&graph).unwrap();

        assert!(table.route(&graph, 1, 0).is_none());
        assert!(table.route(&graph, 0, 2).is_none());
    }

    #[test]
    fn source_to_itself_is_the_empty_route() {
        let graph = DirectedWeightedGraph::new(2);
        let table = RouteTable::build(&graph).unwrap();

        let (weight, edges) = table.route(&graph, 1, 1).unwrap();
        assert!(approx::abs_diff_eq!(weight, 0.0));
        assert!(edges.is_empty());
    }

    #[test]
    fn first_of_two_equal_edges_wins() {
        let mut graph = DirectedWeightedGraph::new(2);
        let first = graph.add_edge(edge(0, 1, 1.0));
        graph.add_edge(edge(0, 1, 1.0));

        let table = RouteTable::build(&graph).unwrap();
        let (_, edges) = table.route(&graph, 0, 1).unwrap();

        assert_eq!(edges, [first]);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let mut graph = DirectedWeightedGraph::new(2);
        graph.add_edge(edge(0, 1, -1.0));
        assert!(matches!(
            RouteTable::build(&graph),
            Err(Error::InvalidWeight(_))
        ));

        let mut graph = DirectedWeightedGraph::new(2);
        graph.add_edge(edge(0, 1, f64::NAN));
        assert!(matches!(
            RouteTable::build(&graph),
            Err(Error::InvalidWeight(_))
        ));
    }
}
