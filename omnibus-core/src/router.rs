/*!
Translates the catalogue into a routing graph and answers itinerary queries.

Every stop owns two vertices: passengers start and change buses in the
*entry* vertex and ride in the *exit* vertex. A wait edge `entry -> exit`
models the boarding delay at the stop; a ride edge `exit -> entry` models
staying on one bus over one or more consecutive spans of its route. With
that split, a shortest path in the graph alternates waiting and riding
exactly like a real passenger does.

The router is sealed by construction: [`TransportRouter::new`] builds the
graph and the all-pairs table, [`TransportRouter::from_parts`] installs both
from a decoded snapshot, and afterwards every query is a pure read.
*/

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algo::RouteTable;
use crate::catalogue::{BusId, Catalogue, StopId};
use crate::graph::{DirectedWeightedGraph, Edge, EdgeId, VertexId};
use crate::Error;

/// Passenger timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Minutes a passenger waits at a stop before any bus departs.
    pub bus_wait_time: u32,
    /// Average bus velocity in km/h.
    pub bus_velocity: f64,
}

/// The two vertices allocated to one stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopVertices {
    pub entry: VertexId,
    pub exit: VertexId,
}

/// One step of an itinerary; also the metadata attached to the graph edge
/// the step was reconstructed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouteItem {
    Wait {
        stop: StopId,
        time: f64,
    },
    Ride {
        bus: BusId,
        span_count: u32,
        time: f64,
    },
}

impl RouteItem {
    #[must_use]
    pub fn time(&self) -> f64 {
        match self {
            RouteItem::Wait { time, .. } | RouteItem::Ride { time, .. } => *time,
        }
    }
}

/// A complete itinerary between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    pub total_minutes: f64,
    pub items: Vec<RouteItem>,
}

#[derive(Debug)]
pub struct TransportRouter {
    vertex_counter: VertexId,
    vertices: Vec<StopVertices>,
    edge_meta: HashMap<EdgeId, RouteItem>,
    graph: DirectedWeightedGraph<f64>,
    table: RouteTable,
}

impl TransportRouter {
    /// Builds the routing graph for a catalogue and precomputes the
    /// shortest-path table over it.
    pub fn new(settings: &RoutingSettings, catalogue: &Catalogue) -> Result<Self, Error> {
        let mut vertex_counter: VertexId = 0;
        let vertices: Vec<StopVertices> = catalogue
            .stops()
            .iter()
            .map(|_| {
                let allocated = StopVertices {
                    entry: vertex_counter,
                    exit: vertex_counter + 1,
                };
                vertex_counter += 2;
                allocated
            })
            .collect();

        let mut graph = DirectedWeightedGraph::new(vertex_counter as usize);
        let mut edge_meta = HashMap::new();

        let wait_time = f64::from(settings.bus_wait_time);
        for (index, allocated) in vertices.iter().enumerate() {
            let edge = graph.add_edge(Edge {
                from: allocated.entry,
                to: allocated.exit,
                weight: wait_time,
            });
            edge_meta.insert(
                edge,
                RouteItem::Wait {
                    stop: StopId(index as u32),
                    time: wait_time,
                },
            );
        }

        for (index, bus) in catalogue.buses().iter().enumerate() {
            // The expanded route of a non-roundtrip bus is a palindrome, so
            // one forward sweep also covers the return direction.
            connect_spans(
                &mut graph,
                &mut edge_meta,
                catalogue,
                settings,
                &vertices,
                BusId(index as u32),
                &bus.route,
            )?;
        }

        let table = RouteTable::build(&graph)?;
        log::info!(
            "routing graph sealed: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );

        Ok(Self {
            vertex_counter,
            vertices,
            edge_meta,
            graph,
            table,
        })
    }

    /// Installs a router decoded from a snapshot, skipping recomputation.
    #[must_use]
    pub fn from_parts(
        vertex_counter: VertexId,
        vertices: Vec<StopVertices>,
        edge_meta: HashMap<EdgeId, RouteItem>,
        graph: DirectedWeightedGraph<f64>,
        table: RouteTable,
    ) -> Self {
        Self {
            vertex_counter,
            vertices,
            edge_meta,
            graph,
            table,
        }
    }

    /// Fastest itinerary between two stops given by name.
    ///
    /// Returns `Ok(None)` when no itinerary exists; a query from a stop to
    /// itself yields an empty itinerary of zero minutes.
    pub fn route(
        &self,
        catalogue: &Catalogue,
        from: &str,
        to: &str,
    ) -> Result<Option<RouteInfo>, Error> {
        let from = catalogue
            .find_stop(from)
            .ok_or_else(|| Error::UnknownStop(from.to_owned()))?;
        let to = catalogue
            .find_stop(to)
            .ok_or_else(|| Error::UnknownStop(to.to_owned()))?;

        let source = self.vertices[from.index()].entry;
        let target = self.vertices[to.index()].entry;

        Ok(self
            .table
            .route(&self.graph, source, target)
            .map(|(total_minutes, edges)| RouteInfo {
                total_minutes,
                items: edges.iter().map(|edge| self.edge_meta[edge].clone()).collect(),
            }))
    }

    #[must_use]
    pub fn vertex_counter(&self) -> VertexId {
        self.vertex_counter
    }

    #[must_use]
    pub fn vertices(&self) -> &[StopVertices] {
        &self.vertices
    }

    #[must_use]
    pub fn edge_meta(&self) -> &HashMap<EdgeId, RouteItem> {
        &self.edge_meta
    }

    #[must_use]
    pub fn graph(&self) -> &DirectedWeightedGraph<f64> {
        &self.graph
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

/// Adds one ride edge per ordered stop pair of the walked route, weighted
/// with the accumulated trip time over the spans between the pair.
#[allow(clippy::too_many_arguments)]
fn connect_spans(
    graph: &mut DirectedWeightedGraph<f64>,
    edge_meta: &mut HashMap<EdgeId, RouteItem>,
    catalogue: &Catalogue,
    settings: &RoutingSettings,
    vertices: &[StopVertices],
    bus: BusId,
    route: &[StopId],
) -> Result<(), Error> {
    for start in 0..route.len() {
        let mut time = 0.0;
        for stop in start + 1..route.len() {
            time += trip_time(catalogue, settings, route[stop - 1], route[stop])?;
            let edge = graph.add_edge(Edge {
                from: vertices[route[start].index()].exit,
                to: vertices[route[stop].index()].entry,
                weight: time,
            });
            edge_meta.insert(
                edge,
                RouteItem::Ride {
                    bus,
                    span_count: (stop - start) as u32,
                    time,
                },
            );
        }
    }

    Ok(())
}

/// Minutes one bus needs for the road between two neighbouring stops.
fn trip_time(
    catalogue: &Catalogue,
    settings: &RoutingSettings,
    from: StopId,
    to: StopId,
) -> Result<f64, Error> {
    Ok(60.0 * catalogue.distance(from, to)? / (1000.0 * settings.bus_velocity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Catalogue, TransportRouter) {
        let mut catalogue = Catalogue::default();
        let a = catalogue.add_stop("Universam", 55.611087, 37.208290).unwrap();
        let b = catalogue.add_stop("Prazhskaya", 55.595884, 37.209755).unwrap();
        catalogue.add_stop("Lone", 55.580999, 37.659164).unwrap();
        catalogue.set_distance(a, b, 3900.0);
        catalogue.set_distance(b, a, 3900.0);
        catalogue.add_bus("256", vec![a, b, a], true).unwrap();

        let settings = RoutingSettings {
            bus_wait_time: 6,
            bus_velocity: 40.0,
        };
        let router = TransportRouter::new(&settings, &catalogue).unwrap();
        (catalogue, router)
    }

    #[test]
    fn single_span_itinerary() {
        let (catalogue, router) = sample();

        let info = router
            .route(&catalogue, "Universam", "Prazhskaya")
            .unwrap()
            .expect("stops are connected by bus 256");

        assert!(approx::abs_diff_eq!(info.total_minutes, 11.85, epsilon = 1e-6));
        assert_eq!(info.items.len(), 2);
        assert!(matches!(
            info.items[0],
            RouteItem::Wait { stop, time } if stop == StopId(0) && time == 6.0
        ));
        match info.items[1] {
            RouteItem::Ride {
                bus,
                span_count,
                time,
            } => {
                assert_eq!(bus, BusId(0));
                assert_eq!(span_count, 1);
                assert!(approx::abs_diff_eq!(time, 5.85, epsilon = 1e-6));
            }
            ref other => panic!("expected a ride, got {other:?}"),
        }
    }

    #[test]
    fn same_stop_itinerary_is_empty() {
        let (catalogue, router) = sample();

        let info = router
            .route(&catalogue, "Universam", "Universam")
            .unwrap()
            .expect("the trivial itinerary always exists");

        assert!(approx::abs_diff_eq!(info.total_minutes, 0.0));
        assert!(info.items.is_empty());
    }

    #[test]
    fn unreachable_stop_has_no_itinerary() {
        let (catalogue, router) = sample();

        assert!(router
            .route(&catalogue, "Universam", "Lone")
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_stop_is_an_error() {
        let (catalogue, router) = sample();

        assert!(matches!(
            router.route(&catalogue, "Universam", "Nowhere"),
            Err(Error::UnknownStop(name)) if name == "Nowhere"
        ));
    }

    #[test]
    fn items_sum_to_the_total() {
        let (catalogue, router) = sample();

        let info = router
            .route(&catalogue, "Prazhskaya", "Universam")
            .unwrap()
            .unwrap();

        let sum: f64 = info.items.iter().map(RouteItem::time).sum();
        assert!(approx::abs_diff_eq!(sum, info.total_minutes, epsilon = 1e-6));
    }
}
