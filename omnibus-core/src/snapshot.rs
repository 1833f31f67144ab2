/*!
Binary persistence of the sealed engine state.

A snapshot carries the whole catalogue, both settings structs and the full
router state (vertex allocation, edge metadata, graph edges with incidence
lists and the precomputed route table), so the query process restores
everything without recomputation.

The wire format is CBOR written with [`ciborium`]: every record is a
length-delimited map keyed by field name in declaration order, which makes
encoding deterministic and the round trip bit-exact. Cross-references are
stored as the dense stop/bus indices of catalogue iteration order.
*/

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algo::RouteTable;
use crate::catalogue::{BusId, Catalogue, StopId};
use crate::graph::{DirectedWeightedGraph, EdgeId, VertexId};
use crate::render::RenderSettings;
use crate::router::{RouteItem, RoutingSettings, StopVertices, TransportRouter};
use crate::Error;

#[derive(Debug, Serialize, Deserialize)]
struct StopRecord {
    id: u32,
    name: String,
    lat: f64,
    lng: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct DistanceRecord {
    from: StopId,
    to: StopId,
    metres: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BusRecord {
    name: String,
    route: Vec<StopId>,
    is_roundtrip: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WaitEdgeRecord {
    edge: EdgeId,
    stop: StopId,
    time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RideEdgeRecord {
    edge: EdgeId,
    bus: BusId,
    span_count: u32,
    time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RouterRecord {
    vertex_counter: VertexId,
    vertices: Vec<StopVertices>,
    wait_edges: Vec<WaitEdgeRecord>,
    ride_edges: Vec<RideEdgeRecord>,
    graph: DirectedWeightedGraph<f64>,
    table: RouteTable,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    stops: Vec<StopRecord>,
    distances: Vec<DistanceRecord>,
    buses: Vec<BusRecord>,
    routing_settings: RoutingSettings,
    render_settings: RenderSettings,
    router: RouterRecord,
}

/// Everything a query process needs, rehydrated from one snapshot.
#[derive(Debug)]
pub struct LoadedBase {
    pub catalogue: Catalogue,
    pub router: TransportRouter,
    pub routing_settings: RoutingSettings,
    pub render_settings: RenderSettings,
}

/// Encodes the sealed state into a snapshot file.
pub fn save(
    path: &Path,
    catalogue: &Catalogue,
    router: &TransportRouter,
    routing_settings: &RoutingSettings,
    render_settings: &RenderSettings,
) -> Result<(), Error> {
    let snapshot = encode(catalogue, router, routing_settings, render_settings);

    let file = File::create(path)?;
    ciborium::ser::into_writer(&snapshot, BufWriter::new(file)).map_err(|err| match err {
        ciborium::ser::Error::Io(err) => Error::Io(err),
        ciborium::ser::Error::Value(message) => Error::MalformedSnapshot(message),
    })?;

    log::info!(
        "snapshot written to {}: {} stops, {} buses, {} edges",
        path.display(),
        catalogue.stops().len(),
        catalogue.buses().len(),
        router.graph().edge_count()
    );

    Ok(())
}

/// Decodes a snapshot file and rebuilds catalogue and router.
///
/// Stops are rehydrated first, then distances, then buses, so bus statistics
/// recompute against complete distance data; the router state is installed
/// as stored, without recomputation.
pub fn load(path: &Path) -> Result<LoadedBase, Error> {
    let file = File::open(path)?;
    let snapshot: Snapshot =
        ciborium::de::from_reader(BufReader::new(file)).map_err(|err| match err {
            ciborium::de::Error::Io(err) => Error::Io(err),
            other => Error::MalformedSnapshot(other.to_string()),
        })?;

    decode(snapshot)
}

fn encode(
    catalogue: &Catalogue,
    router: &TransportRouter,
    routing_settings: &RoutingSettings,
    render_settings: &RenderSettings,
) -> Snapshot {
    let stops = catalogue
        .stops()
        .iter()
        .enumerate()
        .map(|(id, stop)| StopRecord {
            id: id as u32,
            name: stop.name.clone(),
            lat: stop.location.y(),
            lng: stop.location.x(),
        })
        .collect();

    let mut distances: Vec<DistanceRecord> = catalogue
        .distances()
        .map(|(from, to, metres)| DistanceRecord { from, to, metres })
        .collect();
    distances.sort_unstable_by_key(|record| (record.from, record.to));

    let buses = catalogue
        .buses()
        .iter()
        .map(|bus| BusRecord {
            name: bus.name.clone(),
            route: bus.raw_route.clone(),
            is_roundtrip: bus.is_roundtrip,
        })
        .collect();

    let mut metadata: Vec<(EdgeId, &RouteItem)> = router
        .edge_meta()
        .iter()
        .map(|(&edge, item)| (edge, item))
        .collect();
    metadata.sort_unstable_by_key(|(edge, _)| *edge);

    let mut wait_edges = Vec::new();
    let mut ride_edges = Vec::new();
    for (edge, item) in metadata {
        match *item {
            RouteItem::Wait { stop, time } => wait_edges.push(WaitEdgeRecord { edge, stop, time }),
            RouteItem::Ride {
                bus,
                span_count,
                time,
            } => ride_edges.push(RideEdgeRecord {
                edge,
                bus,
                span_count,
                time,
            }),
        }
    }

    Snapshot {
        stops,
        distances,
        buses,
        routing_settings: *routing_settings,
        render_settings: render_settings.clone(),
        router: RouterRecord {
            vertex_counter: router.vertex_counter(),
            vertices: router.vertices().to_vec(),
            wait_edges,
            ride_edges,
            graph: router.graph().clone(),
            table: router.table().clone(),
        },
    }
}

fn decode(snapshot: Snapshot) -> Result<LoadedBase, Error> {
    let stop_count = snapshot.stops.len();
    let bus_count = snapshot.buses.len();
    let in_stop_range = |id: StopId| id.index() < stop_count;

    let mut catalogue = Catalogue::default();
    for record in &snapshot.stops {
        catalogue.add_stop(&record.name, record.lat, record.lng)?;
    }
    for record in &snapshot.distances {
        if !in_stop_range(record.from) || !in_stop_range(record.to) {
            return Err(Error::MalformedSnapshot(format!(
                "distance references stop {} of {stop_count}",
                record.from.0.max(record.to.0)
            )));
        }
        catalogue.set_distance(record.from, record.to, record.metres);
    }
    for record in &snapshot.buses {
        if let Some(stray) = record.route.iter().find(|id| !in_stop_range(**id)) {
            return Err(Error::MalformedSnapshot(format!(
                "bus {} references stop {} of {stop_count}",
                record.name, stray.0
            )));
        }
        catalogue.add_bus(&record.name, record.route.clone(), record.is_roundtrip)?;
    }

    let router = &snapshot.router;
    if router.vertices.len() != stop_count {
        return Err(Error::MalformedSnapshot(format!(
            "router covers {} stops, catalogue has {stop_count}",
            router.vertices.len()
        )));
    }

    let edge_count = router.graph.edge_count() as u32;
    let mut edge_meta: HashMap<EdgeId, RouteItem> =
        HashMap::with_capacity(router.graph.edge_count());
    for record in &router.wait_edges {
        if record.edge >= edge_count || !in_stop_range(record.stop) {
            return Err(Error::MalformedSnapshot(format!(
                "wait edge {} out of range",
                record.edge
            )));
        }
        edge_meta.insert(
            record.edge,
            RouteItem::Wait {
                stop: record.stop,
                time: record.time,
            },
        );
    }
    for record in &router.ride_edges {
        if record.edge >= edge_count || record.bus.index() >= bus_count {
            return Err(Error::MalformedSnapshot(format!(
                "ride edge {} out of range",
                record.edge
            )));
        }
        edge_meta.insert(
            record.edge,
            RouteItem::Ride {
                bus: record.bus,
                span_count: record.span_count,
                time: record.time,
            },
        );
    }

    let snapshot_router = snapshot.router;
    let router = TransportRouter::from_parts(
        snapshot_router.vertex_counter,
        snapshot_router.vertices,
        edge_meta,
        snapshot_router.graph,
        snapshot_router.table,
    );

    log::info!(
        "snapshot loaded: {stop_count} stops, {bus_count} buses, {} edges",
        router.graph().edge_count()
    );

    Ok(LoadedBase {
        catalogue,
        router,
        routing_settings: snapshot.routing_settings,
        render_settings: snapshot.render_settings,
    })
}
