/*!
# Omnibus

**Omnibus** is a library for answering queries over a catalogue of urban bus
lines: which buses serve a stop, how long and how curved a route is, the
fastest passenger itinerary between two stops, and an SVG map of the whole
network.

Routing works in two phases. A build phase translates the catalogue into a
weighted directed graph (two vertices per stop, wait edges and ride edges)
and precomputes an all-pairs shortest-path table over it; the sealed state
can be persisted to a binary snapshot so a query process restores it without
recomputation. After sealing, every query is a pure read.

# Example
```ignore
use omnibus_core::prelude::*;

let mut catalogue = Catalogue::default();
let a = catalogue.add_stop("Universam", 55.611087, 37.208290)?;
let b = catalogue.add_stop("Prazhskaya", 55.595884, 37.209755)?;
catalogue.set_distance(a, b, 3900.0);
catalogue.add_bus("256", vec![a, b, a], true)?;

let settings = RoutingSettings { bus_wait_time: 6, bus_velocity: 40.0 };
let router = TransportRouter::new(&settings, &catalogue)?;

let itinerary = router.route(&catalogue, "Universam", "Prazhskaya")?;
println!("{:?}", itinerary);
```
*/

use thiserror::Error;

pub mod algo;
pub mod catalogue;
pub mod graph;
pub mod prelude;
pub mod render;
pub mod request;
pub mod router;
pub mod snapshot;
pub mod sphere;
pub mod svg;

/// Error type shared by the whole crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("stop already registered: {0}")]
    DuplicateStop(String),
    #[error("unknown stop: {0}")]
    UnknownStop(String),
    #[error("unknown bus: {0}")]
    UnknownBus(String),
    #[error("no road distance between {0} and {1}")]
    UnknownDistance(String, String),
    #[error("bus {0} has an empty route")]
    EmptyRoute(String),
    #[error("edge weight must be non-negative and finite, got {0}")]
    InvalidWeight(f64),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
