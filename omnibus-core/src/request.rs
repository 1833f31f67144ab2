/*!
Request and answer documents plus the query façade over the engine.

A request document is one JSON object: `base_requests` describe the network
and are used by the build phase, `stat_requests` are queries answered by the
query phase. Answers echo the request id; a failed query is reported inline
as `error_message: "not found"` and processing continues with the next
request.
*/

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalogue::{BusStat, Catalogue};
use crate::render::{MapRenderer, RenderSettings};
use crate::router::{RouteInfo, RouteItem, RoutingSettings, TransportRouter};
use crate::Error;

#[derive(Debug, Deserialize)]
pub struct RequestDocument {
    pub serialization_settings: SerializationSettings,
    #[serde(default)]
    pub routing_settings: Option<RoutingSettings>,
    #[serde(default)]
    pub render_settings: Option<RenderSettings>,
    #[serde(default)]
    pub base_requests: Vec<BaseRequest>,
    #[serde(default)]
    pub stat_requests: Vec<StatRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SerializationSettings {
    /// Snapshot location shared by the build and query invocations.
    pub file: PathBuf,
}

/// One entry of `base_requests`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BaseRequest {
    Stop {
        name: String,
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        road_distances: BTreeMap<String, f64>,
    },
    Bus {
        name: String,
        stops: Vec<String>,
        is_roundtrip: bool,
    },
}

/// One entry of `stat_requests`.
#[derive(Debug, Deserialize)]
pub struct StatRequest {
    pub id: i64,
    #[serde(flatten)]
    pub payload: StatPayload,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StatPayload {
    Stop { name: String },
    Bus { name: String },
    Route { from: String, to: String },
    Map,
}

/// Populates a catalogue from base requests: all stops first, then the road
/// distances between them, then the buses.
pub fn build_catalogue(base_requests: &[BaseRequest]) -> Result<Catalogue, Error> {
    let mut catalogue = Catalogue::default();

    for request in base_requests {
        if let BaseRequest::Stop {
            name,
            latitude,
            longitude,
            ..
        } = request
        {
            catalogue.add_stop(name, *latitude, *longitude)?;
        }
    }

    for request in base_requests {
        if let BaseRequest::Stop {
            name,
            road_distances,
            ..
        } = request
        {
            let from = catalogue
                .find_stop(name)
                .ok_or_else(|| Error::UnknownStop(name.clone()))?;
            for (neighbour, metres) in road_distances {
                let to = catalogue
                    .find_stop(neighbour)
                    .ok_or_else(|| Error::UnknownStop(neighbour.clone()))?;
                catalogue.set_distance(from, to, *metres);
            }
        }
    }

    for request in base_requests {
        if let BaseRequest::Bus {
            name,
            stops,
            is_roundtrip,
        } = request
        {
            let route = stops
                .iter()
                .map(|stop| {
                    catalogue
                        .find_stop(stop)
                        .ok_or_else(|| Error::UnknownStop(stop.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            catalogue.add_bus(name, route, *is_roundtrip)?;
        }
    }

    log::info!(
        "catalogue built: {} stops, {} buses",
        catalogue.stops().len(),
        catalogue.buses().len()
    );

    Ok(catalogue)
}

/// Read-only façade answering stat requests over the sealed engine.
pub struct RequestHandler<'a> {
    catalogue: &'a Catalogue,
    router: &'a TransportRouter,
    render_settings: &'a RenderSettings,
}

impl<'a> RequestHandler<'a> {
    #[must_use]
    pub fn new(
        catalogue: &'a Catalogue,
        router: &'a TransportRouter,
        render_settings: &'a RenderSettings,
    ) -> Self {
        Self {
            catalogue,
            router,
            render_settings,
        }
    }

    /// Names of the buses serving a stop, sorted lexicographically.
    pub fn handle_stop_info(&self, name: &str) -> Result<Vec<&str>, Error> {
        self.catalogue.buses_for_stop(name)
    }

    pub fn handle_bus_info(&self, name: &str) -> Result<BusStat, Error> {
        let id = self
            .catalogue
            .find_bus(name)
            .ok_or_else(|| Error::UnknownBus(name.to_owned()))?;
        Ok(self.catalogue.bus(id).stat)
    }

    pub fn handle_route(&self, from: &str, to: &str) -> Result<Option<RouteInfo>, Error> {
        self.router.route(self.catalogue, from, to)
    }

    #[must_use]
    pub fn handle_map(&self) -> String {
        MapRenderer::new(self.catalogue, self.render_settings).render()
    }

    /// Answers every stat request in order, converting failed queries into
    /// `error_message` answers.
    #[must_use]
    pub fn process(&self, requests: &[StatRequest]) -> Vec<Value> {
        requests
            .iter()
            .map(|request| self.answer(request))
            .collect()
    }

    fn answer(&self, request: &StatRequest) -> Value {
        let id = request.id;
        match &request.payload {
            StatPayload::Stop { name } => match self.handle_stop_info(name) {
                Ok(buses) => json!({ "request_id": id, "buses": buses }),
                Err(_) => not_found(id),
            },
            StatPayload::Bus { name } => match self.handle_bus_info(name) {
                Ok(stat) => json!({
                    "request_id": id,
                    "curvature": stat.curvature,
                    "route_length": stat.road_length,
                    "stop_count": stat.stop_count,
                    "unique_stop_count": stat.unique_stops,
                }),
                Err(_) => not_found(id),
            },
            StatPayload::Route { from, to } => match self.handle_route(from, to) {
                Ok(Some(info)) => json!({
                    "request_id": id,
                    "total_time": info.total_minutes,
                    "items": self.route_items(&info),
                }),
                Ok(None) | Err(_) => not_found(id),
            },
            StatPayload::Map => json!({ "request_id": id, "map": self.handle_map() }),
        }
    }

    fn route_items(&self, info: &RouteInfo) -> Vec<Value> {
        info.items
            .iter()
            .map(|item| match *item {
                RouteItem::Wait { stop, time } => json!({
                    "type": "Wait",
                    "stop_name": self.catalogue.stop(stop).name,
                    "time": time,
                }),
                RouteItem::Ride {
                    bus,
                    span_count,
                    time,
                } => json!({
                    "type": "Bus",
                    "bus": self.catalogue.bus(bus).name,
                    "span_count": span_count,
                    "time": time,
                }),
            })
            .collect()
    }
}

fn not_found(id: i64) -> Value {
    json!({ "request_id": id, "error_message": "not found" })
}
