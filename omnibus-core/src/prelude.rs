//! Convenience re-exports of the types most callers need.

pub use crate::catalogue::{Bus, BusId, BusStat, Catalogue, Stop, StopId};
pub use crate::render::{MapRenderer, RenderSettings};
pub use crate::request::{build_catalogue, RequestDocument, RequestHandler, StatRequest};
pub use crate::router::{RouteInfo, RouteItem, RoutingSettings, TransportRouter};
pub use crate::snapshot::{self, LoadedBase};
pub use crate::Error;
