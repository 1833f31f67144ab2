pub mod route_table;

pub use route_table::{RouteInternalData, RouteTable};
