//! Domain types for the bus trip planner.
//!
//! Coordinates validate their bounds on request; stops and route rows are
//! read from the data store as-is.

mod coordinate;
mod route;
mod stop;

pub use coordinate::{Axis, Coordinate, InvalidCoordinate, MAX_LATITUDE, MAX_LONGITUDE};
pub use route::{JourneyKey, RouteStop};
pub use stop::{Stop, StopId, StopWithDistance};
