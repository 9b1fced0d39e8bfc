//! Access to stops and route data.
//!
//! The data lives in an external row store. [`RouteStore`] is the narrow
//! query surface the planner needs: whole-table reads, equality and range
//! filters, IN-lists, ordering, and single-row updates.

mod error;
mod memory;
mod rest;

use std::future::Future;

use crate::domain::{RouteStop, Stop, StopId};

pub use error::StoreError;
pub use memory::InMemoryStore;
#[cfg(test)]
pub(crate) use memory::testing;
pub use rest::{RestStore, RestStoreConfig};

/// Read/write access to stops and route segments.
pub trait RouteStore: Send + Sync {
    /// All known stops.
    fn fetch_stops(&self) -> impl Future<Output = Result<Vec<Stop>, StoreError>> + Send;

    /// Route rows for one bus and direction with `stop_order` in
    /// `[from_order, to_order)`, ascending by `stop_order`.
    fn fetch_route_segments(
        &self,
        bus_id: &str,
        direction: &str,
        from_order: u32,
        to_order: u32,
    ) -> impl Future<Output = Result<Vec<RouteStop>, StoreError>> + Send;

    /// The first route row after `after_order` on one bus and direction.
    fn fetch_next_route_stop(
        &self,
        bus_id: &str,
        direction: &str,
        after_order: u32,
    ) -> impl Future<Output = Result<Option<RouteStop>, StoreError>> + Send;

    /// Every route row whose stop is in `stop_ids`, ordered by bus,
    /// direction, then `stop_order`.
    fn fetch_route_stops_serving(
        &self,
        stop_ids: &[StopId],
    ) -> impl Future<Output = Result<Vec<RouteStop>, StoreError>> + Send;

    /// Store a computed distance (and duration, if known) on a route row.
    fn update_segment_distance(
        &self,
        route_stop_id: i64,
        distance_km: f64,
        duration_secs: Option<f64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
