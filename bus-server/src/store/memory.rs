//! In-memory route store.
//!
//! Serves stops and route rows from memory, optionally loaded from a JSON
//! fixture of the form `{"stops": [...], "route_stops": [...]}`. Useful for
//! local development and tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::{RouteStop, Stop, StopId};

use super::RouteStore;
use super::error::StoreError;

/// Fixture file contents.
#[derive(Debug, Default, Deserialize)]
struct Tables {
    #[serde(default)]
    stops: Vec<Stop>,
    #[serde(default)]
    route_stops: Vec<RouteStop>,
}

/// Route store backed by in-process tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a store holding the given rows.
    pub fn new(stops: Vec<Stop>, route_stops: Vec<RouteStop>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables { stops, route_stops })),
        }
    }

    /// Load a JSON fixture from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StoreError::Fixture {
            message: format!("Failed to read {:?}: {}", path, e),
        })?;
        Self::from_json_str(&json).map_err(|e| StoreError::Fixture {
            message: format!("Failed to parse {:?}: {}", path, e),
        })
    }

    /// Parse a JSON fixture.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let tables: Tables = serde_json::from_str(json).map_err(|e| StoreError::Json {
            message: e.to_string(),
        })?;
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
        })
    }

    /// Look up a route row by id.
    pub async fn route_stop(&self, id: i64) -> Option<RouteStop> {
        let tables = self.tables.read().await;
        tables.route_stops.iter().find(|r| r.id == id).cloned()
    }

    /// Replace route rows (simulates route data changing underneath).
    pub async fn set_route_stops(&self, route_stops: Vec<RouteStop>) {
        self.tables.write().await.route_stops = route_stops;
    }

    pub async fn stop_count(&self) -> usize {
        self.tables.read().await.stops.len()
    }
}

impl RouteStore for InMemoryStore {
    async fn fetch_stops(&self) -> Result<Vec<Stop>, StoreError> {
        Ok(self.tables.read().await.stops.clone())
    }

    async fn fetch_route_segments(
        &self,
        bus_id: &str,
        direction: &str,
        from_order: u32,
        to_order: u32,
    ) -> Result<Vec<RouteStop>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RouteStop> = tables
            .route_stops
            .iter()
            .filter(|r| r.bus_id == bus_id && r.direction == direction)
            .filter(|r| (from_order..to_order).contains(&r.stop_order))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.stop_order);
        Ok(rows)
    }

    async fn fetch_next_route_stop(
        &self,
        bus_id: &str,
        direction: &str,
        after_order: u32,
    ) -> Result<Option<RouteStop>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .route_stops
            .iter()
            .filter(|r| r.bus_id == bus_id && r.direction == direction)
            .filter(|r| r.stop_order > after_order)
            .min_by_key(|r| r.stop_order)
            .cloned())
    }

    async fn fetch_route_stops_serving(
        &self,
        stop_ids: &[StopId],
    ) -> Result<Vec<RouteStop>, StoreError> {
        let wanted: HashSet<StopId> = stop_ids.iter().copied().collect();
        let tables = self.tables.read().await;
        let mut rows: Vec<RouteStop> = tables
            .route_stops
            .iter()
            .filter(|r| wanted.contains(&r.stop_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.bus_id, &a.direction, a.stop_order).cmp(&(&b.bus_id, &b.direction, b.stop_order))
        });
        Ok(rows)
    }

    async fn update_segment_distance(
        &self,
        route_stop_id: i64,
        distance_km: f64,
        duration_secs: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .route_stops
            .iter_mut()
            .find(|r| r.id == route_stop_id)
            .ok_or(StoreError::NotFound(route_stop_id))?;

        row.distance_to_next_km = Some(distance_km);
        if duration_secs.is_some() {
            row.duration_to_next_secs = duration_secs;
        }
        Ok(())
    }
}
