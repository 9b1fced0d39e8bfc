//! Point-to-point distance calculation.
//!
//! A [`DistanceStrategy`] turns a set of origins and destinations into a
//! [`DistanceMatrix`]. Two strategies are provided:
//! - [`OsrmStrategy`] asks a road-routing service for network distances
//!   and travel times
//! - [`HaversineStrategy`] computes great-circle distances locally and
//!   never fails
//!
//! [`DistanceCalculator`] pairs a primary with a fallback strategy and
//! decides which one serves each request.

mod calculator;
mod error;
mod haversine;
mod osrm;

#[cfg(test)]
mod osrm_tests;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Coordinate;

pub use calculator::DistanceCalculator;
#[cfg(test)]
pub(crate) use calculator::testing;
pub use error::DistanceError;
pub use haversine::{EARTH_RADIUS_KM, HaversineStrategy, METHOD as HAVERSINE_METHOD, haversine_km};
pub use osrm::{DEFAULT_BASE_URL, METHOD as OSRM_METHOD, OsrmConfig, OsrmStrategy};

/// Distance between one origin and one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    /// Distance in kilometers.
    pub distance_km: f64,
    /// Travel time in seconds, if the strategy knows it.
    pub duration_secs: Option<f64>,
    /// Name of the strategy that produced this value.
    pub method: &'static str,
}

/// Distances from every origin to every destination.
///
/// `get(i, j)` is the distance from origin `i` to destination `j`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct DistanceMatrix {
    rows: Vec<Vec<DistanceResult>>,
}

impl DistanceMatrix {
    /// Wrap rows indexed `[origin][destination]`.
    pub fn from_rows(rows: Vec<Vec<DistanceResult>>) -> Self {
        Self { rows }
    }

    /// Build an `origins × destinations` matrix cell by cell.
    pub fn from_fn(
        origins: usize,
        destinations: usize,
        mut cell: impl FnMut(usize, usize) -> DistanceResult,
    ) -> Self {
        let rows = (0..origins)
            .map(|i| (0..destinations).map(|j| cell(i, j)).collect())
            .collect();
        Self { rows }
    }

    pub fn get(&self, origin: usize, destination: usize) -> Option<&DistanceResult> {
        self.rows.get(origin)?.get(destination)
    }

    pub fn row(&self, origin: usize) -> Option<&[DistanceResult]> {
        self.rows.get(origin).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<DistanceResult>] {
        &self.rows
    }

    /// Returns `(rows, columns of the first row)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    /// True if there are exactly `origins` rows, each `destinations` long.
    pub fn has_shape(&self, origins: usize, destinations: usize) -> bool {
        self.rows.len() == origins && self.rows.iter().all(|row| row.len() == destinations)
    }
}

/// An interchangeable algorithm for computing distance matrices.
#[async_trait]
pub trait DistanceStrategy: Send + Sync {
    /// Compute distances from each origin to each destination.
    ///
    /// The result must have `origins.len()` rows of `destinations.len()`
    /// cells, with cell `[i][j]` for origin `i` and destination `j`.
    async fn calculate_distances(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DistanceMatrix, DistanceError>;

    /// Whether the strategy can currently serve requests. Never fails.
    async fn is_available(&self) -> bool;

    /// Identifier used to tag results and in logs.
    fn name(&self) -> &'static str;
}
