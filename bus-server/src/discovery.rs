//! Finding stops near a point.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::distance::{DistanceCalculator, DistanceError};
use crate::domain::{Coordinate, StopWithDistance};
use crate::retry::{RetryPolicy, retry};
use crate::store::{RouteStore, StoreError};

/// Errors from stop discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to load stops: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Distance(#[from] DistanceError),
}

impl DiscoveryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DiscoveryError::Distance(e) if e.is_validation())
    }
}

/// Ranks known stops by distance from a location.
pub struct StopDiscovery<S> {
    store: Arc<S>,
    calculator: Arc<DistanceCalculator>,
    retry: RetryPolicy,
}

impl<S: RouteStore> StopDiscovery<S> {
    pub fn new(store: Arc<S>, calculator: Arc<DistanceCalculator>) -> Self {
        Self {
            store,
            calculator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stops within `threshold_m` meters of `location`, nearest first.
    ///
    /// Uses a single 1×N distance request for all stops. The threshold is
    /// inclusive and equally distant stops keep their store order. Stops with
    /// out-of-range coordinates are skipped. Finding nothing is not an error.
    pub async fn discover_stops(
        &self,
        location: Coordinate,
        threshold_m: f64,
    ) -> Result<Vec<StopWithDistance>, DiscoveryError> {
        location.validate().map_err(DistanceError::from)?;

        let stops: Vec<_> = retry(&self.retry, "fetch stops", || self.store.fetch_stops())
            .await?
            .into_iter()
            .filter(|stop| match stop.coordinate.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(stop_id = stop.id, error = %e, "skipping stop with invalid coordinates");
                    false
                }
            })
            .collect();
        if stops.is_empty() {
            return Ok(Vec::new());
        }

        let destinations: Vec<Coordinate> = stops.iter().map(|s| s.coordinate).collect();
        let matrix = self
            .calculator
            .calculate_distances(&[location], &destinations, true)
            .await?;
        let row = matrix.row(0).unwrap_or_default();

        let mut nearby: Vec<StopWithDistance> = stops
            .into_iter()
            .zip(row)
            .map(|(stop, cell)| StopWithDistance {
                stop,
                distance_m: cell.distance_km * 1000.0,
                distance_method: cell.method,
            })
            .filter(|s| s.distance_m <= threshold_m)
            .collect();

        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

        debug!(
            %location,
            threshold_m,
            candidates = destinations.len(),
            found = nearby.len(),
            "discovered stops"
        );
        Ok(nearby)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S> Clone for StopDiscovery<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            calculator: Arc::clone(&self.calculator),
            retry: self.retry.clone(),
        }
    }
}
