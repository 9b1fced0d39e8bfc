//! Journey length aggregation.
//!
//! A journey covers route rows `[boarding, alighting)` on one bus and
//! direction. Its length is the sum of each row's stored distance to the
//! next stop. Rows without a stored distance are computed on demand; road
//! distances computed this way are written back so later journeys read them
//! directly. Great-circle approximations are used but never written back.
//! Write-back is a single best-effort attempt; its failure is only logged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, JourneyCache};
use crate::distance::{DistanceCalculator, DistanceError, OSRM_METHOD};
use crate::domain::{Coordinate, JourneyKey, RouteStop};
use crate::retry::{RetryPolicy, retry};
use crate::store::{RouteStore, StoreError};

/// Errors from journey aggregation.
#[derive(Debug, thiserror::Error)]
pub enum JourneyError {
    #[error("alighting stop {alighting} comes before boarding stop {boarding}")]
    InvalidRange { boarding: u32, alighting: u32 },

    #[error("failed to load route: {0}")]
    Store(#[from] StoreError),
}

/// Computes and memoizes journey lengths.
pub struct JourneyAggregator<S> {
    store: Arc<S>,
    calculator: Arc<DistanceCalculator>,
    cache: JourneyCache,
    retry: RetryPolicy,
}

impl<S: RouteStore> JourneyAggregator<S> {
    pub fn new(store: Arc<S>, calculator: Arc<DistanceCalculator>, cache_config: &CacheConfig) -> Self {
        Self {
            store,
            calculator,
            cache: JourneyCache::new(cache_config),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Length in kilometers of a ride from `boarding_order` to
    /// `alighting_order` on one bus and direction.
    ///
    /// Boarding and alighting at the same stop is a zero-length journey.
    /// Rows whose distance can't be computed (missing coordinates, or both
    /// strategies failing) are skipped with a warning, so the result is a
    /// best-effort total. Store failures are retried, then returned.
    pub async fn calculate_journey_length(
        &self,
        bus_id: &str,
        boarding_order: u32,
        alighting_order: u32,
        direction: &str,
    ) -> Result<f64, JourneyError> {
        if alighting_order < boarding_order {
            return Err(JourneyError::InvalidRange {
                boarding: boarding_order,
                alighting: alighting_order,
            });
        }

        let key = JourneyKey::new(bus_id, direction, boarding_order, alighting_order);
        if let Some(length_km) = self.cache.get(&key).await {
            debug!(journey = %key, length_km, "journey length cache hit");
            return Ok(length_km);
        }

        let segments = retry(&self.retry, "fetch route segments", || {
            self.store
                .fetch_route_segments(bus_id, direction, boarding_order, alighting_order)
        })
        .await?;

        let mut total_km = 0.0;
        for (i, segment) in segments.iter().enumerate() {
            if let Some(km) = segment.distance_to_next_km {
                total_km += km;
                continue;
            }

            let next = match segments.get(i + 1) {
                Some(next) => Some(next.clone()),
                None => {
                    retry(&self.retry, "fetch next route stop", || {
                        self.store
                            .fetch_next_route_stop(bus_id, direction, segment.stop_order)
                    })
                    .await?
                }
            };

            if let Some(km) = self.fill_segment(segment, next.as_ref()).await {
                total_km += km;
            }
        }

        debug!(journey = %key, segments = segments.len(), length_km = total_km, "computed journey length");
        self.cache.insert(key, total_km).await;
        Ok(total_km)
    }

    /// Compute one missing segment distance, writing road distances back.
    async fn fill_segment(&self, segment: &RouteStop, next: Option<&RouteStop>) -> Option<f64> {
        let Some((from, to)) = segment_endpoints(segment, next) else {
            warn!(
                bus_id = %segment.bus_id,
                direction = %segment.direction,
                stop_order = segment.stop_order,
                "segment has no stored distance and missing coordinates, skipping"
            );
            return None;
        };

        let result = match self.calculator.calculate_distance(from, to, true).await {
            Ok(result) => result,
            Err(e) => {
                warn_skipped(segment, &e);
                return None;
            }
        };

        info!(
            bus_id = %segment.bus_id,
            direction = %segment.direction,
            stop_order = segment.stop_order,
            distance_km = result.distance_km,
            method = result.method,
            "computed missing segment distance"
        );

        // Single attempt, no backoff.
        if result.method == OSRM_METHOD {
            let written = self
                .store
                .update_segment_distance(segment.id, result.distance_km, result.duration_secs)
                .await;
            if let Err(e) = written {
                warn!(route_stop_id = segment.id, error = %e, "failed to store computed segment distance");
            }
        }

        Some(result.distance_km)
    }

    /// Forget one journey's cached length.
    pub async fn invalidate(&self, key: &JourneyKey) {
        self.cache.invalidate(key).await;
    }

    /// Forget every cached length (route data changed).
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        info!("journey length cache cleared");
    }

    /// Number of cached journey lengths.
    pub async fn cached_entries(&self) -> u64 {
        self.cache.sync().await;
        self.cache.entry_count()
    }
}

impl<S> Clone for JourneyAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            calculator: Arc::clone(&self.calculator),
            cache: self.cache.clone(),
            retry: self.retry.clone(),
        }
    }
}

fn segment_endpoints(segment: &RouteStop, next: Option<&RouteStop>) -> Option<(Coordinate, Coordinate)> {
    Some((segment.coordinate?, next?.coordinate?))
}

fn warn_skipped(segment: &RouteStop, error: &DistanceError) {
    warn!(
        bus_id = %segment.bus_id,
        direction = %segment.direction,
        stop_order = segment.stop_order,
        error = %error,
        "could not compute segment distance, skipping"
    );
}
