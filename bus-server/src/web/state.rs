//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CacheConfig;
use crate::discovery::StopDiscovery;
use crate::distance::DistanceCalculator;
use crate::journey::JourneyAggregator;
use crate::retry::RetryPolicy;
use crate::store::RouteStore;
use crate::trip::TripPlanner;

/// Shared application state.
///
/// Discovery, journeys and the planner share one store, one calculator and
/// one journey cache.
pub struct AppState<S> {
    pub calculator: Arc<DistanceCalculator>,
    pub discovery: StopDiscovery<S>,
    pub journeys: JourneyAggregator<S>,
    pub planner: Arc<TripPlanner<S>>,

    /// Radius used when a request omits one, meters.
    pub default_radius_m: f64,
}

impl<S: RouteStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        calculator: Arc<DistanceCalculator>,
        cache: &CacheConfig,
        default_radius_m: f64,
    ) -> Self {
        Self::with_retry(store, calculator, cache, default_radius_m, RetryPolicy::default())
    }

    pub fn with_retry(
        store: Arc<S>,
        calculator: Arc<DistanceCalculator>,
        cache: &CacheConfig,
        default_radius_m: f64,
        retry: RetryPolicy,
    ) -> Self {
        let discovery =
            StopDiscovery::new(store.clone(), calculator.clone()).with_retry(retry.clone());
        let journeys =
            JourneyAggregator::new(store, calculator.clone(), cache).with_retry(retry.clone());
        let planner = TripPlanner::new(discovery.clone(), journeys.clone()).with_retry(retry);

        Self {
            calculator,
            discovery,
            journeys,
            planner: Arc::new(planner),
            default_radius_m,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            calculator: Arc::clone(&self.calculator),
            discovery: self.discovery.clone(),
            journeys: self.journeys.clone(),
            planner: Arc::clone(&self.planner),
            default_radius_m: self.default_radius_m,
        }
    }
}
