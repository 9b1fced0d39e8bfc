//! Trip planning: which buses connect two locations.
//!
//! A trip is a walk to a stop near the origin, a ride on one bus in one
//! direction, and a walk from a stop near the destination. For each bus and
//! direction we keep the boarding/alighting pair with the shortest total
//! walk, then rank options by walk, ride length and bus.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::discovery::{DiscoveryError, StopDiscovery};
use crate::domain::{Coordinate, InvalidCoordinate, RouteStop, StopId, StopWithDistance};
use crate::journey::JourneyAggregator;
use crate::retry::{RetryPolicy, retry};
use crate::store::{RouteStore, StoreError};

/// Errors from trip planning.
#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to load routes: {0}")]
    Store(#[from] StoreError),
}

/// One way to make the trip.
#[derive(Debug, Clone, Serialize)]
pub struct TripOption {
    pub bus_id: String,
    pub direction: String,
    pub boarding: StopWithDistance,
    pub boarding_order: u32,
    pub alighting: StopWithDistance,
    pub alighting_order: u32,
    /// Walk to the boarding stop plus walk from the alighting stop, meters.
    pub walk_m: f64,
    /// Ride length, kilometers.
    pub ride_km: f64,
}

/// A boarding/alighting pair before its ride length is known.
struct Candidate<'a> {
    boarding: &'a StopWithDistance,
    boarding_row: &'a RouteStop,
    alighting: &'a StopWithDistance,
    alighting_row: &'a RouteStop,
}

impl Candidate<'_> {
    fn walk_m(&self) -> f64 {
        self.boarding.distance_m + self.alighting.distance_m
    }
}

pub struct TripPlanner<S> {
    discovery: StopDiscovery<S>,
    journeys: JourneyAggregator<S>,
    retry: RetryPolicy,
}

impl<S: RouteStore> TripPlanner<S> {
    pub fn new(discovery: StopDiscovery<S>, journeys: JourneyAggregator<S>) -> Self {
        Self {
            discovery,
            journeys,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bus options from `origin` to `destination`, walking at most
    /// `radius_m` meters at each end. Best option first; no options is an
    /// empty list.
    pub async fn plan(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<TripOption>, TripError> {
        origin.validate()?;
        destination.validate()?;

        let (near_origin, near_destination) = futures::try_join!(
            self.discovery.discover_stops(origin, radius_m),
            self.discovery.discover_stops(destination, radius_m),
        )?;

        if near_origin.is_empty() || near_destination.is_empty() {
            debug!(
                origin_stops = near_origin.len(),
                destination_stops = near_destination.len(),
                "no stops within walking distance"
            );
            return Ok(Vec::new());
        }

        let stop_ids: Vec<StopId> = near_origin
            .iter()
            .chain(&near_destination)
            .map(|s| s.stop.id)
            .collect();
        let store = self.discovery.store();
        let rows = retry(&self.retry, "fetch serving route stops", || {
            store.fetch_route_stops_serving(&stop_ids)
        })
        .await?;

        let candidates = best_pairs(&rows, &near_origin, &near_destination);
        debug!(candidates = candidates.len(), "found boarding/alighting pairs");

        let rides = futures::future::join_all(candidates.iter().map(|c| {
            self.journeys.calculate_journey_length(
                &c.boarding_row.bus_id,
                c.boarding_row.stop_order,
                c.alighting_row.stop_order,
                &c.boarding_row.direction,
            )
        }))
        .await;

        let mut options: Vec<TripOption> = candidates
            .into_iter()
            .zip(rides)
            .filter_map(|(c, ride)| match ride {
                Ok(ride_km) => Some(TripOption {
                    bus_id: c.boarding_row.bus_id.clone(),
                    direction: c.boarding_row.direction.clone(),
                    boarding: c.boarding.clone(),
                    boarding_order: c.boarding_row.stop_order,
                    alighting: c.alighting.clone(),
                    alighting_order: c.alighting_row.stop_order,
                    walk_m: c.walk_m(),
                    ride_km,
                }),
                Err(e) => {
                    warn!(
                        bus_id = %c.boarding_row.bus_id,
                        direction = %c.boarding_row.direction,
                        error = %e,
                        "dropping trip option"
                    );
                    None
                }
            })
            .collect();

        options.sort_by(rank);
        Ok(options)
    }
}

/// For each (bus, direction), the pair with the least walking where the
/// alighting stop comes strictly after the boarding stop.
fn best_pairs<'a>(
    rows: &'a [RouteStop],
    near_origin: &'a [StopWithDistance],
    near_destination: &'a [StopWithDistance],
) -> Vec<Candidate<'a>> {
    let origin_by_id: HashMap<StopId, &StopWithDistance> =
        near_origin.iter().map(|s| (s.stop.id, s)).collect();
    let destination_by_id: HashMap<StopId, &StopWithDistance> =
        near_destination.iter().map(|s| (s.stop.id, s)).collect();

    let mut routes: BTreeMap<(&str, &str), Vec<&RouteStop>> = BTreeMap::new();
    for row in rows {
        routes
            .entry((row.bus_id.as_str(), row.direction.as_str()))
            .or_default()
            .push(row);
    }

    let mut best = Vec::new();
    for rows in routes.values() {
        let mut route_best: Option<Candidate<'a>> = None;

        for &boarding_row in rows {
            let Some(&boarding) = origin_by_id.get(&boarding_row.stop_id) else {
                continue;
            };
            for &alighting_row in rows {
                if alighting_row.stop_order <= boarding_row.stop_order {
                    continue;
                }
                let Some(&alighting) = destination_by_id.get(&alighting_row.stop_id) else {
                    continue;
                };

                let candidate = Candidate {
                    boarding,
                    boarding_row,
                    alighting,
                    alighting_row,
                };
                if route_best
                    .as_ref()
                    .is_none_or(|b| candidate.walk_m() < b.walk_m())
                {
                    route_best = Some(candidate);
                }
            }
        }

        best.extend(route_best);
    }
    best
}

fn rank(a: &TripOption, b: &TripOption) -> Ordering {
    a.walk_m
        .total_cmp(&b.walk_m)
        .then(a.ride_km.total_cmp(&b.ride_km))
        .then_with(|| a.bus_id.cmp(&b.bus_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::distance::{DistanceCalculator, HaversineStrategy};
    use crate::domain::Stop;
    use crate::store::InMemoryStore;

    // Stops along a north-south line; 0.001 degrees of latitude is ~111m.
    fn at(lat_offset: f64) -> Coordinate {
        Coordinate::new(12.9 + lat_offset, 77.6)
    }

    fn route_row(id: i64, bus: &str, direction: &str, order: u32, stop: &Stop, km: f64) -> RouteStop {
        RouteStop {
            id,
            bus_id: bus.to_string(),
            direction: direction.to_string(),
            stop_order: order,
            stop_id: stop.id,
            coordinate: Some(stop.coordinate),
            distance_to_next_km: Some(km),
            duration_to_next_secs: None,
        }
    }

    fn planner(store: InMemoryStore) -> TripPlanner<InMemoryStore> {
        let store = Arc::new(store);
        let haversine = Arc::new(HaversineStrategy::new());
        let calculator = Arc::new(DistanceCalculator::new(haversine.clone(), haversine));
        let fast = RetryPolicy::new(2, Duration::from_millis(1), 2);

        let discovery = StopDiscovery::new(store.clone(), calculator.clone()).with_retry(fast.clone());
        let journeys =
            JourneyAggregator::new(store, calculator, &CacheConfig::default()).with_retry(fast.clone());
        TripPlanner::new(discovery, journeys).with_retry(fast)
    }

    /// Origin near stops 1 and 2, destination near stops 3 and 4.
    fn network() -> (Vec<Stop>, Coordinate, Coordinate) {
        let stops = vec![
            Stop::new(1, "Origin A", at(0.001), false),
            Stop::new(2, "Origin B", at(0.003), true),
            Stop::new(3, "Destination A", at(0.1), false),
            Stop::new(4, "Destination B", at(0.102), false),
            Stop::new(5, "Elsewhere", at(0.5), false),
        ];
        (stops, at(0.0), at(0.1))
    }

    #[tokio::test]
    async fn finds_and_ranks_options() {
        let (stops, origin, destination) = network();
        let rows = vec![
            // 500D serves the closest pair
            route_row(1, "500D", "up", 1, &stops[0], 5.0),
            route_row(2, "500D", "up", 2, &stops[4], 6.0),
            route_row(3, "500D", "up", 3, &stops[2], 1.0),
            // 201 needs more walking at the origin
            route_row(4, "201", "up", 1, &stops[1], 2.0),
            route_row(5, "201", "up", 2, &stops[3], 1.0),
        ];
        let planner = planner(InMemoryStore::new(stops, rows));

        let options = planner.plan(origin, destination, 500.0).await.unwrap();

        let buses: Vec<&str> = options.iter().map(|o| o.bus_id.as_str()).collect();
        assert_eq!(buses, vec!["500D", "201"]);
        assert_eq!(options[0].boarding.stop.id, 1);
        assert_eq!(options[0].alighting.stop.id, 3);
        assert_eq!(options[0].ride_km, 11.0);
        assert_eq!(options[1].ride_km, 2.0);
        assert!(options[0].walk_m < options[1].walk_m);
    }

    #[tokio::test]
    async fn wrong_direction_is_not_an_option() {
        let (stops, origin, destination) = network();
        let rows = vec![
            route_row(1, "500D", "down", 1, &stops[2], 1.0),
            route_row(2, "500D", "down", 2, &stops[0], 1.0),
        ];
        let planner = planner(InMemoryStore::new(stops, rows));

        let options = planner.plan(origin, destination, 500.0).await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn keeps_least_walking_pair_per_route() {
        let (stops, origin, destination) = network();
        let rows = vec![
            route_row(1, "500D", "up", 1, &stops[0], 1.0),
            route_row(2, "500D", "up", 2, &stops[1], 1.0),
            route_row(3, "500D", "up", 3, &stops[3], 1.0),
            route_row(4, "500D", "up", 4, &stops[2], 1.0),
        ];
        let planner = planner(InMemoryStore::new(stops, rows));

        let options = planner.plan(origin, destination, 500.0).await.unwrap();

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].boarding_order, 1);
        assert_eq!(options[0].alighting_order, 4);
        assert_eq!(options[0].ride_km, 3.0);
    }

    #[tokio::test]
    async fn nothing_nearby_is_empty() {
        let (stops, origin, _) = network();
        let planner = planner(InMemoryStore::new(stops, vec![]));

        let options = planner.plan(origin, at(-1.0), 500.0).await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn invalid_destination_is_rejected() {
        let (stops, origin, _) = network();
        let planner = planner(InMemoryStore::new(stops, vec![]));

        let err = planner
            .plan(origin, Coordinate::new(0.0, 181.0), 500.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TripError::InvalidCoordinate(_)));
    }

    #[test]
    fn ranking_breaks_ties_by_ride_then_bus() {
        let stop = StopWithDistance {
            stop: Stop::new(1, "A", at(0.0), false),
            distance_m: 0.0,
            distance_method: "haversine",
        };
        let option = |bus: &str, walk_m: f64, ride_km: f64| TripOption {
            bus_id: bus.to_string(),
            direction: "up".to_string(),
            boarding: stop.clone(),
            boarding_order: 1,
            alighting: stop.clone(),
            alighting_order: 2,
            walk_m,
            ride_km,
        };

        let mut options = vec![
            option("C", 100.0, 1.0),
            option("B", 50.0, 3.0),
            option("A", 50.0, 3.0),
            option("D", 50.0, 2.0),
        ];
        options.sort_by(rank);

        let buses: Vec<&str> = options.iter().map(|o| o.bus_id.as_str()).collect();
        assert_eq!(buses, vec!["D", "A", "B", "C"]);
    }
}
