//! Great-circle distance strategy.

use async_trait::async_trait;

use crate::domain::Coordinate;

use super::{DistanceError, DistanceMatrix, DistanceResult, DistanceStrategy};

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tag for results produced by [`HaversineStrategy`].
pub const METHOD: &str = "haversine";

/// Great-circle distance between two coordinates in kilometers.
///
/// # Example
///
/// ```
/// use bus_server::distance::haversine_km;
/// use bus_server::domain::Coordinate;
///
/// let berlin = Coordinate::new(52.5200, 13.4050);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// assert!((haversine_km(&berlin, &paris) - 878.0).abs() < 5.0);
/// ```
pub fn haversine_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    // Rounding can push `a` past 1 for near-antipodal points.
    let a = ((d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Straight-line distances with no I/O.
///
/// Always available. Has no notion of travel time, so every cell's
/// `duration_secs` is `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineStrategy;

impl HaversineStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistanceStrategy for HaversineStrategy {
    async fn calculate_distances(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DistanceMatrix, DistanceError> {
        Ok(DistanceMatrix::from_fn(
            origins.len(),
            destinations.len(),
            |i, j| DistanceResult {
                distance_km: haversine_km(&origins[i], &destinations[j]),
                duration_secs: None,
                method: METHOD,
            },
        ))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        METHOD
    }
}
