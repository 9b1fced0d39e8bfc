//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::distance::DistanceResult;
use crate::domain::StopWithDistance;
use crate::trip::TripOption;

/// Query for stops near a point.
#[derive(Debug, Deserialize)]
pub struct NearbyStopsQuery {
    pub lat: f64,
    pub lon: f64,

    /// Search radius in meters (defaults to the server's configured radius)
    pub radius_m: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NearbyStopsResponse {
    pub stops: Vec<StopWithDistance>,
}

/// Query for the length of a ride on one bus.
#[derive(Debug, Deserialize)]
pub struct JourneyLengthQuery {
    pub bus_id: String,
    pub direction: String,

    /// Stop order where the ride starts
    pub boarding: u32,

    /// Stop order where the ride ends
    pub alighting: u32,
}

#[derive(Debug, Serialize)]
pub struct JourneyLengthResponse {
    pub bus_id: String,
    pub direction: String,
    pub boarding: u32,
    pub alighting: u32,
    pub length_km: f64,
}

/// Response to clearing the journey cache.
#[derive(Debug, Serialize)]
pub struct CacheClearedResponse {
    /// Entries held before clearing
    pub cleared_entries: u64,
}

/// Query for trip options between two points.
#[derive(Debug, Deserialize)]
pub struct PlanTripQuery {
    pub from_lat: f64,
    pub from_lon: f64,
    pub to_lat: f64,
    pub to_lon: f64,

    /// Maximum walk at each end in meters
    pub radius_m: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PlanTripResponse {
    pub options: Vec<TripOption>,
}

/// Query for the distance between two points.
#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub from_lat: f64,
    pub from_lon: f64,
    pub to_lat: f64,
    pub to_lon: f64,

    /// Fall back to great-circle distance if routing fails (default true)
    #[serde(default = "default_fallback")]
    pub fallback: bool,
}

fn default_fallback() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    #[serde(flatten)]
    pub result: DistanceResult,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
