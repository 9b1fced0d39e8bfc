//! Route segment types.
//!
//! A bus route is an ordered list of stops per direction. Each row carries
//! the distance to the following stop when it has been measured.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coordinate, StopId};

/// A stop's position on one bus route in one direction.
///
/// The row doubles as the segment from this stop to the next one in
/// `stop_order`, so `distance_to_next_km` belongs to that segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Row identifier, used when writing a computed distance back.
    pub id: i64,
    pub bus_id: String,
    pub direction: String,
    pub stop_order: u32,
    pub stop_id: StopId,
    /// Coordinates of the stop, embedded from the stops table.
    #[serde(rename = "stop", default)]
    pub coordinate: Option<Coordinate>,
    #[serde(rename = "distance_to_next", default)]
    pub distance_to_next_km: Option<f64>,
    #[serde(rename = "duration_to_next", default)]
    pub duration_to_next_secs: Option<f64>,
}

/// Identifies one journey on one bus and direction.
///
/// Covers the segments with stop order in `[boarding_order, alighting_order)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JourneyKey {
    pub bus_id: String,
    pub direction: String,
    pub boarding_order: u32,
    pub alighting_order: u32,
}

impl JourneyKey {
    pub fn new(
        bus_id: impl Into<String>,
        direction: impl Into<String>,
        boarding_order: u32,
        alighting_order: u32,
    ) -> Self {
        Self {
            bus_id: bus_id.into(),
            direction: direction.into(),
            boarding_order,
            alighting_order,
        }
    }
}

impl fmt::Display for JourneyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus {} ({}) stops {}..{}",
            self.bus_id, self.direction, self.boarding_order, self.alighting_order
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_row_with_embedded_stop() {
        let json = r#"{
            "id": 11,
            "bus_id": "500D",
            "direction": "up",
            "stop_order": 3,
            "stop_id": 42,
            "stop": {"latitude": 12.9, "longitude": 77.6},
            "distance_to_next": 1.25,
            "duration_to_next": 180.0
        }"#;
        let row: RouteStop = serde_json::from_str(json).unwrap();

        assert_eq!(row.stop_order, 3);
        assert_eq!(row.coordinate, Some(Coordinate::new(12.9, 77.6)));
        assert_eq!(row.distance_to_next_km, Some(1.25));
        assert_eq!(row.duration_to_next_secs, Some(180.0));
    }

    #[test]
    fn missing_distance_and_stop_are_none() {
        let json = r#"{
            "id": 12,
            "bus_id": "500D",
            "direction": "up",
            "stop_order": 4,
            "stop_id": 43,
            "stop": null,
            "distance_to_next": null
        }"#;
        let row: RouteStop = serde_json::from_str(json).unwrap();

        assert!(row.coordinate.is_none());
        assert!(row.distance_to_next_km.is_none());
        assert!(row.duration_to_next_secs.is_none());
    }

    #[test]
    fn journey_key_display() {
        let key = JourneyKey::new("500D", "up", 2, 9);
        assert_eq!(key.to_string(), "bus 500D (up) stops 2..9");
    }
}
