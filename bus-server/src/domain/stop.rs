//! Bus stop types.

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Identifier of a stop row in the data store.
pub type StopId = i64;

/// A bus stop as stored in the data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// Step-free access.
    #[serde(default)]
    pub accessible: bool,
}

impl Stop {
    /// Create a new stop.
    pub fn new(id: StopId, name: impl Into<String>, coordinate: Coordinate, accessible: bool) -> Self {
        Self {
            id,
            name: name.into(),
            coordinate,
            accessible,
        }
    }
}

/// A stop annotated with its distance from a reference point.
///
/// Built per discovery request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopWithDistance {
    #[serde(flatten)]
    pub stop: Stop,
    /// Distance from the reference point in meters.
    pub distance_m: f64,
    /// Name of the strategy that produced the distance.
    pub distance_method: &'static str,
}
