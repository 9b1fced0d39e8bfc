//! Geographic coordinate type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Latitude bound in degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Longitude bound in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Which half of a coordinate failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn bound(self) -> f64 {
        match self {
            Axis::Latitude => MAX_LATITUDE,
            Axis::Longitude => MAX_LONGITUDE,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

/// Error returned when a coordinate is outside the valid WGS84 range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InvalidCoordinate {
    /// The component is NaN.
    #[error("invalid {axis}: value is not a number")]
    NotANumber { axis: Axis },

    /// The component is outside `[-bound, bound]`.
    #[error("invalid {axis} {value}: must be between {min} and {max}")]
    OutOfRange {
        axis: Axis,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A latitude/longitude pair in degrees.
///
/// `Coordinate::new` does not validate, so values read from external data
/// can be carried around and rejected at the point of use. Anything that
/// talks to the routing service calls [`Coordinate::validate`] first.
///
/// # Examples
///
/// ```
/// use bus_server::domain::Coordinate;
///
/// let stop = Coordinate::try_new(12.9716, 77.5946).unwrap();
/// assert_eq!(stop.to_lon_lat(), "77.5946,12.9716");
///
/// assert!(Coordinate::try_new(91.0, 0.0).is_err());
/// assert!(Coordinate::try_new(0.0, f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without validating it.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting NaN and out-of-range components.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        let coordinate = Self::new(latitude, longitude);
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check both components against their bounds.
    pub fn validate(&self) -> Result<(), InvalidCoordinate> {
        check_axis(Axis::Latitude, self.latitude)?;
        check_axis(Axis::Longitude, self.longitude)
    }

    /// Returns `(latitude, longitude)` in radians.
    pub fn to_radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }

    /// Format as `lon,lat`, the order routing services expect in URLs.
    pub fn to_lon_lat(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

fn check_axis(axis: Axis, value: f64) -> Result<(), InvalidCoordinate> {
    if value.is_nan() {
        return Err(InvalidCoordinate::NotANumber { axis });
    }

    let bound = axis.bound();
    if !(-bound..=bound).contains(&value) {
        return Err(InvalidCoordinate::OutOfRange {
            axis,
            value,
            min: -bound,
            max: bound,
        });
    }

    Ok(())
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}
