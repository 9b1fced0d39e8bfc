//! Distance calculation error types.

use crate::domain::InvalidCoordinate;

/// Errors from distance strategies and the calculator.
///
/// Everything except `InvalidCoordinate` is recoverable by falling back to
/// another strategy.
#[derive(Debug, thiserror::Error)]
pub enum DistanceError {
    /// A coordinate failed bounds checking before any request was made
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),

    /// The routing request exceeded its deadline
    #[error("routing request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection-level failure reaching the routing service
    #[error("routing service unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// The routing service returned a non-success HTTP status
    #[error("routing service returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The routing service answered but reported a failure code
    #[error("routing service responded with code {code}: {message}")]
    Api { code: String, message: String },

    /// The response was missing fields or had the wrong shape
    #[error("malformed routing response: {0}")]
    MalformedResponse(String),

    /// Primary reported unavailable and the caller disabled fallback
    #[error("primary strategy {primary} is unavailable and fallback is disabled")]
    PrimaryUnavailable { primary: &'static str },

    /// Both primary and fallback failed
    #[error(
        "primary strategy {primary} failed: {primary_error}; \
         fallback strategy {fallback} also failed: {fallback_error}"
    )]
    BothFailed {
        primary: &'static str,
        primary_error: Box<DistanceError>,
        fallback: &'static str,
        fallback_error: Box<DistanceError>,
    },
}

impl DistanceError {
    /// True for input validation failures, which no strategy can recover from.
    pub fn is_validation(&self) -> bool {
        matches!(self, DistanceError::InvalidCoordinate(_))
    }

    /// True if the request was abandoned at its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DistanceError::Timeout { .. })
    }
}
