//! Data store error types.

/// Errors from the route data store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed
    #[error("unauthorized: check STORE_API_KEY")]
    Unauthorized,

    /// The store returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Fixture file could not be loaded
    #[error("fixture error: {message}")]
    Fixture { message: String },

    /// Update targeted a row that does not exist
    #[error("route stop {0} not found")]
    NotFound(i64),
}
