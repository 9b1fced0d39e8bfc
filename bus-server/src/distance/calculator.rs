//! Primary/fallback orchestration over distance strategies.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::Coordinate;

use super::{
    DistanceError, DistanceMatrix, DistanceResult, DistanceStrategy, HaversineStrategy,
    OsrmConfig, OsrmStrategy,
};

/// Chooses between a primary and a fallback strategy per request.
///
/// Primary availability is probed on every call; nothing is cached between
/// calls. Strategies can be replaced with the setters, but only while no
/// request is in flight (during start-up or between requests).
#[derive(Clone)]
pub struct DistanceCalculator {
    primary: Arc<dyn DistanceStrategy>,
    fallback: Arc<dyn DistanceStrategy>,
}

impl DistanceCalculator {
    /// Create a calculator from an explicit strategy pair.
    pub fn new(primary: Arc<dyn DistanceStrategy>, fallback: Arc<dyn DistanceStrategy>) -> Self {
        Self { primary, fallback }
    }

    /// Road routing first, great-circle distance as fallback.
    pub fn with_default_strategies(config: OsrmConfig) -> Result<Self, DistanceError> {
        let primary = OsrmStrategy::new(config)?;
        Ok(Self::new(Arc::new(primary), Arc::new(HaversineStrategy)))
    }

    pub fn set_primary(&mut self, strategy: Arc<dyn DistanceStrategy>) {
        self.primary = strategy;
    }

    pub fn set_fallback(&mut self, strategy: Arc<dyn DistanceStrategy>) {
        self.fallback = strategy;
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Compute an `origins × destinations` matrix.
    ///
    /// Coordinates are validated up front; a validation failure is returned
    /// as-is and never falls back. Otherwise:
    /// - primary available and succeeds: its matrix
    /// - primary fails or is unavailable, `use_fallback_on_error`: fallback's
    ///   matrix, or `BothFailed` if that fails too
    /// - primary fails, no fallback: the primary's error untouched
    /// - primary unavailable, no fallback: `PrimaryUnavailable` without
    ///   calling either strategy
    pub async fn calculate_distances(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        use_fallback_on_error: bool,
    ) -> Result<DistanceMatrix, DistanceError> {
        for coordinate in origins.iter().chain(destinations) {
            coordinate.validate()?;
        }

        let primary = self.primary.name();

        if !self.primary.is_available().await {
            if !use_fallback_on_error {
                return Err(DistanceError::PrimaryUnavailable { primary });
            }

            debug!(
                primary,
                fallback = self.fallback.name(),
                "primary strategy unavailable, using fallback"
            );
            return self.run(&*self.fallback, origins, destinations).await;
        }

        let primary_error = match self.run(&*self.primary, origins, destinations).await {
            Ok(matrix) => return Ok(matrix),
            Err(e) if !use_fallback_on_error || e.is_validation() => return Err(e),
            Err(e) => e,
        };

        let fallback = self.fallback.name();
        warn!(primary, fallback, error = %primary_error, "primary strategy failed, using fallback");

        self.run(&*self.fallback, origins, destinations)
            .await
            .map_err(|fallback_error| DistanceError::BothFailed {
                primary,
                primary_error: Box::new(primary_error),
                fallback,
                fallback_error: Box::new(fallback_error),
            })
    }

    /// Distance between a single pair of points.
    pub async fn calculate_distance(
        &self,
        from: Coordinate,
        to: Coordinate,
        use_fallback_on_error: bool,
    ) -> Result<DistanceResult, DistanceError> {
        let matrix = self
            .calculate_distances(&[from], &[to], use_fallback_on_error)
            .await?;

        matrix.get(0, 0).cloned().ok_or_else(|| {
            DistanceError::MalformedResponse("single-pair request returned no cell".to_string())
        })
    }

    /// Run one strategy and hold it to the requested shape.
    async fn run(
        &self,
        strategy: &dyn DistanceStrategy,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DistanceMatrix, DistanceError> {
        let matrix = strategy.calculate_distances(origins, destinations).await?;

        if !matrix.has_shape(origins.len(), destinations.len()) {
            let (rows, cols) = matrix.shape();
            return Err(DistanceError::MalformedResponse(format!(
                "{} returned a {rows}x{cols} matrix, expected {}x{}",
                strategy.name(),
                origins.len(),
                destinations.len()
            )));
        }

        Ok(matrix)
    }
}

impl std::fmt::Debug for DistanceCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceCalculator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
