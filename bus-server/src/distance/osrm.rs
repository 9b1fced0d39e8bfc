//! Road-network distance strategy backed by an OSRM-compatible service.
//!
//! Uses the table endpoint, which returns all-pairs distances (meters) and
//! durations (seconds) for a single list of coordinates. Origins and
//! destinations are sent as one list and the origin × destination block is
//! cut out of the response.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::Coordinate;

use super::{DistanceError, DistanceMatrix, DistanceResult, DistanceStrategy};

/// Default base URL (the public OSRM demo server).
pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

/// Tag for results produced by [`OsrmStrategy`].
pub const METHOD: &str = "osrm";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PROFILE: &str = "driving";

/// Upper bound on error body text kept in messages.
const MAX_ERROR_BODY: usize = 500;

/// Configuration for the road-routing strategy.
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL of the routing service
    pub base_url: String,
    /// Routing profile path segment
    pub profile: String,
    /// Deadline for table requests
    pub timeout: Duration,
    /// Deadline for availability probes
    pub probe_timeout: Duration,
}

impl OsrmConfig {
    /// Create a config for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Response body of the table endpoint.
///
/// Cells are `null` where the service found no route.
#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
}

/// Distance strategy that queries a road-routing service.
#[derive(Debug, Clone)]
pub struct OsrmStrategy {
    http: reqwest::Client,
    base_url: String,
    profile: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OsrmStrategy {
    /// Create a new strategy with the given configuration.
    pub fn new(config: OsrmConfig) -> Result<Self, DistanceError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(DistanceError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile,
            timeout: config.timeout,
            probe_timeout: config.probe_timeout,
        })
    }

    fn table_url<'a>(
        &self,
        coordinates: impl Iterator<Item = &'a Coordinate>,
        annotations: &str,
    ) -> String {
        let path = coordinates
            .map(Coordinate::to_lon_lat)
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations={}",
            self.base_url, self.profile, path, annotations
        )
    }

    /// Send a table request and check status and code.
    async fn fetch_table(&self, url: &str) -> Result<TableResponse, DistanceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DistanceError::Upstream {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        let table: TableResponse = serde_json::from_str(&body).map_err(|e| {
            DistanceError::MalformedResponse(format!("{e} (body: {})", truncate(&body)))
        })?;

        if !table.code.eq_ignore_ascii_case("ok") {
            return Err(DistanceError::Api {
                message: table.message.unwrap_or_else(|| "no message".to_string()),
                code: table.code,
            });
        }

        Ok(table)
    }

    fn classify(&self, err: reqwest::Error) -> DistanceError {
        if err.is_timeout() {
            DistanceError::Timeout {
                timeout_ms: millis(self.timeout),
            }
        } else {
            DistanceError::Network(err)
        }
    }
}

#[async_trait]
impl DistanceStrategy for OsrmStrategy {
    async fn calculate_distances(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DistanceMatrix, DistanceError> {
        for coordinate in origins.iter().chain(destinations) {
            coordinate.validate()?;
        }

        if origins.is_empty() || destinations.is_empty() {
            return Ok(DistanceMatrix::from_rows(vec![Vec::new(); origins.len()]));
        }

        let url = self.table_url(origins.iter().chain(destinations), "distance,duration");
        debug!(
            origins = origins.len(),
            destinations = destinations.len(),
            "requesting routing table"
        );

        let table = match tokio::time::timeout(self.timeout, self.fetch_table(&url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DistanceError::Timeout {
                    timeout_ms: millis(self.timeout),
                });
            }
        };

        slice_table(table, origins.len(), destinations.len())
    }

    async fn is_available(&self) -> bool {
        let probe = Coordinate::new(0.0, 0.0);
        let url = self.table_url([probe, probe].iter(), "distance");

        match tokio::time::timeout(self.probe_timeout, self.http.get(&url).send()).await {
            Ok(Ok(response)) => {
                let ok = response.status().is_success();
                if !ok {
                    debug!(status = response.status().as_u16(), "routing probe rejected");
                }
                ok
            }
            Ok(Err(e)) => {
                debug!(error = %e, "routing probe failed");
                false
            }
            Err(_) => {
                debug!(
                    timeout_ms = millis(self.probe_timeout),
                    "routing probe timed out"
                );
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        METHOD
    }
}

/// Cut the origin × destination block out of an all-pairs table.
///
/// Rows `0..origins` are the origins; destinations start at column
/// `origins` because both lists were sent as one.
fn slice_table(
    table: TableResponse,
    origins: usize,
    destinations: usize,
) -> Result<DistanceMatrix, DistanceError> {
    let distances = match table.distances {
        Some(d) if !d.is_empty() => d,
        _ => {
            return Err(DistanceError::MalformedResponse(
                "response has no distance matrix".to_string(),
            ));
        }
    };
    // Requested alongside distances; individual cells may still be null.
    let durations = table.durations.ok_or_else(|| {
        DistanceError::MalformedResponse("response has no duration matrix".to_string())
    })?;

    let mut rows = Vec::with_capacity(origins);
    for i in 0..origins {
        let distance_row = distances.get(i).ok_or_else(|| {
            DistanceError::MalformedResponse(format!(
                "distance matrix has {} rows, expected at least {}",
                distances.len(),
                origins
            ))
        })?;

        let mut row = Vec::with_capacity(destinations);
        for j in 0..destinations {
            let column = origins + j;
            let meters = distance_row.get(column).copied().flatten().ok_or_else(|| {
                DistanceError::MalformedResponse(format!(
                    "no distance from origin {i} to destination {j}"
                ))
            })?;
            let duration_secs = durations
                .get(i)
                .and_then(|r| r.get(column))
                .copied()
                .flatten();

            row.push(DistanceResult {
                distance_km: meters / 1000.0,
                duration_secs,
                method: METHOD,
            });
        }
        rows.push(row);
    }

    Ok(DistanceMatrix::from_rows(rows))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
