//! PostgREST-style data store client.
//!
//! Tables are exposed at `{base_url}/rest/v1/{table}`; filters are query
//! parameters such as `bus_id=eq.500D` or `stop_id=in.(1,2,3)`.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{RouteStop, Stop, StopId};

use super::RouteStore;
use super::error::StoreError;

const STOPS_SELECT: &str = "id,name,latitude,longitude,accessible";

/// Route rows with the stop's coordinates embedded as `stop`.
const ROUTE_STOPS_SELECT: &str = "id,bus_id,direction,stop_order,stop_id,\
     distance_to_next,duration_to_next,stop:stops(latitude,longitude)";

/// Configuration for the REST store client.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL (without the `/rest/v1` suffix)
    pub base_url: String,
    /// API key sent as `apikey` and as a bearer token
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RestStoreConfig {
    /// Create a new config with the given URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Body of a distance write-back.
#[derive(Debug, Serialize)]
struct SegmentDistanceUpdate {
    distance_to_next: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_to_next: Option<f64>,
}

/// Client for a PostgREST-compatible row store.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
}

impl RestStore {
    /// Create a new REST store client.
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| StoreError::Api {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
            StoreError::Api {
                status: 0,
                message: "Invalid API key format".to_string(),
            }
        })?;
        headers.insert(HeaderName::from_static("apikey"), api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// GET rows from a table with the given filters.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self.http.get(self.table_url(table)).query(query).send().await?;
        let body = check_status(response).await?.text().await?;

        serde_json::from_str(&body).map_err(|e| StoreError::Json {
            message: format!("{table}: {e}"),
        })
    }
}

/// Map auth failures and error statuses to `StoreError`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response)
}

fn in_list(ids: &[StopId]) -> String {
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

impl RouteStore for RestStore {
    async fn fetch_stops(&self) -> Result<Vec<Stop>, StoreError> {
        self.select(
            "stops",
            &[
                ("select", STOPS_SELECT.to_string()),
                ("order", "id.asc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_route_segments(
        &self,
        bus_id: &str,
        direction: &str,
        from_order: u32,
        to_order: u32,
    ) -> Result<Vec<RouteStop>, StoreError> {
        self.select(
            "route_stops",
            &[
                ("select", ROUTE_STOPS_SELECT.to_string()),
                ("bus_id", format!("eq.{bus_id}")),
                ("direction", format!("eq.{direction}")),
                ("stop_order", format!("gte.{from_order}")),
                ("stop_order", format!("lt.{to_order}")),
                ("order", "stop_order.asc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_next_route_stop(
        &self,
        bus_id: &str,
        direction: &str,
        after_order: u32,
    ) -> Result<Option<RouteStop>, StoreError> {
        let rows: Vec<RouteStop> = self
            .select(
                "route_stops",
                &[
                    ("select", ROUTE_STOPS_SELECT.to_string()),
                    ("bus_id", format!("eq.{bus_id}")),
                    ("direction", format!("eq.{direction}")),
                    ("stop_order", format!("gt.{after_order}")),
                    ("order", "stop_order.asc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn fetch_route_stops_serving(
        &self,
        stop_ids: &[StopId],
    ) -> Result<Vec<RouteStop>, StoreError> {
        if stop_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select(
            "route_stops",
            &[
                ("select", ROUTE_STOPS_SELECT.to_string()),
                ("stop_id", in_list(stop_ids)),
                (
                    "order",
                    "bus_id.asc,direction.asc,stop_order.asc".to_string(),
                ),
            ],
        )
        .await
    }

    async fn update_segment_distance(
        &self,
        route_stop_id: i64,
        distance_km: f64,
        duration_secs: Option<f64>,
    ) -> Result<(), StoreError> {
        let body = SegmentDistanceUpdate {
            distance_to_next: distance_km,
            duration_to_next: duration_secs,
        };

        let response = self
            .http
            .patch(self.table_url("route_stops"))
            .query(&[("id", format!("eq.{route_stop_id}"))])
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
