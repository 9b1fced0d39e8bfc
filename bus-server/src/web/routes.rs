//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::discovery::DiscoveryError;
use crate::distance::DistanceError;
use crate::domain::{Coordinate, InvalidCoordinate};
use crate::journey::JourneyError;
use crate::store::{RouteStore, StoreError};
use crate::trip::TripError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<S: RouteStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stops/nearby", get(nearby_stops::<S>))
        .route("/api/journeys/length", get(journey_length::<S>))
        .route("/api/journeys/cache/clear", post(clear_journey_cache::<S>))
        .route("/api/trips/plan", get(plan_trip::<S>))
        .route("/api/distance", get(distance::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn nearby_stops<S: RouteStore + 'static>(
    State(state): State<AppState<S>>,
    Query(req): Query<NearbyStopsQuery>,
) -> Result<Json<NearbyStopsResponse>, AppError> {
    let location = Coordinate::try_new(req.lat, req.lon)?;
    let radius_m = radius(req.radius_m, state.default_radius_m)?;

    let stops = state.discovery.discover_stops(location, radius_m).await?;
    Ok(Json(NearbyStopsResponse { stops }))
}

async fn journey_length<S: RouteStore + 'static>(
    State(state): State<AppState<S>>,
    Query(req): Query<JourneyLengthQuery>,
) -> Result<Json<JourneyLengthResponse>, AppError> {
    let length_km = state
        .journeys
        .calculate_journey_length(&req.bus_id, req.boarding, req.alighting, &req.direction)
        .await?;

    Ok(Json(JourneyLengthResponse {
        bus_id: req.bus_id,
        direction: req.direction,
        boarding: req.boarding,
        alighting: req.alighting,
        length_km,
    }))
}

/// Forget cached journey lengths after route data changes.
async fn clear_journey_cache<S: RouteStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<CacheClearedResponse> {
    let cleared_entries = state.journeys.cached_entries().await;
    state.journeys.clear_cache();
    Json(CacheClearedResponse { cleared_entries })
}

async fn plan_trip<S: RouteStore + 'static>(
    State(state): State<AppState<S>>,
    Query(req): Query<PlanTripQuery>,
) -> Result<Json<PlanTripResponse>, AppError> {
    let origin = Coordinate::try_new(req.from_lat, req.from_lon)?;
    let destination = Coordinate::try_new(req.to_lat, req.to_lon)?;
    let radius_m = radius(req.radius_m, state.default_radius_m)?;

    let options = state.planner.plan(origin, destination, radius_m).await?;
    Ok(Json(PlanTripResponse { options }))
}

async fn distance<S: RouteStore + 'static>(
    State(state): State<AppState<S>>,
    Query(req): Query<DistanceQuery>,
) -> Result<Json<DistanceResponse>, AppError> {
    let from = Coordinate::try_new(req.from_lat, req.from_lon)?;
    let to = Coordinate::try_new(req.to_lat, req.to_lon)?;

    let result = state
        .calculator
        .calculate_distance(from, to, req.fallback)
        .await?;
    Ok(Json(DistanceResponse { result }))
}

fn radius(requested: Option<f64>, default: f64) -> Result<f64, AppError> {
    match requested {
        None => Ok(default),
        Some(r) if r.is_finite() && r >= 0.0 => Ok(r),
        Some(r) => Err(AppError::BadRequest {
            message: format!("invalid radius_m {r}: must be a non-negative number"),
        }),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    BadGateway { message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl From<InvalidCoordinate> for AppError {
    fn from(e: InvalidCoordinate) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<DistanceError> for AppError {
    fn from(e: DistanceError) -> Self {
        let message = e.to_string();
        match e {
            DistanceError::InvalidCoordinate(_) => AppError::BadRequest { message },
            DistanceError::PrimaryUnavailable { .. } => AppError::ServiceUnavailable { message },
            _ => AppError::BadGateway { message },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<DiscoveryError> for AppError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::Distance(e) => e.into(),
            DiscoveryError::Store(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<JourneyError> for AppError {
    fn from(e: JourneyError) -> Self {
        match e {
            JourneyError::InvalidRange { .. } => AppError::BadRequest {
                message: e.to_string(),
            },
            JourneyError::Store(e) => e.into(),
        }
    }
}

impl From<TripError> for AppError {
    fn from(e: TripError) -> Self {
        match e {
            TripError::InvalidCoordinate(e) => e.into(),
            TripError::Discovery(e) => e.into(),
            TripError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::ServiceUnavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
