//! Tests for the road-routing strategy against an in-process fake service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;

use super::{DistanceError, DistanceStrategy, OsrmConfig, OsrmStrategy};
use crate::domain::Coordinate;

/// Canned behaviour for the fake routing service.
struct FakeRouter {
    status: StatusCode,
    body: String,
    delay: Duration,
    calls: AtomicUsize,
    last_uri: Mutex<Option<String>>,
}

impl FakeRouter {
    fn new(status: StatusCode, body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_uri: Mutex::new(None),
        })
    }

    fn slow(status: StatusCode, body: serde_json::Value, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            delay,
            calls: AtomicUsize::new(0),
            last_uri: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_uri(&self) -> Option<String> {
        self.last_uri.lock().unwrap().clone()
    }
}

async fn table(State(fake): State<Arc<FakeRouter>>, uri: Uri) -> impl IntoResponse {
    fake.calls.fetch_add(1, Ordering::SeqCst);
    *fake.last_uri.lock().unwrap() = Some(uri.to_string());
    if !fake.delay.is_zero() {
        tokio::time::sleep(fake.delay).await;
    }
    (
        fake.status,
        [(header::CONTENT_TYPE, "application/json")],
        fake.body.clone(),
    )
}

async fn serve(fake: Arc<FakeRouter>) -> String {
    let app = Router::new()
        .route("/table/v1/driving/:coords", get(table))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// An address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn strategy(base_url: &str) -> OsrmStrategy {
    OsrmStrategy::new(
        OsrmConfig::new(base_url)
            .with_timeout(Duration::from_secs(5))
            .with_probe_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

fn origin() -> Coordinate {
    Coordinate::new(12.9716, 77.5946)
}

fn destination() -> Coordinate {
    Coordinate::new(12.9352, 77.6245)
}

fn two_point_table() -> serde_json::Value {
    json!({
        "code": "Ok",
        "distances": [[0.0, 5000.0], [5100.0, 0.0]],
        "durations": [[0.0, 600.0], [610.0, 0.0]]
    })
}

#[tokio::test]
async fn invalid_coordinates_rejected_before_any_request() {
    let fake = FakeRouter::new(StatusCode::OK, two_point_table());
    let strategy = strategy(&serve(fake.clone()).await);

    let bad = [
        Coordinate::new(90.0001, 0.0),
        Coordinate::new(-91.0, 0.0),
        Coordinate::new(0.0, 180.5),
        Coordinate::new(0.0, -200.0),
        Coordinate::new(f64::NAN, 0.0),
        Coordinate::new(0.0, f64::NAN),
    ];

    for coordinate in bad {
        let err = strategy
            .calculate_distances(&[origin()], &[coordinate])
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{coordinate}: {err}");

        let err = strategy
            .calculate_distances(&[coordinate], &[destination()])
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{coordinate}: {err}");
    }

    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn validation_message_names_value_and_bound() {
    let fake = FakeRouter::new(StatusCode::OK, two_point_table());
    let strategy = strategy(&serve(fake.clone()).await);

    let err = strategy
        .calculate_distances(&[Coordinate::new(95.0, 10.0)], &[destination()])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "invalid latitude 95: must be between -90 and 90");
}

#[tokio::test]
async fn meters_converted_to_kilometers() {
    let fake = FakeRouter::new(StatusCode::OK, two_point_table());
    let strategy = strategy(&serve(fake.clone()).await);

    let matrix = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap();

    assert!(matrix.has_shape(1, 1));
    let cell = matrix.get(0, 0).unwrap();
    assert_eq!(cell.distance_km, 5.0);
    assert_eq!(cell.duration_secs, Some(600.0));
    assert_eq!(cell.method, "osrm");
    assert_eq!(fake.calls(), 1);
}

#[tokio::test]
async fn request_concatenates_origins_then_destinations() {
    let fake = FakeRouter::new(StatusCode::OK, two_point_table());
    let strategy = strategy(&serve(fake.clone()).await);

    strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap();

    let uri = fake.last_uri().unwrap();
    assert_eq!(
        uri,
        "/table/v1/driving/77.5946,12.9716;77.6245,12.9352?annotations=distance,duration"
    );
}

#[tokio::test]
async fn submatrix_sliced_from_full_table() {
    // 2 origins + 3 destinations = 5 points; cell [r][c] = (r * 10 + c) km
    let full: Vec<Vec<f64>> = (0..5)
        .map(|r| (0..5).map(|c| ((r * 10 + c) * 1000) as f64).collect())
        .collect();
    let fake = FakeRouter::new(StatusCode::OK, json!({ "code": "Ok", "distances": full, "durations": full }));
    let strategy = strategy(&serve(fake.clone()).await);

    let origins = [Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)];
    let destinations = [
        Coordinate::new(3.0, 3.0),
        Coordinate::new(4.0, 4.0),
        Coordinate::new(5.0, 5.0),
    ];
    let matrix = strategy
        .calculate_distances(&origins, &destinations)
        .await
        .unwrap();

    assert!(matrix.has_shape(2, 3));
    for i in 0..2 {
        for j in 0..3 {
            let expected = (i * 10 + 2 + j) as f64;
            assert_eq!(matrix.get(i, j).unwrap().distance_km, expected);
        }
    }
}

#[tokio::test]
async fn lowercase_ok_code_accepted() {
    let fake = FakeRouter::new(
        StatusCode::OK,
        json!({
            "code": "ok",
            "distances": [[0.0, 1500.0], [1500.0, 0.0]],
            "durations": [[0.0, 90.0], [95.0, 0.0]]
        }),
    );
    let strategy = strategy(&serve(fake).await);

    let matrix = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap();
    assert_eq!(matrix.get(0, 0).unwrap().distance_km, 1.5);
    assert_eq!(matrix.get(0, 0).unwrap().duration_secs, Some(90.0));
}

#[tokio::test]
async fn error_code_surfaces_upstream_message() {
    let fake = FakeRouter::new(
        StatusCode::OK,
        json!({ "code": "NoTable", "message": "No table found" }),
    );
    let strategy = strategy(&serve(fake).await);

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();

    match err {
        DistanceError::Api { code, message } => {
            assert_eq!(code, "NoTable");
            assert_eq!(message, "No table found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_surfaces_status() {
    let fake = FakeRouter::new(
        StatusCode::BAD_REQUEST,
        json!({ "code": "InvalidQuery", "message": "Query string malformed" }),
    );
    let strategy = strategy(&serve(fake).await);

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();

    match err {
        DistanceError::Upstream { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Query string malformed"));
        }
        other => panic!("expected Upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_distances_is_malformed() {
    let fake = FakeRouter::new(StatusCode::OK, json!({ "code": "Ok" }));
    let strategy = strategy(&serve(fake).await);

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();
    assert!(matches!(err, DistanceError::MalformedResponse(_)));
}

#[tokio::test]
async fn missing_durations_is_malformed() {
    let fake = FakeRouter::new(
        StatusCode::OK,
        json!({ "code": "Ok", "distances": [[0.0, 5000.0], [5100.0, 0.0]] }),
    );
    let strategy = strategy(&serve(fake).await);

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "malformed routing response: response has no duration matrix"
    );
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let fake = Arc::new(FakeRouter {
        status: StatusCode::OK,
        body: "<html>gateway</html>".to_string(),
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
        last_uri: Mutex::new(None),
    });
    let strategy = strategy(&serve(fake).await);

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();
    assert!(matches!(err, DistanceError::MalformedResponse(_)));
    assert!(err.to_string().contains("gateway"));
}

#[tokio::test]
async fn slow_service_times_out_with_distinct_error() {
    let fake = FakeRouter::slow(StatusCode::OK, two_point_table(), Duration::from_secs(2));
    let base_url = serve(fake).await;
    let strategy =
        OsrmStrategy::new(OsrmConfig::new(base_url).with_timeout(Duration::from_millis(100)))
            .unwrap();

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.to_string(), "routing request timed out after 100ms");
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let addr = closed_addr().await;
    let strategy = strategy(&format!("http://{addr}"));

    let err = strategy
        .calculate_distances(&[origin()], &[destination()])
        .await
        .unwrap_err();

    assert!(matches!(err, DistanceError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn empty_destinations_skip_the_request() {
    let fake = FakeRouter::new(StatusCode::OK, two_point_table());
    let strategy = strategy(&serve(fake.clone()).await);

    let matrix = strategy
        .calculate_distances(&[origin(), destination()], &[])
        .await
        .unwrap();

    assert!(matrix.has_shape(2, 0));
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn probe_succeeds_on_http_ok() {
    let fake = FakeRouter::new(StatusCode::OK, json!({ "code": "Ok" }));
    let strategy = strategy(&serve(fake.clone()).await);

    assert!(strategy.is_available().await);
    assert_eq!(
        fake.last_uri().unwrap(),
        "/table/v1/driving/0,0;0,0?annotations=distance"
    );
}

#[tokio::test]
async fn probe_fails_on_error_status() {
    let fake = FakeRouter::new(StatusCode::SERVICE_UNAVAILABLE, json!({}));
    let strategy = strategy(&serve(fake).await);

    assert!(!strategy.is_available().await);
}

#[tokio::test]
async fn probe_fails_on_timeout() {
    let fake = FakeRouter::slow(StatusCode::OK, json!({}), Duration::from_secs(2));
    let base_url = serve(fake).await;
    let strategy = OsrmStrategy::new(
        OsrmConfig::new(base_url).with_probe_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    assert!(!strategy.is_available().await);
}

#[tokio::test]
async fn probe_fails_when_unreachable() {
    let addr = closed_addr().await;
    let strategy = strategy(&format!("http://{addr}"));

    assert!(!strategy.is_available().await);
}
