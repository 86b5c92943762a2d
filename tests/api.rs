//! API integration tests driven through the real router with tower oneshot.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use incident_sentinel::api::{self, state::AppState};
use incident_sentinel::generator::GeneratorController;
use incident_sentinel::notify::policy::PolicyHandle;
use incident_sentinel::notify::NotificationRouter;
use incident_sentinel::pipeline::Pipeline;
use incident_sentinel::storage;

fn test_app(dir: &tempfile::TempDir) -> Router {
    let path = dir.path().join("api.db");
    let pool = storage::open_pool(path.to_str().unwrap()).unwrap();
    let router = NotificationRouter::new(Vec::new(), PolicyHandle::new());
    let state = AppState {
        pool: pool.clone(),
        pipeline: Arc::new(Pipeline::new(pool, router)),
        policy: PolicyHandle::new(),
        generator: Arc::new(GeneratorController::new()),
    };
    api::router(state)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn payment_payload() -> Value {
    json!({
        "source": "sensor-payment",
        "timestamp": "2026-08-06T12:00:00Z",
        "values": {
            "amount": 42000.0,
            "response_time_ms": 5000.0,
            "failed_attempts": 6.0,
            "num_items": 2.0
        }
    })
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _) = send(app, "GET", "/api/v1/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(app.clone(), "POST", "/api/v1/ingest", Some(payment_payload())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "data received");
    assert!(body["id"].is_string());
    assert_eq!(body["incident"]["type"], "payment");
    assert_eq!(body["incident"]["source"], "sensor-payment");

    let (status, body) = send(app, "GET", "/api/v1/incidents?source=sensor-payment", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["source"], "sensor-payment");
}

#[tokio::test]
async fn test_ingest_empty_values_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let payload = json!({
        "source": "sensor-api",
        "timestamp": "2026-08-06T12:00:00Z",
        "values": {}
    });
    let (status, body) = send(app, "POST", "/api/v1/ingest", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("feature"));
}

#[tokio::test]
async fn test_ingest_malformed_payload_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    // missing source and values
    let payload = json!({ "timestamp": "2026-08-06T12:00:00Z" });
    let (status, _) = send(app, "POST", "/api/v1/ingest", Some(payload)).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_incidents_rejects_bad_severity_filter() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _) = send(app, "GET", "/api/v1/incidents?severity=urgent", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_email_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(app.clone(), "GET", "/api/v1/admin/email-config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["threshold"], "critical");

    let update = json!({ "enabled": true, "receiver": "  ops@example.com ", "threshold": "high" });
    let (status, body) = send(app.clone(), "POST", "/api/v1/admin/email-config", Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "updated");
    assert_eq!(body["config"]["receiver"], "ops@example.com");

    let (_, body) = send(app, "GET", "/api/v1/admin/email-config", None).await;
    assert_eq!(body["threshold"], "high");
    assert_eq!(body["enabled"], true);
}

#[tokio::test]
async fn test_email_config_rejects_invalid_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let update = json!({ "enabled": true, "receiver": "a@b.com", "threshold": "medium" });
    let (status, body) = send(app, "POST", "/api/v1/admin/email-config", Some(update)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("threshold"));
}

#[tokio::test]
async fn test_generator_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    // stop before any start is a no-op
    let (status, body) = send(app.clone(), "POST", "/api/v1/admin/generator/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_running");

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/v1/admin/generator/start",
        Some(json!({ "interval": 1, "anomalyRate": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");

    // a second start must not spawn another worker or reset the counter
    let (status, body) = send(app.clone(), "POST", "/api/v1/admin/generator/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "already_running");

    let (status, body) = send(app.clone(), "GET", "/api/v1/admin/generator/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], true);

    let (status, body) = send(app.clone(), "POST", "/api/v1/admin/generator/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");

    let (_, body) = send(app, "POST", "/api/v1/admin/generator/stop", None).await;
    assert_eq!(body["status"], "not_running");
}

#[tokio::test]
async fn test_generator_start_rejects_bad_settings() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _) = send(
        app,
        "POST",
        "/api/v1/admin/generator/start",
        Some(json!({ "interval": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_generate_test_batch() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/v1/admin/generate-test",
        Some(json!({ "count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], 3);
    assert_eq!(body["incidents"].as_array().unwrap().len(), 3);

    let (_, body) = send(app, "GET", "/api/v1/admin/stats", None).await;
    assert_eq!(body["total_incidents"], 3);
}

#[tokio::test]
async fn test_crisis_scenario_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(app.clone(), "POST", "/api/v1/admin/crisis-scenario", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], 20);

    let (status, body) = send(app.clone(), "DELETE", "/api/v1/admin/clear-database", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 20);

    let (_, body) = send(app, "GET", "/api/v1/incidents", None).await;
    assert_eq!(body["meta"]["total"], 0);
}
