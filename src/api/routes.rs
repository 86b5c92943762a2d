//! API route definitions.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::api::state::AppState;
use crate::detect::{DataPoint, Severity};
use crate::generator::{shapes, GeneratorSettings, StartOutcome, StopOutcome};
use crate::notify::policy::PolicyError;
use crate::pipeline::PipelineError;
use crate::storage::{self, IncidentQuery};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/incidents", get(list_incidents))
        .route("/admin/generator/start", post(generator_start))
        .route("/admin/generator/stop", post(generator_stop))
        .route("/admin/generator/status", get(generator_status))
        .route("/admin/generate-test", post(generate_test))
        .route("/admin/crisis-scenario", post(crisis_scenario))
        .route(
            "/admin/email-config",
            get(get_email_config).post(update_email_config),
        )
        .route("/admin/stats", get(admin_stats))
        .route("/admin/clear-database", delete(clear_database))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps pipeline and policy failures onto HTTP status codes. Invalid input
/// surfaces the violated constraint; internal failures stay generic.
pub enum ApiError {
    Validation(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": detail })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::EmptySource | PipelineError::Invalid(_) => {
                ApiError::Validation(e.to_string())
            }
            PipelineError::Storage(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(e: PolicyError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

async fn ingest(
    State(state): State<AppState>,
    Json(datapoint): Json<DataPoint>,
) -> Result<Json<Value>, ApiError> {
    let (id, incident) = state.pipeline.ingest(datapoint).await?;
    Ok(Json(json!({
        "message": "data received",
        "incident": incident,
        "id": id,
    })))
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IncidentParams {
    severity: Option<String>,
    source: Option<String>,
    since: Option<chrono::DateTime<Utc>>,
    limit: Option<usize>,
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(params): Query<IncidentParams>,
) -> Result<Json<Value>, ApiError> {
    let severity = match params.severity.as_deref() {
        Some(s) => Some(s.parse::<Severity>().map_err(ApiError::Validation)?),
        None => None,
    };

    let query = IncidentQuery {
        severity,
        source: params.source,
        since: params.since,
        limit: params.limit,
    };
    let incidents =
        storage::query_incidents(&state.pool, &query).map_err(ApiError::Internal)?;
    let total = incidents.len();

    Ok(Json(json!({
        "data": incidents,
        "meta": { "total": total }
    })))
}

// ---------------------------------------------------------------------------
// Generator control surface
// ---------------------------------------------------------------------------

async fn generator_start(
    State(state): State<AppState>,
    settings: Option<Json<GeneratorSettings>>,
) -> Result<Json<Value>, ApiError> {
    let settings = settings.map(|Json(s)| s).unwrap_or_default();
    settings.validate().map_err(ApiError::Validation)?;

    match state
        .generator
        .start(settings, state.pipeline.clone())
        .await
    {
        StartOutcome::Started => Ok(Json(json!({
            "status": "started",
            "message": "Generator started in background",
            "settings": settings,
        }))),
        StartOutcome::AlreadyRunning { generated } => Ok(Json(json!({
            "status": "already_running",
            "message": "Generator is already running",
            "generated": generated,
        }))),
    }
}

async fn generator_stop(State(state): State<AppState>) -> Json<Value> {
    match state.generator.stop().await {
        StopOutcome::Stopped { generated } => Json(json!({
            "status": "stopped",
            "message": format!("Generator stopped. {} incidents generated.", generated),
            "generated": generated,
        })),
        StopOutcome::NotRunning => Json(json!({
            "status": "not_running",
            "message": "Generator is not running",
        })),
    }
}

async fn generator_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.generator.status().await;
    Json(json!({
        "running": status.running,
        "generated": status.generated,
        "settings": status.settings,
        "message": if status.running { "Running" } else { "Stopped" },
    }))
}

// ---------------------------------------------------------------------------
// One-shot batch generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateTestRequest {
    #[serde(default = "default_test_count")]
    count: usize,
}

fn default_test_count() -> usize {
    10
}

async fn generate_test(
    State(state): State<AppState>,
    request: Option<Json<GenerateTestRequest>>,
) -> Result<Json<Value>, ApiError> {
    let count = request.map(|Json(r)| r.count).unwrap_or_else(default_test_count);
    let generated = run_batch(&state, count, 30).await?;

    Ok(Json(json!({
        "generated": generated.len(),
        "incidents": generated,
    })))
}

async fn crisis_scenario(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let generated = run_batch(&state, 20, 90).await?;
    let critical = generated
        .iter()
        .filter(|entry| {
            matches!(
                entry["severity"].as_str(),
                Some("high") | Some("critical")
            )
        })
        .count();

    Ok(Json(json!({
        "generated": generated.len(),
        "message": "Crisis scenario created",
        "critical": critical,
    })))
}

async fn run_batch(
    state: &AppState,
    count: usize,
    anomaly_rate: u8,
) -> Result<Vec<Value>, ApiError> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let mut generated = Vec::with_capacity(count);
    let mut rng = StdRng::from_entropy();
    for _ in 0..count {
        let datapoint = shapes::synthesize(&mut rng, anomaly_rate);
        let (id, incident) = state.pipeline.ingest(datapoint).await?;
        generated.push(json!({ "id": id, "severity": incident.severity }));
    }
    Ok(generated)
}

// ---------------------------------------------------------------------------
// Notification policy
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EmailConfigRequest {
    enabled: bool,
    receiver: String,
    #[serde(default = "default_threshold")]
    threshold: String,
}

fn default_threshold() -> String {
    "critical".to_string()
}

async fn get_email_config(State(state): State<AppState>) -> Json<Value> {
    let policy = state.policy.snapshot().await;
    Json(json!(policy))
}

async fn update_email_config(
    State(state): State<AppState>,
    Json(request): Json<EmailConfigRequest>,
) -> Result<Json<Value>, ApiError> {
    let updated = state
        .policy
        .update(request.enabled, &request.receiver, &request.threshold)
        .await?;

    Ok(Json(json!({
        "status": "updated",
        "config": updated,
    })))
}

// ---------------------------------------------------------------------------
// Admin stats and maintenance
// ---------------------------------------------------------------------------

async fn admin_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = storage::count_incidents(&state.pool).map_err(ApiError::Internal)?;
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now);
    let today = storage::count_since(&state.pool, midnight).map_err(ApiError::Internal)?;
    let last = storage::latest_incident(&state.pool).map_err(ApiError::Internal)?;
    let generator = state.generator.status().await;

    Ok(Json(json!({
        "total_incidents": total,
        "today_count": today,
        "last_incident": last.map(|rec| json!({
            "timestamp": rec.timestamp.to_rfc3339(),
            "severity": rec.severity,
        })),
        "generator_running": generator.running,
        "generator_count": generator.generated,
    })))
}

async fn clear_database(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let deleted = storage::clear_incidents(&state.pool).map_err(ApiError::Internal)?;
    Ok(Json(json!({
        "deleted": deleted,
        "message": format!("{} incidents deleted", deleted),
    })))
}
