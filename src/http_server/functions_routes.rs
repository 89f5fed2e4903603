//! Function HTTP Routes
//!
//! The lifecycle jobs as externally triggered functions:
//!
//! - `POST /notify-grace-period`
//! - `POST /begin-grace-period`
//! - `POST /suspend-expired-grace`
//! - `POST /check-data-corruption`
//! - `POST /send-grace-reminders`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::{JobKind, JobOutcome};
use crate::services::Services;
use crate::subscription::{GracePeriodEventRequest, LifecycleError, LifecycleResult};

/// State shared by the function handlers
pub struct FunctionsState {
    pub services: Services,
}

impl FunctionsState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub sent: bool,
    pub event_kind: String,
}

#[derive(Debug, Deserialize)]
pub struct BeginGraceRequest {
    #[serde(alias = "userId")]
    pub user_id: Uuid,

    /// Overrides `lifecycle.grace_days`
    #[serde(default, alias = "graceDays")]
    pub grace_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BeginGraceResponse {
    pub user_id: Uuid,
    pub applied: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn functions_routes(state: Arc<FunctionsState>) -> Router {
    Router::new()
        .route("/notify-grace-period", post(notify_grace_period_handler))
        .route("/begin-grace-period", post(begin_grace_period_handler))
        .route("/:name", post(run_job_handler))
        .with_state(state)
}

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: status.as_u16(),
        }),
    )
}

fn lifecycle_error(e: LifecycleError) -> ApiError {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, e.to_string())
}

/// Store and SMTP calls block; keep them off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> LifecycleResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(lifecycle_error),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Job task failed: {}", e),
        )),
    }
}

async fn notify_grace_period_handler(
    State(state): State<Arc<FunctionsState>>,
    Json(request): Json<GracePeriodEventRequest>,
) -> Result<Json<NotifyResponse>, ApiError> {
    let engine = Arc::clone(&state.services.engine);
    let event_kind = request.event_kind.clone();

    run_blocking(move || engine.notify_grace_period_event(&request)).await?;

    Ok(Json(NotifyResponse {
        sent: true,
        event_kind,
    }))
}

async fn begin_grace_period_handler(
    State(state): State<Arc<FunctionsState>>,
    Json(request): Json<BeginGraceRequest>,
) -> Result<Json<BeginGraceResponse>, ApiError> {
    let engine = Arc::clone(&state.services.engine);
    let user_id = request.user_id;
    let grace_days = request
        .grace_days
        .unwrap_or(engine.config().grace_days);

    let applied = run_blocking(move || engine.begin_grace_period(user_id, grace_days)).await?;

    Ok(Json(BeginGraceResponse { user_id, applied }))
}

async fn run_job_handler(
    State(state): State<Arc<FunctionsState>>,
    Path(name): Path<String>,
) -> Result<Json<JobOutcome>, ApiError> {
    let kind: JobKind = name
        .parse()
        .map_err(|_| error_response(StatusCode::NOT_FOUND, format!("Unknown function: {}", name)))?;
    let runner = Arc::clone(&state.services.runner);

    let outcome = run_blocking(move || runner.run(kind, Utc::now())).await?;
    Ok(Json(outcome))
}
