//! REST endpoints for submitting and polling progression tasks.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::dto::{DetailResponse, SubmitTaskRequest};
use super::error::ApiError;
use crate::tasks::{TaskId, TaskQueue, TaskRecord};

/// How long browsers may cache a CORS preflight.
const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// Deadline for reading a request and writing its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for task routes.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn TaskQueue>,
}

/// Build the task API router.
pub fn task_routes(queue: Arc<dyn TaskQueue>) -> Router {
    let state = AppState { queue };

    let router = Router::new()
        .route("/health", get(health))
        .route("/task/add", post(add_task))
        .route("/task/list", get(list_tasks))
        .route("/task/{id}", get(get_task))
        .with_state(state);

    with_middleware(router)
}

/// Shared middleware stack, outermost layer first.
fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(CORS_MAX_AGE);

    router.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(cors),
    )
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (tasks, pending) = state.queue.counts().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "tasks": tasks,
        "pending": pending,
    }))
}

// ── Tasks ───────────────────────────────────────────────────────────────

/// POST /task/add
///
/// Body: `{"n": 5, "d": 11.5, "n1": 21.33, "I": 0.5, "TTL": 120}`.
/// 201 with the new id, 400 on undecodable JSON, 422 on invalid fields.
async fn add_task(
    State(state): State<AppState>,
    body: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DetailResponse>), ApiError> {
    let Json(request) = body.map_err(|e| {
        warn!(error = %e, "Failed to decode body");
        ApiError::BadRequest(e.body_text())
    })?;

    let params = request.validate().inspect_err(|e| {
        warn!(error = %e, "Task validation error");
    })?;
    debug!(?params, "New task request");

    let task_id = state.queue.add_task(params).await.inspect_err(|e| {
        warn!(error = %e, "Failed to add task");
    })?;

    info!(task_id, "New task accepted");
    Ok((StatusCode::CREATED, Json(DetailResponse::created(task_id))))
}

/// GET /task/list
///
/// All tasks in ascending id order.
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let tasks = state.queue.list_tasks().await.inspect_err(|e| {
        warn!(error = %e, "Failed to get task list");
    })?;
    debug!(count = tasks.len(), "Task list served");
    Ok(Json(tasks))
}

/// GET /task/{id}
///
/// A single task, or 404 once it is unknown or past its TTL.
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    Ok(Json(state.queue.get_task(id).await?))
}
