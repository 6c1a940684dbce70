//! waha-relay HTTP API
//!
//! - `POST /send`: validate and queue a message (202 / 400 / 503)
//! - Health and Kubernetes probes
//! - Dispatcher statistics and Prometheus metrics
//! - OpenAPI document

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::OpenApi;

use relay_common::{DispatchStats, DispatcherState, Job};
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

pub mod model;

use model::{ErrorResponse, HealthResponse, ProbeResponse, SendAcceptedResponse, SendRequest};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Rendered by `/metrics` when a Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "waha-relay", description = "Asynchronous WhatsApp text delivery"),
    paths(
        send_message,
        health_handler,
        liveness_probe,
        readiness_probe,
        dispatcher_stats_handler,
        metrics_handler,
    ),
    components(schemas(
        SendRequest,
        SendAcceptedResponse,
        ErrorResponse,
        HealthResponse,
        ProbeResponse,
        DispatchStats,
        DispatcherState,
    )),
    tags(
        (name = "messages", description = "Message intake"),
        (name = "health", description = "Health checks and probes"),
        (name = "monitoring", description = "Monitoring and metrics endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the router without a metrics recorder
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    create_router_with_metrics(dispatcher, None)
}

/// Create the full router with all endpoints
pub fn create_router_with_metrics(
    dispatcher: Arc<Dispatcher>,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let state = AppState { dispatcher, prometheus };

    Router::new()
        .route("/send", post(send_message))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/monitoring/dispatcher", get(dispatcher_stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api-doc/openapi.json", get(openapi_handler))
        .with_state(state)
}

// ============================================================================
// Message Intake
// ============================================================================

/// Queue a text message for asynchronous delivery
#[utoipa::path(
    post,
    path = "/send",
    tag = "messages",
    request_body = SendRequest,
    responses(
        (status = 202, description = "Message queued", body = SendAcceptedResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 503, description = "Queue full or shutting down", body = ErrorResponse)
    )
)]
async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) if req.is_valid() => req,
        Ok(_) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new("Payload invalid"))).into_response();
        }
        Err(rejection) => {
            debug!(error = %rejection, "Rejected malformed send request");
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new("Payload invalid"))).into_response();
        }
    };

    let job = Job::new(req.to.trim(), req.message);
    let job_id = job.id.clone();

    match state.dispatcher.enqueue(job) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(SendAcceptedResponse {
                status: "queued".to_string(),
                message: "Message queued".to_string(),
                job_id,
            }),
        )
            .into_response(),
        Err(DispatchError::QueueFull(capacity)) => {
            warn!(capacity, "Queue full, rejecting message");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("Server busy, queue full")),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Dispatcher refused message");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("Dispatcher is not accepting jobs")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Health Endpoints
// ============================================================================

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.dispatcher.state() {
        DispatcherState::Created | DispatcherState::Running => "UP",
        DispatcherState::Draining | DispatcherState::Stopped => "DRAINING",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is live", body = ProbeResponse)
    )
)]
async fn liveness_probe() -> Json<ProbeResponse> {
    Json(ProbeResponse { status: "LIVE".to_string() })
}

/// Kubernetes readiness probe - ready only while the dispatcher is running
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Accepting messages", body = ProbeResponse),
        (status = 503, description = "Not accepting messages", body = ProbeResponse)
    )
)]
async fn readiness_probe(State(state): State<AppState>) -> Response {
    if state.dispatcher.state() == DispatcherState::Running {
        (StatusCode::OK, Json(ProbeResponse { status: "READY".to_string() })).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(ProbeResponse { status: "NOT_READY".to_string() })).into_response()
    }
}

// ============================================================================
// Monitoring
// ============================================================================

/// Dispatcher statistics
#[utoipa::path(
    get,
    path = "/monitoring/dispatcher",
    tag = "monitoring",
    responses(
        (status = 200, description = "Dispatcher statistics", body = DispatchStats)
    )
)]
async fn dispatcher_stats_handler(State(state): State<AppState>) -> Json<DispatchStats> {
    Json(state.dispatcher.stats())
}

/// Prometheus metrics endpoint
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "monitoring",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain")
    )
)]
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let output = state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
        .into_response()
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
