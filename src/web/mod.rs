//! Web API module for TrapWatch.
//!
//! This module provides the REST API the dashboard frontend renders from:
//! trap state, the detection service relay, the detection trigger and the
//! shared detection status slot.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/traps` - All traps with statuses, cursors and counts
//! - `GET /api/traps/counts` - Traps per status
//! - `POST /api/traps/reset` - Reset every trap to the initial status
//! - `GET /api/traps/{id}` - One trap
//! - `PUT /api/traps/{id}` - Set a trap status
//! - `POST /api/traps/{id}/cycle` - Advance a trap status (click)
//! - `POST /api/traps/{id}/enlarge` - Toggle the enlarged view of a trap
//! - `POST /api/traps/{id}/select` - Move the selection cursor to a trap
//! - `DELETE /api/traps/selection` - Clear the selection cursor
//! - `GET /api/detector/health` - Detection service liveness
//! - `POST /api/detector/detect` - Run a detection through the relay
//! - `GET /api/detector/capture` - Fetch a camera frame through the relay
//! - `POST /api/detection/trigger` - Start a detection (`?source=keypress`)
//! - `GET /api/detection` - Trigger state and last result
//! - `GET /api/detection-status` - Last posted detection status
//! - `POST /api/detection-status` - Update the detection status
//! - `DELETE /api/detection-status` - Reset the detection status

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{RelayError, TrapError, TriggerError};
use crate::models::{DetectionStatus, DetectionStatusPatch, TrapStatus};
use crate::relay::{DetectorRelay, HealthReply, RelayAnswer};
use crate::services::{
    DashboardSession, DetectionStatusSlot, StoreSnapshot, TrapView, TriggerSnapshot, TriggerSource,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
#[derive(Clone)]
pub struct AppState {
    /// Dashboard session (trap store, trigger, relay)
    session: Arc<DashboardSession>,
    /// Process-wide detection status slot
    detection_status: Arc<DetectionStatusSlot>,
}

impl AppState {
    /// Creates application state talking to the real detection service.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let relay = DetectorRelay::from_config(&config.detector)?;
        Self::with_relay(config, relay)
    }

    /// Creates application state over an explicit relay.
    pub fn with_relay(config: &Config, relay: DetectorRelay) -> anyhow::Result<Self> {
        let detection_status = Arc::new(DetectionStatusSlot::new(
            config.dashboard.default_room.clone(),
        ));
        let session = DashboardSession::from_config(config, relay, detection_status.clone())?;

        Ok(Self {
            session: Arc::new(session),
            detection_status,
        })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current health status (e.g., "healthy").
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Trap status update request.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// New status; must belong to the configured scheme.
    pub status: TrapStatus,
}

/// Query parameters for starting a detection.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    /// What started the detection (defaults to a click).
    #[serde(default)]
    pub source: TriggerSource,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Relay failure response, shaped like the detection service's own errors.
#[derive(Debug, Serialize)]
pub struct RelayErrorResponse {
    /// Always "error".
    pub status: &'static str,
    /// Displayable failure message.
    pub error: String,
    /// Ports that were tried.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
    /// Last failed attempt, for diagnosis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<RelayError> for RelayErrorResponse {
    fn from(err: RelayError) -> Self {
        let error = err.to_string();
        match err {
            RelayError::ServiceUnreachable { ports, last_error } => Self {
                status: "error",
                error,
                ports,
                details: last_error,
            },
            RelayError::Connection { port, .. }
            | RelayError::MalformedResponse { port, .. }
            | RelayError::Timeout { port, .. } => Self {
                status: "error",
                error,
                ports: vec![port],
                details: None,
            },
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;
type RelayResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<RelayErrorResponse>)>;

fn trap_error(err: TrapError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        TrapError::UnknownTrap(_) => StatusCode::NOT_FOUND,
        TrapError::StatusNotInScheme { .. } => StatusCode::BAD_REQUEST,
        TrapError::InvalidRegistry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new(err.to_string())))
}

fn relay_reply(answer: Result<RelayAnswer, RelayError>) -> RelayResult {
    match answer {
        Ok(answer) => {
            let status = StatusCode::from_u16(answer.http_status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(answer.body)))
        }
        Err(err) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RelayErrorResponse::from(err)),
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/traps - All traps in registry order.
async fn list_traps(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.session.snapshot())
}

/// GET /api/traps/counts - Traps per status.
async fn trap_counts(State(state): State<AppState>) -> Json<BTreeMap<TrapStatus, usize>> {
    Json(state.session.store().counts())
}

/// POST /api/traps/reset - Reset every trap.
async fn reset_traps(State(state): State<AppState>) -> Json<StoreSnapshot> {
    let mut store = state.session.store();
    store.reset();
    Json(store.snapshot())
}

/// GET /api/traps/{id} - One trap.
async fn get_trap(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TrapView>> {
    state.session.store().view(&id).map(Json).map_err(trap_error)
}

/// PUT /api/traps/{id} - Set a trap status.
async fn set_trap_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> ApiResult<Json<TrapView>> {
    let mut store = state.session.store();
    store.set(&id, request.status).map_err(trap_error)?;
    store.view(&id).map(Json).map_err(trap_error)
}

/// POST /api/traps/{id}/cycle - Advance a trap status, as a click does.
async fn cycle_trap(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TrapView>> {
    let mut store = state.session.store();
    store.cycle(&id).map_err(trap_error)?;
    store.view(&id).map(Json).map_err(trap_error)
}

/// POST /api/traps/{id}/enlarge - Toggle the enlarged view.
async fn toggle_enlarge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TrapView>> {
    let mut store = state.session.store();
    store.toggle_enlarged(&id).map_err(trap_error)?;
    store.view(&id).map(Json).map_err(trap_error)
}

/// POST /api/traps/{id}/select - Move the selection cursor.
async fn select_trap(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TrapView>> {
    let mut store = state.session.store();
    store.select(&id).map_err(trap_error)?;
    store.view(&id).map(Json).map_err(trap_error)
}

/// DELETE /api/traps/selection - Clear the selection cursor.
async fn clear_selection(State(state): State<AppState>) -> Json<StoreSnapshot> {
    let mut store = state.session.store();
    store.clear_selection();
    Json(store.snapshot())
}

/// GET /api/detector/health - Detection service liveness.
///
/// Always answers 200; the body says whether the service is running.
async fn detector_health(State(state): State<AppState>) -> Json<HealthReply> {
    Json(state.session.relay().check_health().await)
}

/// POST /api/detector/detect - Relay one detection request.
async fn detector_detect(State(state): State<AppState>) -> RelayResult {
    relay_reply(state.session.relay().detect().await)
}

/// GET /api/detector/capture - Relay a camera frame request.
async fn detector_capture(State(state): State<AppState>) -> RelayResult {
    relay_reply(state.session.relay().capture().await)
}

/// POST /api/detection/trigger - Start a detection without waiting for it.
async fn trigger_detection(
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
) -> ApiResult<(StatusCode, Json<TriggerSnapshot>)> {
    match state.session.trigger_detection(query.source) {
        Ok(_handle) => Ok((
            StatusCode::ACCEPTED,
            Json(state.session.trigger().snapshot()),
        )),
        Err(err @ TriggerError::DetectionInFlight) => Err((
            StatusCode::CONFLICT,
            Json(ApiError::with_details(
                err.to_string(),
                "Wait for the current detection to finish",
            )),
        )),
    }
}

/// GET /api/detection - Trigger state and last result.
async fn detection_state(State(state): State<AppState>) -> Json<TriggerSnapshot> {
    Json(state.session.trigger().snapshot())
}

/// GET /api/detection-status - Last posted detection status.
async fn get_detection_status(State(state): State<AppState>) -> Json<DetectionStatus> {
    Json(state.detection_status.get())
}

/// POST /api/detection-status - Update the detection status.
async fn post_detection_status(
    State(state): State<AppState>,
    Json(patch): Json<DetectionStatusPatch>,
) -> Json<DetectionStatus> {
    Json(state.detection_status.update(patch))
}

/// DELETE /api/detection-status - Back to the startup state.
async fn reset_detection_status(State(state): State<AppState>) -> Json<DetectionStatus> {
    Json(state.detection_status.reset())
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    // The dashboard frontend runs on its own dev-server port next to this
    // API on the same machine.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Trap endpoints
        .route("/api/traps", get(list_traps))
        .route("/api/traps/counts", get(trap_counts))
        .route("/api/traps/reset", post(reset_traps))
        .route("/api/traps/selection", delete(clear_selection))
        .route("/api/traps/{id}", get(get_trap).put(set_trap_status))
        .route("/api/traps/{id}/cycle", post(cycle_trap))
        .route("/api/traps/{id}/enlarge", post(toggle_enlarge))
        .route("/api/traps/{id}/select", post(select_trap))
        // Detection service relay
        .route("/api/detector/health", get(detector_health))
        .route("/api/detector/detect", post(detector_detect))
        .route("/api/detector/capture", get(detector_capture))
        // Detection trigger
        .route("/api/detection", get(detection_state))
        .route("/api/detection/trigger", post(trigger_detection))
        // Detection status slot
        .route(
            "/api/detection-status",
            get(get_detection_status)
                .post(post_detection_status)
                .delete(reset_detection_status),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server.
///
/// # Errors
///
/// Returns an error if the state cannot be built or the server fails to start.
pub async fn run_server(config: Config, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    let app = create_router(state);

    info!(
        "Detection service candidates: {}:{:?}",
        config.detector.host, config.detector.candidate_ports
    );
    info!("Starting TrapWatch web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_error_status_codes() {
        let (status, _) = trap_error(TrapError::UnknownTrap("attic".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = trap_error(TrapError::StatusNotInScheme {
            status: TrapStatus::Red,
            scheme: crate::models::TransitionScheme::Binary,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_relay_reply_passes_upstream_status() {
        let reply = relay_reply(Ok(RelayAnswer {
            port: 5001,
            http_status: 500,
            body: serde_json::json!({"status": "error", "error": "camera"}),
            attempts: Vec::new(),
        }));
        let (status, Json(body)) = reply.unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "camera");
    }

    #[test]
    fn test_relay_reply_unreachable() {
        let reply = relay_reply(Err(RelayError::ServiceUnreachable {
            ports: vec![5001, 5000],
            last_error: Some("port 5000: connection refused".into()),
        }));
        let (status, Json(body)) = reply.unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "error");
        assert_eq!(body.ports, vec![5001, 5000]);
    }
}
