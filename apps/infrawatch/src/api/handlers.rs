//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers. Handlers
//! translate between wire types and the core, and own no decision logic.

use super::{
    AppState,
    types::{
        HealthResponse, MarkReadRequest, MarkReadResponse, ObservationRequest,
        ObservationResponse, SignalJson, SignalListResponse, StageHistoryPoint,
        StageHistoryResponse, StageResponse, StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use infrawatch_core::{InfrawatchError, MetricSnapshot};
use serde::Deserialize;

/// Upper bound on list sizes a single request may ask for.
const MAX_LIST_LIMIT: usize = 100;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get store status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = || -> Result<StatusResponse, InfrawatchError> {
        Ok(StatusResponse {
            observations: state.store.observation_count()?,
            stage_snapshots: state.store.stage_count()?,
            signals_total: state.store.signal_count()?,
            signals_unread: state.store.unread_count()?,
            latest_stage: state
                .store
                .latest_stage()?
                .map(|r| format!("{:?}", r.stage)),
        })
    };

    match status() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => storage_error(e),
    }
}

// =============================================================================
// STAGE HANDLERS
// =============================================================================

/// Classify the stored snapshot and append the result to the stage
/// history, then return it in full.
pub async fn stage_current_handler(State(state): State<AppState>) -> impl IntoResponse {
    let determine = || -> Result<StageResponse, InfrawatchError> {
        let snapshot = state.store.load_snapshot()?;
        let result = state.classifier.determine(&snapshot);
        state.store.append_stage(&result)?;
        Ok(StageResponse::from(&result))
    };

    match determine() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => storage_error(e),
    }
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// Get recent stage determinations, newest first.
pub async fn stage_history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(10).clamp(1, MAX_LIST_LIMIT);

    match state.store.stage_history(limit) {
        Ok(history) => {
            let points: Vec<StageHistoryPoint> =
                history.iter().map(StageHistoryPoint::from).collect();
            let total = points.len();
            (
                StatusCode::OK,
                Json(StageHistoryResponse {
                    history: points,
                    total,
                }),
            )
                .into_response()
        }
        Err(e) => storage_error(e),
    }
}

/// Classify a posted snapshot without persisting anything.
pub async fn classify_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<MetricSnapshot>,
) -> impl IntoResponse {
    let result = state.classifier.determine(&snapshot);
    (StatusCode::OK, Json(StageResponse::from(&result)))
}

// =============================================================================
// OBSERVATION HANDLER
// =============================================================================

/// Ingest a metric observation and run its detector against the value
/// it replaced.
pub async fn observations_handler(
    State(state): State<AppState>,
    Json(request): Json<ObservationRequest>,
) -> impl IntoResponse {
    let input = match request.to_input() {
        Ok(input) => input,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ObservationResponse::error(format!(
                    "Invalid observation: {}",
                    e
                ))),
            )
                .into_response();
        }
    };

    match crate::pipeline::process_observation(&state.store, &state.detector, &input) {
        Ok(outcome) => {
            let signal = outcome
                .signal
                .as_ref()
                .map(|(id, signal)| SignalJson::from_stored(*id, signal));
            (
                StatusCode::OK,
                Json(ObservationResponse::stored(outcome.previous_value, signal)),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ObservationResponse::error(format!("Ingest failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// SIGNAL HANDLERS
// =============================================================================

/// Query parameters for the signal list.
#[derive(Debug, Deserialize)]
pub struct SignalParams {
    pub limit: Option<usize>,
    #[serde(default)]
    pub unread_only: bool,
}

/// List stored signals, newest first.
pub async fn signals_handler(
    State(state): State<AppState>,
    Query(params): Query<SignalParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).clamp(1, MAX_LIST_LIMIT);

    let list = || -> Result<SignalListResponse, InfrawatchError> {
        let signals: Vec<SignalJson> = state
            .store
            .signals(limit, params.unread_only)?
            .iter()
            .map(|(id, signal)| SignalJson::from_stored(*id, signal))
            .collect();
        Ok(SignalListResponse {
            total: signals.len(),
            unread: state.store.unread_count()?,
            signals,
        })
    };

    match list() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => storage_error(e),
    }
}

/// Acknowledge a signal.
pub async fn mark_read_handler(
    State(state): State<AppState>,
    Json(request): Json<MarkReadRequest>,
) -> impl IntoResponse {
    match state.store.mark_read(request.id) {
        Ok(()) => (StatusCode::OK, Json(MarkReadResponse::success())).into_response(),
        Err(e @ InfrawatchError::SignalNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(MarkReadResponse::error(e.to_string())),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MarkReadResponse::error(e.to_string())),
        )
            .into_response(),
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Uniform 500 for storage failures.
fn storage_error(e: InfrawatchError) -> axum::response::Response {
    tracing::error!("Storage error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}
