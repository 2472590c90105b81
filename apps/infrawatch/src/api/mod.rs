//! # Infrawatch HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Store counts and latest stage
//! - `GET /stage/current` - Classify the stored snapshot (persisted)
//! - `GET /stage/history` - Recent stage determinations
//! - `POST /classify` - Classify a posted snapshot (not persisted)
//! - `POST /observations` - Ingest an observation, run its detector
//! - `GET /signals` - List signals
//! - `POST /signals/read` - Acknowledge a signal
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `INFRAWATCH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `INFRAWATCH_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `INFRAWATCH_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `infrawatch::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    classify_handler, health_handler, mark_read_handler, observations_handler, signals_handler,
    stage_current_handler, stage_history_handler, status_handler,
};
#[allow(unused_imports)]
pub use types::{
    HealthResponse, MarkReadRequest, MarkReadResponse, ObservationRequest, ObservationResponse,
    SignalJson, SignalListResponse, StageHistoryResponse, StageResponse, StatusResponse,
    TransitionRiskJson,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use infrawatch_core::{InfrawatchError, MetricStore, SignalDetector, StageClassifier};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the store plus the configured evaluators.
///
/// The evaluators are pure, so sharing them is only a convenience for
/// carrying threshold overrides; the store serializes its own writes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricStore>,
    pub classifier: Arc<StageClassifier>,
    pub detector: Arc<SignalDetector>,
}

impl AppState {
    /// Create app state with default-threshold evaluators.
    #[must_use]
    pub fn new(store: MetricStore) -> Self {
        Self::with_evaluators(store, StageClassifier::new(), SignalDetector::new())
    }

    /// Create app state with explicitly configured evaluators.
    #[must_use]
    pub fn with_evaluators(
        store: MetricStore,
        classifier: StageClassifier,
        detector: SignalDetector,
    ) -> Self {
        Self {
            store: Arc::new(store),
            classifier: Arc::new(classifier),
            detector: Arc::new(detector),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `INFRAWATCH_CORS_ORIGINS`:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("INFRAWATCH_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (INFRAWATCH_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in INFRAWATCH_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No INFRAWATCH_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set INFRAWATCH_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/stage/current", get(handlers::stage_current_handler))
        .route("/stage/history", get(handlers::stage_history_handler))
        .route("/classify", post(handlers::classify_handler))
        .route("/observations", post(handlers::observations_handler))
        .route("/signals", get(handlers::signals_handler))
        .route("/signals/read", post(handlers::mark_read_handler));

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(256 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), InfrawatchError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| InfrawatchError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Infrawatch HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| InfrawatchError::IoError(format!("Server error: {}", e)))
}
