//! API module for the verification gate

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub replay_backend: String,
    pub max_age_secs: u64,
    pub max_future_skew_secs: u64,
    pub secret_fingerprint: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
///
/// Reports 503 while the replay store is unreachable, since every
/// verification would fail closed until it returns.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    let verifier = &state.verifier;
    let store = verifier.guard().store();

    let ready = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(backend = store.backend(), error = %e, "Replay store not reachable");
            false
        }
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let freshness = verifier.freshness();
    (
        status,
        Json(ReadyResponse {
            ready,
            replay_backend: store.backend().to_string(),
            max_age_secs: freshness.max_age_secs,
            max_future_skew_secs: freshness.max_future_skew_secs,
            secret_fingerprint: verifier.secret_fingerprint(),
        }),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Mini apps call from arbitrary webview origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Verification endpoints
        .route("/v1/auth/verify", post(handlers::verify_init_data))
        .route("/v1/auth/me", get(handlers::me))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
