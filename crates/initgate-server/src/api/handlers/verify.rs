//! Init-data verification handler
//!
//! Verifies a blob passed in the request body and returns the principal.
//! The blob is consumed: a second call with the same blob is rejected.

use axum::{extract::State, Json};
use initgate_core::Principal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::core::Verifier;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// The verifier, holding secret, freshness policy and replay guard
    pub verifier: Verifier,
}

/// Request to verify init data
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Raw init-data string exactly as the client received it
    pub init_data: String,
}

/// Response from a successful verification
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Always true; failures are error responses
    pub verified: bool,

    /// The verified principal
    pub principal: Principal,
}

/// Verify init data
///
/// POST /v1/auth/verify
pub async fn verify_init_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    if request.init_data.is_empty() {
        return Err(ApiError::BadRequest("init_data cannot be empty".into()));
    }

    let principal = state.verifier.verify(&request.init_data).await?;

    Ok(Json(VerifyResponse {
        verified: true,
        principal,
    }))
}
