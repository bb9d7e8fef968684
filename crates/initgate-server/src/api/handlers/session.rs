//! Verified-user extractor
//!
//! Handlers that need an authenticated user take a [`VerifiedUser`]
//! argument. The extractor reads init data from
//! `Authorization: tma <init data>` (or the `X-Init-Data` header) and runs
//! the full verification before the handler body executes.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    Json,
};
use initgate_core::{Principal, UserProfile};
use serde::Serialize;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::handlers::verify::AppState;

/// Authorization scheme for init data
pub const TMA_SCHEME: &str = "tma";

/// Fallback header carrying raw init data
pub const INIT_DATA_HEADER: &str = "x-init-data";

/// A principal verified for this request
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub Principal);

impl FromRequestParts<Arc<AppState>> for VerifiedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = init_data_from_headers(&parts.headers)?;
        let principal = state.verifier.verify(raw).await?;
        Ok(VerifiedUser(principal))
    }
}

/// Pull raw init data out of request headers
fn init_data_from_headers(headers: &HeaderMap) -> Result<&str, ApiError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Authorization header is not ASCII".into()))?;

        let (scheme, credentials) = value
            .split_once(' ')
            .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".into()))?;

        if !scheme.eq_ignore_ascii_case(TMA_SCHEME) {
            return Err(ApiError::Unauthorized(format!(
                "Unsupported authorization scheme, expected '{}'",
                TMA_SCHEME
            )));
        }

        return Ok(credentials.trim());
    }

    if let Some(value) = headers.get(INIT_DATA_HEADER) {
        return value
            .to_str()
            .map_err(|_| ApiError::BadRequest("X-Init-Data header is not ASCII".into()));
    }

    Err(ApiError::Unauthorized("No init data supplied".into()))
}

/// Response describing the verified caller
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub user: UserProfile,
    pub auth_date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_param: Option<String>,
}

/// Describe the verified caller
///
/// GET /v1/auth/me
pub async fn me(
    State(_state): State<Arc<AppState>>,
    VerifiedUser(principal): VerifiedUser,
) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: principal.user_id,
        user: principal.user,
        auth_date: principal.auth_date,
        start_param: principal.start_param,
    })
}
