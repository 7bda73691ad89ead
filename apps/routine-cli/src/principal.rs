//! Caller identity from the `X-User-Id` header
//!
//! Token issuance lives in front of this service; by the time a request
//! arrives the header names an existing user, or the request is rejected.

use crate::api_error::ApiError;
use crate::server::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use routine_common::PRINCIPAL_HEADER;
use routine_core::Principal;
use uuid::Uuid;

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Malformed X-User-Id header".to_string()))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::Unauthorized("Malformed X-User-Id header".to_string()))?;

        if !state.db.user_exists(user_id).await? {
            return Err(ApiError::Unauthorized("Unknown user".to_string()));
        }
        Ok(AuthUser(Principal::new(user_id)))
    }
}
