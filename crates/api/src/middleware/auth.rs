//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use keystone_core::error::CoreError;
use keystone_core::types::DbId;

use crate::auth::jwt::decode_access_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// Only proves the token is valid. Use [`super::rbac::CurrentUser`] or
/// [`super::rbac::Authorized`] when the account's current state matters.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User id from the token subject.
    pub user_id: DbId,
    /// Role id at token issue time.
    pub role_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("auth.error.missingToken"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("auth.error.tokenFormat"))?;

        let claims = decode_access_token(token, &state.config.tokens).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            unauthorized("auth.error.tokenInvalid")
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role_id: claims.role_id,
        })
    }
}

fn unauthorized(key: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(key.into()))
}
