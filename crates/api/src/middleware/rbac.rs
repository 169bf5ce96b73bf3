//! Role/permission access control extractors.
//!
//! Each extractor builds on [`AuthUser`] and re-reads the caller's user and
//! role rows, so deactivations and permission changes apply to tokens that
//! are already issued.

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use keystone_core::authorization::{authorize, RoleGrant, ROLE_UNRESOLVED_KEY};
use keystone_core::error::CoreError;
use keystone_core::permissions::Permission;
use keystone_db::models::user::User;
use keystone_db::repositories::{RoleRepo, UserRepo};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller's current user row. Rejects with 401 when the
/// user no longer exists and 403 when the account is inactive.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let user = UserRepo::find_by_id(&state.pool, auth.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("auth.error.tokenInvalid".into()))
            })?;

        if !user.is_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "user.error.inactive".into(),
            )));
        }
        Ok(CurrentUser(user))
    }
}

/// Requires the caller's role to grant `P`.
///
/// ```ignore
/// async fn list_users(auth: Authorized<UserRead>) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user.id, "listing users");
///     Ok(Json(()))
/// }
/// ```
pub struct Authorized<P: Permission> {
    pub user: User,
    pub role: RoleGrant,
    _permission: PhantomData<fn() -> P>,
}

impl<P: Permission> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let grant = RoleRepo::find_grant(&state.pool, user.role_id).await?;

        if let Err(e) = authorize(grant.as_ref(), P::CODE) {
            tracing::info!(
                user_id = user.id,
                role_id = user.role_id,
                permission = P::CODE,
                "Permission denied"
            );
            return Err(e.into());
        }

        // `authorize` only succeeds with a resolved role.
        let role = grant
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized(ROLE_UNRESOLVED_KEY.into())))?;

        Ok(Self {
            user,
            role,
            _permission: PhantomData,
        })
    }
}
