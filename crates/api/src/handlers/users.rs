//! Handlers for the `/users` resource.
//!
//! Every handler is gated by the matching `user.*` permission through
//! [`Authorized`].

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use keystone_core::error::CoreError;
use keystone_core::pagination::{ListQuery, Page};
use keystone_core::permissions::{UserCreate, UserDelete, UserRead, UserUpdate};
use keystone_core::types::DbId;
use keystone_core::validation::{rules, FieldSpec, RequestSchema, RequestViolation, Schema};
use keystone_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use keystone_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::Deserialize;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::middleware::rbac::Authorized;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub mobile_number: Option<String>,
    pub password: String,
    pub role_id: DbId,
}

impl RequestSchema for CreateUserRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(rules::person_name("firstName").required())
            .field(rules::person_name("lastName"))
            .field(rules::email("email").required())
            .field(rules::mobile_number("mobileNumber"))
            .field(rules::password("password"))
            .field(FieldSpec::integer("roleId").required().min(1.0))
    }
}

/// Request body for `PUT /users/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile_number: Option<String>,
    pub role_id: Option<DbId>,
}

impl RequestSchema for UpdateUserRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(rules::person_name("firstName"))
            .field(rules::person_name("lastName"))
            .field(rules::mobile_number("mobileNumber"))
            .field(FieldSpec::integer("roleId").min(1.0))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    _auth: Authorized<UserRead>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> AppResult<Json<Page<UserResponse>>> {
    let page = query.into_page_request(&UserRepo::SORTABLE)?;
    let (users, total) = UserRepo::list(&state.pool, &page).await?;
    let names = role_names(&state).await?;

    let page = Page::new(users, total, &page).map(|user| {
        let role_name = names.get(&user.role_id).cloned().unwrap_or_default();
        UserResponse::new(user, role_name)
    });
    Ok(Json(page))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: Authorized<UserRead>,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = find_user(&state, id).await?;
    Ok(Json(user_to_response(&state, user).await?))
}

/// POST /api/v1/users
///
/// Create a user with an explicit role. Email and mobile number must be
/// unused; the role must exist.
pub async fn create_user(
    State(state): State<AppState>,
    auth: Authorized<UserCreate>,
    ValidatedJson(input): ValidatedJson<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    ensure_role_exists(&state, input.role_id).await?;
    ensure_contact_unused(&state, None, Some(&input.email), input.mobile_number.as_deref())
        .await?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            mobile_number: input.mobile_number,
            password_hash,
            role_id: input.role_id,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = auth.user.id, "User created");
    Ok(Json(user_to_response(&state, user).await?))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    _auth: Authorized<UserUpdate>,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    find_user(&state, id).await?;
    if let Some(role_id) = input.role_id {
        ensure_role_exists(&state, role_id).await?;
    }
    ensure_contact_unused(&state, Some(id), None, input.mobile_number.as_deref()).await?;

    let update = UpdateUser {
        first_name: input.first_name,
        last_name: input.last_name,
        mobile_number: input.mobile_number,
        role_id: input.role_id,
    };
    let user = UserRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "user", id }))?;

    Ok(Json(user_to_response(&state, user).await?))
}

/// PATCH /api/v1/users/{id}/active
pub async fn activate_user(
    State(state): State<AppState>,
    _auth: Authorized<UserUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    set_active(&state, id, true).await
}

/// PATCH /api/v1/users/{id}/inactive
///
/// Also revokes the user's sessions so refresh tokens stop working.
pub async fn deactivate_user(
    State(state): State<AppState>,
    _auth: Authorized<UserUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let response = set_active(&state, id, false).await?;
    let revoked = SessionRepo::revoke_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, revoked, "User deactivated");
    Ok(response)
}

/// DELETE /api/v1/users/{id}
///
/// Callers cannot delete their own account.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: Authorized<UserDelete>,
    Path(id): Path<DbId>,
) -> AppResult<()> {
    if auth.user.id == id {
        return Err(AppError::BadRequest("user.error.deleteSelf".into()));
    }
    if !UserRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "user", id }));
    }
    tracing::info!(user_id = id, deleted_by = auth.user.id, "User deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "user", id }))
}

async fn set_active(state: &AppState, id: DbId, is_active: bool) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::set_active(&state.pool, id, is_active)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "user", id }))?;
    Ok(Json(user_to_response(state, user).await?))
}

/// Role id to role name for every role.
async fn role_names(state: &AppState) -> AppResult<HashMap<DbId, String>> {
    let roles = RoleRepo::list_all(&state.pool).await?;
    Ok(roles.into_iter().map(|r| (r.id, r.name)).collect())
}

/// Resolve the user's role name and build the response.
pub(crate) async fn user_to_response(state: &AppState, user: User) -> AppResult<UserResponse> {
    let role_name = RoleRepo::find_by_id(&state.pool, user.role_id)
        .await?
        .map(|role| role.name)
        .unwrap_or_default();
    Ok(UserResponse::new(user, role_name))
}

async fn ensure_role_exists(state: &AppState, role_id: DbId) -> AppResult<()> {
    if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
        return Err(AppError::Core(CoreError::Validation(vec![RequestViolation::new(
            "roleId", "exists",
        )
        .with_message_key("user.error.roleNotFound")
        .with_value(role_id.into())])));
    }
    Ok(())
}

/// Reject an email or mobile number already held by another user.
///
/// The unique constraints still catch races; this gives the common case a
/// specific message before any work is done.
pub(crate) async fn ensure_contact_unused(
    state: &AppState,
    user_id: Option<DbId>,
    email: Option<&str>,
    mobile_number: Option<&str>,
) -> AppResult<()> {
    let is_other = |found: Option<User>| found.is_some_and(|u| Some(u.id) != user_id);

    if let Some(email) = email {
        if is_other(UserRepo::find_by_email(&state.pool, email).await?) {
            return Err(AppError::Core(CoreError::Conflict("user.error.emailExist".into())));
        }
    }
    if let Some(mobile_number) = mobile_number {
        if is_other(UserRepo::find_by_mobile_number(&state.pool, mobile_number).await?) {
            return Err(AppError::Core(CoreError::Conflict(
                "user.error.mobileNumberExist".into(),
            )));
        }
    }
    Ok(())
}
