//! Handlers for the `/auth` resource (signup, login, refresh, logout,
//! profile and password change).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use keystone_core::error::CoreError;
use keystone_core::roles::DEFAULT_SIGNUP_ROLE;
use keystone_core::validation::{rules, FieldSpec, RequestSchema, Schema};
use keystone_db::models::session::NewSession;
use keystone_db::models::user::{CreateUser, User, UserResponse};
use keystone_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{hash_refresh_token, issue_access_token, RefreshToken};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::handlers::users::{ensure_contact_unused, user_to_response};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::CurrentUser;
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

const CREDENTIALS_INVALID_KEY: &str = "auth.error.credentialsInvalid";
const REFRESH_INVALID_KEY: &str = "auth.error.refreshTokenInvalid";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub mobile_number: Option<String>,
    pub password: String,
}

impl RequestSchema for SignupRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(rules::person_name("firstName").required())
            .field(rules::person_name("lastName"))
            .field(rules::email("email").required())
            .field(rules::mobile_number("mobileNumber"))
            .field(rules::password("password"))
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl RequestSchema for LoginRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(rules::email("email").required())
            .field(FieldSpec::string("password").required().secret())
    }
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RequestSchema for RefreshRequest {
    fn schema() -> Schema {
        Schema::new().field(FieldSpec::string("refreshToken").required().trim().secret())
    }
}

/// Request body for `PATCH /auth/change-password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl RequestSchema for ChangePasswordRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::string("oldPassword").required().secret())
            .field(rules::password("newPassword"))
            .cross_field("newPassword", "notSameAs", |fields| {
                fields.get("newPassword") != fields.get("oldPassword")
            })
    }
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// The caller's profile plus the permission codes their role grants.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub permissions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signup
///
/// Register a new account with the default signup role.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SignupRequest>,
) -> AppResult<Json<UserResponse>> {
    ensure_contact_unused(&state, None, Some(&input.email), input.mobile_number.as_deref())
        .await?;

    let role = RoleRepo::find_by_name(&state.pool, DEFAULT_SIGNUP_ROLE)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!("Signup role '{DEFAULT_SIGNUP_ROLE}' is not seeded"))
        })?;

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
            role_id: role.id,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User signed up");
    Ok(Json(UserResponse::new(user, role.name)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find user by email.
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| unauthorized(CREDENTIALS_INVALID_KEY))?;

    // 2. Check if the account is active.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden("user.error.inactive".into())));
    }

    // 3. Check if the account is temporarily locked.
    if user.is_locked(Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "auth.error.accountLocked".into(),
        )));
    }

    // 4. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 5. On failure: increment counter, lock if threshold reached.
        let failed = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failed >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, %lock_until, "Account locked after failed logins");
        }
        return Err(unauthorized(CREDENTIALS_INVALID_KEY));
    }

    // 6. On success: reset failed count, set last_login_at.
    UserRepo::record_successful_login(&state.pool, user.id).await?;

    // 7. Generate tokens and create session.
    let response = create_auth_response(&state, user, user_agent(&headers)).await?;
    tracing::info!(user_id = response.user.id, "User logged in");

    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens. The
/// presented token is spent either way.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::redeem(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| unauthorized(REFRESH_INVALID_KEY))?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| unauthorized(REFRESH_INVALID_KEY))?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden("user.error.inactive".into())));
    }

    let response = create_auth_response(&state, user, user_agent(&headers)).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions for the authenticated user.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<()> {
    let revoked = SessionRepo::revoke_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");
    Ok(())
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let permissions = RoleRepo::find_grant(&state.pool, user.role_id)
        .await?
        .filter(|grant| grant.is_active)
        .map(|grant| grant.permissions.into_iter().collect())
        .unwrap_or_default();

    Ok(Json(MeResponse {
        user: user_to_response(&state, user).await?,
        permissions,
    }))
}

/// PATCH /api/v1/auth/change-password
///
/// Requires the current password. Revokes every session, so other devices
/// must log in again.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<()> {
    let matches = verify_password(&input.old_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !matches {
        return Err(AppError::BadRequest("auth.error.passwordNotMatch".into()));
    }

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    SessionRepo::revoke_for_user(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, "Password changed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unauthorized(key: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(key.into()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(
    state: &AppState,
    user: User,
    user_agent: Option<String>,
) -> AppResult<AuthResponse> {
    let access = issue_access_token(user.id, user.role_id, &state.config.tokens)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let refresh = RefreshToken::generate();
    let expires_at = Utc::now() + chrono::Duration::days(state.config.tokens.refresh_ttl_days);

    SessionRepo::issue(
        &state.pool,
        &NewSession {
            user_id: user.id,
            refresh_token_hash: refresh.hash,
            expires_at,
            user_agent,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token: access.token,
        refresh_token: refresh.plaintext,
        expires_in: access.expires_in,
        user: user_to_response(state, user).await?,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use keystone_core::validation::{validation_pipe, Validator};
    use serde_json::json;

    use super::*;

    #[test]
    fn new_password_must_differ() {
        let result = validation_pipe::<ChangePasswordRequest>().transform(json!({
            "oldPassword": "correct1horse",
            "newPassword": "correct1horse",
        }));
        assert_matches!(result, Err(CoreError::Validation(v)) => {
            assert_eq!(v.len(), 1);
            assert_eq!(v[0].field, "newPassword");
            assert_eq!(v[0].message_key, "request.notSameAs");
        });
    }

    #[test]
    fn weak_new_password_skips_cross_field_rule() {
        let result = validation_pipe::<ChangePasswordRequest>().transform(json!({
            "oldPassword": "password",
            "newPassword": "password",
        }));
        assert_matches!(result, Err(CoreError::Validation(v)) => {
            let constraints: Vec<_> = v.iter().map(|x| x.constraint.as_str()).collect();
            assert_eq!(constraints, vec!["isStrongPassword"]);
        });
    }

    #[test]
    fn login_lowercases_email() {
        let request = validation_pipe::<LoginRequest>()
            .transform(json!({ "email": "Admin@Example.com", "password": "x" }))
            .expect("payload is valid");
        assert_eq!(request.email, "admin@example.com");
    }

    #[test]
    fn me_response_flattens_user() {
        let now = Utc::now();
        let user = User {
            id: 4,
            first_name: "Grace".into(),
            last_name: Some("Hopper".into()),
            email: "grace@example.com".into(),
            mobile_number: None,
            password_hash: "$argon2id$secret".into(),
            role_id: 2,
            is_active: true,
            last_login_at: None,
            failed_login_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_value(MeResponse {
            user: UserResponse::new(user, "user".into()),
            permissions: vec!["user.read".into()],
        })
        .unwrap();

        assert_eq!(body["firstName"], "Grace");
        assert_eq!(body["role"], json!({ "id": 2, "name": "user" }));
        assert_eq!(body["permissions"], json!(["user.read"]));
        assert!(body.get("passwordHash").is_none());
    }
}
