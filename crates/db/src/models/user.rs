//! User entity model and DTOs.

use keystone_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub mobile_number: Option<String>,
    pub password_hash: String,
    pub role_id: DbId,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// `true` while a lockout from repeated failed logins is in effect.
    pub fn is_locked(&self, now: Timestamp) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Role reference embedded in [`UserResponse`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub id: DbId,
    pub name: String,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: DbId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub mobile_number: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserResponse {
    pub fn new(user: User, role_name: String) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            mobile_number: user.mobile_number,
            role: UserRole {
                id: user.role_id,
                name: role_name,
            },
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: Option<String>,
    /// Already lowercased.
    pub email: String,
    pub mobile_number: Option<String>,
    pub password_hash: String,
    pub role_id: DbId,
}

/// Profile fields an admin may change. Email and password have their own flows.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile_number: Option<String>,
    pub role_id: Option<DbId>,
}
