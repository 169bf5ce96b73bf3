//! Refresh-token sessions.

use keystone_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One issued refresh token. Rotation spends the row; logout and password
/// changes spend every row of the user.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. `refresh_token_hash` is the SHA-256 hex digest of the token.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
}
