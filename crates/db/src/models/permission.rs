//! Permission entity model and DTOs.

use keystone_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: DbId,
    /// Dotted lowercase code, e.g. `user.read`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreatePermission {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct UpdatePermission {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}
