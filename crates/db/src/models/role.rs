//! Role entity model and DTOs.

use keystone_core::authorization::RoleGrant;
use keystone_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::permission::Permission;

/// A row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: DbId,
    /// Trimmed, lowercase, unique.
    pub name: String,
    pub is_active: bool,
    /// Ordered references into `permissions`.
    pub permission_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A role with its permission references resolved, for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub permissions: Vec<Permission>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RoleDetail {
    pub fn new(role: Role, permissions: Vec<Permission>) -> Self {
        Self {
            id: role.id,
            name: role.name,
            is_active: role.is_active,
            permissions,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// Role name plus the codes of its active permissions, as loaded for the
/// authorization gate.
#[derive(Debug, Clone, FromRow)]
pub struct RoleGrantRow {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub permissions: Vec<String>,
}

impl From<RoleGrantRow> for RoleGrant {
    fn from(row: RoleGrantRow) -> Self {
        RoleGrant {
            role_id: row.id,
            name: row.name,
            is_active: row.is_active,
            permissions: row.permissions.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
pub struct CreateRole {
    pub name: String,
    pub permission_ids: Vec<DbId>,
}

#[derive(Debug)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<DbId>>,
}
