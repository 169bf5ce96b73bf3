//! Role/permission authorization gate.
//!
//! The decision is a pure lookup: a caller is allowed an operation iff their
//! role is active and the operation's permission code is in the role's
//! expanded permission set. Expanding the set (and dropping inactive
//! permissions) is the database layer's job.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// Message key for callers whose role cannot be resolved.
pub const ROLE_UNRESOLVED_KEY: &str = "auth.error.roleUnresolved";
/// Message key for callers whose role is inactive.
pub const ROLE_INACTIVE_KEY: &str = "role.error.inactive";
/// Message key for callers lacking the required permission.
pub const PERMISSION_DENIED_KEY: &str = "permission.error.denied";

/// A role with its permission references expanded to permission codes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
    pub role_id: DbId,
    pub name: String,
    pub is_active: bool,
    pub permissions: BTreeSet<String>,
}

impl RoleGrant {
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }
}

/// `true` iff the role is active and grants `permission`.
pub fn allow(role: &RoleGrant, permission: &str) -> bool {
    role.is_active && role.has_permission(permission)
}

/// Gate an operation requiring `permission`.
///
/// - no role → [`CoreError::Unauthorized`] (401)
/// - inactive role or missing permission → [`CoreError::Forbidden`] (403)
pub fn authorize(role: Option<&RoleGrant>, permission: &str) -> Result<(), CoreError> {
    let role = role.ok_or_else(|| CoreError::Unauthorized(ROLE_UNRESOLVED_KEY.into()))?;

    if !role.is_active {
        return Err(CoreError::Forbidden(ROLE_INACTIVE_KEY.into()));
    }
    if !role.has_permission(permission) {
        return Err(CoreError::Forbidden(PERMISSION_DENIED_KEY.into()));
    }
    Ok(())
}
