//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::CurrentUser`] -- Loads the authenticated user's row and rejects inactive accounts.
//! - [`rbac::Authorized`] -- Requires the caller's role to grant a permission.

pub mod auth;
pub mod rbac;
