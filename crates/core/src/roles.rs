//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000005_seed_roles.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Role assigned to accounts created through public signup.
pub const DEFAULT_SIGNUP_ROLE: &str = ROLE_USER;
