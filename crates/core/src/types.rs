//! Scalar aliases shared by every keystone crate.

/// Row identifier for users, roles, permissions and sessions (`BIGSERIAL`).
pub type DbId = i64;

/// Stored and serialized in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
