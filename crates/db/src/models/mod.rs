//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the table,
//! a create DTO for inserts and, where rows are editable, an update DTO
//! whose `None` fields are left unchanged.

pub mod permission;
pub mod role;
pub mod session;
pub mod user;
