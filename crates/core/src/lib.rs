//! Domain layer for the Keystone backend.
//!
//! Everything here is pure logic with no HTTP or database dependencies:
//! the error taxonomy, the request validation pipe, the message catalogue,
//! pagination helpers and the role/permission authorization gate.

pub mod authorization;
pub mod error;
pub mod messages;
pub mod pagination;
pub mod permissions;
pub mod roles;
pub mod types;
pub mod validation;
