//! Request validation.
//!
//! - [`schema`] -- field descriptors and the pure evaluator.
//! - [`pipe`] -- the typed pipe turning raw payloads into request structs.
//! - [`rules`] -- field builders shared across request types.
//! - [`violation`] -- raw constraint violations and their translated form.

pub mod pipe;
pub mod rules;
pub mod schema;
pub mod violation;

pub use pipe::{validation_pipe, RequestSchema, ValidationPipe, Validator};
pub use schema::{FieldKind, FieldSpec, Rule, Schema};
pub use violation::{FieldError, RequestViolation};
