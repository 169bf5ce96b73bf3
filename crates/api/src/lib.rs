//! Keystone API server library.
//!
//! Exposes the building blocks (config, state, the request/response pipeline,
//! routes) so integration tests and the binary entrypoint can both access
//! them.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod handlers;
pub mod language;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
