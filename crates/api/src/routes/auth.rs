//! Route definitions for the `/auth` resource.

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use keystone_core::messages::MessageService;

use super::{respond, respond_created};
use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST  /signup           -> signup
/// POST  /login            -> login
/// POST  /refresh          -> refresh
/// POST  /logout           -> logout (requires auth)
/// GET   /me               -> me (requires auth)
/// PATCH /change-password  -> change_password (requires auth)
/// ```
pub fn router(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new()
        .route(
            "/signup",
            respond_created(messages, "auth.signup").apply(post(auth::signup)),
        )
        .route("/login", respond(messages, "auth.login").apply(post(auth::login)))
        .route(
            "/refresh",
            respond(messages, "auth.refresh").apply(post(auth::refresh)),
        )
        .route("/logout", respond(messages, "auth.logout").apply(post(auth::logout)))
        .route("/me", respond(messages, "auth.me").apply(get(auth::me)))
        .route(
            "/change-password",
            respond(messages, "auth.changePassword").apply(patch(auth::change_password)),
        )
}
