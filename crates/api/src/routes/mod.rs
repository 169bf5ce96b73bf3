pub mod auth;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod users;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use keystone_core::messages::MessageService;

use crate::response::{ResponseConfig, ResponseFormatter};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                     signup (public)
/// /auth/login                      login (public)
/// /auth/refresh                    refresh (public)
/// /auth/logout                     logout (requires auth)
/// /auth/me                         profile (requires auth)
/// /auth/change-password            change password (requires auth)
///
/// /users                           list, create (user.read, user.create)
/// /users/{id}                      get, update, delete
/// /users/{id}/active               activate (user.update)
/// /users/{id}/inactive             deactivate (user.update)
///
/// /roles                           list, create (role.read, role.create)
/// /roles/{id}                      get, update, delete
/// /roles/{id}/active               activate (role.update)
/// /roles/{id}/inactive             deactivate (role.update)
///
/// /permissions                     list, create (permission.read, permission.create)
/// /permissions/{id}                get, update, delete
/// /permissions/{id}/active         activate (permission.update)
/// /permissions/{id}/inactive       deactivate (permission.update)
/// ```
///
/// Every route answers with the response envelope; the message key for
/// each is attached here.
pub fn api_routes(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(messages))
        .nest("/users", users::router(messages))
        .nest("/roles", roles::router(messages))
        .nest("/permissions", permissions::router(messages))
}

/// Formatter answering with `message_key` and the handler's status.
pub(crate) fn respond(messages: &Arc<MessageService>, message_key: &str) -> ResponseFormatter {
    ResponseFormatter::new(Arc::clone(messages), ResponseConfig::new(message_key))
}

/// Formatter answering with `message_key` and 201 Created.
pub(crate) fn respond_created(
    messages: &Arc<MessageService>,
    message_key: &str,
) -> ResponseFormatter {
    ResponseFormatter::new(
        Arc::clone(messages),
        ResponseConfig::new(message_key).with_status(StatusCode::CREATED),
    )
}
