//! Route definitions for the `/users` resource.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use keystone_core::messages::MessageService;

use super::{respond, respond_created};
use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`. Each handler checks its own `user.*` permission.
///
/// ```text
/// GET    /                -> list_users
/// POST   /                -> create_user
/// GET    /{id}            -> get_user
/// PUT    /{id}            -> update_user
/// DELETE /{id}            -> delete_user
/// PATCH  /{id}/active     -> activate_user
/// PATCH  /{id}/inactive   -> deactivate_user
/// ```
pub fn router(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            respond(messages, "user.list")
                .apply(get(users::list_users))
                .merge(respond_created(messages, "user.create").apply(post(users::create_user))),
        )
        .route(
            "/{id}",
            respond(messages, "user.get")
                .apply(get(users::get_user))
                .merge(respond(messages, "user.update").apply(put(users::update_user)))
                .merge(respond(messages, "user.delete").apply(delete(users::delete_user))),
        )
        .route(
            "/{id}/active",
            respond(messages, "user.active").apply(patch(users::activate_user)),
        )
        .route(
            "/{id}/inactive",
            respond(messages, "user.inactive").apply(patch(users::deactivate_user)),
        )
}
