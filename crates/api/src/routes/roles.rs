//! Route definitions for the `/roles` resource.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use keystone_core::messages::MessageService;

use super::{respond, respond_created};
use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/roles`. Each handler checks its own `role.*` permission.
///
/// ```text
/// GET    /                -> list_roles
/// POST   /                -> create_role
/// GET    /{id}            -> get_role
/// PUT    /{id}            -> update_role
/// DELETE /{id}            -> delete_role
/// PATCH  /{id}/active     -> activate_role
/// PATCH  /{id}/inactive   -> deactivate_role
/// ```
pub fn router(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            respond(messages, "role.list")
                .apply(get(roles::list_roles))
                .merge(respond_created(messages, "role.create").apply(post(roles::create_role))),
        )
        .route(
            "/{id}",
            respond(messages, "role.get")
                .apply(get(roles::get_role))
                .merge(respond(messages, "role.update").apply(put(roles::update_role)))
                .merge(respond(messages, "role.delete").apply(delete(roles::delete_role))),
        )
        .route(
            "/{id}/active",
            respond(messages, "role.active").apply(patch(roles::activate_role)),
        )
        .route(
            "/{id}/inactive",
            respond(messages, "role.inactive").apply(patch(roles::deactivate_role)),
        )
}
