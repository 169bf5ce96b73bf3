//! Route definitions for the `/permissions` resource.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use keystone_core::messages::MessageService;

use super::{respond, respond_created};
use crate::handlers::permissions;
use crate::state::AppState;

/// Routes mounted at `/permissions`. Each handler checks its own `permission.*` permission.
///
/// ```text
/// GET    /                -> list_permissions
/// POST   /                -> create_permission
/// GET    /{id}            -> get_permission
/// PUT    /{id}            -> update_permission
/// DELETE /{id}            -> delete_permission
/// PATCH  /{id}/active     -> activate_permission
/// PATCH  /{id}/inactive   -> deactivate_permission
/// ```
pub fn router(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            respond(messages, "permission.list")
                .apply(get(permissions::list_permissions))
                .merge(
                    respond_created(messages, "permission.create")
                        .apply(post(permissions::create_permission)),
                ),
        )
        .route(
            "/{id}",
            respond(messages, "permission.get")
                .apply(get(permissions::get_permission))
                .merge(
                    respond(messages, "permission.update")
                        .apply(put(permissions::update_permission)),
                )
                .merge(
                    respond(messages, "permission.delete")
                        .apply(delete(permissions::delete_permission)),
                ),
        )
        .route(
            "/{id}/active",
            respond(messages, "permission.active").apply(patch(permissions::activate_permission)),
        )
        .route(
            "/{id}/inactive",
            respond(messages, "permission.inactive")
                .apply(patch(permissions::deactivate_permission)),
        )
}
