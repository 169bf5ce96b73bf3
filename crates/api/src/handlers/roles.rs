//! Handlers for the `/roles` resource.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use keystone_core::error::CoreError;
use keystone_core::pagination::{ListQuery, Page};
use keystone_core::permissions::{RoleCreate, RoleDelete, RoleRead, RoleUpdate};
use keystone_core::types::DbId;
use keystone_core::validation::rules::NAME_MAX_LENGTH;
use keystone_core::validation::{FieldSpec, RequestSchema, RequestViolation, Schema};
use keystone_db::models::permission::Permission;
use keystone_db::models::role::{CreateRole, Role, RoleDetail, UpdateRole};
use keystone_db::repositories::{PermissionRepo, RoleRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::middleware::rbac::Authorized;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

fn role_name() -> FieldSpec {
    FieldSpec::string("name")
        .trim()
        .lowercase()
        .min_length(1)
        .max_length(NAME_MAX_LENGTH)
}

fn permission_ids() -> FieldSpec {
    FieldSpec::integer_array("permissionIds")
}

/// Request body for `POST /roles`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    pub permission_ids: Vec<DbId>,
}

impl RequestSchema for CreateRoleRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(role_name().required())
            .field(permission_ids().default_value(Vec::<DbId>::new()))
    }
}

/// Request body for `PUT /roles/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<DbId>>,
}

impl RequestSchema for UpdateRoleRequest {
    fn schema() -> Schema {
        Schema::new().field(role_name()).field(permission_ids())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/roles
pub async fn list_roles(
    State(state): State<AppState>,
    _auth: Authorized<RoleRead>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> AppResult<Json<Page<RoleDetail>>> {
    let page = query.into_page_request(&RoleRepo::SORTABLE)?;
    let (roles, total) = RoleRepo::list(&state.pool, &page).await?;

    let mut ids: Vec<DbId> = roles.iter().flat_map(|r| r.permission_ids.iter().copied()).collect();
    ids.sort_unstable();
    ids.dedup();
    let by_id: HashMap<DbId, Permission> = PermissionRepo::find_by_ids(&state.pool, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let page = Page::new(roles, total, &page).map(|role| {
        let permissions = role
            .permission_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        RoleDetail::new(role, permissions)
    });
    Ok(Json(page))
}

/// GET /api/v1/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    _auth: Authorized<RoleRead>,
    Path(id): Path<DbId>,
) -> AppResult<Json<RoleDetail>> {
    let role = find_role(&state, id).await?;
    Ok(Json(role_detail(&state, role).await?))
}

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<AppState>,
    auth: Authorized<RoleCreate>,
    ValidatedJson(input): ValidatedJson<CreateRoleRequest>,
) -> AppResult<Json<RoleDetail>> {
    ensure_name_unused(&state, None, &input.name).await?;
    let permission_ids = dedup(input.permission_ids);
    ensure_permissions_exist(&state, &permission_ids).await?;

    let role = RoleRepo::create(
        &state.pool,
        &CreateRole {
            name: input.name,
            permission_ids,
        },
    )
    .await?;

    tracing::info!(role_id = role.id, created_by = auth.user.id, "Role created");
    Ok(Json(role_detail(&state, role).await?))
}

/// PUT /api/v1/roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    _auth: Authorized<RoleUpdate>,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateRoleRequest>,
) -> AppResult<Json<RoleDetail>> {
    find_role(&state, id).await?;
    if let Some(name) = &input.name {
        ensure_name_unused(&state, Some(id), name).await?;
    }
    let permission_ids = input.permission_ids.map(dedup);
    if let Some(ids) = &permission_ids {
        ensure_permissions_exist(&state, ids).await?;
    }

    let role = RoleRepo::update(
        &state.pool,
        id,
        &UpdateRole {
            name: input.name,
            permission_ids,
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound { entity: "role", id }))?;

    Ok(Json(role_detail(&state, role).await?))
}

/// PATCH /api/v1/roles/{id}/active
pub async fn activate_role(
    State(state): State<AppState>,
    _auth: Authorized<RoleUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<RoleDetail>> {
    set_active(&state, id, true).await
}

/// PATCH /api/v1/roles/{id}/inactive
///
/// Users holding an inactive role fail every permission check.
pub async fn deactivate_role(
    State(state): State<AppState>,
    _auth: Authorized<RoleUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<RoleDetail>> {
    set_active(&state, id, false).await
}

/// DELETE /api/v1/roles/{id}
///
/// Blocked with 409 while any user holds the role.
pub async fn delete_role(
    State(state): State<AppState>,
    auth: Authorized<RoleDelete>,
    Path(id): Path<DbId>,
) -> AppResult<()> {
    find_role(&state, id).await?;
    if RoleRepo::is_assigned(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict("role.error.inUse".into())));
    }
    if !RoleRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "role", id }));
    }
    tracing::info!(role_id = id, deleted_by = auth.user.id, "Role deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_role(state: &AppState, id: DbId) -> AppResult<Role> {
    RoleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "role", id }))
}

async fn set_active(state: &AppState, id: DbId, is_active: bool) -> AppResult<Json<RoleDetail>> {
    let role = RoleRepo::set_active(&state.pool, id, is_active)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "role", id }))?;
    tracing::info!(role_id = id, is_active, "Role activation changed");
    Ok(Json(role_detail(state, role).await?))
}

async fn role_detail(state: &AppState, role: Role) -> AppResult<RoleDetail> {
    let permissions = PermissionRepo::find_by_ids(&state.pool, &role.permission_ids).await?;
    Ok(RoleDetail::new(role, permissions))
}

async fn ensure_name_unused(state: &AppState, role_id: Option<DbId>, name: &str) -> AppResult<()> {
    let existing = RoleRepo::find_by_name(&state.pool, name).await?;
    if existing.is_some_and(|r| Some(r.id) != role_id) {
        return Err(AppError::Core(CoreError::Conflict("role.error.exist".into())));
    }
    Ok(())
}

/// Reject references to permissions that do not exist.
async fn ensure_permissions_exist(state: &AppState, ids: &[DbId]) -> AppResult<()> {
    let missing = PermissionRepo::missing_ids(&state.pool, ids).await?;
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::Core(CoreError::Validation(vec![RequestViolation::new(
        "permissionIds",
        "exists",
    )
    .with_message_key("role.error.permissionNotFound")
    .with_param("values", missing)])))
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup(ids: Vec<DbId>) -> Vec<DbId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
