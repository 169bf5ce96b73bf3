//! Handlers for the `/permissions` resource.

use axum::extract::{Path, State};
use axum::Json;
use keystone_core::error::CoreError;
use keystone_core::pagination::{ListQuery, Page};
use keystone_core::permissions::{
    PermissionCreate, PermissionDelete, PermissionRead, PermissionUpdate,
};
use keystone_core::types::DbId;
use keystone_core::validation::rules::{NAME_MAX_LENGTH, PERMISSION_CODE_RE};
use keystone_core::validation::{FieldSpec, RequestSchema, Schema};
use keystone_db::models::permission::{CreatePermission, Permission, UpdatePermission};
use keystone_db::repositories::PermissionRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::middleware::rbac::Authorized;
use crate::state::AppState;

const DESCRIPTION_MAX_LENGTH: usize = 250;

fn code() -> FieldSpec {
    FieldSpec::string("code")
        .trim()
        .lowercase()
        .max_length(NAME_MAX_LENGTH)
        .pattern(&PERMISSION_CODE_RE, "isPermissionCode")
}

fn name() -> FieldSpec {
    FieldSpec::string("name").trim().min_length(1).max_length(NAME_MAX_LENGTH)
}

fn description() -> FieldSpec {
    FieldSpec::string("description")
        .trim()
        .max_length(DESCRIPTION_MAX_LENGTH)
}

/// Request body for `POST /permissions`.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

impl RequestSchema for CreatePermissionRequest {
    fn schema() -> Schema {
        Schema::new()
            .field(code().required())
            .field(name().required())
            .field(description())
    }
}

/// Request body for `PUT /permissions/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl RequestSchema for UpdatePermissionRequest {
    fn schema() -> Schema {
        Schema::new().field(code()).field(name()).field(description())
    }
}

/// GET /api/v1/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    _auth: Authorized<PermissionRead>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> AppResult<Json<Page<Permission>>> {
    let page = query.into_page_request(&PermissionRepo::SORTABLE)?;
    let (permissions, total) = PermissionRepo::list(&state.pool, &page).await?;
    Ok(Json(Page::new(permissions, total, &page)))
}

/// GET /api/v1/permissions/{id}
pub async fn get_permission(
    State(state): State<AppState>,
    _auth: Authorized<PermissionRead>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Permission>> {
    let permission = PermissionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(not_found(id))?;
    Ok(Json(permission))
}

/// POST /api/v1/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    auth: Authorized<PermissionCreate>,
    ValidatedJson(input): ValidatedJson<CreatePermissionRequest>,
) -> AppResult<Json<Permission>> {
    ensure_code_unused(&state, None, &input.code).await?;

    let permission = PermissionRepo::create(
        &state.pool,
        &CreatePermission {
            code: input.code,
            name: input.name,
            description: input.description,
        },
    )
    .await?;

    tracing::info!(
        permission_id = permission.id,
        code = %permission.code,
        created_by = auth.user.id,
        "Permission created"
    );
    Ok(Json(permission))
}

/// PUT /api/v1/permissions/{id}
pub async fn update_permission(
    State(state): State<AppState>,
    _auth: Authorized<PermissionUpdate>,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdatePermissionRequest>,
) -> AppResult<Json<Permission>> {
    if let Some(code) = &input.code {
        ensure_code_unused(&state, Some(id), code).await?;
    }

    let permission = PermissionRepo::update(
        &state.pool,
        id,
        &UpdatePermission {
            code: input.code,
            name: input.name,
            description: input.description,
        },
    )
    .await?
    .ok_or(not_found(id))?;
    Ok(Json(permission))
}

/// PATCH /api/v1/permissions/{id}/active
pub async fn activate_permission(
    State(state): State<AppState>,
    _auth: Authorized<PermissionUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Permission>> {
    set_active(&state, id, true).await
}

/// PATCH /api/v1/permissions/{id}/inactive
///
/// Inactive permissions are dropped from every role's grant.
pub async fn deactivate_permission(
    State(state): State<AppState>,
    _auth: Authorized<PermissionUpdate>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Permission>> {
    set_active(&state, id, false).await
}

/// DELETE /api/v1/permissions/{id}
///
/// Blocked with 409 while any role references the permission.
pub async fn delete_permission(
    State(state): State<AppState>,
    auth: Authorized<PermissionDelete>,
    Path(id): Path<DbId>,
) -> AppResult<()> {
    if PermissionRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(not_found(id));
    }
    if PermissionRepo::is_referenced(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict("permission.error.inUse".into())));
    }
    if !PermissionRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(permission_id = id, deleted_by = auth.user.id, "Permission deleted");
    Ok(())
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "permission",
        id,
    })
}

async fn set_active(state: &AppState, id: DbId, is_active: bool) -> AppResult<Json<Permission>> {
    let permission = PermissionRepo::set_active(&state.pool, id, is_active)
        .await?
        .ok_or(not_found(id))?;
    tracing::info!(permission_id = id, is_active, "Permission activation changed");
    Ok(Json(permission))
}

async fn ensure_code_unused(
    state: &AppState,
    permission_id: Option<DbId>,
    code: &str,
) -> AppResult<()> {
    let existing = PermissionRepo::find_by_code(&state.pool, code).await?;
    if existing.is_some_and(|p| Some(p.id) != permission_id) {
        return Err(AppError::Core(CoreError::Conflict("permission.error.exist".into())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use keystone_core::validation::{validation_pipe, Validator};
    use serde_json::json;

    use super::*;

    #[test]
    fn code_is_normalized_and_checked() {
        let request = validation_pipe::<CreatePermissionRequest>()
            .transform(json!({ "code": " Report.Export ", "name": "Export reports" }))
            .expect("payload is valid");
        assert_eq!(request.code, "report.export");

        let result = validation_pipe::<CreatePermissionRequest>()
            .transform(json!({ "code": "report", "name": "Reports" }));
        assert_matches!(result, Err(CoreError::Validation(v)) => {
            assert_eq!(v[0].field, "code");
            assert_eq!(v[0].message_key, "request.isPermissionCode");
        });
    }
}
