//! Repository for the `permissions` table.

use keystone_core::pagination::{PageRequest, Sortable};
use keystone_core::types::DbId;
use sqlx::PgPool;

use crate::models::permission::{CreatePermission, Permission, UpdatePermission};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code, name, description, is_active, created_at, updated_at";

/// Filter for list and count queries; `$1` is the `ILIKE` pattern or NULL.
const SEARCH: &str = "($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1)";

/// Provides CRUD operations for permissions.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Fields a permission list may be sorted by.
    pub const SORTABLE: Sortable = Sortable {
        fields: &[
            ("code", "code"),
            ("name", "name"),
            ("createdAt", "created_at"),
        ],
        default: "code@asc",
    };

    /// Insert a new permission, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePermission,
    ) -> Result<Permission, sqlx::Error> {
        let query = format!(
            "INSERT INTO permissions (code, name, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM permissions WHERE id = $1");
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM permissions WHERE code = $1");
        sqlx::query_as::<_, Permission>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the permissions with the given ids, in the order of `ids`.
    ///
    /// Ids with no matching row are skipped.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Permission>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM permissions
             WHERE id = ANY($1)
             ORDER BY array_position($1, id)"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// The subset of `ids` that have no permission row.
    pub async fn missing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, DbId>(
            "SELECT requested.id FROM UNNEST($1::bigint[]) AS requested(id)
             WHERE NOT EXISTS (SELECT 1 FROM permissions p WHERE p.id = requested.id)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// One page of permissions plus the total count matching the search.
    pub async fn list(
        pool: &PgPool,
        page: &PageRequest,
    ) -> Result<(Vec<Permission>, i64), sqlx::Error> {
        let pattern = page.search_pattern();

        let query = format!(
            "SELECT {COLUMNS} FROM permissions
             WHERE {SEARCH}
             ORDER BY {}, id ASC
             LIMIT $2 OFFSET $3",
            page.sort.to_sql()
        );
        let rows = sqlx::query_as::<_, Permission>(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM permissions WHERE {SEARCH}");
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }

    /// Update a permission. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!(
            "UPDATE permissions SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                description = COALESCE($4, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!(
            "UPDATE permissions SET is_active = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// `true` if any role still lists this permission.
    pub async fn is_referenced(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE $1 = ANY(permission_ids))",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Hard-delete a permission. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
