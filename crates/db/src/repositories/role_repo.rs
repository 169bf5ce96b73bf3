//! Repository for the `roles` table.

use keystone_core::authorization::RoleGrant;
use keystone_core::pagination::{PageRequest, Sortable};
use keystone_core::types::DbId;
use sqlx::PgPool;

use crate::models::role::{CreateRole, Role, RoleGrantRow, UpdateRole};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, is_active, permission_ids, created_at, updated_at";

/// Provides CRUD operations for roles and loads role grants.
pub struct RoleRepo;

impl RoleRepo {
    /// Fields a role list may be sorted by.
    pub const SORTABLE: Sortable = Sortable {
        fields: &[("name", "name"), ("createdAt", "created_at")],
        default: "name@asc",
    };

    /// Insert a new role, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateRole) -> Result<Role, sqlx::Error> {
        let query = format!(
            "INSERT INTO roles (name, permission_ids)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(&input.name)
            .bind(&input.permission_ids)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a role by its normalized name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Every role, for resolving names without N+1 lookups.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles ORDER BY id ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }

    /// One page of roles plus the total count matching the search.
    pub async fn list(pool: &PgPool, page: &PageRequest) -> Result<(Vec<Role>, i64), sqlx::Error> {
        let pattern = page.search_pattern();

        let query = format!(
            "SELECT {COLUMNS} FROM roles
             WHERE ($1::text IS NULL OR name ILIKE $1)
             ORDER BY {}, id ASC
             LIMIT $2 OFFSET $3",
            page.sort.to_sql()
        );
        let rows = sqlx::query_as::<_, Role>(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM roles WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        Ok((rows, total))
    }

    /// Load a role with its permission references expanded to codes.
    ///
    /// Inactive permissions and dangling ids are not expanded.
    pub async fn find_grant(pool: &PgPool, id: DbId) -> Result<Option<RoleGrant>, sqlx::Error> {
        let row = sqlx::query_as::<_, RoleGrantRow>(
            "SELECT r.id, r.name, r.is_active,
                    COALESCE(
                        ARRAY_AGG(p.code ORDER BY p.code) FILTER (WHERE p.id IS NOT NULL),
                        '{}'
                    ) AS permissions
             FROM roles r
             LEFT JOIN permissions p ON p.id = ANY(r.permission_ids) AND p.is_active
             WHERE r.id = $1
             GROUP BY r.id",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(RoleGrant::from))
    }

    /// Update a role. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRole,
    ) -> Result<Option<Role>, sqlx::Error> {
        let query = format!(
            "UPDATE roles SET
                name = COALESCE($2, name),
                permission_ids = COALESCE($3, permission_ids)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.permission_ids)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("UPDATE roles SET is_active = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// `true` if any user is assigned this role.
    pub async fn is_assigned(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE role_id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Hard-delete a role. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
