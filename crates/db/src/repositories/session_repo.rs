//! Repository for the `user_sessions` table.

use keystone_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::{NewSession, Session};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, \
                       user_agent, created_at, updated_at";

/// Issues, redeems and revokes refresh-token sessions.
pub struct SessionRepo;

impl SessionRepo {
    pub async fn issue(pool: &PgPool, input: &NewSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, user_agent)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Spend the live session holding `hash` and return it.
    ///
    /// A single `UPDATE ... RETURNING`, so of two concurrent redemptions of
    /// the same token exactly one gets `Some`. Revoked, expired and unknown
    /// tokens all yield `None`.
    pub async fn redeem(pool: &PgPool, hash: &str) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET is_revoked = true
             WHERE refresh_token_hash = $1
               AND is_revoked = false
               AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Revoke every live session of `user_id`, returning how many were spent.
    pub async fn revoke_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that can no longer be redeemed.
    pub async fn purge_stale(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE is_revoked = true OR expires_at <= NOW()")
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
