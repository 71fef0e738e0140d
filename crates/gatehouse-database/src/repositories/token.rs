//! Token repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_core::config::OverflowStrategy;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::token::{NewToken, RevokeReason, TokenRecord};

use super::db_error;
use crate::store::{IssueOutcome, RotationOutcome, TokenStore};

const LIVE: &str = "is_active AND refresh_expires_at > $2";

/// Repository for session token records.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Create a new token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Takes the per-user lock that serializes issuance and rotation, so the
/// live set cannot change between counting and inserting. Returns `false`
/// if the user does not exist.
async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let owner: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to lock user"))?;
    Ok(owner.is_some())
}

async fn insert_record(conn: &mut PgConnection, record: &TokenRecord) -> AppResult<TokenRecord> {
    sqlx::query_as::<_, TokenRecord>(
        "INSERT INTO tokens (id, user_id, session_id, family_id, access_token_hash, refresh_token_hash, \
         is_active, created_at, access_expires_at, refresh_expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9) RETURNING *",
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(record.session_id)
    .bind(record.family_id)
    .bind(&record.access_token_hash)
    .bind(&record.refresh_token_hash)
    .bind(record.created_at)
    .bind(record.access_expires_at)
    .bind(record.refresh_expires_at)
    .fetch_one(conn)
    .await
    .map_err(db_error("Failed to insert token"))
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn count_active(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tokens WHERE user_id = $1 AND {LIVE}"))
                .bind(user_id)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count active tokens"))?;
        Ok(count as u64)
    }

    async fn issue(
        &self,
        data: &NewToken,
        ceiling: u32,
        strategy: OverflowStrategy,
        now: DateTime<Utc>,
    ) -> AppResult<IssueOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !lock_user(&mut *tx, data.user_id).await? {
            return Err(AppError::not_found("User not found"));
        }

        let live: Vec<Uuid> = sqlx::query_scalar(&format!(
            "SELECT session_id FROM tokens WHERE user_id = $1 AND {LIVE} ORDER BY created_at, id"
        ))
        .bind(data.user_id)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to list active tokens"))?;

        let mut evicted = Vec::new();
        if ceiling > 0 && live.len() >= ceiling as usize {
            match strategy {
                OverflowStrategy::Reject => {
                    return Err(AppError::rate_limited(format!(
                        "Maximum of {ceiling} active sessions reached"
                    )));
                }
                OverflowStrategy::EvictOldest => {
                    let excess = live.len() + 1 - ceiling as usize;
                    evicted = live[..excess].to_vec();

                    sqlx::query(
                        "UPDATE tokens SET is_active = FALSE, revoked_at = $2, revoked_reason = $3 \
                         WHERE session_id = ANY($1) AND is_active",
                    )
                    .bind(&evicted)
                    .bind(now)
                    .bind(RevokeReason::Evicted.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to evict tokens"))?;
                }
            }
        }

        let record = insert_record(&mut *tx, &TokenRecord::from_new(data, now)).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit token issue"))?;

        if !evicted.is_empty() {
            info!(user_id = %data.user_id, evicted = evicted.len(), "Evicted oldest sessions");
        }

        Ok(IssueOutcome { record, evicted })
    }

    async fn find_by_session_id(&self, session_id: Uuid) -> AppResult<Option<TokenRecord>> {
        sqlx::query_as::<_, TokenRecord>("SELECT * FROM tokens WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find token"))
    }

    async fn deactivate(
        &self,
        session_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tokens SET is_active = FALSE, revoked_at = $2, revoked_reason = $3 \
             WHERE session_id = $1 AND is_active",
        )
        .bind(session_id)
        .bind(now)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate token"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all(
        &self,
        user_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE tokens SET is_active = FALSE, revoked_at = $2, revoked_reason = $3 \
             WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(now)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate user tokens"))?;
        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        user_id: Uuid,
        exclude: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TokenRecord>> {
        sqlx::query_as::<_, TokenRecord>(&format!(
            "SELECT * FROM tokens WHERE user_id = $1 AND {LIVE} \
             AND ($3::uuid IS NULL OR session_id <> $3) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(now)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list active tokens"))
    }

    async fn rotate(
        &self,
        session_id: Uuid,
        refresh_token_hash: &str,
        successor: &NewToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotationOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // The owner of a record never changes, so it can be read before
        // locking. User lock first, then the token row, same order as `issue`.
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM tokens WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to find token"))?;
        let Some(owner) = owner else {
            return Ok(RotationOutcome::Rejected("unknown session"));
        };
        lock_user(&mut *tx, owner).await?;

        let current = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM tokens WHERE session_id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock token"))?;

        let Some(current) = current else {
            return Ok(RotationOutcome::Rejected("unknown session"));
        };
        if current.refresh_token_hash != refresh_token_hash {
            return Ok(RotationOutcome::Rejected("token mismatch"));
        }

        if current.is_rotated() {
            let result = sqlx::query(
                "UPDATE tokens SET is_active = FALSE, revoked_at = $2, revoked_reason = $3 \
                 WHERE family_id = $1 AND is_active",
            )
            .bind(current.family_id)
            .bind(now)
            .bind(RevokeReason::RefreshReuse.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to revoke token family"))?;

            tx.commit()
                .await
                .map_err(db_error("Failed to commit family revocation"))?;

            warn!(
                user_id = %current.user_id,
                family_id = %current.family_id,
                "Refresh token reuse detected, family revoked"
            );
            return Ok(RotationOutcome::Replayed {
                family_id: current.family_id,
                revoked: result.rows_affected(),
            });
        }

        if !current.is_active {
            return Ok(RotationOutcome::Rejected("session revoked"));
        }
        if current.refresh_expires_at <= now {
            return Ok(RotationOutcome::Rejected("refresh token expired"));
        }

        sqlx::query(
            "UPDATE tokens SET is_active = FALSE, revoked_at = $2, revoked_reason = $3, replaced_by = $4 \
             WHERE id = $1",
        )
        .bind(current.id)
        .bind(now)
        .bind(RevokeReason::Rotated.as_str())
        .bind(successor.session_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to retire token"))?;

        let mut next = TokenRecord::from_new(successor, now);
        next.user_id = current.user_id;
        next.family_id = current.family_id;
        let record = insert_record(&mut *tx, &next).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit token rotation"))?;

        Ok(RotationOutcome::Rotated(record))
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM tokens WHERE refresh_expires_at < $1 \
             OR (revoked_at IS NOT NULL AND revoked_at < $1)",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to purge tokens"))?;
        Ok(result.rows_affected())
    }
}
