//! Change-log repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::audit::{ChangeLog, NewChangeLog};

use crate::store::ChangeLogStore;

/// Repository for change-log entries.
#[derive(Debug, Clone)]
pub struct ChangeLogRepository {
    pool: PgPool,
}

impl ChangeLogRepository {
    /// Create a new change-log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeLogStore for ChangeLogRepository {
    async fn record(&self, entry: &NewChangeLog) -> AppResult<ChangeLog> {
        sqlx::query_as::<_, ChangeLog>(
            "INSERT INTO change_logs (id, entity_name, entity_id, action, old_value, new_value, changed_by, changed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&entry.entity_name)
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.changed_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record change", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ChangeLog>> {
        sqlx::query_as::<_, ChangeLog>("SELECT * FROM change_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find change log entry", e)
            })
    }

    async fn history(&self, entity_name: &str, entity_id: Uuid) -> AppResult<Vec<ChangeLog>> {
        sqlx::query_as::<_, ChangeLog>(
            "SELECT * FROM change_logs WHERE entity_name = $1 AND entity_id = $2 \
             ORDER BY changed_at, id",
        )
        .bind(entity_name)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load change history", e))
    }
}
