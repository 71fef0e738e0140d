//! Role and permission repository, generic over the catalogue entry type.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::policy::{CatalogChanges, CatalogEntry, NewCatalogEntry};

use super::{db_error, unique_violation};
use crate::store::CatalogStore;

/// Repository for one catalogue table (`roles` or `permissions`).
#[derive(Debug, Clone)]
pub struct CatalogRepository<E> {
    pool: PgPool,
    _entry: PhantomData<fn() -> E>,
}

impl<E: CatalogEntry> CatalogRepository<E> {
    /// Create a new catalogue repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entry: PhantomData,
        }
    }

    fn conflict(constraint: &str) -> AppError {
        let field = if constraint.contains("_name_") { "name" } else { "code" };
        AppError::conflict(format!("A {} with this {field} already exists", E::LABEL))
    }
}

#[async_trait]
impl<E> CatalogStore<E> for CatalogRepository<E>
where
    E: CatalogEntry + for<'r> sqlx::FromRow<'r, PgRow>,
{
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!("SELECT * FROM {} WHERE id = $1", E::TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error(format!("Failed to find {}", E::LABEL)))
    }

    async fn find_live(&self, id: Uuid) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL",
            E::TABLE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to find {}", E::LABEL)))
    }

    async fn find_live_by_name(&self, name: &str) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "SELECT * FROM {} WHERE name = $1 AND deleted_at IS NULL",
            E::TABLE
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to find {} by name", E::LABEL)))
    }

    async fn find_live_by_code(&self, code: &str) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "SELECT * FROM {} WHERE code = $1 AND deleted_at IS NULL",
            E::TABLE
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to find {} by code", E::LABEL)))
    }

    async fn list_live(&self) -> AppResult<Vec<E>> {
        sqlx::query_as::<_, E>(&format!(
            "SELECT * FROM {} WHERE deleted_at IS NULL ORDER BY created_at, id",
            E::TABLE
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error(format!("Failed to list {}", E::TABLE)))
    }

    async fn create(&self, data: &NewCatalogEntry, actor: Uuid) -> AppResult<E> {
        sqlx::query_as::<_, E>(&format!(
            "INSERT INTO {} (id, name, description, code, created_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            E::TABLE
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.code)
        .bind(Utc::now())
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) => Self::conflict(&constraint),
            None => db_error(format!("Failed to create {}", E::LABEL))(e),
        })
    }

    async fn update(&self, id: Uuid, changes: &CatalogChanges) -> AppResult<Option<E>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let current = sqlx::query_as::<_, E>(&format!(
            "SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            E::TABLE
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error(format!("Failed to lock {}", E::LABEL)))?;

        let Some(mut entry) = current else {
            return Ok(None);
        };
        entry.apply(changes);

        let updated = sqlx::query_as::<_, E>(&format!(
            "UPDATE {} SET name = $2, description = $3, code = $4 WHERE id = $1 RETURNING *",
            E::TABLE
        ))
        .bind(id)
        .bind(entry.name())
        .bind(entry.description())
        .bind(entry.code())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) => Self::conflict(&constraint),
            None => db_error(format!("Failed to update {}", E::LABEL))(e),
        })?;

        tx.commit()
            .await
            .map_err(db_error(format!("Failed to commit {} update", E::LABEL)))?;

        Ok(Some(updated))
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "UPDATE {} SET deleted_at = $2, deleted_by = $3 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
            E::TABLE
        ))
        .bind(id)
        .bind(Utc::now())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to soft-delete {}", E::LABEL)))
    }

    async fn restore(&self, id: Uuid) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "UPDATE {} SET deleted_at = NULL, deleted_by = NULL \
             WHERE id = $1 AND deleted_at IS NOT NULL RETURNING *",
            E::TABLE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) => Self::conflict(&constraint),
            None => db_error(format!("Failed to restore {}", E::LABEL))(e),
        })
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", E::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error(format!("Failed to delete {}", E::LABEL)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn revert_to(&self, id: Uuid, target: &E, actor: Uuid) -> AppResult<Option<E>> {
        sqlx::query_as::<_, E>(&format!(
            "UPDATE {} SET name = $2, description = $3, code = $4, \
             deleted_at = CASE WHEN $5 THEN NULL WHEN deleted_at IS NULL THEN $6 ELSE deleted_at END, \
             deleted_by = CASE WHEN $5 THEN NULL WHEN deleted_at IS NULL THEN $7 ELSE deleted_by END \
             WHERE id = $1 RETURNING *",
            E::TABLE
        ))
        .bind(id)
        .bind(target.name())
        .bind(target.description())
        .bind(target.code())
        .bind(target.is_live())
        .bind(Utc::now())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) => Self::conflict(&constraint),
            None => db_error(format!("Failed to revert {}", E::LABEL))(e),
        })
    }
}
