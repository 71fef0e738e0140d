//! User-role and role-permission link repository.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::policy::PolicyLink;

use super::{db_error, foreign_key_violation, unique_violation};
use crate::store::LinkStore;

/// Repository for one link table (`user_roles` or `role_permissions`).
#[derive(Debug, Clone)]
pub struct LinkRepository<L> {
    pool: PgPool,
    _link: PhantomData<fn() -> L>,
}

impl<L> LinkRepository<L>
where
    L: PolicyLink + for<'r> sqlx::FromRow<'r, PgRow>,
{
    /// Create a new link repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _link: PhantomData,
        }
    }

    async fn insert(conn: &mut PgConnection, owner: Uuid, target: Uuid, actor: Uuid) -> AppResult<L> {
        sqlx::query_as::<_, L>(&format!(
            "INSERT INTO {} (id, {}, {}, created_at, created_by) VALUES ($1, $2, $3, $4, $5) RETURNING *",
            L::TABLE,
            L::OWNER_COLUMN,
            L::TARGET_COLUMN
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(target)
        .bind(Utc::now())
        .bind(actor)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if unique_violation(&e).is_some() {
                AppError::conflict(format!("The {} link already exists", L::LABEL))
            } else if foreign_key_violation(&e) {
                AppError::not_found(format!("The {} link refers to a missing row", L::LABEL))
            } else {
                db_error(format!("Failed to create {} link", L::LABEL))(e)
            }
        })
    }
}

#[async_trait]
impl<L> LinkStore<L> for LinkRepository<L>
where
    L: PolicyLink + for<'r> sqlx::FromRow<'r, PgRow>,
{
    async fn find(&self, owner: Uuid, target: Uuid) -> AppResult<Option<L>> {
        sqlx::query_as::<_, L>(&format!(
            "SELECT * FROM {} WHERE {} = $1 AND {} = $2 \
             ORDER BY (deleted_at IS NULL) DESC, deleted_at DESC LIMIT 1",
            L::TABLE,
            L::OWNER_COLUMN,
            L::TARGET_COLUMN
        ))
        .bind(owner)
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to find {} link", L::LABEL)))
    }

    async fn list_live_for_owner(&self, owner: Uuid) -> AppResult<Vec<L>> {
        sqlx::query_as::<_, L>(&format!(
            "SELECT * FROM {} WHERE {} = $1 AND deleted_at IS NULL ORDER BY created_at, id",
            L::TABLE,
            L::OWNER_COLUMN
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error(format!("Failed to list {} links", L::LABEL)))
    }

    async fn create(&self, owner: Uuid, target: Uuid, actor: Uuid) -> AppResult<L> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        Self::insert(&mut *conn, owner, target, actor).await
    }

    async fn replace_for_owner(
        &self,
        owner: Uuid,
        targets: &[Uuid],
        actor: Uuid,
    ) -> AppResult<Vec<L>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            L::TABLE,
            L::OWNER_COLUMN
        ))
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(db_error(format!("Failed to clear {} links", L::LABEL)))?;

        let mut links = Vec::with_capacity(targets.len());
        for target in targets {
            links.push(Self::insert(&mut *tx, owner, *target, actor).await?);
        }

        tx.commit()
            .await
            .map_err(db_error(format!("Failed to commit {} links", L::LABEL)))?;

        Ok(links)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", L::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error(format!("Failed to delete {} link", L::LABEL)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<L>> {
        sqlx::query_as::<_, L>(&format!(
            "UPDATE {} SET deleted_at = $2, deleted_by = $3 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
            L::TABLE
        ))
        .bind(id)
        .bind(Utc::now())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error(format!("Failed to soft-delete {} link", L::LABEL)))
    }

    async fn restore(&self, id: Uuid) -> AppResult<Option<L>> {
        sqlx::query_as::<_, L>(&format!(
            "UPDATE {} SET deleted_at = NULL, deleted_by = NULL \
             WHERE id = $1 AND deleted_at IS NOT NULL RETURNING *",
            L::TABLE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e).is_some() {
                AppError::conflict(format!("A live {} link already exists", L::LABEL))
            } else {
                db_error(format!("Failed to restore {} link", L::LABEL))(e)
            }
        })
    }
}
