//! In-memory role and permission store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::policy::{CatalogChanges, CatalogEntry, NewCatalogEntry};

use super::link::CascadeTarget;
use crate::store::CatalogStore;

pub struct MemoryCatalogStore<E> {
    rows: RwLock<Vec<E>>,
    cascade: Vec<Arc<dyn CascadeTarget>>,
}

impl<E: CatalogEntry> MemoryCatalogStore<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            cascade: Vec::new(),
        }
    }

    /// Link stores whose rows referencing a hard-deleted entry are removed with it.
    pub fn with_cascade(mut self, targets: Vec<Arc<dyn CascadeTarget>>) -> Self {
        self.cascade = targets;
        self
    }

    pub(crate) async fn snapshot(&self) -> Vec<E> {
        self.rows.read().await.clone()
    }

    fn check_unique(rows: &[E], candidate: &E) -> AppResult<()> {
        for row in rows.iter().filter(|r| r.is_live() && r.id() != candidate.id()) {
            if row.name() == candidate.name() {
                return Err(AppError::conflict(format!(
                    "A {} with this name already exists",
                    E::LABEL
                )));
            }
            if row.code() == candidate.code() {
                return Err(AppError::conflict(format!(
                    "A {} with this code already exists",
                    E::LABEL
                )));
            }
        }
        Ok(())
    }
}

impl<E: CatalogEntry> Default for MemoryCatalogStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for MemoryCatalogStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCatalogStore")
            .field("cascade", &self.cascade.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: CatalogEntry> CatalogStore<E> for MemoryCatalogStore<E> {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<E>> {
        Ok(self.rows.read().await.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_live(&self, id: Uuid) -> AppResult<Option<E>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.id() == id && r.is_live())
            .cloned())
    }

    async fn find_live_by_name(&self, name: &str) -> AppResult<Option<E>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.name() == name && r.is_live())
            .cloned())
    }

    async fn find_live_by_code(&self, code: &str) -> AppResult<Option<E>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.code() == code && r.is_live())
            .cloned())
    }

    async fn list_live(&self) -> AppResult<Vec<E>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.is_live())
            .cloned()
            .collect())
    }

    async fn create(&self, data: &NewCatalogEntry, actor: Uuid) -> AppResult<E> {
        let mut rows = self.rows.write().await;
        let entry = E::build(data, actor, Utc::now());
        Self::check_unique(&rows, &entry)?;
        rows.push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, id: Uuid, changes: &CatalogChanges) -> AppResult<Option<E>> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| r.id() == id && r.is_live()) else {
            return Ok(None);
        };

        let mut updated = rows[index].clone();
        updated.apply(changes);
        Self::check_unique(&rows, &updated)?;
        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<E>> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id() == id && r.is_live()) {
            Some(row) => {
                row.mark_deleted(actor, Utc::now());
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn restore(&self, id: Uuid) -> AppResult<Option<E>> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| r.id() == id && !r.is_live()) else {
            return Ok(None);
        };

        let mut restored = rows[index].clone();
        restored.clear_deleted();
        Self::check_unique(&rows, &restored)?;
        rows[index] = restored.clone();
        Ok(Some(restored))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let removed = {
            let mut rows = self.rows.write().await;
            let len = rows.len();
            rows.retain(|r| r.id() != id);
            rows.len() < len
        };

        if removed {
            for target in &self.cascade {
                target.purge_referencing(id).await;
            }
        }
        Ok(removed)
    }

    async fn revert_to(&self, id: Uuid, target: &E, actor: Uuid) -> AppResult<Option<E>> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let mut reverted = rows[index].clone();
        reverted.apply(&CatalogChanges::overwrite_with(target));
        match (reverted.is_live(), target.is_live()) {
            (false, true) => reverted.clear_deleted(),
            (true, false) => reverted.mark_deleted(actor, Utc::now()),
            _ => {}
        }
        if reverted.is_live() {
            Self::check_unique(&rows, &reverted)?;
        }
        rows[index] = reverted.clone();
        Ok(Some(reverted))
    }
}
