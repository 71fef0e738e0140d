//! In-memory link store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::policy::PolicyLink;

use crate::store::LinkStore;

/// Receives hard deletions of catalogue rows so dependent links go with them.
#[async_trait]
pub trait CascadeTarget: Send + Sync + 'static {
    async fn purge_referencing(&self, id: Uuid);
}

pub struct MemoryLinkStore<L> {
    rows: RwLock<Vec<L>>,
}

impl<L: PolicyLink> MemoryLinkStore<L> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<L> {
        self.rows.read().await.clone()
    }

    fn insert(rows: &mut Vec<L>, owner: Uuid, target: Uuid, actor: Uuid) -> AppResult<L> {
        if rows
            .iter()
            .any(|r| r.is_live() && r.owner_id() == owner && r.target_id() == target)
        {
            return Err(AppError::conflict(format!(
                "The {} link already exists",
                L::LABEL
            )));
        }
        let link = L::build(owner, target, actor, Utc::now());
        rows.push(link.clone());
        Ok(link)
    }
}

impl<L: PolicyLink> Default for MemoryLinkStore<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> std::fmt::Debug for MemoryLinkStore<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLinkStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl<L: PolicyLink> CascadeTarget for MemoryLinkStore<L> {
    async fn purge_referencing(&self, id: Uuid) {
        self.rows
            .write()
            .await
            .retain(|r| r.owner_id() != id && r.target_id() != id);
    }
}

#[async_trait]
impl<L: PolicyLink> LinkStore<L> for MemoryLinkStore<L> {
    async fn find(&self, owner: Uuid, target: Uuid) -> AppResult<Option<L>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<&L> = rows
            .iter()
            .filter(|r| r.owner_id() == owner && r.target_id() == target)
            .collect();
        // Live first, then the most recently deleted.
        matching.sort_by_key(|r| (r.is_live(), r.deleted_at()));
        Ok(matching.last().map(|r| (*r).clone()))
    }

    async fn list_live_for_owner(&self, owner: Uuid) -> AppResult<Vec<L>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.owner_id() == owner && r.is_live())
            .cloned()
            .collect())
    }

    async fn create(&self, owner: Uuid, target: Uuid, actor: Uuid) -> AppResult<L> {
        let mut rows = self.rows.write().await;
        Self::insert(&mut rows, owner, target, actor)
    }

    async fn replace_for_owner(
        &self,
        owner: Uuid,
        targets: &[Uuid],
        actor: Uuid,
    ) -> AppResult<Vec<L>> {
        let mut rows = self.rows.write().await;

        let mut next: Vec<L> = rows
            .iter()
            .filter(|r| r.owner_id() != owner)
            .cloned()
            .collect();
        let mut links = Vec::with_capacity(targets.len());
        for target in targets {
            links.push(Self::insert(&mut next, owner, *target, actor)?);
        }

        *rows = next;
        Ok(links)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        let len = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() < len)
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<L>> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id() == id && r.is_live()) {
            Some(row) => {
                row.mark_deleted(actor, Utc::now());
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn restore(&self, id: Uuid) -> AppResult<Option<L>> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| r.id() == id && !r.is_live()) else {
            return Ok(None);
        };

        let (owner, target) = (rows[index].owner_id(), rows[index].target_id());
        if rows
            .iter()
            .any(|r| r.is_live() && r.owner_id() == owner && r.target_id() == target)
        {
            return Err(AppError::conflict(format!(
                "A live {} link already exists",
                L::LABEL
            )));
        }

        rows[index].clear_deleted();
        Ok(Some(rows[index].clone()))
    }
}
