//! In-memory change log.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::audit::{ChangeLog, NewChangeLog};

use crate::store::ChangeLogStore;

#[derive(Debug, Default)]
pub struct MemoryChangeLogStore {
    entries: RwLock<Vec<ChangeLog>>,
}

impl MemoryChangeLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangeLogStore for MemoryChangeLogStore {
    async fn record(&self, entry: &NewChangeLog) -> AppResult<ChangeLog> {
        let log = ChangeLog {
            id: Uuid::new_v4(),
            entity_name: entry.entity_name.clone(),
            entity_id: entry.entity_id,
            action: entry.action.as_str().to_string(),
            old_value: entry.old_value.clone(),
            new_value: entry.new_value.clone(),
            changed_by: entry.changed_by,
            changed_at: Utc::now(),
        };
        self.entries.write().await.push(log.clone());
        Ok(log)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ChangeLog>> {
        Ok(self.entries.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn history(&self, entity_name: &str, entity_id: Uuid) -> AppResult<Vec<ChangeLog>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.entity_name == entity_name && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
