//! Change-log store contract.

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::AppResult;
use gatehouse_entity::audit::{ChangeLog, NewChangeLog};

/// Append-only log of policy mutations.
#[async_trait]
pub trait ChangeLogStore: Send + Sync + 'static {
    async fn record(&self, entry: &NewChangeLog) -> AppResult<ChangeLog>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ChangeLog>>;

    /// Entries for one entity, oldest first.
    async fn history(&self, entity_name: &str, entity_id: Uuid) -> AppResult<Vec<ChangeLog>>;
}
