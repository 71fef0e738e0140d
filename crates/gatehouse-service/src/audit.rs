//! Change log of policy mutations and per-field history.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::ChangeLogStore;
use gatehouse_entity::audit::{ChangeAction, ChangeLog, NewChangeLog};

/// Old and new value of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// A change-log entry with the fields it changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub log: ChangeLog,
    /// Only the fields whose value differs between the two snapshots.
    pub changes: BTreeMap<String, FieldChange>,
}

/// Records and reads change-log entries.
#[derive(Clone)]
pub struct ChangeLogService {
    store: Arc<dyn ChangeLogStore>,
}

impl std::fmt::Debug for ChangeLogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeLogService").finish_non_exhaustive()
    }
}

impl ChangeLogService {
    /// Creates a new change-log service.
    pub fn new(store: Arc<dyn ChangeLogStore>) -> Self {
        Self { store }
    }

    /// Appends an entry.
    ///
    /// Runs after the mutation it describes, so a failure here is reported
    /// to the caller with the mutation already applied.
    pub async fn record<T: Serialize>(
        &self,
        entity_name: &str,
        entity_id: Uuid,
        action: ChangeAction,
        old: Option<&T>,
        new: Option<&T>,
        changed_by: Uuid,
    ) -> AppResult<()> {
        let entry = NewChangeLog {
            entity_name: entity_name.to_string(),
            entity_id,
            action,
            old_value: old.map(serde_json::to_value).transpose()?,
            new_value: new.map(serde_json::to_value).transpose()?,
            changed_by,
        };

        self.store.record(&entry).await.map(drop).map_err(|e| {
            error!(
                entity = entity_name,
                entity_id = %entity_id,
                action = %action,
                error = %e,
                "Failed to write change log entry"
            );
            e
        })
    }

    /// Looks up one entry.
    pub async fn find(&self, id: Uuid) -> AppResult<ChangeLog> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Change log entry {id} not found")))
    }

    /// History of one entity, oldest first, with per-field diffs.
    pub async fn history(&self, entity_name: &str, entity_id: Uuid) -> AppResult<Vec<HistoryEntry>> {
        let logs = self.store.history(entity_name, entity_id).await?;
        Ok(logs
            .into_iter()
            .map(|log| {
                let changes = diff(log.old_value.as_ref(), log.new_value.as_ref());
                HistoryEntry { log, changes }
            })
            .collect())
    }
}

/// Fields whose values differ between two JSON object snapshots.
///
/// A missing snapshot contributes `None` for each of the other side's fields.
pub fn diff(old: Option<&Value>, new: Option<&Value>) -> BTreeMap<String, FieldChange> {
    let empty = serde_json::Map::new();
    let old = old.and_then(Value::as_object).unwrap_or(&empty);
    let new = new.and_then(Value::as_object).unwrap_or(&empty);

    old.keys()
        .chain(new.keys())
        .filter_map(|key| {
            let (before, after) = (old.get(key), new.get(key));
            (before != after).then(|| {
                (
                    key.clone(),
                    FieldChange {
                        old: before.cloned(),
                        new: after.cloned(),
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use gatehouse_core::error::ErrorKind;
    use gatehouse_database::memory::MemoryChangeLogStore;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_record_fails_when_snapshot_cannot_be_serialized() {
        let service = ChangeLogService::new(Arc::new(MemoryChangeLogStore::new()));
        let entity_id = Uuid::new_v4();
        // JSON object keys must be strings.
        let snapshot = HashMap::from([((1, 2), "tuple key")]);

        let err = service
            .record("role", entity_id, ChangeAction::Update, Some(&snapshot), None, Uuid::nil())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(service.history("role", entity_id).await.unwrap().is_empty());

        service
            .record("role", entity_id, ChangeAction::Create, None, Some(&json!({"name": "Admin"})), Uuid::nil())
            .await
            .unwrap();
        assert_eq!(service.history("role", entity_id).await.unwrap().len(), 1);
    }

    #[test]
    fn test_diff_keeps_only_changed_fields() {
        let old = json!({"name": "Admin", "code": "ADMIN", "description": null});
        let new = json!({"name": "Administrator", "code": "ADMIN", "description": null});

        let changes = diff(Some(&old), Some(&new));
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes["name"],
            FieldChange {
                old: Some(json!("Admin")),
                new: Some(json!("Administrator")),
            }
        );
    }

    #[test]
    fn test_diff_against_missing_snapshot() {
        let new = json!({"name": "Admin", "code": "ADMIN"});
        let changes = diff(None, Some(&new));

        assert_eq!(changes.len(), 2);
        assert_eq!(changes["code"].old, None);
        assert!(diff(Some(&new), Some(&new)).is_empty());
    }
}
