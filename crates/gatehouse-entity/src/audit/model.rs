//! Change-log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable record of one mutation of a policy entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChangeLog {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Entity type (`"role"`, `"permission"`, `"user_role"`, `"role_permission"`).
    pub entity_name: String,
    /// Identifier of the changed row.
    pub entity_id: Uuid,
    /// What happened, see [`ChangeAction`].
    pub action: String,
    /// Snapshot before the change.
    pub old_value: Option<serde_json::Value>,
    /// Snapshot after the change.
    pub new_value: Option<serde_json::Value>,
    /// Who made the change.
    pub changed_by: Uuid,
    /// When the change was made.
    pub changed_at: DateTime<Utc>,
}

impl ChangeLog {
    /// Parsed action, if it is one of the known kinds.
    pub fn action_kind(&self) -> Option<ChangeAction> {
        ChangeAction::parse(&self.action)
    }
}

/// Data required to append a change-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChangeLog {
    pub entity_name: String,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub changed_by: Uuid,
}

/// Kind of recorded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    SoftDelete,
    Restore,
    Assign,
    Revert,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
            ChangeAction::SoftDelete => "soft_delete",
            ChangeAction::Restore => "restore",
            ChangeAction::Assign => "assign",
            ChangeAction::Revert => "revert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(ChangeAction::Create),
            "update" => Some(ChangeAction::Update),
            "delete" => Some(ChangeAction::Delete),
            "soft_delete" => Some(ChangeAction::SoftDelete),
            "restore" => Some(ChangeAction::Restore),
            "assign" => Some(ChangeAction::Assign),
            "revert" => Some(ChangeAction::Revert),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
