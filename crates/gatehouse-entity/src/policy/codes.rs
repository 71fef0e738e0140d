//! Permission codes guarding the administrative operations.
//!
//! Codes have the form `<action>-<resource>`, e.g. `get-list-user` or
//! `restore-permission`.

use serde::{Deserialize, Serialize};

/// Resources protected by CRUD permissions.
pub const RESOURCES: [&str; 3] = ["user", "role", "permission"];

/// CRUD-style action component of a permission code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    GetList,
    Read,
    Create,
    Update,
    Delete,
    Restore,
}

impl Action {
    /// Every action, in seeding order.
    pub const ALL: [Action; 6] = [
        Action::GetList,
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Restore,
    ];

    /// Code prefix for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetList => "get-list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Restore => "restore",
        }
    }

    /// Full permission code for `resource`.
    pub fn code(&self, resource: &str) -> String {
        format!("{}-{resource}", self.as_str())
    }

    /// Human-readable name of the permission for `resource`.
    pub fn display_name(&self, resource: &str) -> String {
        let verb = match self {
            Action::GetList => "List",
            Action::Read => "Read",
            Action::Create => "Create",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Restore => "Restore",
        };
        format!("{verb} {resource}")
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every built-in permission code.
pub fn all_codes() -> Vec<String> {
    RESOURCES
        .iter()
        .flat_map(|resource| Action::ALL.iter().map(move |action| action.code(resource)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Action::GetList.code("user"), "get-list-user");
        assert_eq!(Action::Restore.code("role"), "restore-role");

        let codes = all_codes();
        assert_eq!(codes.len(), 18);
        assert!(codes.contains(&"create-permission".to_string()));
    }
}
