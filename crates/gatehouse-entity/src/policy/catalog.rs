//! Role and permission catalogue entries.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Shared behaviour of the two soft-deletable catalogue types.
///
/// Roles and permissions have identical shapes; this trait lets stores
/// and services handle both through one generic implementation.
pub trait CatalogEntry:
    Clone + Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync + Unpin + 'static
{
    /// Backing table name.
    const TABLE: &'static str;
    /// Singular resource label, also the suffix of the guarding permission codes.
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn code(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// Whether the entry has not been soft-deleted.
    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }

    /// Build a fresh live row.
    fn build(data: &NewCatalogEntry, actor: Uuid, now: DateTime<Utc>) -> Self;
    /// Overwrite the fields present in `changes`.
    fn apply(&mut self, changes: &CatalogChanges);
    /// Set the soft-delete audit fields.
    fn mark_deleted(&mut self, actor: Uuid, now: DateTime<Utc>);
    /// Clear both soft-delete audit fields.
    fn clear_deleted(&mut self);
}

/// Data required to create a role or permission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCatalogEntry {
    /// Display name, unique among live entries.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Machine code, unique among live entries.
    pub code: String,
}

/// Partial update of a role or permission. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub code: Option<String>,
}

impl CatalogChanges {
    /// Whether the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.code.is_none()
    }

    /// Changes that set every field to the value held by `target`.
    pub fn overwrite_with<E: CatalogEntry>(target: &E) -> Self {
        Self {
            name: Some(target.name().to_string()),
            description: Some(target.description().map(str::to_string)),
            code: Some(target.code().to_string()),
        }
    }

    /// Changes that turn `current` into `target`, limited to differing fields.
    pub fn between<E: CatalogEntry>(current: &E, target: &E) -> Self {
        Self {
            name: (current.name() != target.name()).then(|| target.name().to_string()),
            description: (current.description() != target.description())
                .then(|| target.description().map(str::to_string)),
            code: (current.code() != target.code()).then(|| target.code().to_string()),
        }
    }
}

macro_rules! catalog_entry {
    ($(#[$meta:meta])* $ty:ident, $table:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
        pub struct $ty {
            pub id: Uuid,
            pub name: String,
            pub description: Option<String>,
            pub code: String,
            pub created_at: DateTime<Utc>,
            pub created_by: Uuid,
            pub deleted_at: Option<DateTime<Utc>>,
            pub deleted_by: Option<Uuid>,
        }

        impl CatalogEntry for $ty {
            const TABLE: &'static str = $table;
            const LABEL: &'static str = $label;

            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn code(&self) -> &str {
                &self.code
            }

            fn description(&self) -> Option<&str> {
                self.description.as_deref()
            }

            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn build(data: &NewCatalogEntry, actor: Uuid, now: DateTime<Utc>) -> Self {
                Self {
                    id: Uuid::new_v4(),
                    name: data.name.clone(),
                    description: data.description.clone(),
                    code: data.code.clone(),
                    created_at: now,
                    created_by: actor,
                    deleted_at: None,
                    deleted_by: None,
                }
            }

            fn apply(&mut self, changes: &CatalogChanges) {
                if let Some(name) = &changes.name {
                    self.name = name.clone();
                }
                if let Some(description) = &changes.description {
                    self.description = description.clone();
                }
                if let Some(code) = &changes.code {
                    self.code = code.clone();
                }
            }

            fn mark_deleted(&mut self, actor: Uuid, now: DateTime<Utc>) {
                self.deleted_at = Some(now);
                self.deleted_by = Some(actor);
            }

            fn clear_deleted(&mut self) {
                self.deleted_at = None;
                self.deleted_by = None;
            }
        }
    };
}

catalog_entry!(
    /// A named bundle of permissions assignable to users.
    Role,
    "roles",
    "role"
);

catalog_entry!(
    /// A named capability identified by its code (e.g. `read-role`).
    Permission,
    "permissions",
    "permission"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_delete_round_trip_keeps_fields() {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        let data = NewCatalogEntry {
            name: "Admin".to_string(),
            description: Some("Administrators".to_string()),
            code: "ADMIN".to_string(),
        };
        let original = Role::build(&data, actor, now);

        let mut role = original.clone();
        role.mark_deleted(actor, now);
        assert!(!role.is_live());
        assert_eq!(role.deleted_by, Some(actor));

        role.clear_deleted();
        assert_eq!(role, original);
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut perm = Permission::build(
            &NewCatalogEntry {
                name: "Read role".to_string(),
                description: None,
                code: "read-role".to_string(),
            },
            Uuid::nil(),
            Utc::now(),
        );

        perm.apply(&CatalogChanges {
            description: Some(Some("View a role".to_string())),
            ..Default::default()
        });

        assert_eq!(perm.name, "Read role");
        assert_eq!(perm.code, "read-role");
        assert_eq!(perm.description.as_deref(), Some("View a role"));
    }

    #[test]
    fn test_changes_between_lists_differing_fields_only() {
        let data = NewCatalogEntry {
            name: "Admin".to_string(),
            description: None,
            code: "ADMIN".to_string(),
        };
        let before = Role::build(&data, Uuid::nil(), Utc::now());
        let mut after = before.clone();
        after.apply(&CatalogChanges {
            name: Some("Administrators".to_string()),
            ..Default::default()
        });

        let changes = CatalogChanges::between(&after, &before);
        assert_eq!(changes.name.as_deref(), Some("Admin"));
        assert!(changes.code.is_none() && changes.description.is_none());
        assert!(CatalogChanges::between(&before, &before).is_empty());
    }
}
