//! Join rows of the policy graph, each with its own soft-delete state.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A directed edge `owner -> target` of the policy graph.
pub trait PolicyLink:
    Clone + Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync + Unpin + 'static
{
    /// Backing table name.
    const TABLE: &'static str;
    /// Column holding the owning side (user for user-role links).
    const OWNER_COLUMN: &'static str;
    /// Column holding the target side (role for user-role links).
    const TARGET_COLUMN: &'static str;
    /// Entity name used in change-log entries.
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn target_id(&self) -> Uuid;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }

    /// Build a fresh live link.
    fn build(owner: Uuid, target: Uuid, actor: Uuid, now: DateTime<Utc>) -> Self;
    fn mark_deleted(&mut self, actor: Uuid, now: DateTime<Utc>);
    fn clear_deleted(&mut self);
}

macro_rules! policy_link {
    ($(#[$meta:meta])* $ty:ident, $table:literal, $label:literal, $owner:ident, $target:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
        pub struct $ty {
            pub id: Uuid,
            pub $owner: Uuid,
            pub $target: Uuid,
            pub created_at: DateTime<Utc>,
            pub created_by: Uuid,
            pub deleted_at: Option<DateTime<Utc>>,
            pub deleted_by: Option<Uuid>,
        }

        impl PolicyLink for $ty {
            const TABLE: &'static str = $table;
            const OWNER_COLUMN: &'static str = stringify!($owner);
            const TARGET_COLUMN: &'static str = stringify!($target);
            const LABEL: &'static str = $label;

            fn id(&self) -> Uuid {
                self.id
            }

            fn owner_id(&self) -> Uuid {
                self.$owner
            }

            fn target_id(&self) -> Uuid {
                self.$target
            }

            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn build(owner: Uuid, target: Uuid, actor: Uuid, now: DateTime<Utc>) -> Self {
                Self {
                    id: Uuid::new_v4(),
                    $owner: owner,
                    $target: target,
                    created_at: now,
                    created_by: actor,
                    deleted_at: None,
                    deleted_by: None,
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

policy_link!(
    /// Assignment of a role to a user.
    UserRole,
    "user_roles",
    "user_role",
    user_id,
    role_id
);

policy_link!(
    /// Grant of a permission to a role.
    RolePermission,
    "role_permissions",
    "role_permission",
    role_id,
    permission_id
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_field_names() {
        assert_eq!(UserRole::OWNER_COLUMN, "user_id");
        assert_eq!(UserRole::TARGET_COLUMN, "role_id");
        assert_eq!(RolePermission::OWNER_COLUMN, "role_id");
        assert_eq!(RolePermission::TARGET_COLUMN, "permission_id");
    }

    #[test]
    fn test_build_maps_owner_and_target() {
        let (role, perm) = (Uuid::new_v4(), Uuid::new_v4());
        let link = RolePermission::build(role, perm, Uuid::nil(), Utc::now());
        assert_eq!(link.role_id, role);
        assert_eq!(link.permission_id, perm);
        assert!(link.is_live());
    }
}
