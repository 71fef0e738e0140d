//! Built-in roles, permissions and grants.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use gatehouse_core::result::AppResult;
use gatehouse_database::store::{CatalogStore, LinkStore};
use gatehouse_entity::SYSTEM_ACTOR;
use gatehouse_entity::policy::{
    Action, CatalogEntry, NewCatalogEntry, Permission, RESOURCES, Role, RolePermission, all_codes,
};

/// Built-in roles as `(code, name)`.
pub const ROLES: [(&str, &str); 3] = [("ADMIN", "Admin"), ("USER", "User"), ("GUEST", "Guest")];

/// Permission codes granted to each built-in role. `ADMIN` holds every code.
fn grants_for(role_code: &str) -> Vec<String> {
    match role_code {
        "ADMIN" => all_codes(),
        "USER" => vec![
            Action::GetList.code("user"),
            Action::Read.code("user"),
            Action::Update.code("user"),
        ],
        "GUEST" => vec![Action::GetList.code("user")],
        _ => Vec::new(),
    }
}

/// What a seeding run created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub roles_created: usize,
    pub permissions_created: usize,
    pub grants_created: usize,
}

/// Idempotently installs the built-in policy graph.
#[derive(Clone)]
pub struct Seeder {
    roles: Arc<dyn CatalogStore<Role>>,
    permissions: Arc<dyn CatalogStore<Permission>>,
    grants: Arc<dyn LinkStore<RolePermission>>,
}

impl std::fmt::Debug for Seeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seeder").finish_non_exhaustive()
    }
}

impl Seeder {
    pub fn new(
        roles: Arc<dyn CatalogStore<Role>>,
        permissions: Arc<dyn CatalogStore<Permission>>,
        grants: Arc<dyn LinkStore<RolePermission>>,
    ) -> Self {
        Self {
            roles,
            permissions,
            grants,
        }
    }

    async fn ensure<E: CatalogEntry>(
        store: &dyn CatalogStore<E>,
        code: &str,
        name: String,
        created: &mut usize,
    ) -> AppResult<E> {
        if let Some(existing) = store.find_live_by_code(code).await? {
            return Ok(existing);
        }
        let entry = store
            .create(
                &NewCatalogEntry {
                    name,
                    description: None,
                    code: code.to_string(),
                },
                SYSTEM_ACTOR,
            )
            .await?;
        *created += 1;
        Ok(entry)
    }

    /// Creates whatever part of the built-in graph is missing.
    pub async fn run(&self) -> AppResult<SeedReport> {
        let mut report = SeedReport::default();

        let mut permissions = Vec::new();
        for resource in RESOURCES {
            for action in Action::ALL {
                let permission = Self::ensure(
                    self.permissions.as_ref(),
                    &action.code(resource),
                    action.display_name(resource),
                    &mut report.permissions_created,
                )
                .await?;
                permissions.push(permission);
            }
        }

        for (code, name) in ROLES {
            let role = Self::ensure(
                self.roles.as_ref(),
                code,
                name.to_string(),
                &mut report.roles_created,
            )
            .await?;

            for granted in grants_for(code) {
                let Some(permission) = permissions.iter().find(|p| p.code == granted) else {
                    continue;
                };
                let existing = self.grants.find(role.id, permission.id).await?;
                if existing.as_ref().is_some_and(|link| link.deleted_at.is_none()) {
                    continue;
                }
                self.grants
                    .create(role.id, permission.id, SYSTEM_ACTOR)
                    .await?;
                report.grants_created += 1;
            }
        }

        info!(
            roles = report.roles_created,
            permissions = report.permissions_created,
            grants = report.grants_created,
            "Seeded built-in policy"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_grants() {
        assert_eq!(grants_for("ADMIN").len(), 18);
        assert_eq!(
            grants_for("USER"),
            vec!["get-list-user", "read-user", "update-user"]
        );
        assert_eq!(grants_for("GUEST"), vec!["get-list-user"]);
        assert!(grants_for("OTHER").is_empty());
    }
}
