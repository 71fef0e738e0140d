//! In-memory permission resolution over the four policy stores.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::policy::{Permission, PolicyLink, Role, RolePermission, UserRole};

use super::{MemoryCatalogStore, MemoryLinkStore};
use crate::store::PolicyGraph;

/// Walks user-role links to roles, role-permission links to permissions,
/// keeping only live rows at every hop.
#[derive(Debug, Clone)]
pub struct MemoryPolicyGraph {
    user_roles: Arc<MemoryLinkStore<UserRole>>,
    roles: Arc<MemoryCatalogStore<Role>>,
    role_permissions: Arc<MemoryLinkStore<RolePermission>>,
    permissions: Arc<MemoryCatalogStore<Permission>>,
}

impl MemoryPolicyGraph {
    pub fn new(
        user_roles: Arc<MemoryLinkStore<UserRole>>,
        roles: Arc<MemoryCatalogStore<Role>>,
        role_permissions: Arc<MemoryLinkStore<RolePermission>>,
        permissions: Arc<MemoryCatalogStore<Permission>>,
    ) -> Self {
        Self {
            user_roles,
            roles,
            role_permissions,
            permissions,
        }
    }
}

#[async_trait]
impl PolicyGraph for MemoryPolicyGraph {
    async fn permission_codes_for_user(&self, user_id: Uuid) -> AppResult<HashSet<String>> {
        let live_roles: HashSet<Uuid> = self
            .roles
            .snapshot()
            .await
            .into_iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.id)
            .collect();

        let codes_by_permission: HashMap<Uuid, String> = self
            .permissions
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.deleted_at.is_none())
            .map(|p| (p.id, p.code))
            .collect();

        let roles: HashSet<Uuid> = self
            .user_roles
            .snapshot()
            .await
            .into_iter()
            .filter(|link| link.is_live() && link.user_id == user_id)
            .map(|link| link.role_id)
            .filter(|role_id| live_roles.contains(role_id))
            .collect();

        Ok(self
            .role_permissions
            .snapshot()
            .await
            .into_iter()
            .filter(|link| link.is_live() && roles.contains(&link.role_id))
            .filter_map(|link| codes_by_permission.get(&link.permission_id).cloned())
            .collect())
    }
}
