//! Granting permissions to roles.

use std::sync::Arc;

use uuid::Uuid;

use gatehouse_auth::AuthorizationResolver;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::{CatalogStore, LinkStore};
use gatehouse_entity::policy::{Action, Permission, Role, RolePermission};

use crate::audit::ChangeLogService;
use crate::context::RequestContext;
use crate::links::{LinkOps, distinct};

const RESOURCE: &str = "role";

/// Manages the role-permission links of the policy graph.
///
/// Reading is guarded by `read-role`, granting and replacing by
/// `update-role`, removal by `delete-role` and restoring by `restore-role`.
#[derive(Clone)]
pub struct GrantService {
    roles: Arc<dyn CatalogStore<Role>>,
    permissions: Arc<dyn CatalogStore<Permission>>,
    links: LinkOps<RolePermission>,
    resolver: Arc<AuthorizationResolver>,
}

impl std::fmt::Debug for GrantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantService").finish_non_exhaustive()
    }
}

impl GrantService {
    /// Creates a new grant service.
    pub fn new(
        roles: Arc<dyn CatalogStore<Role>>,
        permissions: Arc<dyn CatalogStore<Permission>>,
        links: Arc<dyn LinkStore<RolePermission>>,
        change_log: ChangeLogService,
        resolver: Arc<AuthorizationResolver>,
    ) -> Self {
        Self {
            roles,
            permissions,
            links: LinkOps::new(links, change_log, resolver.clone()),
            resolver,
        }
    }

    async fn live_role(&self, role_id: Uuid) -> AppResult<Role> {
        self.roles
            .find_live(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No role with id {role_id}")))
    }

    async fn live_permission(&self, permission_id: Uuid) -> AppResult<Permission> {
        self.permissions
            .find_live(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No permission with id {permission_id}")))
    }

    /// Live permissions granted to a live role through live links.
    pub async fn permissions_of(&self, ctx: &RequestContext, role_id: Uuid) -> AppResult<Vec<Permission>> {
        ctx.authorize(&self.resolver, &Action::Read.code(RESOURCE))
            .await?;
        self.live_role(role_id).await?;

        let mut permissions = Vec::new();
        for permission_id in self.links.live_targets(role_id).await? {
            if let Some(permission) = self.permissions.find_live(permission_id).await? {
                permissions.push(permission);
            }
        }
        Ok(permissions)
    }

    /// Grants one permission. A live duplicate is `Conflict`.
    pub async fn grant(
        &self,
        ctx: &RequestContext,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<RolePermission> {
        ctx.authorize(&self.resolver, &Action::Update.code(RESOURCE))
            .await?;
        self.live_role(role_id).await?;
        self.live_permission(permission_id).await?;

        self.links.create(ctx, role_id, permission_id).await
    }

    /// Replaces every grant of the role with the given permissions.
    pub async fn set_permissions(
        &self,
        ctx: &RequestContext,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<Vec<RolePermission>> {
        ctx.authorize(&self.resolver, &Action::Update.code(RESOURCE))
            .await?;
        self.live_role(role_id).await?;

        let permission_ids = distinct(permission_ids);
        for permission_id in &permission_ids {
            self.live_permission(*permission_id).await?;
        }

        self.links.replace(ctx, role_id, &permission_ids).await
    }

    /// Removes a live grant.
    pub async fn remove(&self, ctx: &RequestContext, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        ctx.authorize(&self.resolver, &Action::Delete.code(RESOURCE))
            .await?;
        self.links.remove(ctx, role_id, permission_id).await
    }

    /// Soft-deletes a live grant.
    pub async fn soft_delete(
        &self,
        ctx: &RequestContext,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<RolePermission> {
        ctx.authorize(&self.resolver, &Action::Delete.code(RESOURCE))
            .await?;
        self.links.soft_delete(ctx, role_id, permission_id).await
    }

    /// Restores a soft-deleted grant.
    pub async fn restore(
        &self,
        ctx: &RequestContext,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<RolePermission> {
        ctx.authorize(&self.resolver, &Action::Restore.code(RESOURCE))
            .await?;
        self.links.restore(ctx, role_id, permission_id).await
    }
}
