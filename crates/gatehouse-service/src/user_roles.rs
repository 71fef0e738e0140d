//! User listing and role assignment.

use std::sync::Arc;

use uuid::Uuid;

use gatehouse_auth::AuthorizationResolver;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::{CatalogStore, CredentialStore, LinkStore};
use gatehouse_entity::policy::{Action, Role, UserRole};
use gatehouse_entity::user::User;

use crate::audit::ChangeLogService;
use crate::context::RequestContext;
use crate::links::{LinkOps, distinct};

const RESOURCE: &str = "user";

/// Manages the user-role links of the policy graph.
#[derive(Clone)]
pub struct UserRoleService {
    users: Arc<dyn CredentialStore>,
    roles: Arc<dyn CatalogStore<Role>>,
    links: LinkOps<UserRole>,
    resolver: Arc<AuthorizationResolver>,
}

impl std::fmt::Debug for UserRoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRoleService").finish_non_exhaustive()
    }
}

impl UserRoleService {
    /// Creates a new user-role service.
    pub fn new(
        users: Arc<dyn CredentialStore>,
        roles: Arc<dyn CatalogStore<Role>>,
        links: Arc<dyn LinkStore<UserRole>>,
        change_log: ChangeLogService,
        resolver: Arc<AuthorizationResolver>,
    ) -> Self {
        Self {
            users,
            roles,
            links: LinkOps::new(links, change_log, resolver.clone()),
            resolver,
        }
    }

    async fn existing_user(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No user with id {user_id}")))
    }

    /// All users ordered by creation time.
    pub async fn list_users(&self, ctx: &RequestContext) -> AppResult<Vec<User>> {
        ctx.authorize(&self.resolver, &Action::GetList.code(RESOURCE))
            .await?;
        self.users.list().await
    }

    /// Live roles reachable from the user through live links.
    pub async fn roles_of(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<Vec<Role>> {
        ctx.authorize(&self.resolver, &Action::Read.code(RESOURCE))
            .await?;
        self.existing_user(user_id).await?;

        let mut roles = Vec::new();
        for role_id in self.links.live_targets(user_id).await? {
            if let Some(role) = self.roles.find_live(role_id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    /// Replaces every role link of the user with one live link per role.
    ///
    /// Duplicate ids are collapsed; every role must be live.
    pub async fn assign(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<Vec<UserRole>> {
        ctx.authorize(&self.resolver, &Action::Update.code(RESOURCE))
            .await?;
        self.existing_user(user_id).await?;

        let role_ids = distinct(role_ids);
        for role_id in &role_ids {
            if self.roles.find_live(*role_id).await?.is_none() {
                return Err(AppError::not_found(format!("No role with id {role_id}")));
            }
        }

        self.links.replace(ctx, user_id, &role_ids).await
    }

    /// Removes a live role link.
    pub async fn remove(&self, ctx: &RequestContext, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        ctx.authorize(&self.resolver, &Action::Delete.code(RESOURCE))
            .await?;
        self.links.remove(ctx, user_id, role_id).await
    }

    /// Soft-deletes a live role link.
    pub async fn soft_delete(&self, ctx: &RequestContext, user_id: Uuid, role_id: Uuid) -> AppResult<UserRole> {
        ctx.authorize(&self.resolver, &Action::Delete.code(RESOURCE))
            .await?;
        self.links.soft_delete(ctx, user_id, role_id).await
    }

    /// Restores a soft-deleted role link.
    pub async fn restore(&self, ctx: &RequestContext, user_id: Uuid, role_id: Uuid) -> AppResult<UserRole> {
        ctx.authorize(&self.resolver, &Action::Restore.code(RESOURCE))
            .await?;
        self.links.restore(ctx, user_id, role_id).await
    }
}
