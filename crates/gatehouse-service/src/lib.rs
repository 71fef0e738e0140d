//! # gatehouse-service
//!
//! Application services for Gatehouse. Each service orchestrates the store
//! contracts, the token manager and the authorization resolver to implement
//! one group of use cases.
//!
//! Services follow constructor injection: every dependency is an `Arc`
//! handle supplied at construction, so the same code runs over PostgreSQL
//! or the in-memory stores.

pub mod account;
pub mod audit;
pub mod catalog;
pub mod context;
pub mod grants;
mod links;
pub mod seed;
pub mod user_roles;

use std::sync::Arc;

use gatehouse_auth::token::build_codec;
use gatehouse_auth::{AuthorizationResolver, PasswordHasher, TokenManager};
use gatehouse_core::config::{AppConfig, AuthConfig, RbacConfig, TokenConfig};
use gatehouse_core::result::AppResult;
use gatehouse_database::Stores;

pub use account::{AccountService, ChangePasswordRequest, LoginRequest, RegisterRequest};
pub use audit::{ChangeLogService, FieldChange, HistoryEntry};
pub use catalog::{CatalogService, PermissionService, RoleService};
pub use context::{Actor, RequestContext};
pub use grants::GrantService;
pub use seed::{SeedReport, Seeder};
pub use user_roles::UserRoleService;

/// Every service wired over one set of stores.
#[derive(Debug, Clone)]
pub struct Gatehouse {
    pub stores: Stores,
    pub tokens: Arc<TokenManager>,
    pub resolver: Arc<AuthorizationResolver>,
    pub accounts: AccountService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub grants: GrantService,
    pub user_roles: UserRoleService,
    pub change_log: ChangeLogService,
    pub seeder: Seeder,
}

impl Gatehouse {
    /// Wires the services from the loaded configuration.
    pub fn new(stores: Stores, config: &AppConfig) -> Self {
        Self::with_settings(stores, &config.auth, &config.token, &config.rbac)
    }

    /// Wires the services from individual configuration sections.
    pub fn with_settings(
        stores: Stores,
        auth: &AuthConfig,
        token: &TokenConfig,
        rbac: &RbacConfig,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(
            build_codec(auth, token),
            stores.tokens.clone(),
            stores.users.clone(),
            token.clone(),
        ));
        let resolver = Arc::new(AuthorizationResolver::new(stores.graph.clone(), rbac));
        let change_log = ChangeLogService::new(stores.change_logs.clone());

        let accounts = AccountService::new(
            stores.users.clone(),
            Arc::new(PasswordHasher::new()),
            tokens.clone(),
            auth,
        );
        let roles = RoleService::new(stores.roles.clone(), change_log.clone(), resolver.clone());
        let permissions =
            PermissionService::new(stores.permissions.clone(), change_log.clone(), resolver.clone());
        let grants = GrantService::new(
            stores.roles.clone(),
            stores.permissions.clone(),
            stores.role_permissions.clone(),
            change_log.clone(),
            resolver.clone(),
        );
        let user_roles = UserRoleService::new(
            stores.users.clone(),
            stores.roles.clone(),
            stores.user_roles.clone(),
            change_log.clone(),
            resolver.clone(),
        );
        let seeder = Seeder::new(
            stores.roles.clone(),
            stores.permissions.clone(),
            stores.role_permissions.clone(),
        );

        Self {
            stores,
            tokens,
            resolver,
            accounts,
            roles,
            permissions,
            grants,
            user_roles,
            change_log,
            seeder,
        }
    }

    /// Installs the built-in policy graph and drops cached permissions.
    pub async fn seed(&self) -> AppResult<SeedReport> {
        let report = self.seeder.run().await?;
        self.resolver.invalidate_all();
        Ok(report)
    }
}
