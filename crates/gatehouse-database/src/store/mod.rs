//! Store contracts.
//!
//! Components receive these as `Arc<dyn ...>` handles at construction, so the
//! same service code runs over PostgreSQL or the in-memory stores.

pub mod audit;
pub mod credential;
pub mod policy;
pub mod token;

use std::sync::Arc;

use sqlx::PgPool;

use gatehouse_entity::policy::{Permission, Role, RolePermission, UserRole};

pub use audit::ChangeLogStore;
pub use credential::CredentialStore;
pub use policy::{CatalogStore, LinkStore, PolicyGraph};
pub use token::{IssueOutcome, RotationOutcome, TokenStore};

use crate::memory::{
    CascadeTarget, MemoryCatalogStore, MemoryChangeLogStore, MemoryCredentialStore, MemoryLinkStore,
    MemoryPolicyGraph, MemoryTokenStore,
};
use crate::repositories::{
    CatalogRepository, ChangeLogRepository, LinkRepository, PolicyGraphRepository,
    TokenRepository, UserRepository,
};

/// Every store handle the services need, bundled for wiring.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub roles: Arc<dyn CatalogStore<Role>>,
    pub permissions: Arc<dyn CatalogStore<Permission>>,
    pub user_roles: Arc<dyn LinkStore<UserRole>>,
    pub role_permissions: Arc<dyn LinkStore<RolePermission>>,
    pub graph: Arc<dyn PolicyGraph>,
    pub change_logs: Arc<dyn ChangeLogStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            tokens: Arc::new(TokenRepository::new(pool.clone())),
            roles: Arc::new(CatalogRepository::<Role>::new(pool.clone())),
            permissions: Arc::new(CatalogRepository::<Permission>::new(pool.clone())),
            user_roles: Arc::new(LinkRepository::<UserRole>::new(pool.clone())),
            role_permissions: Arc::new(LinkRepository::<RolePermission>::new(pool.clone())),
            graph: Arc::new(PolicyGraphRepository::new(pool.clone())),
            change_logs: Arc::new(ChangeLogRepository::new(pool)),
        }
    }

    /// Process-local stores.
    pub fn in_memory() -> Self {
        let user_roles = Arc::new(MemoryLinkStore::<UserRole>::new());
        let role_permissions = Arc::new(MemoryLinkStore::<RolePermission>::new());
        let roles = Arc::new(MemoryCatalogStore::<Role>::new().with_cascade(vec![
            user_roles.clone() as Arc<dyn CascadeTarget>,
            role_permissions.clone() as Arc<dyn CascadeTarget>,
        ]));
        let permissions = Arc::new(
            MemoryCatalogStore::<Permission>::new()
                .with_cascade(vec![role_permissions.clone() as Arc<dyn CascadeTarget>]),
        );
        let graph = Arc::new(MemoryPolicyGraph::new(
            user_roles.clone(),
            roles.clone(),
            role_permissions.clone(),
            permissions.clone(),
        ));

        Self {
            users: Arc::new(MemoryCredentialStore::new()),
            tokens: Arc::new(MemoryTokenStore::new()),
            roles,
            permissions,
            user_roles,
            role_permissions,
            graph,
            change_logs: Arc::new(MemoryChangeLogStore::new()),
        }
    }
}
