//! Policy graph store contracts.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::AppResult;
use gatehouse_entity::policy::{CatalogChanges, CatalogEntry, NewCatalogEntry, PolicyLink};

/// Roles or permissions.
#[async_trait]
pub trait CatalogStore<E: CatalogEntry>: Send + Sync + 'static {
    /// Lookup regardless of soft-delete state.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<E>>;

    /// Lookup among live rows only.
    async fn find_live(&self, id: Uuid) -> AppResult<Option<E>>;

    async fn find_live_by_name(&self, name: &str) -> AppResult<Option<E>>;

    async fn find_live_by_code(&self, code: &str) -> AppResult<Option<E>>;

    /// Live rows ordered by creation time.
    async fn list_live(&self) -> AppResult<Vec<E>>;

    /// Insert a live row. A live duplicate name or code yields `Conflict`.
    async fn create(&self, data: &NewCatalogEntry, actor: Uuid) -> AppResult<E>;

    /// Apply `changes` to a live row. `None` if no live row has this id.
    async fn update(&self, id: Uuid, changes: &CatalogChanges) -> AppResult<Option<E>>;

    /// Soft-delete a live row. `None` if no live row has this id.
    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<E>>;

    /// Clear the soft-delete fields of a deleted row. `None` if no deleted row has this id.
    async fn restore(&self, id: Uuid) -> AppResult<Option<E>>;

    /// Hard-delete a row in any state, cascading to its links.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Overwrite name, description, code and deletion state of a row in any
    /// state with those of `target`, in one step. A row that becomes deleted
    /// is stamped with `actor`; a row that stays deleted keeps its stamp.
    /// A live duplicate yields `Conflict` and leaves the row untouched.
    async fn revert_to(&self, id: Uuid, target: &E, actor: Uuid) -> AppResult<Option<E>>;
}

/// User-role or role-permission links.
#[async_trait]
pub trait LinkStore<L: PolicyLink>: Send + Sync + 'static {
    /// The live link between `owner` and `target`, or else the most recently
    /// soft-deleted one.
    async fn find(&self, owner: Uuid, target: Uuid) -> AppResult<Option<L>>;

    /// Live links of an owner ordered by creation time.
    async fn list_live_for_owner(&self, owner: Uuid) -> AppResult<Vec<L>>;

    /// Insert a live link. A live duplicate yields `Conflict`.
    async fn create(&self, owner: Uuid, target: Uuid, actor: Uuid) -> AppResult<L>;

    /// Atomically hard-delete every link of `owner` and insert one live link per target.
    async fn replace_for_owner(
        &self,
        owner: Uuid,
        targets: &[Uuid],
        actor: Uuid,
    ) -> AppResult<Vec<L>>;

    /// Hard-delete by id.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Soft-delete a live link by id. `None` if it is not live.
    async fn soft_delete(&self, id: Uuid, actor: Uuid) -> AppResult<Option<L>>;

    /// Restore a soft-deleted link by id. `None` if it is not deleted.
    async fn restore(&self, id: Uuid) -> AppResult<Option<L>>;
}

/// Read side of the policy graph used by the authorization resolver.
#[async_trait]
pub trait PolicyGraph: Send + Sync + 'static {
    /// Codes of every permission reachable from the user through a chain of
    /// live user-role link, role, role-permission link and permission.
    async fn permission_codes_for_user(&self, user_id: Uuid) -> AppResult<HashSet<String>>;
}
