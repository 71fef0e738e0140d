//! Role and permission catalogue management with soft delete and restore.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use gatehouse_auth::AuthorizationResolver;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::CatalogStore;
use gatehouse_entity::audit::ChangeAction;
use gatehouse_entity::policy::{Action, CatalogChanges, CatalogEntry, NewCatalogEntry, Permission, Role};

use crate::audit::{ChangeLogService, HistoryEntry};
use crate::context::RequestContext;

/// CRUD over roles.
pub type RoleService = CatalogService<Role>;
/// CRUD over permissions.
pub type PermissionService = CatalogService<Permission>;

/// CRUD, soft delete, restore and revert for one catalogue type.
///
/// Every operation is guarded by `<action>-<label>`, e.g. `restore-role`.
pub struct CatalogService<E: CatalogEntry> {
    store: Arc<dyn CatalogStore<E>>,
    change_log: ChangeLogService,
    resolver: Arc<AuthorizationResolver>,
}

impl<E: CatalogEntry> Clone for CatalogService<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            change_log: self.change_log.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<E: CatalogEntry> std::fmt::Debug for CatalogService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("entity", &E::LABEL)
            .finish_non_exhaustive()
    }
}

impl<E: CatalogEntry> CatalogService<E> {
    /// Creates a new catalogue service.
    pub fn new(
        store: Arc<dyn CatalogStore<E>>,
        change_log: ChangeLogService,
        resolver: Arc<AuthorizationResolver>,
    ) -> Self {
        Self {
            store,
            change_log,
            resolver,
        }
    }

    async fn authorize(&self, ctx: &RequestContext, action: Action) -> AppResult<()> {
        ctx.authorize(&self.resolver, &action.code(E::LABEL)).await
    }

    fn not_found(id: Uuid) -> AppError {
        AppError::not_found(format!("No {} with id {id}", E::LABEL))
    }

    /// Fails with `Conflict` if a live row other than `except` uses `name` or `code`.
    async fn ensure_unique(
        &self,
        name: Option<&str>,
        code: Option<&str>,
        except: Option<Uuid>,
    ) -> AppResult<()> {
        if let Some(name) = name {
            if let Some(existing) = self.store.find_live_by_name(name).await? {
                if Some(existing.id()) != except {
                    return Err(AppError::conflict(format!(
                        "A {} named '{name}' already exists",
                        E::LABEL
                    )));
                }
            }
        }
        if let Some(code) = code {
            if let Some(existing) = self.store.find_live_by_code(code).await? {
                if Some(existing.id()) != except {
                    return Err(AppError::conflict(format!(
                        "A {} with code '{code}' already exists",
                        E::LABEL
                    )));
                }
            }
        }
        Ok(())
    }

    /// Live entries ordered by creation time.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<E>> {
        self.authorize(ctx, Action::GetList).await?;
        self.store.list_live().await
    }

    /// One live entry.
    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> AppResult<E> {
        self.authorize(ctx, Action::Read).await?;
        self.store
            .find_live(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Creates a live entry with a name and code unique among live entries.
    pub async fn create(&self, ctx: &RequestContext, data: NewCatalogEntry) -> AppResult<E> {
        self.authorize(ctx, Action::Create).await?;

        if data.name.trim().is_empty() || data.code.trim().is_empty() {
            return Err(AppError::validation(format!(
                "A {} requires a name and a code",
                E::LABEL
            )));
        }
        self.ensure_unique(Some(&data.name), Some(&data.code), None)
            .await?;

        let entry = self.store.create(&data, ctx.actor_id()).await?;
        self.change_log
            .record(
                E::LABEL,
                entry.id(),
                ChangeAction::Create,
                None,
                Some(&entry),
                ctx.actor_id(),
            )
            .await?;

        info!(
            actor = %ctx.actor_id(),
            id = %entry.id(),
            code = entry.code(),
            "Created {}",
            E::LABEL
        );
        Ok(entry)
    }

    /// Applies a partial update to a live entry.
    ///
    /// Uniqueness is only checked for fields whose value actually changes.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        mut changes: CatalogChanges,
    ) -> AppResult<E> {
        self.authorize(ctx, Action::Update).await?;

        let current = self
            .store
            .find_live(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        if changes.name.as_deref() == Some(current.name()) {
            changes.name = None;
        }
        if changes.code.as_deref() == Some(current.code()) {
            changes.code = None;
        }
        if changes.description.as_ref().map(Option::as_deref) == Some(current.description()) {
            changes.description = None;
        }
        if changes.is_empty() {
            return Ok(current);
        }

        if matches!(changes.name.as_deref(), Some(n) if n.trim().is_empty())
            || matches!(changes.code.as_deref(), Some(c) if c.trim().is_empty())
        {
            return Err(AppError::validation("Name and code must not be empty"));
        }
        self.ensure_unique(changes.name.as_deref(), changes.code.as_deref(), Some(id))
            .await?;

        let updated = self
            .store
            .update(id, &changes)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.change_log
            .record(
                E::LABEL,
                id,
                ChangeAction::Update,
                Some(&current),
                Some(&updated),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), id = %id, "Updated {}", E::LABEL);
        Ok(updated)
    }

    /// Removes an entry in any state together with its links.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        self.authorize(ctx, Action::Delete).await?;

        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        if !self.store.delete(id).await? {
            return Err(Self::not_found(id));
        }

        self.change_log
            .record(
                E::LABEL,
                id,
                ChangeAction::Delete,
                Some(&current),
                None,
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), id = %id, "Deleted {}", E::LABEL);
        Ok(())
    }

    /// Marks a live entry deleted. Absent or already deleted entries are `NotFound`.
    pub async fn soft_delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<E> {
        self.authorize(ctx, Action::Delete).await?;

        let current = self
            .store
            .find_live(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        let deleted = self
            .store
            .soft_delete(id, ctx.actor_id())
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.change_log
            .record(
                E::LABEL,
                id,
                ChangeAction::SoftDelete,
                Some(&current),
                Some(&deleted),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), id = %id, "Soft-deleted {}", E::LABEL);
        Ok(deleted)
    }

    /// Clears the deletion of a soft-deleted entry.
    pub async fn restore(&self, ctx: &RequestContext, id: Uuid) -> AppResult<E> {
        self.authorize(ctx, Action::Restore).await?;

        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        if current.is_live() {
            return Err(AppError::validation(format!(
                "The {} {id} is not deleted",
                E::LABEL
            )));
        }
        self.ensure_unique(Some(current.name()), Some(current.code()), Some(id))
            .await?;

        let restored = self
            .store
            .restore(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.change_log
            .record(
                E::LABEL,
                id,
                ChangeAction::Restore,
                Some(&current),
                Some(&restored),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), id = %id, "Restored {}", E::LABEL);
        Ok(restored)
    }

    /// Change history of an entry, oldest first.
    pub async fn history(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Vec<HistoryEntry>> {
        self.authorize(ctx, Action::Read).await?;
        self.change_log.history(E::LABEL, id).await
    }

    /// Brings an entry back to the state captured before a logged change.
    ///
    /// Fields and deletion state move together: either the whole previous
    /// state is reinstated or nothing changes. Entries recording a creation,
    /// a hard deletion or an assignment cannot be reverted.
    pub async fn revert(&self, ctx: &RequestContext, log_id: Uuid) -> AppResult<E> {
        self.authorize(ctx, Action::Update).await?;

        let log = self.change_log.find(log_id).await?;
        if log.entity_name != E::LABEL {
            return Err(AppError::validation(format!(
                "Change log entry {log_id} does not belong to a {}",
                E::LABEL
            )));
        }
        match log.action_kind() {
            Some(
                ChangeAction::Update
                | ChangeAction::SoftDelete
                | ChangeAction::Restore
                | ChangeAction::Revert,
            ) => {}
            _ => {
                return Err(AppError::validation(format!(
                    "Cannot revert a '{}' change",
                    log.action
                )));
            }
        }

        let target: E = log
            .old_value
            .clone()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| AppError::validation("Change log entry has no previous state"))?;

        let id = log.entity_id;
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        if CatalogChanges::between(&current, &target).is_empty()
            && current.is_live() == target.is_live()
        {
            return Ok(current);
        }
        if target.name().trim().is_empty() || target.code().trim().is_empty() {
            return Err(AppError::validation("Name and code must not be empty"));
        }
        if target.is_live() {
            self.ensure_unique(Some(target.name()), Some(target.code()), Some(id))
                .await?;
        }

        let reverted = self
            .store
            .revert_to(id, &target, ctx.actor_id())
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.change_log
            .record(
                E::LABEL,
                id,
                ChangeAction::Revert,
                Some(&current),
                Some(&reverted),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), id = %id, log_id = %log_id, "Reverted {}", E::LABEL);
        Ok(reverted)
    }
}
