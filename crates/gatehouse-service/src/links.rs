//! Mutations shared by user-role and role-permission links.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use gatehouse_auth::AuthorizationResolver;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::LinkStore;
use gatehouse_entity::audit::ChangeAction;
use gatehouse_entity::policy::PolicyLink;

use crate::audit::ChangeLogService;
use crate::context::RequestContext;

/// Link mutations that log to the change log and drop cached permissions.
///
/// Callers check permissions and the existence of both ends first.
pub(crate) struct LinkOps<L: PolicyLink> {
    store: Arc<dyn LinkStore<L>>,
    change_log: ChangeLogService,
    resolver: Arc<AuthorizationResolver>,
}

impl<L: PolicyLink> Clone for LinkOps<L> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            change_log: self.change_log.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<L: PolicyLink> LinkOps<L> {
    pub(crate) fn new(
        store: Arc<dyn LinkStore<L>>,
        change_log: ChangeLogService,
        resolver: Arc<AuthorizationResolver>,
    ) -> Self {
        Self {
            store,
            change_log,
            resolver,
        }
    }

    fn not_found(owner: Uuid, target: Uuid) -> AppError {
        AppError::not_found(format!("No {} link between {owner} and {target}", L::LABEL))
    }

    /// Target ids of the owner's live links.
    pub(crate) async fn live_targets(&self, owner: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .store
            .list_live_for_owner(owner)
            .await?
            .iter()
            .map(L::target_id)
            .collect())
    }

    pub(crate) async fn create(&self, ctx: &RequestContext, owner: Uuid, target: Uuid) -> AppResult<L> {
        let link = self.store.create(owner, target, ctx.actor_id()).await?;

        self.change_log
            .record(L::LABEL, link.id(), ChangeAction::Create, None, Some(&link), ctx.actor_id())
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), owner = %owner, target = %target, "Created {} link", L::LABEL);
        Ok(link)
    }

    /// Replaces every link of `owner` with one live link per target.
    pub(crate) async fn replace(
        &self,
        ctx: &RequestContext,
        owner: Uuid,
        targets: &[Uuid],
    ) -> AppResult<Vec<L>> {
        let before = self.live_targets(owner).await?;
        let links = self
            .store
            .replace_for_owner(owner, targets, ctx.actor_id())
            .await?;
        let after: Vec<Uuid> = links.iter().map(L::target_id).collect();

        self.change_log
            .record(
                L::LABEL,
                owner,
                ChangeAction::Assign,
                Some(&serde_json::json!({ "targets": before })),
                Some(&serde_json::json!({ "targets": after })),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), owner = %owner, count = links.len(), "Replaced {} links", L::LABEL);
        Ok(links)
    }

    /// Hard-deletes the live link between `owner` and `target`.
    pub(crate) async fn remove(&self, ctx: &RequestContext, owner: Uuid, target: Uuid) -> AppResult<()> {
        let link = self
            .store
            .find(owner, target)
            .await?
            .filter(L::is_live)
            .ok_or_else(|| Self::not_found(owner, target))?;

        if !self.store.delete(link.id()).await? {
            return Err(Self::not_found(owner, target));
        }

        self.change_log
            .record(L::LABEL, link.id(), ChangeAction::Delete, Some(&link), None, ctx.actor_id())
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), owner = %owner, target = %target, "Removed {} link", L::LABEL);
        Ok(())
    }

    pub(crate) async fn soft_delete(&self, ctx: &RequestContext, owner: Uuid, target: Uuid) -> AppResult<L> {
        let link = self
            .store
            .find(owner, target)
            .await?
            .filter(L::is_live)
            .ok_or_else(|| Self::not_found(owner, target))?;

        let deleted = self
            .store
            .soft_delete(link.id(), ctx.actor_id())
            .await?
            .ok_or_else(|| Self::not_found(owner, target))?;

        self.change_log
            .record(
                L::LABEL,
                deleted.id(),
                ChangeAction::SoftDelete,
                Some(&link),
                Some(&deleted),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), owner = %owner, target = %target, "Soft-deleted {} link", L::LABEL);
        Ok(deleted)
    }

    /// Restores the most recently soft-deleted link. A live link is `Validation`.
    pub(crate) async fn restore(&self, ctx: &RequestContext, owner: Uuid, target: Uuid) -> AppResult<L> {
        let link = self
            .store
            .find(owner, target)
            .await?
            .ok_or_else(|| Self::not_found(owner, target))?;
        if link.is_live() {
            return Err(AppError::validation(format!(
                "The {} link between {owner} and {target} is not deleted",
                L::LABEL
            )));
        }

        let restored = self
            .store
            .restore(link.id())
            .await?
            .ok_or_else(|| Self::not_found(owner, target))?;

        self.change_log
            .record(
                L::LABEL,
                restored.id(),
                ChangeAction::Restore,
                Some(&link),
                Some(&restored),
                ctx.actor_id(),
            )
            .await?;
        self.resolver.invalidate_all();

        info!(actor = %ctx.actor_id(), owner = %owner, target = %target, "Restored {} link", L::LABEL);
        Ok(restored)
    }
}

/// Ids in first-seen order without repeats.
pub(crate) fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(distinct(&[a, b, a, b, a]), vec![a, b]);
        assert!(distinct(&[]).is_empty());
    }
}
