//! Authorization resolver: does a user hold a permission code?

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use gatehouse_core::config::RbacConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_database::store::PolicyGraph;
use gatehouse_entity::user::User;

/// Resolves permission codes through the live policy graph.
///
/// A permission is held only through a chain in which the user-role link,
/// the role, the role-permission link and the permission are all live.
/// Resolved sets can be cached for a short TTL; callers that mutate the
/// policy graph must call [`AuthorizationResolver::invalidate_all`].
#[derive(Clone)]
pub struct AuthorizationResolver {
    graph: Arc<dyn PolicyGraph>,
    cache: Option<Cache<Uuid, Arc<HashSet<String>>>>,
    /// Bumped by every invalidation; a set read under an older value is not cached.
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for AuthorizationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResolver")
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl AuthorizationResolver {
    /// Creates a resolver, caching when `cache_ttl_seconds` is non-zero.
    pub fn new(graph: Arc<dyn PolicyGraph>, config: &RbacConfig) -> Self {
        let cache = (config.cache_ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
                .build()
        });
        Self {
            graph,
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a resolver that always reads the graph.
    pub fn uncached(graph: Arc<dyn PolicyGraph>) -> Self {
        Self {
            graph,
            cache: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Every permission code the user currently holds.
    pub async fn permissions_for(&self, user_id: Uuid) -> AppResult<Arc<HashSet<String>>> {
        if let Some(cache) = &self.cache {
            if let Some(codes) = cache.get(&user_id).await {
                return Ok(codes);
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let codes = Arc::new(self.graph.permission_codes_for_user(user_id).await?);
        if let Some(cache) = &self.cache {
            if self.generation.load(Ordering::Acquire) == generation {
                cache.insert(user_id, codes.clone()).await;
                // An invalidation between the check and the insert may have missed it.
                if self.generation.load(Ordering::Acquire) != generation {
                    cache.invalidate(&user_id).await;
                }
            }
        }
        Ok(codes)
    }

    /// Succeeds if the user holds `code`, otherwise fails with `Forbidden`.
    pub async fn has_permission(&self, code: &str, user: &User) -> AppResult<()> {
        if self.permissions_for(user.id).await?.contains(code) {
            Ok(())
        } else {
            debug!(user_id = %user.id, code, "Permission denied");
            Err(AppError::forbidden(format!("Permission denied: {code}")))
        }
    }

    /// Boolean form of [`AuthorizationResolver::has_permission`].
    pub async fn check(&self, code: &str, user: &User) -> AppResult<bool> {
        match self.has_permission(code, user).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind == ErrorKind::Forbidden => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Sorted permission codes of the user.
    pub async fn permission_codes(&self, user: &User) -> AppResult<Vec<String>> {
        let mut codes: Vec<String> = self.permissions_for(user.id).await?.iter().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    /// Drops every cached permission set, including sets still being read.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}
