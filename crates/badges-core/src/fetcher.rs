use crate::cache::BadgeCache;
use crate::error::Result;
use crate::types::{ProviderBadgeMap, UserId};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Remote registry that can produce the raw badge payload for a user.
#[async_trait]
pub trait BadgeSource: Send + Sync + 'static {
    async fn fetch_user(&self, id: &UserId) -> Result<ProviderBadgeMap>;
}

/// Where a resolved badge set came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Cached(Arc<ProviderBadgeMap>),
    Fetched(Arc<ProviderBadgeMap>),
}

impl Resolution {
    pub fn badges(&self) -> &Arc<ProviderBadgeMap> {
        match self {
            Resolution::Cached(b) | Resolution::Fetched(b) => b,
        }
    }

    pub fn into_badges(self) -> Arc<ProviderBadgeMap> {
        match self {
            Resolution::Cached(b) | Resolution::Fetched(b) => b,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Resolution::Cached(_))
    }
}

/// Serves badge sets from the cache, falling back to the registry when the
/// entry is missing or stale.
///
/// Concurrent lookups for the same user are not coalesced: each one that
/// misses the cache fetches, and the last response to land wins.
///
/// Fetches are spawned on the runtime captured at construction (or set with
/// [`BadgeFetcher::with_runtime`]), so `resolve` may be called from threads
/// outside any runtime context.
pub struct BadgeFetcher<S: BadgeSource> {
    source: Arc<S>,
    cache: Arc<Mutex<BadgeCache>>,
    runtime: Option<Handle>,
}

impl<S: BadgeSource> Clone for BadgeFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cache: self.cache.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<S: BadgeSource> BadgeFetcher<S> {
    /// Build a fetcher bound to the current runtime, if there is one.
    pub fn new(source: Arc<S>, cache: Arc<Mutex<BadgeCache>>) -> Self {
        Self {
            source,
            cache,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Spawn fetches on `runtime` instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn cache(&self) -> &Arc<Mutex<BadgeCache>> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Resolve badges for `id`, awaiting the registry on a miss.
    ///
    /// A failed fetch leaves any existing cache entry untouched.
    pub async fn fetch(&self, id: &UserId) -> Result<Resolution> {
        if let Some(badges) = self.fresh(id) {
            return Ok(Resolution::Cached(badges));
        }
        let badges = self.refresh(id).await?;
        Ok(Resolution::Fetched(badges))
    }

    /// Fire-and-forget resolve.
    ///
    /// On a fresh cache hit `on_result` runs before this returns and `None` is
    /// returned. Otherwise the fetch runs on a spawned task whose handle is
    /// returned; `on_result` runs there only if the fetch succeeds. Failures
    /// are logged and dropped. With no runtime to spawn on, the miss is
    /// logged and treated as a failed fetch.
    pub fn resolve<F>(&self, id: UserId, on_result: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Arc<ProviderBadgeMap>) + Send + 'static,
    {
        if let Some(badges) = self.fresh(&id) {
            debug!("Serving badges for {} from cache", id);
            on_result(badges);
            return None;
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("No async runtime available, skipping badge fetch for {}", id);
            return None;
        };

        let this = self.clone();
        Some(runtime.spawn(async move {
            match this.refresh(&id).await {
                Ok(badges) => on_result(badges),
                Err(e) => debug!("Badge fetch for {} failed: {}", id, e),
            }
        }))
    }

    fn fresh(&self, id: &UserId) -> Option<Arc<ProviderBadgeMap>> {
        self.lock_cache().get_fresh(id)
    }

    async fn refresh(&self, id: &UserId) -> Result<Arc<ProviderBadgeMap>> {
        debug!("Fetching badges for {}", id);
        let badges = Arc::new(self.source.fetch_user(id).await?);
        self.lock_cache().put(id.clone(), badges.clone());
        Ok(badges)
    }

    fn lock_cache(&self) -> MutexGuard<'_, BadgeCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
