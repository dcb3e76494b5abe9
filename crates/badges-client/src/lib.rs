//! HTTP client for the global badge registry.
//!
//! Implements [`BadgeSource`] over `GET {base}/users/{id}` so it can be plugged
//! straight into a [`BadgeFetcher`].
//!
//! # Example
//! ```rust,no_run
//! use badges_client::global_badges;
//! use badges_core::{BadgeConfig, UserId};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let adapter = global_badges(BadgeConfig::default())?;
//!     let user = UserId::from("354191516979429376");
//!
//!     if let Some(fetch) = adapter.observe(&user) {
//!         fetch.await?;
//!     }
//!     for badge in adapter.render().badges {
//!         println!("{} -> {}", badge.label, badge.image_url);
//!     }
//!     Ok(())
//! }
//! ```
use async_trait::async_trait;
use badges_core::{
    BadgeCache, BadgeConfig, BadgeError, BadgeFetcher, BadgeNormalizer, BadgeSource,
    PresentationAdapter, ProviderBadgeMap, UserId,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Registry client over a shared `reqwest` connection pool.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    config: BadgeConfig,
}

impl RegistryClient {
    /// Build a client for the registry named in `config`.
    pub fn new(config: BadgeConfig) -> anyhow::Result<Self> {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Build a client reusing an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, config: BadgeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    /// Fetch and decode the raw badge payload for `id`.
    ///
    /// Non-success statuses are errors so that error pages never reach the cache.
    pub async fn user_badges(&self, id: &UserId) -> badges_core::Result<ProviderBadgeMap> {
        let url = self.config.user_url(id.as_str());
        debug!(%url, "fetching user badges");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BadgeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "badge registry returned an error status");
            return Err(BadgeError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BadgeError::Transport(e.to_string()))?;
        ProviderBadgeMap::from_json(&body)
    }

    /// `{base}/badges/{provider}/{token}`, the image the host should load.
    pub fn badge_image_url(&self, provider: &str, token: &str) -> String {
        self.config.badge_image_url(provider, token)
    }

    /// Wrap this client in a fetcher with a fresh cache using the configured TTL.
    pub fn into_fetcher(self) -> BadgeFetcher<Self> {
        let cache = BadgeCache::new(self.config.cache_ttl());
        BadgeFetcher::new(Arc::new(self), Arc::new(Mutex::new(cache)))
    }
}

#[async_trait]
impl BadgeSource for RegistryClient {
    async fn fetch_user(&self, id: &UserId) -> badges_core::Result<ProviderBadgeMap> {
        self.user_badges(id).await
    }
}

/// Wire a registry client, cache, fetcher and normalizer into a ready
/// presentation adapter.
pub fn global_badges(config: BadgeConfig) -> anyhow::Result<PresentationAdapter<RegistryClient>> {
    let normalizer = BadgeNormalizer::new(config.clone());
    let fetcher = RegistryClient::new(config)?.into_fetcher();
    Ok(PresentationAdapter::new(fetcher, normalizer))
}
