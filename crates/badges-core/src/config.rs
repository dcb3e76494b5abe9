use crate::error::{BadgeError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://clientmodbadges-api.herokuapp.com";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Configuration for badge resolution and presentation.
///
/// Deserializes with every field optional, so a host can embed a partial
/// `[badges]` table in its own config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    /// Registry root, without a trailing slash. Default: the public registry.
    pub base_url: String,

    /// Lifetime of a cached badge set in seconds. Default: 900 (15 minutes).
    pub cache_ttl_secs: u64,

    /// Provider whose badges are already shown by the host. Default: "vencord".
    pub home_provider: String,

    /// Provider whose entries carry their own name and image. Default: "badgevault".
    pub aggregator_provider: String,

    /// Exact-match expansions for stripped badge names.
    pub abbreviations: HashMap<String, String>,

    /// Labels containing this substring are drawn slightly smaller.
    pub scaled_marker: String,

    /// Scale applied to marked labels. Must be in (0, 1].
    pub scaled_factor: f32,

    /// Width and height of a badge image in pixels.
    pub badge_size_px: u32,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        let abbreviations = [("hunter", "Bug Hunter"), ("early", "Early User")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            home_provider: "vencord".to_string(),
            aggregator_provider: "badgevault".to_string(),
            abbreviations,
            scaled_marker: "Replugged".to_string(),
            scaled_factor: 0.9,
            badge_size_px: 22,
        }
    }
}

impl BadgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_home_provider(mut self, provider: impl Into<String>) -> Self {
        self.home_provider = provider.into();
        self
    }

    pub fn with_aggregator_provider(mut self, provider: impl Into<String>) -> Self {
        self.aggregator_provider = provider.into();
        self
    }

    pub fn with_abbreviation(mut self, short: impl Into<String>, full: impl Into<String>) -> Self {
        self.abbreviations.insert(short.into(), full.into());
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Base URL with any trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `{base}/users/{id}`
    pub fn user_url(&self, id: &str) -> String {
        format!("{}/users/{}", self.base_url(), id)
    }

    /// `{base}/badges/{provider}/{token}`
    pub fn badge_image_url(&self, provider: &str, token: &str) -> String {
        format!("{}/badges/{}/{}", self.base_url(), provider, token)
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url();
        if base.is_empty() {
            return Err(BadgeError::Validation("base_url must not be empty".into()));
        }

        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(BadgeError::Validation(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }

        if self.cache_ttl_secs == 0 {
            return Err(BadgeError::Validation("cache_ttl_secs must be > 0".into()));
        }

        if self.home_provider.trim().is_empty() || self.aggregator_provider.trim().is_empty() {
            return Err(BadgeError::Validation(
                "reserved provider names must not be empty".into(),
            ));
        }

        if !(self.scaled_factor > 0.0 && self.scaled_factor <= 1.0) {
            return Err(BadgeError::Validation(format!(
                "scaled_factor must be in (0, 1], got {}",
                self.scaled_factor
            )));
        }

        Ok(())
    }
}
