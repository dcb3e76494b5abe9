use crate::config::BadgeConfig;
use crate::types::{DisplayBadge, ProviderBadgeMap, RawBadge};
use log::trace;

/// How a provider's entries are turned into display badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// The host's own badges; shown elsewhere, never here.
    Home,
    /// Entries already carry a display name and image URL.
    Aggregator,
    /// Entries are bare strings; name and image are derived.
    Generic,
}

/// Turns a registry payload into an ordered list of display badges.
pub struct BadgeNormalizer {
    config: BadgeConfig,
}

impl BadgeNormalizer {
    pub fn new(config: BadgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    pub fn classify(&self, provider: &str) -> ProviderKind {
        if provider.eq_ignore_ascii_case(&self.config.home_provider) {
            ProviderKind::Home
        } else if provider.eq_ignore_ascii_case(&self.config.aggregator_provider) {
            ProviderKind::Aggregator
        } else {
            ProviderKind::Generic
        }
    }

    pub fn normalize(&self, badges: &ProviderBadgeMap) -> Vec<DisplayBadge> {
        let mut out = Vec::new();

        for (provider, entries) in badges.iter() {
            let kind = self.classify(provider);
            for entry in entries {
                match (kind, entry) {
                    (ProviderKind::Home, _) => {}
                    (ProviderKind::Aggregator, RawBadge::Record { name, badge }) => {
                        out.push(DisplayBadge::new(name.clone(), badge.clone()));
                    }
                    (ProviderKind::Generic, RawBadge::Plain(raw)) => {
                        out.push(self.derive(provider, raw));
                    }
                    (kind, other) => {
                        trace!("Skipping {:?} entry for {:?} provider {}", other, kind, provider);
                    }
                }
            }
        }

        out
    }

    /// Build the label and image for a bare badge string.
    fn derive(&self, provider: &str, raw: &str) -> DisplayBadge {
        let stripped = raw.replacen(provider, "", 1);
        let stripped = stripped.trim();
        let token = stripped.split_whitespace().next().unwrap_or("");

        let clean_name = self
            .config
            .abbreviations
            .get(stripped)
            .map(String::as_str)
            .unwrap_or(stripped);

        DisplayBadge {
            label: format!("{} {}", provider, capitalize(clean_name)),
            image_url: self.config.badge_image_url(provider, token),
        }
    }
}

impl Default for BadgeNormalizer {
    fn default() -> Self {
        Self::new(BadgeConfig::default())
    }
}

/// Uppercase the first character only.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
