pub mod types;
pub mod error;
pub mod config;
pub mod clock;
pub mod cache;
pub mod normalize;
pub mod fetcher;
pub mod presentation;

pub use error::{BadgeError, Result};
pub use types::*;
pub use config::{BadgeConfig, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cache::{BadgeCache, CacheEntry};
pub use normalize::{BadgeNormalizer, ProviderKind};
pub use fetcher::{BadgeFetcher, BadgeSource, Resolution};
pub use presentation::{
    render_badges, BadgeStrip, BadgeVisual, IdentityObserver, PresentationAdapter, STRIP_CLASS,
};
