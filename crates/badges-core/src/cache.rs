use crate::clock::{Clock, SystemClock};
use crate::types::{ProviderBadgeMap, UserId};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub badges: Arc<ProviderBadgeMap>,
    pub expires_at: DateTime<Utc>,
}

/// Per-user badge sets with a fixed time-to-live.
///
/// Entries are only ever written by `put` and never removed implicitly;
/// staleness is checked when an entry is read.
pub struct BadgeCache {
    entries: HashMap<UserId, CacheEntry>,
    ttl: ChronoDuration,
    clock: Arc<dyn Clock>,
}

impl BadgeCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Lifetime given to every entry written by `put`.
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    pub fn get(&self, id: &UserId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Return the cached badges for `id` if an entry exists and is still fresh.
    pub fn get_fresh(&self, id: &UserId) -> Option<Arc<ProviderBadgeMap>> {
        self.entries
            .get(id)
            .filter(|e| self.is_fresh(e))
            .map(|e| e.badges.clone())
    }

    pub fn put(&mut self, id: UserId, badges: Arc<ProviderBadgeMap>) {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(id, CacheEntry { badges, expires_at });
    }

    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.expires_at >= self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every stale entry. Returns how many were removed.
    ///
    /// Nothing calls this automatically; hosts that want bounded memory over
    /// a long session can call it on their own schedule.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at >= now);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (BadgeCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = BadgeCache::with_clock(Duration::from_secs(15 * 60), clock.clone());
        (cache, clock)
    }

    fn badges() -> Arc<ProviderBadgeMap> {
        Arc::new(ProviderBadgeMap::new().with_provider("acme", vec!["acme early".into()]))
    }

    #[test]
    fn test_ttl_reports_configured_lifetime() {
        assert_eq!(BadgeCache::new(Duration::from_secs(60)).ttl(), Duration::from_secs(60));
        assert_eq!(BadgeCache::new(Duration::ZERO).ttl(), Duration::ZERO);
    }

    #[test]
    fn test_get_after_put_is_fresh() {
        let (mut cache, _clock) = cache_with_clock();
        let id = UserId::from("1");
        cache.put(id.clone(), badges());

        let entry = cache.get(&id).unwrap();
        assert!(cache.is_fresh(entry));
        assert_eq!(cache.get_fresh(&id), Some(badges()));
    }

    #[test]
    fn test_entry_is_fresh_at_exact_expiry_and_stale_after() {
        let (mut cache, clock) = cache_with_clock();
        let id = UserId::from("1");
        cache.put(id.clone(), badges());

        clock.advance(ChronoDuration::minutes(15));
        assert!(cache.is_fresh(cache.get(&id).unwrap()));

        clock.advance(ChronoDuration::milliseconds(1));
        assert!(!cache.is_fresh(cache.get(&id).unwrap()));
        assert!(cache.get_fresh(&id).is_none());
        // Stale entries are still present until overwritten.
        assert!(cache.get(&id).is_some());
    }

    #[test]
    fn test_put_overwrites_and_resets_expiry() {
        let (mut cache, clock) = cache_with_clock();
        let id = UserId::from("1");
        cache.put(id.clone(), badges());
        let first_expiry = cache.get(&id).unwrap().expires_at;

        clock.advance(ChronoDuration::minutes(20));
        let replacement = Arc::new(ProviderBadgeMap::new());
        cache.put(id.clone(), replacement.clone());

        let entry = cache.get(&id).unwrap();
        assert!(entry.expires_at > first_expiry);
        assert!(entry.badges.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_grows_with_distinct_users() {
        let (mut cache, clock) = cache_with_clock();
        for i in 0..100 {
            cache.put(UserId::new(i.to_string()), badges());
        }
        assert_eq!(cache.len(), 100);

        // Expiry alone never shrinks the map.
        clock.advance(ChronoDuration::hours(1));
        assert_eq!(cache.len(), 100);

        assert_eq!(cache.purge_expired(), 100);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_keeps_fresh_entries() {
        let (mut cache, clock) = cache_with_clock();
        cache.put(UserId::from("old"), badges());
        clock.advance(ChronoDuration::minutes(10));
        cache.put(UserId::from("new"), badges());
        clock.advance(ChronoDuration::minutes(10));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get(&UserId::from("old")).is_none());
        assert!(cache.get(&UserId::from("new")).is_some());
    }
}
