//! Time-windowed record of recent callers
//!
//! Used by the ring policy to recognise a caller who tries again shortly
//! after a first attempt. Eviction is sampled, not scheduled: every lookup
//! and every write purges entries that fell out of the window, so the map
//! never grows past the set of numbers seen within one window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::trace;

use crate::number::NormalizedNumber;

/// Default repeat-caller retention window (15 minutes)
pub const REPEAT_CALLER_WINDOW_SECS: u64 = 15 * 60;

/// Longest window the cache accepts; larger values are clamped
pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Mapping from normalized number to the time that number last called
#[derive(Debug, Clone)]
pub struct RecentCallerCache {
    window: Duration,
    entries: HashMap<NormalizedNumber, DateTime<Utc>>,
}

impl RecentCallerCache {
    /// Create a cache with the default 15 minute window
    pub fn new() -> Self {
        Self::with_window_secs(REPEAT_CALLER_WINDOW_SECS)
    }

    /// Create a cache with a custom retention window
    pub fn with_window_secs(window_secs: u64) -> Self {
        let secs = window_secs.min(MAX_WINDOW_SECS) as i64;
        Self {
            window: Duration::seconds(secs),
            entries: HashMap::new(),
        }
    }

    /// The retention window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record that `number` called at `now`, then purge stale entries
    pub fn record(&mut self, number: &NormalizedNumber, now: DateTime<Utc>) {
        self.entries.insert(number.clone(), now);
        self.purge(now);
    }

    /// How long ago `number` last called, if that was within the window
    ///
    /// The window is inclusive: a sighting exactly one window ago still counts.
    pub fn last_seen(&mut self, number: &NormalizedNumber, now: DateTime<Utc>) -> Option<Duration> {
        self.purge(now);
        self.entries.get(number).map(|seen| {
            let age = now - *seen;
            if age < Duration::zero() {
                Duration::zero()
            } else {
                age
            }
        })
    }

    /// Number of numbers currently remembered
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no number is remembered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every number
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn purge(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let before = self.entries.len();
        self.entries.retain(|_, seen| *seen >= cutoff);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            trace!(evicted, remaining = self.entries.len(), "Evicted stale recent callers");
        }
    }
}

impl Default for RecentCallerCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn num(raw: &str) -> NormalizedNumber {
        NormalizedNumber::parse(raw).unwrap()
    }

    #[test]
    fn unseen_number_is_absent() {
        let mut cache = RecentCallerCache::new();
        assert!(cache.last_seen(&num("+41791234567"), t0()).is_none());
    }

    #[test]
    fn sighting_within_window_reports_age() {
        let mut cache = RecentCallerCache::new();
        cache.record(&num("+41791234567"), t0());

        let age = cache.last_seen(&num("+41 79 123 45 67"), t0() + Duration::minutes(5));
        assert_eq!(age, Some(Duration::minutes(5)));
    }

    #[test]
    fn window_is_inclusive_at_the_boundary() {
        let mut cache = RecentCallerCache::new();
        cache.record(&num("555"), t0());

        assert!(cache.last_seen(&num("555"), t0() + Duration::minutes(15)).is_some());
        assert!(cache
            .last_seen(&num("555"), t0() + Duration::minutes(15) + Duration::seconds(1))
            .is_none());
    }

    #[test]
    fn stale_entries_are_purged_on_write() {
        let mut cache = RecentCallerCache::new();
        cache.record(&num("111"), t0());
        cache.record(&num("222"), t0() + Duration::minutes(20));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_entries_are_purged_on_lookup() {
        let mut cache = RecentCallerCache::new();
        cache.record(&num("111"), t0());
        cache.last_seen(&num("999"), t0() + Duration::minutes(16));

        assert!(cache.is_empty());
    }

    #[test]
    fn recording_twice_is_idempotent() {
        let mut once = RecentCallerCache::new();
        once.record(&num("777"), t0());

        let mut twice = RecentCallerCache::new();
        twice.record(&num("777"), t0());
        twice.record(&num("777"), t0());

        let later = t0() + Duration::minutes(3);
        assert_eq!(once.last_seen(&num("777"), later), twice.last_seen(&num("777"), later));
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn custom_window() {
        let mut cache = RecentCallerCache::with_window_secs(60);
        cache.record(&num("123"), t0());

        assert!(cache.last_seen(&num("123"), t0() + Duration::seconds(60)).is_some());
        assert!(cache.last_seen(&num("123"), t0() + Duration::seconds(61)).is_none());
    }
}
