//! Concurrent key → window counter map.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::counter::{Decision, WindowCounter};

/// Aggregate view over the counters whose window is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveSummary {
    /// Number of keys with a running window
    pub keys: usize,
    /// Sum of their counts
    pub requests: u64,
}

/// A named map of window counters.
///
/// Each check holds the shard lock for its key for the whole read-modify-write,
/// so concurrent requests for one key never lose an update.
#[derive(Debug)]
pub struct WindowStore {
    name: &'static str,
    counters: DashMap<String, WindowCounter>,
}

impl WindowStore {
    /// Create an empty store. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            counters: DashMap::new(),
        }
    }

    /// Count one request for `key` and decide whether it is admitted.
    ///
    /// `identifier` is recorded on first sight of the key only.
    pub fn check_and_increment(
        &self,
        key: &str,
        max_requests: u32,
        window_ms: u64,
        now_ms: u64,
        identifier: Option<&str>,
    ) -> Decision {
        trace!(store = self.name, key = %key, max_requests, window_ms, "Checking window counter");

        // Avoid allocating the key on the hot path when it already exists.
        if let Some(mut counter) = self.counters.get_mut(key) {
            return counter.hit(now_ms, max_requests, window_ms);
        }

        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().hit(now_ms, max_requests, window_ms),
            Entry::Vacant(vacant) => {
                debug!(
                    store = self.name,
                    key = %key,
                    max_requests,
                    window_ms,
                    "Creating new window counter"
                );
                let counter = WindowCounter::open(now_ms, window_ms, identifier.map(str::to_string));
                let decision = counter.allowed(max_requests);
                vacant.insert(counter);
                decision
            }
        }
    }

    /// Counters whose window is still running at `now_ms`. Does not mutate.
    pub fn active_summary(&self, now_ms: u64) -> ActiveSummary {
        self.counters
            .iter()
            .filter(|entry| entry.value().is_active(now_ms))
            .fold(ActiveSummary::default(), |mut acc, entry| {
                acc.keys += 1;
                acc.requests += u64::from(entry.value().count());
                acc
            })
    }

    /// Drop counters whose window ended more than `grace_ms` before `now_ms`.
    ///
    /// Returns how many were removed.
    pub fn evict_stale(&self, now_ms: u64, grace_ms: u64) -> usize {
        let mut removed = 0;
        self.counters.retain(|_, counter| {
            let keep = counter.expired_for_ms(now_ms) <= grace_ms;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Snapshot of a single counter.
    pub fn get(&self, key: &str) -> Option<WindowCounter> {
        self.counters.get(key).map(|c| c.value().clone())
    }

    /// Number of stored keys, expired ones included.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether the store holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Remove every key.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.counters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MINUTE: u64 = 60_000;

    #[test]
    fn test_first_request_creates_counter() {
        let store = WindowStore::new("test");
        let decision = store.check_and_increment("1.2.3.4", 3, 1_000, 0, Some("IP: 1.2.3.4"));

        assert!(decision.is_allowed());
        let counter = store.get("1.2.3.4").unwrap();
        assert_eq!(counter.count(), 1);
        assert_eq!(counter.reset_at_ms(), 1_000);
        assert_eq!(counter.identifier(), Some("IP: 1.2.3.4"));
    }

    #[test]
    fn test_threshold_is_exact() {
        let store = WindowStore::new("test");
        for i in 1..=3 {
            assert!(
                store.check_and_increment("k", 3, 1_000, i, None).is_allowed(),
                "Request {} should be allowed",
                i
            );
        }

        match store.check_and_increment("k", 3, 1_000, 4, None) {
            Decision::Deny { retry_after_secs, .. } => assert!(retry_after_secs > 0),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_are_isolated() {
        let store = WindowStore::new("test");
        store.check_and_increment("a", 1, 1_000, 0, None);
        assert!(!store.check_and_increment("a", 1, 1_000, 1, None).is_allowed());

        assert!(store.check_and_increment("b", 1, 1_000, 2, None).is_allowed());
    }

    #[test]
    fn test_deny_does_not_increment() {
        let store = WindowStore::new("test");
        store.check_and_increment("k", 2, 10_000, 0, None);
        store.check_and_increment("k", 2, 10_000, 0, None);

        let mut last_retry = u64::MAX;
        for now in [1_000, 3_500, 7_000, 9_999] {
            match store.check_and_increment("k", 2, 10_000, now, None) {
                Decision::Deny { retry_after_secs, .. } => {
                    assert!(retry_after_secs <= last_retry);
                    last_retry = retry_after_secs;
                }
                other => panic!("expected deny, got {:?}", other),
            }
        }
        assert_eq!(store.get("k").unwrap().count(), 2);
    }

    #[test]
    fn test_expired_entry_is_reset_not_removed() {
        let store = WindowStore::new("test");
        store.check_and_increment("k", 2, 1_000, 0, None);
        store.check_and_increment("k", 2, 1_000, 1, None);

        // Expired entries linger until something evicts them
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_summary(5_000), ActiveSummary::default());

        assert!(store.check_and_increment("k", 2, 1_000, 5_000, None).is_allowed());
        assert_eq!(store.get("k").unwrap().count(), 1);
        assert_eq!(store.get("k").unwrap().reset_at_ms(), 6_000);
    }

    #[test]
    fn test_active_summary_counts_only_running_windows() {
        let store = WindowStore::new("test");
        store.check_and_increment("old", 10, 1_000, 0, None);
        store.check_and_increment("new", 10, MINUTE, 0, None);
        store.check_and_increment("new", 10, MINUTE, 1, None);

        let summary = store.active_summary(2_000);
        assert_eq!(summary, ActiveSummary { keys: 1, requests: 2 });
    }

    #[test]
    fn test_evict_stale_respects_grace() {
        let store = WindowStore::new("test");
        // Window ends at 1_000
        store.check_and_increment("stale", 10, 1_000, 0, None);
        // Window ends at 10 * MINUTE
        store.check_and_increment("recent", 10, 10 * MINUTE, 0, None);

        let now = 16 * MINUTE + 1_000 + 1;
        let removed = store.evict_stale(now, 15 * MINUTE);

        assert_eq!(removed, 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("recent").is_some());
    }

    #[test]
    fn test_evict_stale_keeps_entry_at_exact_grace() {
        let store = WindowStore::new("test");
        store.check_and_increment("k", 10, 1_000, 0, None);

        assert_eq!(store.evict_stale(1_000 + 15 * MINUTE, 15 * MINUTE), 0);
        assert_eq!(store.evict_stale(1_000 + 15 * MINUTE + 1, 15 * MINUTE), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_stale_counts_only_removals_under_concurrent_inserts() {
        let store = Arc::new(WindowStore::new("test"));
        for i in 0..2_000 {
            store.check_and_increment(&format!("stale-{}", i), 5, 1_000, 0, None);
        }
        let now = 1_000 + 15 * MINUTE + 1;

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    store.check_and_increment(&format!("fresh-{}", i), 5, MINUTE, now, None);
                }
            })
        };
        let removed = store.evict_stale(now, 15 * MINUTE);
        writer.join().unwrap();

        assert_eq!(removed, 2_000);
        assert_eq!(store.len(), 2_000);
    }

    #[test]
    fn test_concurrent_checks_do_not_lose_updates() {
        let store = Arc::new(WindowStore::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|_| store.check_and_increment("shared", 500, MINUTE, 0, None).is_allowed())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 500);
        assert_eq!(store.get("shared").unwrap().count(), 500);
    }
}
