//! The registry that owns both counter stores.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::counter::Decision;
use super::policy::LimitRule;
use super::stats::{format_timestamp, RateLimitStats, ReclaimReport};
use super::store::WindowStore;

/// Default time an expired general counter is kept before reclamation.
pub const DEFAULT_GENERAL_GRACE: Duration = Duration::from_secs(15 * 60);
/// Default time an expired heavy-operation counter is kept before reclamation.
pub const DEFAULT_HEAVY_GRACE: Duration = Duration::from_secs(60 * 60);

/// Which of the two stores a policy counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Generic and database-intensive throttling
    General,
    /// Exports, downloads and other expensive work
    HeavyOperation,
}

/// How long an expired counter may linger before the reclaimer drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Grace for the general store
    pub general: Duration,
    /// Grace for the heavy-operation store
    pub heavy: Duration,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            general: DEFAULT_GENERAL_GRACE,
            heavy: DEFAULT_HEAVY_GRACE,
        }
    }
}

/// Process-wide rate-limit state: a general store, a heavy-operation store,
/// and the clock both are judged against.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimitRegistry {
    general: WindowStore,
    heavy: WindowStore,
    clock: Arc<dyn Clock>,
    retention: Retention,
    last_reclaim: RwLock<Option<ReclaimReport>>,
}

impl RateLimitRegistry {
    /// Create a registry on the system clock with default retention.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a registry that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            general: WindowStore::new("general"),
            heavy: WindowStore::new("heavy"),
            clock,
            retention: Retention::default(),
            last_reclaim: RwLock::new(None),
        }
    }

    /// Replace the reclamation grace periods.
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Current time according to the registry's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The store behind `kind`.
    pub fn store(&self, kind: StoreKind) -> &WindowStore {
        match kind {
            StoreKind::General => &self.general,
            StoreKind::HeavyOperation => &self.heavy,
        }
    }

    /// Count one request for `key` in `kind`'s store under `rule`.
    pub fn check(&self, kind: StoreKind, key: &str, rule: &LimitRule) -> Decision {
        self.check_labeled(kind, key, rule, None)
    }

    /// Like [`check`](Self::check), recording `identifier` on a new counter.
    pub fn check_labeled(
        &self,
        kind: StoreKind,
        key: &str,
        rule: &LimitRule,
        identifier: Option<&str>,
    ) -> Decision {
        let now_ms = self.now_ms();
        self.store(kind).check_and_increment(
            key,
            rule.max_requests(),
            rule.window_ms(),
            now_ms,
            identifier,
        )
    }

    /// Snapshot of the running windows in both stores.
    pub fn stats(&self) -> RateLimitStats {
        self.stats_at(self.now_ms())
    }

    /// Snapshot as seen at `now_ms`.
    pub fn stats_at(&self, now_ms: u64) -> RateLimitStats {
        let general = self.general.active_summary(now_ms);
        let heavy = self.heavy.active_summary(now_ms);

        RateLimitStats {
            timestamp: format_timestamp(now_ms),
            active_general_limits: general.keys,
            active_heavy_limits: heavy.keys,
            total_requests: general.requests,
            total_heavy_operations: heavy.requests,
        }
    }

    /// Drop counters that expired longer ago than their store's grace period.
    pub fn reclaim(&self) -> ReclaimReport {
        self.reclaim_at(self.now_ms())
    }

    /// Reclaim as seen at `now_ms`.
    pub fn reclaim_at(&self, now_ms: u64) -> ReclaimReport {
        let general_removed = self
            .general
            .evict_stale(now_ms, saturating_millis(self.retention.general));
        let heavy_removed = self
            .heavy
            .evict_stale(now_ms, saturating_millis(self.retention.heavy));

        let report = ReclaimReport {
            timestamp: format_timestamp(now_ms),
            general_removed,
            heavy_removed,
        };

        if report.total_removed() > 0 {
            info!(
                general_removed,
                heavy_removed,
                general_remaining = self.general.len(),
                heavy_remaining = self.heavy.len(),
                "Reclaimed stale rate limit counters"
            );
        } else {
            debug!("No stale rate limit counters to reclaim");
        }

        *self.last_reclaim.write() = Some(report.clone());
        report
    }

    /// The most recent reclamation pass, if one has run.
    pub fn last_reclaim(&self) -> Option<ReclaimReport> {
        self.last_reclaim.read().clone()
    }

    /// Remove every counter from both stores.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.general.clear();
        self.heavy.clear();
    }
}

impl Default for RateLimitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitRegistry")
            .field("general", &self.general.len())
            .field("heavy", &self.heavy.len())
            .field("retention", &self.retention)
            .finish()
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
