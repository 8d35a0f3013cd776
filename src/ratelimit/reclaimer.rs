//! Background task that drops abandoned counters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::registry::RateLimitRegistry;
use super::stats::ReclaimReport;

/// Default time between reclamation passes.
pub const DEFAULT_RECLAIM_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Periodically reclaims stale counters from a registry.
pub struct Reclaimer {
    registry: Arc<RateLimitRegistry>,
    interval: Duration,
}

impl Reclaimer {
    /// Create a reclaimer running every `interval`.
    pub fn new(registry: Arc<RateLimitRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run a single pass now.
    pub fn reclaim_once(&self) -> ReclaimReport {
        self.registry.reclaim()
    }

    /// Start the recurring task. The first pass runs one interval from now.
    pub fn spawn(self) -> ReclaimerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        info!(interval_secs = self.interval.as_secs(), "Starting rate limit reclaimer");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.interval,
                self.interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.reclaim_once();
                        debug!(
                            general_removed = report.general_removed,
                            heavy_removed = report.heavy_removed,
                            "Reclaimer pass complete"
                        );
                    }
                    _ = &mut stop_rx => {
                        info!("Stopping rate limit reclaimer");
                        break;
                    }
                }
            }
        });

        ReclaimerHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }
}

/// Owns a running reclaimer task.
pub struct ReclaimerHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Reclaimer task ended abnormally");
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReclaimerHandle {
    fn drop(&mut self) {
        if self.stop_tx.is_some() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use crate::ratelimit::policy::LimitRule;
    use crate::ratelimit::registry::StoreKind;

    const INTERVAL: Duration = Duration::from_secs(15 * 60);

    fn setup() -> (Arc<ManualClock>, Arc<RateLimitRegistry>) {
        let clock = Arc::new(ManualClock::new(0));
        let registry = Arc::new(RateLimitRegistry::with_clock(clock.clone()));
        (clock, registry)
    }

    #[test]
    fn test_reclaim_once() {
        let (clock, registry) = setup();
        let rule = LimitRule::new(5, Duration::from_secs(1)).unwrap();
        registry.check(StoreKind::General, "1.2.3.4", &rule);

        let reclaimer = Reclaimer::new(registry.clone(), INTERVAL);
        assert_eq!(reclaimer.reclaim_once().total_removed(), 0);

        clock.set(1_000 + 15 * 60 * 1000 + 1);
        assert_eq!(reclaimer.reclaim_once().general_removed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reclaimer_runs_on_interval() {
        let (clock, registry) = setup();
        let rule = LimitRule::new(5, Duration::from_secs(1)).unwrap();
        registry.check(StoreKind::General, "stale", &rule);
        clock.set(1_000 + 16 * 60 * 1000);

        let handle = Reclaimer::new(registry.clone(), INTERVAL).spawn();

        // No pass before the first interval elapses
        tokio::time::sleep(INTERVAL / 2).await;
        assert!(registry.last_reclaim().is_none());
        assert_eq!(registry.store(StoreKind::General).len(), 1);

        tokio::time::sleep(INTERVAL).await;
        let report = registry.last_reclaim().expect("a pass should have run");
        assert_eq!(report.general_removed, 1);
        assert!(registry.store(StoreKind::General).is_empty());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_task() {
        let (_, registry) = setup();
        let handle = Reclaimer::new(registry, INTERVAL).spawn();
        assert!(!handle.is_finished());
        handle.stop().await;
    }
}
