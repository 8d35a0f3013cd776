//! Introspection snapshots for health checks.

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Serialize;

/// Point-in-time view of both stores, restricted to running windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    /// RFC 3339 timestamp of the snapshot
    pub timestamp: String,
    /// Keys in the general store with a running window
    pub active_general_limits: usize,
    /// Keys in the heavy-operation store with a running window
    pub active_heavy_limits: usize,
    /// Requests counted across running general windows
    pub total_requests: u64,
    /// Requests counted across running heavy-operation windows
    pub total_heavy_operations: u64,
}

/// Result of one reclamation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimReport {
    /// RFC 3339 timestamp of the pass
    pub timestamp: String,
    /// Counters dropped from the general store
    pub general_removed: usize,
    /// Counters dropped from the heavy-operation store
    pub heavy_removed: usize,
}

impl ReclaimReport {
    /// Total counters dropped in this pass.
    pub fn total_removed(&self) -> usize {
        self.general_removed + self.heavy_removed
    }
}

/// Render epoch milliseconds the way JavaScript's `toISOString` does.
pub(crate) fn format_timestamp(epoch_ms: u64) -> String {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
