//! Fixed-window request counter.

/// Outcome of a single check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was admitted and counted.
    Allow {
        /// Requests admitted in the current window, this one included
        count: u32,
        /// Requests still admissible before the window resets
        remaining: u32,
        /// End of the current window (epoch ms)
        reset_at_ms: u64,
    },
    /// The window's quota is exhausted. Nothing was counted.
    Deny {
        /// Whole seconds until the window resets, rounded up
        retry_after_secs: u64,
        /// End of the current window (epoch ms)
        reset_at_ms: u64,
    },
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Per-key state: how many requests landed in the current window and when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCounter {
    count: u32,
    reset_at_ms: u64,
    identifier: Option<String>,
}

impl WindowCounter {
    /// Open a window at `now_ms` with the first request already counted.
    pub fn open(now_ms: u64, window_ms: u64, identifier: Option<String>) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(window_ms),
            identifier,
        }
    }

    /// Count a request against this window, rolling it over first if it has expired.
    ///
    /// The `max_requests`-th request is the last one admitted; the next is denied
    /// and leaves the count untouched.
    pub fn hit(&mut self, now_ms: u64, max_requests: u32, window_ms: u64) -> Decision {
        if now_ms > self.reset_at_ms {
            self.count = 1;
            self.reset_at_ms = now_ms.saturating_add(window_ms);
            return self.allowed(max_requests);
        }

        if self.count >= max_requests {
            return Decision::Deny {
                retry_after_secs: retry_after_secs(self.reset_at_ms, now_ms),
                reset_at_ms: self.reset_at_ms,
            };
        }

        self.count += 1;
        self.allowed(max_requests)
    }

    /// Decision for a freshly counted request.
    pub(crate) fn allowed(&self, max_requests: u32) -> Decision {
        Decision::Allow {
            count: self.count,
            remaining: max_requests.saturating_sub(self.count),
            reset_at_ms: self.reset_at_ms,
        }
    }

    /// Requests admitted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// End of the current window (epoch ms).
    pub fn reset_at_ms(&self) -> u64 {
        self.reset_at_ms
    }

    /// Diagnostic label recorded when the counter was created.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// The window has not ended yet at `now_ms`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.reset_at_ms > now_ms
    }

    /// Time since the window ended, zero while it is still running.
    pub fn expired_for_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.reset_at_ms)
    }
}

fn retry_after_secs(reset_at_ms: u64, now_ms: u64) -> u64 {
    reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
}
