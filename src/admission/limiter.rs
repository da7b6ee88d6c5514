//! Fixed-window request counter.
//!
//! # Algorithm
//! ```text
//! lock state
//!     → window expired?  (now - start > size)
//!           yes → start = now, count[key] = 0
//!     → count[key] >= max?
//!           yes → Reject (count untouched)
//!           no  → count[key] += 1, Allow
//! unlock
//! ```
//!
//! # Window modes
//! - `Shared`: one window for the whole process. A rollover resets only the
//!   key that observed it; other keys carry their count into the new window
//!   until they observe a rollover themselves.
//! - `PerClient`: each key owns its window start.
//!
//! The whole check runs under one mutex, so concurrent callers can never
//! admit more than `max_requests` for a key within a window.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::admission::identity::ClientKey;
use crate::config::{RateLimitConfig, WindowMode};
use crate::observability::metrics;

/// Outcome of a single limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `count` is the key's request count in the window, this one included.
    Allow { count: u32 },
    Reject,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

#[derive(Debug)]
struct Counter {
    count: u32,
    /// Own window start; only read in per-client mode.
    window_start: Instant,
}

#[derive(Debug)]
struct LimiterState {
    /// Process-wide window start; only read in shared mode.
    window_start: Instant,
    counters: HashMap<ClientKey, Counter>,
}

/// Thread-safe fixed-window rate limiter.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    state: Mutex<LimiterState>,
    window_size: Duration,
    max_requests: u32,
    mode: WindowMode,
}

impl FixedWindowLimiter {
    pub fn new(window_size: Duration, max_requests: u32, mode: WindowMode) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                window_start: Instant::now(),
                counters: HashMap::new(),
            }),
            window_size,
            max_requests,
            mode,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.window_size(),
            config.max_requests_per_window,
            config.window_mode,
        )
    }

    /// Count a request from `key` and decide whether it fits the budget.
    pub fn check(&self, key: &ClientKey) -> Decision {
        let mut state = self.lock();
        let now = Instant::now();
        let tracked = state.counters.len();

        let counter = match self.mode {
            WindowMode::Shared => {
                let rolled = now.duration_since(state.window_start) > self.window_size;
                if rolled {
                    state.window_start = now;
                }
                let window_start = state.window_start;
                let counter = state
                    .counters
                    .entry(key.clone())
                    .or_insert(Counter { count: 0, window_start });
                if rolled {
                    tracing::debug!(client = %key, "Shared window rolled over");
                    counter.count = 0;
                    counter.window_start = window_start;
                }
                counter
            }
            WindowMode::PerClient => {
                let counter = state
                    .counters
                    .entry(key.clone())
                    .or_insert(Counter { count: 0, window_start: now });
                if now.duration_since(counter.window_start) > self.window_size {
                    counter.window_start = now;
                    counter.count = 0;
                }
                counter
            }
        };

        let decision = if counter.count >= self.max_requests {
            Decision::Reject
        } else {
            counter.count += 1;
            Decision::Allow { count: counter.count }
        };

        if state.counters.len() != tracked {
            metrics::set_tracked_clients(state.counters.len());
        }
        decision
    }

    /// Drop counters whose own window has expired. Per-client mode only:
    /// in shared mode a stale counter still decides verdicts, so nothing is
    /// removed. Returns the number of entries dropped.
    pub fn purge_idle(&self) -> usize {
        if self.mode == WindowMode::Shared {
            return 0;
        }

        let mut state = self.lock();
        let now = Instant::now();
        let before = state.counters.len();
        state
            .counters
            .retain(|_, counter| now.duration_since(counter.window_start) <= self.window_size);
        before - state.counters.len()
    }

    /// Number of keys currently holding a counter.
    pub fn tracked_clients(&self) -> usize {
        self.lock().counters.len()
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_size(&self) -> Duration {
        self.window_size
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // Every mutation completes before the guard drops, so state behind a
        // poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("rate limiter lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }
}
