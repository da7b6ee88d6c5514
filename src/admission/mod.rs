//! Admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → classifier.rs (static asset? → proceed, nothing counted)
//!     → identity.rs (x-forwarded-for, user-agent)
//!     → no forwarded address? → proceed (fail open)
//!     → limiter.rs (fixed window count per client)
//!     → allow → next handler | reject → 429 JSON
//! ```
//!
//! # Design Decisions
//! - One gate per process, constructed at startup and shared through `Arc`
//! - Unidentifiable clients are admitted, never throttled
//! - Internal faults admit the request instead of blocking all traffic
//! - The budget is per client across the whole surface, not per route

pub mod classifier;
pub mod gate;
pub mod identity;
pub mod limiter;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

pub use classifier::StaticAssetClassifier;
pub use gate::{Admission, AdmissionGate, ProceedReason, Rejection, Verdict};
pub use identity::{ClientIdentity, ClientKey, Product, UserAgent};
pub use limiter::{Decision, FixedWindowLimiter};
pub use middleware::admission_middleware;

use crate::observability::metrics;

/// Periodically drop expired counters and publish the table size.
pub async fn run_sweeper(gate: Arc<AdmissionGate>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(interval = ?every, "Rate limiter sweeper started");

    loop {
        interval.tick().await;
        let removed = gate.limiter().purge_idle();
        let tracked = gate.limiter().tracked_clients();
        metrics::set_tracked_clients(tracked);
        if removed > 0 {
            tracing::debug!(removed, tracked, "Expired rate limit entries purged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GateConfig, WindowMode};

    #[tokio::test(start_paused = true)]
    async fn per_client_sweep_drops_expired_entries_under_default_config() {
        let mut config = GateConfig::default();
        config.rate_limit.window_mode = WindowMode::PerClient;
        let gate = Arc::new(AdmissionGate::from_config(&config));

        for i in 0..500 {
            gate.limiter().check(&ClientKey::new(format!("10.0.{}.{}", i / 256, i % 256)));
        }
        assert_eq!(gate.limiter().tracked_clients(), 500);

        let every = config.rate_limit.sweep_interval().unwrap();
        let sweeper = tokio::spawn(run_sweeper(gate.clone(), every));

        tokio::time::sleep(config.rate_limit.window_size() * 2 + Duration::from_secs(5)).await;
        assert_eq!(gate.limiter().tracked_clients(), 0);

        sweeper.abort();
    }
}
