//! Periodic scheduler tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::debug;

use claims_engine::ClaimRegistry;

/// Spawned task invoking `registry.tick(now)` on a fixed cadence. The task
/// is aborted when the driver is dropped.
pub struct TickDriver {
    handle: JoinHandle<()>,
}

impl TickDriver {
    pub fn spawn(registry: Arc<ClaimRegistry>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let summary = registry.tick(Utc::now());
                if summary.expired > 0 {
                    debug!(
                        expired = summary.expired,
                        finished = summary.finished,
                        "scheduler tick drove expired claims"
                    );
                }
            }
        });
        Self { handle }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
