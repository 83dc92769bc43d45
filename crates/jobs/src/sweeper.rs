//! Periodic purge of expired process records.
//!
//! Expired records are already invisible to reads; the sweeper only reclaims
//! their memory so the cache does not fill up with dead entries between
//! evictions.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::JobRegistry;

/// Run the sweep loop until `cancel` is triggered.
///
/// A zero `interval` disables sweeping: the loop logs an error and returns.
pub async fn run(registry: Arc<JobRegistry>, interval: Duration, cancel: CancellationToken) {
    if interval.is_zero() {
        tracing::error!("Cache sweep interval is zero, sweeper not started");
        return;
    }
    tracing::info!(interval_secs = interval.as_secs(), "Cache sweeper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cache sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let purged = registry.cache().purge_expired();
                if purged > 0 {
                    tracing::info!(purged, remaining = registry.cache().len(), "Cache sweep: purged expired processes");
                } else {
                    tracing::debug!("Cache sweep: nothing to purge");
                }
            }
        }
    }
}
