use crate::domain_port::Cache;
use crate::infra::BoundedCache;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodically purges expired refresh entries and logs cache counters.
pub struct CacheReporter {
    cache: Arc<BoundedCache>,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl CacheReporter {
    pub fn new(
        cache: Arc<BoundedCache>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            cache,
            interval,
            cancellation_token,
        }
    }

    fn tick_once(&self) {
        self.cache.purge_expired();
        let stats = self.cache.stats();
        info!(
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            used_bytes = stats.used_bytes,
            capacity_bytes = stats.capacity_bytes,
            "refresh cache stats"
        );
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("cache reporter shutting down...");
                    break;
                }
                _ = ticker.tick() => self.tick_once(),
            }
        }
    }
}
