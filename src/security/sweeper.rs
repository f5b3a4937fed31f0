//! Periodic eviction of expired rate windows.
//!
//! Without it every identifier ever seen stays in memory for the life of the
//! process.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::SweeperConfig;
use crate::security::rate_limit::RateLimiter;

pub struct WindowSweeper {
    limiters: Vec<Arc<RateLimiter>>,
    interval: Duration,
}

impl WindowSweeper {
    pub fn new(limiters: Vec<Arc<RateLimiter>>, config: &SweeperConfig) -> Self {
        Self {
            limiters,
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    /// Sweep every limiter once. Returns the total number of evicted windows.
    pub fn sweep_all(&self, now: Instant) -> usize {
        self.limiters.iter().map(|limiter| limiter.sweep(now)).sum()
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Rate window sweeper disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            limiters = self.limiters.len(),
            "Rate window sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_all(Instant::now());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate window sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
