//! Fixed-window rate limiting keyed by client identifier.
//!
//! # Responsibilities
//! - Count requests per identifier inside a fixed window
//! - Reset the window once `now > window_reset_at`
//! - Report how long a rejected caller has to wait
//! - Evict windows that have already expired
//!
//! # Design Decisions
//! - Fixed window, not sliding window and not token bucket
//! - `now == window_reset_at` is still inside the window (strict `>` resets)
//! - Each limiter owns its own table; instances never share counters
//! - Read-check-increment runs under the DashMap shard write lock for the
//!   identifier's entry, so it is atomic per identifier

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Limits applied by one limiter instance. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }
}

impl From<&RateLimitConfig> for RatePolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }
}

/// Per-identifier counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_reset_at: Instant,
}

impl RateWindow {
    fn open(now: Instant, policy: &RatePolicy) -> Self {
        Self {
            count: 1,
            window_reset_at: now + policy.window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now > self.window_reset_at
    }

    /// Apply one request to an existing window.
    fn observe(&mut self, now: Instant, policy: &RatePolicy) -> Admission {
        if self.is_expired(now) {
            *self = Self::open(now, policy);
            return Admission::Admitted { count: 1 };
        }

        if self.count >= policy.max_requests {
            return Admission::Rejected {
                retry_after: retry_after(self.window_reset_at, now),
            };
        }

        self.count = self.count.saturating_add(1);
        Admission::Admitted { count: self.count }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request counted; `count` is the window's count including this request.
    Admitted { count: u32 },
    /// Quota exhausted for the current window.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Whole seconds until the window rolls over, rounded up, at least one.
fn retry_after(window_reset_at: Instant, now: Instant) -> Duration {
    let remaining = window_reset_at.saturating_duration_since(now);
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    Duration::from_secs(secs.max(1))
}

/// An isolated fixed-window counter table.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    policy: RatePolicy,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, policy: RatePolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            windows: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// Count a request from `identifier` at `now`.
    ///
    /// Never fails; an empty identifier is just another key.
    pub fn admit(&self, identifier: &str, now: Instant) -> Admission {
        // Avoid allocating a key for identifiers we already track.
        if let Some(mut window) = self.windows.get_mut(identifier) {
            return window.observe(now, &self.policy);
        }

        match self.windows.entry(identifier.to_string()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().observe(now, &self.policy),
            Entry::Vacant(vacant) => {
                vacant.insert(RateWindow::open(now, &self.policy));
                Admission::Admitted { count: 1 }
            }
        }
    }

    /// Snapshot of the window for `identifier`, if one exists.
    pub fn window(&self, identifier: &str) -> Option<RateWindow> {
        self.windows.get(identifier).map(|w| *w.value())
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop windows that expired before `now`. Returns how many were removed.
    ///
    /// A removed identifier's next request opens a fresh window, which is
    /// exactly what the reset path would have done.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.windows.retain(|_, window| {
            let expired = window.is_expired(now);
            if expired {
                evicted += 1;
            }
            !expired
        });

        metrics::record_rate_windows(&self.name, self.windows.len(), evicted);
        if evicted > 0 {
            tracing::debug!(limiter = %self.name, evicted, remaining = self.windows.len(), "Swept expired rate windows");
        }
        evicted
    }
}
