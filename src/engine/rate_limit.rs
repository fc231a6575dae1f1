//! Per-credential token bucket guarding draft-creating and draft-inspection
//! endpoints (SPEC_FULL.md §4.1).

use std::collections::VecDeque;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};

#[derive(Default)]
struct BucketState {
    last_request: Option<Instant>,
    minute_samples: VecDeque<Instant>,
    hour_samples: VecDeque<Instant>,
}

/// Three simultaneous constraints per credential: minimum spacing between
/// consecutive requests, a rolling per-minute cap, and a rolling per-hour
/// cap. Sample sets are pruned on every `acquire`, so memory is bounded by
/// the request rate over the last hour, not unbounded.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Mutex<BucketState>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Block the caller until all three constraints are satisfied, then
    /// record the request. Cancelling `cancel` unblocks immediately with
    /// `Error::Cancelled` rather than waiting out the remaining delay.
    pub async fn acquire(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        loop {
            let wait = self.wait_for(key);
            if wait.is_zero() {
                return Ok(());
            }
            trace!(key, wait_ms = wait.as_millis() as u64, "rate limit wait");
            tokio::select! {
                () = sleep(wait) => {}
                () = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }
    }

    /// Returns `Duration::ZERO` and records a sample if the request is
    /// admissible right now; otherwise returns how long to wait before
    /// trying again (never less than `min_wait_ms`).
    fn wait_for(&self, key: &str) -> Duration {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(BucketState::default()));
        let mut state = entry.lock();
        let now = Instant::now();

        prune(&mut state.minute_samples, now, Duration::from_secs(60));
        prune(&mut state.hour_samples, now, Duration::from_secs(3600));

        let mut next_allowed = now;
        if let Some(last) = state.last_request {
            next_allowed = next_allowed.max(last + Duration::from_millis(self.config.per_second_ms));
        }
        if state.minute_samples.len() as u32 >= self.config.per_minute {
            if let Some(&first) = state.minute_samples.front() {
                next_allowed = next_allowed.max(first + Duration::from_secs(60));
            }
        }
        if state.hour_samples.len() as u32 >= self.config.per_hour {
            if let Some(&first) = state.hour_samples.front() {
                next_allowed = next_allowed.max(first + Duration::from_secs(3600));
            }
        }

        if next_allowed <= now {
            state.last_request = Some(now);
            state.minute_samples.push_back(now);
            state.hour_samples.push_back(now);
            return Duration::ZERO;
        }

        (next_allowed - now).max(Duration::from_millis(self.config.min_wait_ms))
    }
}

fn prune(samples: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = samples.front() {
        if now.saturating_duration_since(front) > window {
            samples.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            per_second_ms: 2_000,
            per_minute: 2,
            per_hour: 50,
            min_wait_ms: 250,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_never_waits() {
        let limiter = RateLimiter::new(test_config());
        let cancel = CancellationToken::new();
        let before = Instant::now();
        limiter.acquire("client-1", &cancel).await.unwrap();
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn enforces_minimum_spacing_between_consecutive_calls() {
        let limiter = RateLimiter::new(test_config());
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.acquire("client-1", &cancel).await.unwrap();
        limiter.acquire("client-1", &cancel).await.unwrap();
        let elapsed = Instant::now() - start;

        assert!(elapsed >= Duration::from_millis(2_000), "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn enforces_per_minute_cap() {
        let mut config = test_config();
        config.per_second_ms = 0;
        let limiter = RateLimiter::new(config);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("client-1", &cancel).await.unwrap();
        }
        let elapsed = Instant::now() - start;

        // Third call must wait for the first sample to fall out of the
        // 60-second rolling window.
        assert!(elapsed >= Duration::from_secs(60), "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn different_credentials_do_not_share_a_bucket() {
        let limiter = RateLimiter::new(test_config());
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.acquire("client-1", &cancel).await.unwrap();
        limiter.acquire("client-2", &cancel).await.unwrap();
        let elapsed = Instant::now() - start;

        assert!(elapsed < Duration::from_millis(100), "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_unblocks_a_waiting_acquire() {
        let limiter = RateLimiter::new(test_config());
        let cancel = CancellationToken::new();

        limiter.acquire("client-1", &cancel).await.unwrap();

        let child_cancel = cancel.clone();
        let task = tokio::spawn(async move { limiter.acquire("client-1", &child_cancel).await });

        tokio::time::advance(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
