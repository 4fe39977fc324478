//! Global dispatch spacing for WHOIS lookups.
//!
//! WHOIS servers throttle aggressively, so the interval applies to the whole
//! process rather than to each worker. Only the moment a lookup *starts* is
//! spaced out; the lookups themselves still overlap freely.

use crate::types::MAX_RATE_LIMIT_SECS;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Enforces a minimum interval between the start of consecutive lookups.
///
/// The limiter owns a single "earliest next dispatch" instant behind a mutex.
/// Each call to [`acquire`](RateLimiter::acquire) claims the next free slot and
/// pushes the shared instant forward by one interval while holding the lock,
/// so two workers can never claim the same slot.
///
/// # Example
///
/// ```rust
/// use bulk_whois_lib::RateLimiter;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let limiter = RateLimiter::new(Duration::from_millis(10));
/// limiter.acquire().await; // first call returns immediately
/// limiter.acquire().await; // second call waits ~10ms
/// # });
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum spacing.
    ///
    /// Intervals above [`MAX_RATE_LIMIT_SECS`] are clamped to it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.min(Duration::from_secs_f64(MAX_RATE_LIMIT_SECS)),
            next_slot: Mutex::new(None),
        }
    }

    /// The configured minimum spacing.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until this caller may dispatch a lookup.
    ///
    /// Returns the instant the caller was scheduled for. Callers are served in
    /// the order they obtain the internal lock.
    pub async fn acquire(&self) -> Instant {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot.checked_add(self.interval).unwrap_or(slot));
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "waiting for rate limit slot");
            sleep_until(slot).await;
        }

        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_acquires_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(250)));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }

        let mut slots = Vec::new();
        for handle in handles {
            slots.push(handle.await.unwrap());
        }
        slots.sort();

        for pair in slots.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_is_not_banked() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;

        // A long idle period must not allow a burst afterwards
        tokio::time::sleep(Duration::from_secs(10)).await;

        let first = limiter.acquire().await;
        let second = limiter.acquire().await;
        assert!(second - first >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_is_clamped() {
        let limiter = RateLimiter::new(Duration::MAX);
        assert_eq!(limiter.interval(), Duration::from_secs(3600));

        let first = limiter.acquire().await;
        let second = limiter.acquire().await;
        assert_eq!(second - first, Duration::from_secs(3600));
    }

    #[test]
    fn test_interval_accessor() {
        let limiter = RateLimiter::new(Duration::from_millis(750));
        assert_eq!(limiter.interval(), Duration::from_millis(750));
    }
}
