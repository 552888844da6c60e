//! Retry and backoff helpers.
//!
//! - [`retry_with_delays`]: run an async operation, sleeping the given
//!   delays between failed attempts (used for deep-thread root fetches)
//! - [`Backoff`]: doubling delay with a cap and optional jitter (used by
//!   the chat poller)

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delays between attempts when fetching a freshly created comment.
///
/// Two retries, linear: the backend may not have committed the comment yet
/// when a permalink to it is opened.
pub const ROOT_RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

/// Runs `op`, retrying after each delay in `delays` while it fails.
///
/// Makes `delays.len() + 1` attempts at most and returns the last error.
pub async fn retry_with_delays<T, F, Fut>(delays: &[Duration], label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation = label, attempt, "retry succeeded");
                }
                return Ok(value);
            }
            Err(e) => match delays.get(attempt) {
                Some(delay) => {
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
        }
    }
}

/// Exponential backoff with a cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    jitter: f64,
}

impl Backoff {
    /// Creates a backoff starting at `base` and doubling up to `max`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            current: base,
            jitter: 0.0,
        }
    }

    /// Adds up to `fraction` of random extra delay to each step (0.0..=1.0).
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction.clamp(0.0, 1.0);
        self
    }

    /// Returns the delay for the current step without jitter.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay to wait now and advances to the next step.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);

        if self.jitter > 0.0 {
            let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
            delay + delay.mul_f64(extra)
        } else {
            delay
        }
    }

    /// Returns to the base delay.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnoniumError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(40));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(10));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let mut backoff =
            Backoff::new(Duration::from_millis(100), Duration::from_secs(1)).with_jitter(0.5);
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        let result = retry_with_delays(&ROOT_RETRY_DELAYS, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AnoniumError::api(404, "not yet"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry_with_delays(&ROOT_RETRY_DELAYS, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AnoniumError::api(500, "boom")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_delays_means_single_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry_with_delays(&[], "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AnoniumError::api(500, "boom")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
