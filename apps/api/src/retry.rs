//! Retry policy for calls to upstream services.
//!
//! Attempts are numbered from 1. After a failed attempt `n` (that is not the
//! last one) the policy sleeps `n * step` before trying again.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than 1.
    pub max_attempts: u32,
    /// Linear backoff step.
    pub step: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// Policy for the enhancement call: 3 attempts, 1s then 2s between them.
    pub fn enhancement() -> Self {
        Self::linear(3, Duration::from_millis(1000))
    }

    /// Delay to wait after failed attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step * attempt
    }

    /// Runs `op` until it succeeds or the attempts are used up.
    /// The closure receives the 1-based attempt number. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "{operation} failed on final attempt: {e}"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "{operation} failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::enhancement();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::linear(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let start = Instant::now();
        let result: Result<&str, String> = RetryPolicy::enhancement()
            .run("op", |_| async { Ok("done") })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), String> = RetryPolicy::enhancement()
            .run("op", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {attempt}")) }
            })
            .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after attempt 1, 2s after attempt 2, nothing after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let result: Result<String, String> = RetryPolicy::enhancement()
            .run("op", |attempt| async move {
                if attempt == 1 {
                    Err("transient".to_string())
                } else {
                    Ok(format!("attempt {attempt}"))
                }
            })
            .await;
        assert_eq!(result.unwrap(), "attempt 2");
    }
}
