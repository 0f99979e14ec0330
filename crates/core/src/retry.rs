//! Deadline-bounded retry with exponential backoff.
//!
//! Call sites pass a classifier instead of wiring cancellation into each
//! loop: any failure the classifier marks terminal ends the loop at once,
//! regardless of remaining deadline budget.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Wall-clock budget for the whole loop, first attempt included.
    pub max_wait: Duration,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
}

impl RetryPolicy {
    /// 60s budget with 500ms/x2 backoff, the schedule used for faucet
    /// funding.
    pub fn faucet_default() -> Self {
        Self {
            max_wait: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
            backoff_factor: 2,
        }
    }

    /// Backoff to wait after the given zero-based failed attempt. The
    /// schedule is monotonically non-decreasing.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.saturating_pow(attempt.min(16));
        self.initial_backoff.saturating_mul(factor)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: Display + Debug> {
    #[error("non-retryable failure: {0}")]
    Terminal(E),

    #[error("deadline exceeded after {attempts} attempts, last failure: {last}")]
    DeadlineExceeded { last: E, attempts: u32 },
}

/// Runs `op` until it succeeds, `is_terminal` classifies a failure as
/// non-retryable, or the policy's deadline would be crossed by the next
/// backoff. Every failed attempt is logged with its reason.
pub async fn retry_until_deadline<T, E, F, Fut>(
    policy: &RetryPolicy,
    is_terminal: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Display + Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let deadline = Instant::now() + policy.max_wait;
    let mut attempts: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts += 1;
                if is_terminal(&err) {
                    return Err(RetryError::Terminal(err));
                }
                let backoff = policy.backoff_for(attempts - 1);
                warn!(attempts, backoff_ms = backoff.as_millis() as u64, error = %err, "attempt failed, backing off");
                if Instant::now() + backoff >= deadline {
                    return Err(RetryError::DeadlineExceeded {
                        last: err,
                        attempts,
                    });
                }
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Flaky {
        failures_left: AtomicU32,
        attempt_times: Mutex<Vec<Instant>>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                attempt_times: Mutex::new(Vec::new()),
            }
        }

        async fn call(&self) -> Result<u32, String> {
            self.attempt_times.lock().unwrap().push(Instant::now());
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err("flaky".to_owned())
            } else {
                Ok(42)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_transient_failures() {
        let k = 4;
        let flaky = Flaky::new(k);
        let policy = RetryPolicy::faucet_default();
        let out = retry_until_deadline(&policy, |_| false, || flaky.call())
            .await
            .unwrap();
        assert_eq!(out, 42);

        let times = flaky.attempt_times.lock().unwrap();
        assert_eq!(times.len() as u32, k + 1);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        for pair in gaps.windows(2) {
            assert!(pair[1] >= pair[0], "backoff schedule must not decrease");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_stops_after_first_attempt() {
        let flaky = Flaky::new(u32::MAX);
        let policy = RetryPolicy::faucet_default();
        let err = retry_until_deadline(&policy, |_| true, || flaky.call())
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Terminal(_)));
        assert_eq!(flaky.attempt_times.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let flaky = Flaky::new(u32::MAX);
        let policy = RetryPolicy {
            max_wait: Duration::from_secs(60),
            ..RetryPolicy::faucet_default()
        };
        let started = Instant::now();
        let err = retry_until_deadline(&policy, |_| false, || flaky.call())
            .await
            .unwrap_err();
        match err {
            RetryError::DeadlineExceeded { attempts, .. } => assert!(attempts > 1),
            other => panic!("expected deadline exceeded, got {other}"),
        }
        assert!(started.elapsed() <= Duration::from_secs(60));
    }

    #[test]
    fn backoff_is_exponential_and_saturating() {
        let policy = RetryPolicy::faucet_default();
        assert_eq!(policy.backoff_for(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert!(policy.backoff_for(60) >= policy.backoff_for(16));
    }
}
