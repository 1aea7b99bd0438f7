use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::classifier::{Disposition, ErrorClassifier};
use crate::error::SuiteError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RESETS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait: Duration,
    /// `None` lets resets repeat without bound.
    pub max_resets: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: DEFAULT_RETRY_WAIT,
            max_resets: Some(DEFAULT_MAX_RESETS),
        }
    }
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_max_resets(mut self, max_resets: Option<u32>) -> Self {
        self.max_resets = max_resets;
        self
    }

    /// Worst-case time spent waiting when no reset occurs.
    pub fn worst_case_wait(&self) -> Duration {
        self.wait * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("non retryable error: {reason}")]
    NonRetryable { reason: String, attempt: u32 },

    #[error("max retry exceeded after {attempts} attempts, last failure: {last_reason}")]
    MaxRetryExceeded { attempts: u32, last_reason: String },

    #[error("reset limit of {limit} exceeded")]
    ResetLimitExceeded { limit: u32 },
}

/// Per-call retry bookkeeping. Created fresh for every verification and
/// dropped when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub wait: Duration,
    pub resets: u32,
    max_resets: Option<u32>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            wait: policy.wait,
            resets: 0,
            max_resets: policy.max_resets,
        }
    }

    pub fn has_budget(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn consume(&mut self) {
        self.attempt = (self.attempt + 1).min(self.max_attempts);
    }

    pub fn reset(&mut self) -> Result<(), RetryError> {
        self.resets += 1;
        if let Some(limit) = self.max_resets {
            if self.resets > limit {
                return Err(RetryError::ResetLimitExceeded { limit });
            }
        }
        self.attempt = 0;
        Ok(())
    }
}

/// Summary of a verification that eventually passed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Times the verification function was invoked.
    pub calls: u32,
    /// Budgeted attempts consumed since the last reset.
    pub attempts: u32,
    pub resets: u32,
}

/// A classified failure, handed to observers before the driver acts on it.
#[derive(Debug)]
pub struct FailedAttempt<'a> {
    pub round: u32,
    /// Budget consumed before this failure.
    pub attempt: u32,
    pub call: u32,
    pub disposition: &'a Disposition,
}

#[derive(Debug, Clone, Default)]
pub struct RetryDriver {
    policy: RetryPolicy,
}

impl RetryDriver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// There is no wait after the final retryable failure, so an exhausted
    /// budget costs `wait * (max_attempts - 1)`.
    pub async fn verify_with_retry<F, Fut>(&self, verify: F, round: u32) -> Result<RetryStats, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), SuiteError>>,
    {
        self.verify_with_retry_observed(verify, round, |_| {}).await
    }

    /// Run `verify(round)` until it passes, the budget is exhausted or a
    /// failure classifies as terminal. `observe` sees every failure.
    pub async fn verify_with_retry_observed<F, Fut, O>(
        &self,
        mut verify: F,
        round: u32,
        mut observe: O,
    ) -> Result<RetryStats, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), SuiteError>>,
        O: FnMut(&FailedAttempt<'_>),
    {
        let mut state = RetryState::new(&self.policy);
        let mut calls = 0u32;
        let mut last_reason = String::new();

        while state.has_budget() {
            calls += 1;
            let err = match verify(round).await {
                Ok(()) => {
                    return Ok(RetryStats {
                        calls,
                        attempts: state.attempt,
                        resets: state.resets,
                    })
                }
                Err(err) => err,
            };

            let disposition = ErrorClassifier::classify(&err);
            observe(&FailedAttempt {
                round,
                attempt: state.attempt,
                call: calls,
                disposition: &disposition,
            });

            match disposition {
                Disposition::ResetAndRetry => {
                    state.reset()?;
                    info!(round, resets = state.resets, "Reset retry count and retry");
                }
                Disposition::Retryable(reason) | Disposition::InfrastructureNotReady(reason) => {
                    state.consume();
                    warn!(
                        round,
                        attempt = state.attempt,
                        max_attempts = state.max_attempts,
                        reason = %reason,
                        "Verification failed, retryable"
                    );
                    last_reason = reason;
                    if state.has_budget() {
                        tokio::time::sleep(state.wait).await;
                    }
                }
                Disposition::NonRetryable(reason) => {
                    error!(round, attempt = state.attempt, reason = %reason, "Non retryable error raised");
                    return Err(RetryError::NonRetryable {
                        reason,
                        attempt: state.attempt,
                    });
                }
            }
        }

        error!(round, attempts = state.attempt, "Max retry exceeded");
        Err(RetryError::MaxRetryExceeded {
            attempts: state.attempt,
            last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays scripted outcomes; once exhausted every call succeeds.
    struct Script {
        outcomes: RefCell<VecDeque<Result<(), SuiteError>>>,
        rounds_seen: RefCell<Vec<u32>>,
    }

    impl Script {
        fn new(outcomes: Vec<Result<(), SuiteError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
                rounds_seen: RefCell::new(Vec::new()),
            }
        }

        async fn call(&self, round: u32) -> Result<(), SuiteError> {
            self.rounds_seen.borrow_mut().push(round);
            self.outcomes.borrow_mut().pop_front().unwrap_or(Ok(()))
        }

        fn calls(&self) -> usize {
            self.rounds_seen.borrow().len()
        }
    }

    fn always_retryable() -> impl FnMut(u32) -> std::future::Ready<Result<(), SuiteError>> {
        |_| std::future::ready(Err(SuiteError::retryable("not yet")))
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_wait(Duration::from_secs(60))
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.wait, Duration::from_secs(60));
        assert_eq!(policy.max_resets, Some(100));
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_call_does_not_wait() {
        let driver = RetryDriver::new(fast_policy(30));
        let script = Script::new(vec![]);
        let start = Instant::now();

        let stats = driver
            .verify_with_retry(|r| script.call(r), 4)
            .await
            .unwrap();

        assert_eq!(stats, RetryStats { calls: 1, attempts: 0, resets: 0 });
        assert_eq!(*script.rounds_seen.borrow(), vec![4]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_waits_between_attempts() {
        let driver = RetryDriver::new(fast_policy(30));
        let script = Script::new(vec![
            Err(SuiteError::retryable("0 rows")),
            Err(SuiteError::retryable("50 rows")),
        ]);
        let start = Instant::now();

        let stats = driver
            .verify_with_retry(|r| script.call(r), 0)
            .await
            .unwrap();

        assert_eq!(stats.calls, 3);
        assert_eq!(stats.attempts, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_never_exceed_max() {
        let driver = RetryDriver::new(fast_policy(5));
        let mut calls = 0u32;
        let mut seen_attempts = Vec::new();

        let err = driver
            .verify_with_retry_observed(
                |_| {
                    calls += 1;
                    std::future::ready(Err(SuiteError::retryable("not yet")))
                },
                0,
                |failed| seen_attempts.push(failed.attempt),
            )
            .await
            .unwrap_err();

        assert_eq!(calls, 5);
        assert_eq!(seen_attempts, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            err,
            RetryError::MaxRetryExceeded {
                attempts: 5,
                last_reason: "not yet".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wall_clock_bound() {
        let policy = fast_policy(30);
        let driver = RetryDriver::new(policy.clone());
        let start = Instant::now();

        let _ = driver.verify_with_retry(always_retryable(), 0).await;

        assert_eq!(start.elapsed(), policy.worst_case_wait());
        assert!(start.elapsed() <= policy.wait * policy.max_attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_twice_then_success() {
        let driver = RetryDriver::new(fast_policy(3));
        let script = Script::new(vec![
            Err(SuiteError::retryable("lagging")),
            Err(SuiteError::retryable("lagging")),
            Err(SuiteError::reset("offset flip")),
            Err(SuiteError::retryable("lagging")),
            Err(SuiteError::retryable("lagging")),
            Err(SuiteError::reset("offset flip")),
        ]);

        let stats = driver
            .verify_with_retry(|r| script.call(r), 1)
            .await
            .unwrap();

        // Six failures against a budget of three only pass because each
        // reset returned the counter to zero.
        assert_eq!(script.calls(), 7);
        assert_eq!(stats.resets, 2);
        assert_eq!(stats.attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_does_not_wait() {
        let driver = RetryDriver::new(fast_policy(3));
        let script = Script::new(vec![
            Err(SuiteError::reset("flip")),
            Err(SuiteError::reset("flip")),
        ]);
        let start = Instant::now();

        driver
            .verify_with_retry(|r| script.call(r), 0)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_limit_is_terminal() {
        let driver = RetryDriver::new(fast_policy(3).with_max_resets(Some(2)));
        let mut calls = 0u32;

        let err = driver
            .verify_with_retry(
                |_| {
                    calls += 1;
                    std::future::ready(Err(SuiteError::reset("flip")))
                },
                0,
            )
            .await
            .unwrap_err();

        assert_eq!(err, RetryError::ResetLimitExceeded { limit: 2 });
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let driver = RetryDriver::new(fast_policy(30));
        let script = Script::new(vec![
            Err(SuiteError::retryable("0 rows")),
            Err(SuiteError::non_retryable("content mismatch")),
        ]);

        let err = driver
            .verify_with_retry(|r| script.call(r), 0)
            .await
            .unwrap_err();

        assert_eq!(script.calls(), 2);
        assert_eq!(
            err,
            RetryError::NonRetryable {
                reason: "content mismatch".to_string(),
                attempt: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_error_is_not_retried() {
        let driver = RetryDriver::new(fast_policy(30));
        let script = Script::new(vec![Err(SuiteError::from(anyhow::anyhow!("panic in decoder")))]);

        let err = driver
            .verify_with_retry(|r| script.call(r), 0)
            .await
            .unwrap_err();

        assert_eq!(script.calls(), 1);
        assert!(matches!(err, RetryError::NonRetryable { .. }));
    }

    #[test]
    fn test_state_consume_is_bounded() {
        let mut state = RetryState::new(&RetryPolicy::default().with_max_attempts(2));
        state.consume();
        state.consume();
        state.consume();
        assert_eq!(state.attempt, 2);
        assert!(!state.has_budget());
        state.reset().unwrap();
        assert_eq!(state.attempt, 0);
        assert_eq!(state.resets, 1);
    }
}
