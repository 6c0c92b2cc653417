//! Fixed-interval polling of result pages.
//!
//! A generation moves `submitted -> polling -> {succeeded | rejected}`. Each
//! poll step either finishes the run (`Ready`, or an error such as a content
//! rejection) or asks for another round (`Pending`). The sleep between rounds
//! goes through [`Sleeper`] so tests can drive many iterations instantly.

use super::BingError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Result of a single inspection of a results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Pending,
    Ready(T),
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` keeps polling until the page is ready or rejected.
    pub max_attempts: Option<u32>,
}

/// Run `step` until it yields a value or an error, sleeping `policy.interval`
/// between pending rounds.
///
/// `step` receives the 1-based attempt number.
pub async fn poll_until<T, F, Fut>(
    sleeper: &dyn Sleeper,
    policy: PollPolicy,
    request_id: &str,
    mut step: F,
) -> Result<T, BingError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, BingError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match step(attempt).await? {
            PollOutcome::Ready(value) => {
                tracing::debug!(request_id, attempt, "Poll finished");
                return Ok(value);
            }
            PollOutcome::Pending => {
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    tracing::warn!(request_id, attempt, "Poll limit reached");
                    return Err(BingError::PollLimitExceeded {
                        request_id: request_id.to_string(),
                        attempts: attempt,
                    });
                }
                tracing::trace!(request_id, attempt, "Result not ready, waiting");
                sleeper.sleep(policy.interval).await;
            }
        }
    }
}
