use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget for establishing a service connection.
///
/// The delay is fixed: no backoff growth and no jitter. Every error is
/// treated as retryable until the attempt budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of connection attempts.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Outcome of a bounded retry loop.
///
/// Exhaustion is data, not an exception; the caller decides whether and how
/// to propagate it.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The connect closure succeeded on attempt `attempts`.
    Connected { value: T, attempts: u32 },
    /// Every attempt failed; `last_error` is the final failure.
    Exhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Number of attempts consumed, whichever way the loop ended.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Connected { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `connect` up to `policy.max_attempts` times with a fixed delay
/// between attempts.
///
/// A zero-attempt policy is treated as a single attempt so the outcome
/// always carries a result.
pub async fn retry_connect<T, E, F, Fut>(
    policy: &RetryPolicy,
    service: &str,
    mut connect: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let budget = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match connect().await {
            Ok(value) => {
                return RetryOutcome::Connected {
                    value,
                    attempts: attempt,
                }
            }
            Err(err) => {
                if attempt >= budget {
                    warn!(
                        "{} connection attempt {}/{} failed: {}. Giving up.",
                        service, attempt, budget, err
                    );
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    };
                }

                warn!(
                    "{} connection attempt {}/{} failed: {}. Retrying in {:?}...",
                    service, attempt, budget, err, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
