use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: u32,
    },
}

impl Backoff {
    /// Delay after the `failures`-th consecutive failure (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let factor = multiplier.saturating_pow(failures.saturating_sub(1));
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}

/// Bounded retry: `max_attempts` counts every call, the first one included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

/// Runs `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the attempts run out. Returns the last error in the latter cases.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                let delay = policy.backoff.delay(attempt);
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
