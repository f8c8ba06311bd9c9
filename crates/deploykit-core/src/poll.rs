//! Fixed-interval polling, bounded by a deadline or by an attempt budget.
//!
//! Both loops check immediately, then sleep `interval` after every check that
//! is neither ready nor failed. There is no backoff and no jitter.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one polling check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T, E> {
    /// Terminal success.
    Ready(T),
    /// Not there yet; check again after the interval.
    Pending,
    /// Terminal failure; stop immediately.
    Failed(E),
}

/// Why a polling loop stopped without reaching `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    Failed(E),
    TimedOut { waited: Duration },
    Exhausted { attempts: u32 },
}

/// Poll `check` until it is ready, fails, or `timeout` has elapsed.
///
/// The deadline is tested after each sleep, so the final check happens no
/// later than `timeout` after the first.
pub async fn poll_until_deadline<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<T, E>>,
{
    let started = Instant::now();
    loop {
        match check().await {
            Probe::Ready(value) => return Ok(value),
            Probe::Failed(err) => return Err(PollError::Failed(err)),
            Probe::Pending => {}
        }
        tokio::time::sleep(interval).await;
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(PollError::TimedOut { waited });
        }
    }
}

/// Poll `check` at most `attempts` times. The closure receives the 1-based
/// attempt number.
pub async fn poll_attempts<T, E, F, Fut>(
    attempts: u32,
    interval: Duration,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T, E>>,
{
    for attempt in 1..=attempts {
        match check(attempt).await {
            Probe::Ready(value) => return Ok(value),
            Probe::Failed(err) => return Err(PollError::Failed(err)),
            Probe::Pending => {}
        }
        tokio::time::sleep(interval).await;
    }
    Err(PollError::Exhausted { attempts })
}
