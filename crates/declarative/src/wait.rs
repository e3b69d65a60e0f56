//! Waiting for a remote object to settle.
//!
//! A [`Refresh`] implementation samples remote state once per call and
//! reports whether it reached a final state. [`wait_for_state`] calls it
//! repeatedly, sleeping with exponential backoff between calls, until it is
//! done, fails, or the timeout passes. The refresher itself never sleeps or
//! retries.

use crate::context::WaitCallback;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a single refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<T> {
    /// Not settled yet
    Pending { status: String },
    /// Settled with a result
    Done(T),
}

/// Something that can be sampled until it settles
pub trait Refresh {
    type Output;
    type Error: std::error::Error;

    /// Sample remote state once
    fn refresh(&mut self) -> Result<Progress<Self::Output>, Self::Error>;
}

/// Timing policy for [`wait_for_state`]
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    /// Delay after the first pending refresh
    pub min_interval: Duration,
    /// Upper bound for the delay between refreshes
    pub max_interval: Duration,
    /// Multiplier applied to the delay after each pending refresh
    pub backoff_factor: f64,
    /// Give up once this much time has passed
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            backoff_factor: 2.0,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Shortest pause between refreshes, whatever the options say
pub const MIN_DELAY: Duration = Duration::from_millis(1);

impl WaitOptions {
    /// Calculate the delay after a given pending refresh (0-indexed).
    ///
    /// Never shorter than [`MIN_DELAY`], so a zero `min_interval` still
    /// leaves a pause between refreshes.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let floor = self.min_interval.max(MIN_DELAY).as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = floor * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(floor)).max(MIN_DELAY)
    }
}

/// Errors from [`wait_for_state`]
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E: std::error::Error> {
    /// The timeout passed before the refresher settled
    #[error("timeout while waiting for state to become final (last status: {last_status}, after {}s)", elapsed.as_secs())]
    Timeout {
        elapsed: Duration,
        last_status: String,
    },

    /// The refresher failed
    #[error(transparent)]
    Refresh(E),
}

impl<E: std::error::Error> WaitError<E> {
    /// Check if the wait gave up on time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Refresh until settled, failed, or timed out.
///
/// # Arguments
/// * `refresher` - Samples remote state once per call
/// * `options` - Backoff and timeout policy
/// * `callback` - Notified of each pending refresh
pub fn wait_for_state<R: Refresh>(
    refresher: &mut R,
    options: &WaitOptions,
    callback: &mut dyn WaitCallback,
) -> Result<R::Output, WaitError<R::Error>> {
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let status = match refresher.refresh().map_err(WaitError::Refresh)? {
            Progress::Done(output) => {
                callback.on_done(attempt + 1);
                return Ok(output);
            }
            Progress::Pending { status } => status,
        };

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            return Err(WaitError::Timeout {
                elapsed,
                last_status: status,
            });
        }

        let delay = options
            .delay_for_attempt(attempt)
            .min(options.timeout - elapsed);
        attempt = attempt.saturating_add(1);
        log::trace!("still waiting ({status}), next refresh in {delay:?}");
        callback.on_pending(&status, attempt, delay);
        thread::sleep(delay);
    }
}

impl<T: fmt::Display> fmt::Display for Progress<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending { status } => write!(f, "pending ({status})"),
            Self::Done(output) => write!(f, "done ({output})"),
        }
    }
}
