//! Callback traits
//!
//! These traits keep the crate free of any particular terminal UI: the
//! caller decides how confirmations are asked and how waiting is shown.

use anyhow::Result;
use std::time::Duration;

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action, returning `true` if confirmed
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Progress callback for [`crate::wait::wait_for_state`]
pub trait WaitCallback {
    /// Called after each refresh that did not reach a final state
    ///
    /// # Arguments
    /// * `status` - Human-readable status reported by the refresher
    /// * `attempt` - Number of refreshes so far (1-indexed)
    /// * `next_delay` - Time until the next refresh
    fn on_pending(&mut self, status: &str, attempt: u32, next_delay: Duration);

    /// Called once the final state is reached
    fn on_done(&mut self, _attempts: u32) {}
}

/// No-op wait callback
pub struct NoProgress;

impl WaitCallback for NoProgress {
    fn on_pending(&mut self, _status: &str, _attempt: u32, _next_delay: Duration) {}
}
