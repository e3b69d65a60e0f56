//! Progress indicators for the converge CLI.

use colored::Colorize;
use declarative::WaitCallback;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a spinner with a success mark
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {}", "✓".green(), msg);
}

/// Finish a spinner with an error mark
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", "✗".red(), msg);
}

/// Shows deployment monitoring on a spinner
///
/// The spinner only appears once the first refresh comes back pending.
pub struct SpinnerProgress {
    pb: Option<ProgressBar>,
    label: String,
    hidden: bool,
}

impl SpinnerProgress {
    pub fn new(label: &str, hidden: bool) -> Self {
        Self {
            pb: None,
            label: label.to_string(),
            hidden,
        }
    }

    /// Clear the spinner if it was shown
    pub fn finish(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}

impl WaitCallback for SpinnerProgress {
    fn on_pending(&mut self, status: &str, attempt: u32, next_delay: Duration) {
        log::debug!("{}: {status} (attempt {attempt}, next in {next_delay:?})", self.label);
        let hidden = self.hidden;
        let pb = self.pb.get_or_insert_with(|| {
            if hidden {
                ProgressBar::hidden()
            } else {
                spinner(&self.label)
            }
        });
        pb.set_message(format!("{} ({status})", self.label));
    }

    fn on_done(&mut self, attempts: u32) {
        log::debug!("{}: settled after {attempts} refresh(es)", self.label);
    }
}
