//! Progress Indicator - spinner feedback for slow model operations
//!
//! Only drawn when stderr is a terminal. Spinner failures never affect the
//! operation being waited on.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

pub struct ProgressIndicator {
    spinner: Option<ProgressBar>,
    start_time: Instant,
}

impl ProgressIndicator {
    /// Spinner with `message`, drawn only if `enabled` and stderr is a TTY
    pub fn new(message: &str, enabled: bool) -> Self {
        let start_time = Instant::now();
        let enabled = enabled && console::Term::stderr().is_term();

        let spinner = if enabled {
            let pb = ProgressBar::new_spinner();
            let style = if console::Term::stderr().features().wants_emoji() {
                ProgressStyle::default_spinner()
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
                    .template("{spinner} {msg} [{elapsed}]")
            } else {
                ProgressStyle::default_spinner()
                    .tick_strings(&["-", "\\", "|", "/", "*"])
                    .template("{spinner} {msg} [{elapsed}]")
            };
            if let Ok(style) = style {
                pb.set_style(style);
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            Some(pb)
        } else {
            None
        };

        Self {
            spinner,
            start_time,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.spinner.is_some()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Stop and clear the spinner, returning elapsed seconds
    pub fn finish(&mut self) -> f64 {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.elapsed_secs()
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
