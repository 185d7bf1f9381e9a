//! Terminal spinner for CLI requests.
//!
//! Hidden when `KLABIS_NO_PROGRESS` is set or when the caller asks for it,
//! so piped output stays clean.
//!
//! ```rust
//! use klabis_hal::utils::progress::Spinner;
//!
//! let spinner = Spinner::hidden();
//! spinner.set_message("Loading /members");
//! spinner.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// Indeterminate progress indicator.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Visible spinner, unless disabled by `quiet` or the environment.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        if quiet || is_progress_disabled() {
            return Self::hidden();
        }
        let bar = IndicatifBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { inner: bar }
    }

    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}
