//! Progress reporting for long row writes
//!
//! Keeps indicatif out of the store and updater logic.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A handle to an active progress bar
pub trait ProgressHandle: Send + Sync {
    fn set_total(&self, total: u64);
    fn inc(&self, n: u64);
    fn finish(&self);
}

/// Factory for creating progress handles
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str, total: u64) -> Box<dyn ProgressHandle>;
}

/// Pick the reporter for an interactive or quiet run
pub fn reporter(verbose: bool) -> Box<dyn ProgressReporter> {
    if verbose {
        Box::new(IndicatifProgress)
    } else {
        Box::new(NoopProgress)
    }
}

/// Terminal progress bars on stderr
pub struct IndicatifProgress;

impl ProgressReporter for IndicatifProgress {
    fn start(&self, label: &str, total: u64) -> Box<dyn ProgressHandle> {
        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {}: [{{bar:40.cyan/blue}}] {{pos}}/{{len}} rows ({{per_sec}})",
                    label
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Box::new(BarHandle(pb))
    }
}

struct BarHandle(ProgressBar);

impl ProgressHandle for BarHandle {
    fn set_total(&self, total: u64) {
        if self.0.length() != Some(total) {
            self.0.set_length(total);
        }
    }

    fn inc(&self, n: u64) {
        self.0.inc(n);
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

/// Discards all progress, for tests and quiet mode
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&self, _label: &str, _total: u64) -> Box<dyn ProgressHandle> {
        Box::new(NoopHandle)
    }
}

struct NoopHandle;

impl ProgressHandle for NoopHandle {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _n: u64) {}
    fn finish(&self) {}
}
