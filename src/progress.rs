//! Spinners for the CLI phases.
//!
//! In log-only mode the spinners are hidden and each finished phase is
//! reported through `tracing` instead, which keeps `tail -f` output readable.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    log_only: bool,
}

impl Progress {
    pub fn new(log_only: bool) -> Self {
        Self { log_only }
    }

    pub fn is_log_only(&self) -> bool {
        self.log_only
    }

    /// Start a spinner for one phase.
    pub fn phase(&self, msg: &str) -> Phase {
        let pb = ProgressBar::new_spinner();
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        pb.set_message(msg.to_string());

        Phase {
            pb,
            started: Instant::now(),
            log_only: self.log_only,
        }
    }
}

/// A running phase.
pub struct Phase {
    pb: ProgressBar,
    started: Instant,
    log_only: bool,
}

impl Phase {
    /// Stop the spinner and leave `msg` with the elapsed time.
    pub fn finish(self, msg: &str) {
        let elapsed = format_duration(self.started.elapsed());
        if self.log_only {
            info!(elapsed = %elapsed, "{}", msg);
        }
        self.pb.finish_with_message(format!("{} ({})", msg, elapsed));
    }
}
