//! Progress and status reporting.

use std::sync::Arc;

/// Receives progress updates from a transfer. Both methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// Fraction complete in `[0.0, 1.0]`, never decreasing within a run.
    fn progress(&self, _fraction: f64) {}

    /// Human-readable description of the current step.
    fn status(&self, _message: &str) {}
}

/// Reporter that ignores every update.
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Clamps reported fractions so a run never moves backwards.
pub(crate) struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    last: f64,
}

impl ProgressTracker {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            last: 0.0,
        }
    }

    pub fn progress(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            self.last
        } else {
            fraction.clamp(self.last, 1.0)
        };
        self.last = fraction;
        self.reporter.progress(fraction);
    }

    /// Map `done / total` into the band `[from, to]`.
    pub fn progress_between(&mut self, from: f64, to: f64, done: u64, total: u64) {
        let ratio = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).min(1.0)
        };
        self.progress(from + (to - from) * ratio);
    }

    pub fn status(&self, message: &str) {
        self.reporter.status(message);
    }
}

/// Format a row count with thousands separators: `1234567` → `1,234,567`.
pub fn format_row_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
