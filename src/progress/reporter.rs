//! Progress reporter implementation
//!
//! Uses indicatif for a status line and a bar over the raw result files
//! being imported.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Progress reporter for result imports
///
/// Clones report to the same bars and counters.
#[derive(Clone)]
pub struct ProgressReporter {
    multi: MultiProgress,
    /// Raw result files read
    files_bar: ProgressBar,
    /// Current status message
    status: ProgressBar,
    start_time: Instant,
    total_files: Arc<AtomicU64>,
    files_read: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    enabled: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let files_bar = multi.add(ProgressBar::new(0));
        files_bar.set_style(style(
            "{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} results ({percent}%)",
        ));
        files_bar.set_prefix("Import");

        Self {
            multi,
            files_bar,
            status,
            start_time: Instant::now(),
            total_files: Arc::new(AtomicU64::new(0)),
            files_read: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            enabled: true,
        }
    }

    /// Create a disabled progress reporter (for quiet mode and tests)
    pub fn disabled() -> Self {
        let mut reporter = Self::new();
        reporter.enabled = false;
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Set number of result files to read
    pub fn set_total_files(&self, total: u64) {
        self.total_files.store(total, Ordering::Relaxed);
        self.files_bar.set_length(total);
    }

    /// Record a result file as read
    pub fn file_read(&self, path: &Path) {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.bytes_read.fetch_add(size, Ordering::Relaxed);
        self.files_read.fetch_add(1, Ordering::Relaxed);
        self.files_bar.inc(1);
        self.set_current_file(&path.display().to_string());
    }

    /// Set current status message
    pub fn set_status(&self, msg: &str) {
        self.status.set_message(msg.to_string());
    }

    fn set_current_file(&self, path: &str) {
        let display = if path.chars().count() > 60 {
            let tail: String = path.chars().rev().take(57).collect::<Vec<_>>().into_iter().rev().collect();
            format!("...{}", tail)
        } else {
            path.to_string()
        };
        self.status.set_message(display);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finish progress with success message
    pub fn finish_success(&self, message: &str) {
        self.status.finish_with_message(format!("✓ {}", message));
        self.files_bar.finish();
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.status.finish_with_message(format!("✗ {}", message));
        self.files_bar.abandon();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get progress summary
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total_files: self.total_files.load(Ordering::Relaxed),
            files_read: self.files_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress summary
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    pub total_files: u64,
    pub files_read: u64,
    /// Size of the result files read
    pub bytes_read: u64,
    pub elapsed: Duration,
}

impl ProgressSummary {
    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.files_read as f64 / self.total_files as f64) * 100.0
        }
    }

    /// Print summary to console
    pub fn print(&self) {
        println!(
            "Results:  {}/{} ({:.0}%)",
            self.files_read,
            self.total_files,
            self.percentage()
        );
        println!(
            "Read:     {}",
            humansize::format_size(self.bytes_read, humansize::BINARY)
        );
        println!("Elapsed:  {:.1?}", self.elapsed);
    }
}
