use indicatif::{ProgressBar, ProgressStyle};
use sat_fetch_core::{FetchOutcome, ProgressReporter, RunSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter using an indicatif progress bar.
///
/// The bar message tracks new downloads, skips and failures as the run goes.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            downloaded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn message(&self) -> String {
        format!(
            "new {} / skip {} / fail {}",
            self.downloaded.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        )
    }
}

impl ProgressReporter for CliReporter {
    fn on_fetch_start(&self, total_records: usize) {
        let pb = ProgressBar::new(total_records as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Downloading [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_record_complete(&self, _record_id: &str, outcome: &FetchOutcome, processed: usize) {
        let counter = match outcome {
            FetchOutcome::Downloaded => &self.downloaded,
            FetchOutcome::Skipped => &self.skipped,
            FetchOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(processed as u64);
                pb.set_message(self.message());
            }
        }
    }

    fn on_fetch_complete(&self, summary: &RunSummary) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  \x1b[32m✓\x1b[0m Fetch complete: {} records in {:.2}s",
            summary.processed(),
            summary.duration.as_secs_f64()
        );
    }
}
