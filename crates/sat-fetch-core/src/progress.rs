use crate::engine::{FetchOutcome, RunSummary};

/// Trait for reporting fetch progress.
///
/// The CLI implements it with indicatif; tests and library callers use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_fetch_start(&self, _total_records: usize) {}
    fn on_record_complete(&self, _record_id: &str, _outcome: &FetchOutcome, _processed: usize) {}
    fn on_fetch_complete(&self, _summary: &RunSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
