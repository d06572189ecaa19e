use crate::config::AppConfig;
use crate::error::{Error, FetchFailure};
use crate::imagery::{persist_image, ImageSource, PersistResult};
use crate::progress::ProgressReporter;
use crate::records::{Record, RecordSet};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of processing one record.
#[derive(Debug)]
pub enum FetchOutcome {
    Downloaded,
    Skipped,
    Failed(FetchFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the cancel token stopped the run before every record was processed.
    pub cancelled: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded => self.downloaded += 1,
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Failed(_) => self.failed += 1,
        }
    }
}

pub struct FetchEngine<S: ImageSource> {
    save_dir: PathBuf,
    workers: usize,
    source: S,
    state: Mutex<RunState>,
    cancel: Arc<AtomicBool>,
}

impl<S: ImageSource> FetchEngine<S> {
    pub fn new(config: &AppConfig, source: S) -> Self {
        Self {
            save_dir: config.save_dir.clone(),
            workers: config.workers.max(1),
            source,
            state: Mutex::new(RunState::Idle),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_save_dir(mut self, save_dir: impl AsRef<Path>) -> Self {
        self.save_dir = save_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Token checked before each record. Storing `true` stops the run between records.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> RunState {
        self.state.lock().map(|s| *s).unwrap_or(RunState::Idle)
    }

    fn set_state(&self, state: RunState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    /// Fetch an image for every record that does not already have one on disk.
    ///
    /// Per-record failures are counted, never returned. The only error is failing to
    /// create the save directory.
    pub fn run(&self, records: &RecordSet, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        ensure_save_dir(&self.save_dir)?;

        self.set_state(RunState::Running);
        let start = Instant::now();
        reporter.on_fetch_start(records.len());

        let mut summary = if self.workers > 1 {
            self.run_parallel(records, reporter)?
        } else {
            self.run_sequential(records, reporter)
        };

        summary.duration = start.elapsed();
        if summary.cancelled {
            warn!(
                "Run cancelled after {} of {} records",
                summary.processed(),
                records.len()
            );
        }
        reporter.on_fetch_complete(&summary);
        self.set_state(RunState::Completed);

        Ok(summary)
    }

    fn run_sequential(&self, records: &RecordSet, reporter: &dyn ProgressReporter) -> RunSummary {
        let mut summary = RunSummary::default();

        for record in records {
            if self.cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }
            let outcome = self.process_record(record);
            summary.record(&outcome);
            reporter.on_record_complete(record.id(), &outcome, summary.processed());
        }

        summary
    }

    fn run_parallel(&self, records: &RecordSet, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot start worker pool: {}", e)))?;
        debug!("Fetching with {} workers", self.workers);

        let summary = Mutex::new(RunSummary::default());
        let processed = AtomicUsize::new(0);

        pool.install(|| {
            records.as_slice().par_iter().for_each(|record| {
                if self.cancel.load(Ordering::Relaxed) {
                    if let Ok(mut s) = summary.lock() {
                        s.cancelled = true;
                    }
                    return;
                }
                let outcome = self.process_record(record);
                if let Ok(mut s) = summary.lock() {
                    s.record(&outcome);
                }
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_record_complete(record.id(), &outcome, done);
            });
        });

        Ok(summary.into_inner().unwrap_or_default())
    }

    /// One record, one fault domain: every error ends up in the returned outcome.
    fn process_record(&self, record: &Record) -> FetchOutcome {
        let dest = record.destination(&self.save_dir);

        if dest.exists() {
            return FetchOutcome::Skipped;
        }

        let data = match self.source.fetch(record.lat, record.lon) {
            Ok(data) => data,
            Err(err) => {
                debug!("Failed to fetch {}: {}", record.id(), err);
                return FetchOutcome::Failed(err.into());
            }
        };

        match persist_image(&dest, &data) {
            Ok(PersistResult::Written) => FetchOutcome::Downloaded,
            Ok(PersistResult::AlreadyExists) => {
                debug!("{} appeared while fetching, keeping existing file", dest.display());
                FetchOutcome::Skipped
            }
            Err(err) => {
                debug!("Failed to write {}: {}", dest.display(), err);
                FetchOutcome::Failed(err.into())
            }
        }
    }
}

fn ensure_save_dir(save_dir: &Path) -> Result<(), Error> {
    if save_dir.is_dir() {
        info!("Target directory: {}", save_dir.display());
    } else {
        fs::create_dir_all(save_dir)?;
        info!("Created directory: {}", save_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::progress::SilentReporter;
    use bytes::Bytes;
    use tempfile::tempdir;

    struct EchoSource;

    impl ImageSource for EchoSource {
        fn fetch(&self, lat: f64, lon: f64) -> Result<Bytes, FetchError> {
            Ok(Bytes::from(format!("{},{}", lat, lon)))
        }
    }

    fn records(ids: &[&str]) -> RecordSet {
        let list = ids
            .iter()
            .enumerate()
            .map(|(i, id)| Record::new(id, i as f64, i as f64 * 2.0).unwrap());
        RecordSet::dedup_first_wins(list).0
    }

    #[test]
    fn test_state_transitions() {
        let tmp = tempdir().unwrap();
        let engine = FetchEngine::new(&AppConfig::default(), EchoSource).with_save_dir(tmp.path());
        assert_eq!(engine.state(), RunState::Idle);
        engine.run(&records(&["1"]), &SilentReporter).unwrap();
        assert_eq!(engine.state(), RunState::Completed);
    }

    #[test]
    fn test_creates_missing_save_dir() {
        let tmp = tempdir().unwrap();
        let save_dir = tmp.path().join("nested").join("images");
        let engine = FetchEngine::new(&AppConfig::default(), EchoSource).with_save_dir(&save_dir);
        let summary = engine.run(&records(&["7"]), &SilentReporter).unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(fs::read(save_dir.join("7.jpg")).unwrap(), b"0,0");
    }

    #[test]
    fn test_empty_record_set_is_noop() {
        let tmp = tempdir().unwrap();
        let engine = FetchEngine::new(&AppConfig::default(), EchoSource).with_save_dir(tmp.path());
        let summary = engine.run(&RecordSet::default(), &SilentReporter).unwrap();
        assert_eq!(summary.processed(), 0);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_cancel_before_run_processes_nothing() {
        let tmp = tempdir().unwrap();
        let engine = FetchEngine::new(&AppConfig::default(), EchoSource).with_save_dir(tmp.path());
        engine.cancel_token().store(true, Ordering::Relaxed);
        let summary = engine.run(&records(&["1", "2"]), &SilentReporter).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 0);
        assert!(!tmp.path().join("1.jpg").exists());
    }
}
