use bytes::Bytes;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::tempdir;

use sat_fetch_core::{
    load_record_set, AppConfig, CsvRecordSource, FetchEngine, FetchError, FetchOutcome,
    ImageSource, ProgressReporter, Record, RecordSet, RunSummary, SilentReporter,
};

/// Test double that counts calls and fails for chosen latitudes.
struct FakeSource {
    calls: AtomicUsize,
    fail_lats: Vec<f64>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_lats: Vec::new(),
        }
    }

    fn failing_at(lats: &[f64]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_lats: lats.to_vec(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageSource for FakeSource {
    fn fetch(&self, lat: f64, lon: f64) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lats.contains(&lat) {
            return Err(FetchError::Status(404));
        }
        Ok(Bytes::from(format!("image@{},{}", lat, lon)))
    }
}

fn record_set(rows: &[(&str, f64, f64)]) -> RecordSet {
    let records = rows
        .iter()
        .map(|(id, lat, lon)| Record::new(id, *lat, *lon).unwrap());
    RecordSet::dedup_first_wins(records).0
}

fn engine_for(dir: &Path, source: FakeSource) -> FetchEngine<FakeSource> {
    FetchEngine::new(&AppConfig::default(), source).with_save_dir(dir)
}

fn jpg_files(dir: &Path) -> HashSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_downloads_one_file_per_record() {
    let tmp = tempdir().unwrap();
    let records = record_set(&[("1", 47.5, -122.2), ("2", 47.6, -122.3), ("3", 47.7, -122.4)]);

    let engine = engine_for(tmp.path(), FakeSource::new());
    let summary = engine.run(&records, &SilentReporter).unwrap();

    assert_eq!(summary.downloaded, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(engine.source().calls(), 3);

    let expected: HashSet<String> = ["1.jpg", "2.jpg", "3.jpg"].iter().map(|s| s.to_string()).collect();
    assert_eq!(jpg_files(tmp.path()), expected);
    assert_eq!(
        fs::read(tmp.path().join("2.jpg")).unwrap(),
        b"image@47.6,-122.3".to_vec()
    );
}

#[test]
fn test_second_run_skips_everything() {
    let tmp = tempdir().unwrap();
    let records = record_set(&[("10", 1.0, 1.0), ("11", 2.0, 2.0)]);

    let first = engine_for(tmp.path(), FakeSource::new())
        .run(&records, &SilentReporter)
        .unwrap();
    assert_eq!(first.downloaded, 2);

    let engine = engine_for(tmp.path(), FakeSource::new());
    let second = engine.run(&records, &SilentReporter).unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.failed, 0);
    assert_eq!(engine.source().calls(), 0);
}

#[test]
fn test_existing_file_is_never_fetched() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("42.jpg"), b"already here").unwrap();
    let records = record_set(&[("42.0", 5.0, 5.0), ("43", 6.0, 6.0)]);

    let engine = engine_for(tmp.path(), FakeSource::new());
    let summary = engine.run(&records, &SilentReporter).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(engine.source().calls(), 1);
    assert_eq!(fs::read(tmp.path().join("42.jpg")).unwrap(), b"already here");
}

#[test]
fn test_normalized_id_names_the_file() {
    let tmp = tempdir().unwrap();
    let records = record_set(&[(" 42.0 ", 5.0, 5.0)]);

    engine_for(tmp.path(), FakeSource::new())
        .run(&records, &SilentReporter)
        .unwrap();

    assert!(tmp.path().join("42.jpg").exists());
    assert!(!tmp.path().join("42.0.jpg").exists());
}

#[test]
fn test_one_failure_does_not_stop_the_run() {
    let tmp = tempdir().unwrap();
    let records = record_set(&[("1", 1.0, 1.0), ("2", 2.0, 2.0), ("3", 3.0, 3.0)]);

    let engine = engine_for(tmp.path(), FakeSource::failing_at(&[2.0]));
    let summary = engine.run(&records, &SilentReporter).unwrap();

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 1);
    assert!(tmp.path().join("1.jpg").exists());
    assert!(!tmp.path().join("2.jpg").exists());
    assert!(tmp.path().join("3.jpg").exists());
}

#[test]
fn test_failed_record_leaves_no_file_and_is_retried_next_run() {
    let tmp = tempdir().unwrap();
    let records = record_set(&[("9", 9.0, 9.0)]);

    let summary = engine_for(tmp.path(), FakeSource::failing_at(&[9.0]))
        .run(&records, &SilentReporter)
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert!(jpg_files(tmp.path()).is_empty());

    let engine = engine_for(tmp.path(), FakeSource::new());
    let summary = engine.run(&records, &SilentReporter).unwrap();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(engine.source().calls(), 1);
}

#[test]
fn test_counts_add_up_to_record_count() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("b.jpg"), b"x").unwrap();
    let records = record_set(&[
        ("a", 1.0, 1.0),
        ("b", 2.0, 2.0),
        ("c", 3.0, 3.0),
        ("d", 4.0, 4.0),
        ("e", 5.0, 5.0),
    ]);

    let summary = engine_for(tmp.path(), FakeSource::failing_at(&[3.0, 5.0]))
        .run(&records, &SilentReporter)
        .unwrap();

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.processed(), records.len());
    assert!(!summary.cancelled);
}

#[test]
fn test_worker_pool_matches_sequential_counts() {
    let tmp = tempdir().unwrap();
    let rows: Vec<(String, f64, f64)> = (0..20)
        .map(|i| (i.to_string(), i as f64, i as f64))
        .collect();
    let row_refs: Vec<(&str, f64, f64)> = rows.iter().map(|(id, a, b)| (id.as_str(), *a, *b)).collect();
    let records = record_set(&row_refs);
    fs::write(tmp.path().join("0.jpg"), b"x").unwrap();

    let engine = engine_for(tmp.path(), FakeSource::failing_at(&[5.0, 6.0])).with_workers(4);
    let summary = engine.run(&records, &SilentReporter).unwrap();

    assert_eq!(summary.downloaded, 17);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(engine.source().calls(), 19);
    assert_eq!(jpg_files(tmp.path()).len(), 18);
}

/// Records every callback so ordering can be checked.
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_fetch_start(&self, total_records: usize) {
        self.events.lock().unwrap().push(format!("start:{}", total_records));
    }

    fn on_record_complete(&self, record_id: &str, outcome: &FetchOutcome, processed: usize) {
        let kind = match outcome {
            FetchOutcome::Downloaded => "downloaded",
            FetchOutcome::Skipped => "skipped",
            FetchOutcome::Failed(_) => "failed",
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", record_id, kind, processed));
    }

    fn on_fetch_complete(&self, summary: &RunSummary) {
        self.events.lock().unwrap().push(format!("done:{}", summary.processed()));
    }
}

#[test]
fn test_reporter_sees_records_in_order() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("y.jpg"), b"x").unwrap();
    let records = record_set(&[("x", 1.0, 1.0), ("y", 2.0, 2.0), ("z", 3.0, 3.0)]);
    let reporter = RecordingReporter {
        events: Mutex::new(Vec::new()),
    };

    engine_for(tmp.path(), FakeSource::failing_at(&[3.0]))
        .run(&records, &reporter)
        .unwrap();

    let events = reporter.events.into_inner().unwrap();
    assert_eq!(
        events,
        vec![
            "start:3",
            "x:downloaded:1",
            "y:skipped:2",
            "z:failed:3",
            "done:3",
        ]
    );
}

#[test]
fn test_cancel_mid_run_stops_between_records() {
    struct CancelAfterFirst {
        token: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    impl ProgressReporter for CancelAfterFirst {
        fn on_record_complete(&self, _id: &str, _outcome: &FetchOutcome, _processed: usize) {
            self.token.store(true, Ordering::Relaxed);
        }
    }

    let tmp = tempdir().unwrap();
    let records = record_set(&[("1", 1.0, 1.0), ("2", 2.0, 2.0), ("3", 3.0, 3.0)]);
    let engine = engine_for(tmp.path(), FakeSource::new());
    let reporter = CancelAfterFirst {
        token: engine.cancel_token(),
    };

    let summary = engine.run(&records, &reporter).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(engine.source().calls(), 1);
    assert!(tmp.path().join("1.jpg").exists());
    assert!(!tmp.path().join("2.jpg").exists());
}

#[test]
fn test_path_like_ids_never_write_outside_save_dir() {
    let tmp = tempdir().unwrap();
    let save_dir = tmp.path().join("images");
    let abs_target = tmp.path().join("abs_target");
    let csv_path = tmp.path().join("train.csv");
    fs::write(
        &csv_path,
        format!(
            "id,lat,long\n../escaped,1.0,1.0\n{},2.0,2.0\nsafe,3.0,3.0\n",
            abs_target.display()
        ),
    )
    .unwrap();

    let source = CsvRecordSource::new("train", &csv_path);
    let outcome = load_record_set(&[&source]);
    assert_eq!(outcome.rows_rejected, 2);

    let engine = engine_for(&save_dir, FakeSource::new());
    let summary = engine.run(&outcome.records, &SilentReporter).unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(engine.source().calls(), 1);
    assert!(!tmp.path().join("escaped.jpg").exists());
    assert!(!tmp.path().join("abs_target.jpg").exists());

    let top_level: HashSet<String> = ["images", "train.csv"].iter().map(|s| s.to_string()).collect();
    assert_eq!(jpg_files(tmp.path()), top_level);
    let saved: HashSet<String> = ["safe.jpg"].iter().map(|s| s.to_string()).collect();
    assert_eq!(jpg_files(&save_dir), saved);
}
