use tracing::{error, info, warn};

use super::model::{Record, RecordSet};
use super::source::{RawRow, RecordSource};
use crate::error::Error;

/// A source that could not be read, kept so the caller can report it.
#[derive(Debug)]
pub struct SourceFailure {
    pub label: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: RecordSet,
    pub failures: Vec<SourceFailure>,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub duplicates_dropped: usize,
}

impl LoadOutcome {
    /// Nothing usable was loaded and at least one source failed.
    pub fn is_fatal(&self) -> bool {
        self.records.is_empty() && !self.failures.is_empty()
    }

    /// Turn a fatal outcome into `Error::NoRecords`.
    pub fn into_result(self) -> Result<LoadOutcome, Error> {
        if self.is_fatal() {
            Err(Error::NoRecords)
        } else {
            Ok(self)
        }
    }
}

/// Read every source in order, map rows to typed records, then deduplicate.
///
/// A failing source is recorded and skipped; it never aborts the load.
pub fn load_record_set(sources: &[&dyn RecordSource]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    let mut merged: Vec<Record> = Vec::new();

    for source in sources {
        let rows = match source.read_rows() {
            Ok(rows) => rows,
            Err(err) => {
                error!("Error loading {} records: {}", source.label(), err);
                outcome.failures.push(SourceFailure {
                    label: source.label().to_string(),
                    error: err,
                });
                continue;
            }
        };

        outcome.rows_read += rows.len();
        let before = merged.len();
        for row in rows {
            match map_row(&row) {
                Some(record) => merged.push(record),
                None => {
                    warn!(
                        "Rejected {} row at line {}: id={:?} lat={:?} long={:?}",
                        source.label(),
                        row.line,
                        row.id,
                        row.lat,
                        row.lon
                    );
                    outcome.rows_rejected += 1;
                }
            }
        }
        info!("Loaded {} records from {}", merged.len() - before, source.label());
    }

    let (records, dropped) = RecordSet::dedup_first_wins(merged);
    outcome.records = records;
    outcome.duplicates_dropped = dropped;

    info!(
        "Ready to process {} unique records ({} duplicates dropped)",
        outcome.records.len(),
        outcome.duplicates_dropped
    );

    outcome
}

fn map_row(row: &RawRow) -> Option<Record> {
    let lat: f64 = row.lat.trim().parse().ok()?;
    let lon: f64 = row.lon.trim().parse().ok()?;
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Record::new(&row.id, lat, lon)
}
