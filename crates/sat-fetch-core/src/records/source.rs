use csv::{ReaderBuilder, Trim};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::xlsx::XlsxRecordSource;
use crate::error::Error;

pub const ID_COLUMN: &str = "id";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "long";

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A row projected to the three required fields, still untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub id: String,
    pub lat: String,
    pub lon: String,
}

/// A tabular input that yields `id`, `lat`, `long` rows.
pub trait RecordSource {
    /// Short name used in logs and errors.
    fn label(&self) -> &str;

    fn read_rows(&self) -> Result<Vec<RawRow>, Error>;
}

/// Pick a spreadsheet or CSV reader from the file extension.
pub fn open_record_source(label: &str, path: impl AsRef<Path>) -> Box<dyn RecordSource> {
    let path = path.as_ref();
    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if is_spreadsheet {
        Box::new(XlsxRecordSource::new(label, path))
    } else {
        Box::new(CsvRecordSource::new(label, path))
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnMap {
    id: usize,
    lat: usize,
    lon: usize,
}

impl ColumnMap {
    /// Find `id`, `lat`, `long` by name (case-insensitive, BOM tolerant).
    pub(crate) fn from_headers<'a>(
        label: &str,
        headers: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, Error> {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| Error::Schema {
                    source_label: label.to_string(),
                    column,
                })
        };
        Ok(Self {
            id: find(ID_COLUMN)?,
            lat: find(LAT_COLUMN)?,
            lon: find(LON_COLUMN)?,
        })
    }

    /// Project one row of cell text; missing cells become empty strings.
    pub(crate) fn project(&self, line: u64, cell: impl Fn(usize) -> String) -> RawRow {
        RawRow {
            line,
            id: cell(self.id),
            lat: cell(self.lat),
            lon: cell(self.lon),
        }
    }
}

/// CSV file with a header row. Columns are looked up by name; extra columns are ignored.
pub struct CsvRecordSource {
    label: String,
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(label: &str, path: impl AsRef<Path>) -> Self {
        Self {
            label: label.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for CsvRecordSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn read_rows(&self) -> Result<Vec<RawRow>, Error> {
        debug!("Reading {} records from {}", self.label, self.path.display());
        let file = std::fs::File::open(&self.path)?;
        read_csv_rows(&self.label, file)
    }
}

/// Project CSV content from any reader onto `RawRow`s.
pub fn read_csv_rows<R: Read>(label: &str, reader: R) -> Result<Vec<RawRow>, Error> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(label, csv_reader.headers()?.iter())?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(columns.project(line, |idx| record.get(idx).unwrap_or("").to_string()));
    }

    Ok(rows)
}
