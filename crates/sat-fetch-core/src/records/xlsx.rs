use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::source::{ColumnMap, RawRow, RecordSource};
use crate::error::Error;

/// First worksheet of a spreadsheet workbook (xlsx, xls, xlsb, ods).
///
/// The first non-empty row is the header; columns are matched by name like the CSV reader.
pub struct XlsxRecordSource {
    label: String,
    path: PathBuf,
}

impl XlsxRecordSource {
    pub fn new(label: &str, path: impl AsRef<Path>) -> Self {
        Self {
            label: label.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for XlsxRecordSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn read_rows(&self) -> Result<Vec<RawRow>, Error> {
        debug!("Reading {} records from {}", self.label, self.path.display());
        let mut workbook = open_workbook_auto(&self.path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(calamine::Error::Msg("workbook has no worksheets"))??;

        let first_line = range.start().map(|(row, _)| row as u64 + 1).unwrap_or(1);
        let mut rows_iter = range.rows();

        let header: Vec<String> = rows_iter
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();
        let columns = ColumnMap::from_headers(&self.label, header.iter().map(|h| h.as_str()))?;

        let mut rows = Vec::new();
        for (offset, cells) in rows_iter.enumerate() {
            if cells.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let line = first_line + offset as u64 + 1;
            rows.push(columns.project(line, |idx| cells.get(idx).map(cell_text).unwrap_or_default()));
        }

        Ok(rows)
    }
}

/// Render a cell the way the CSV reader would see it. Whole floats print without a
/// fraction (`42.0` -> `42`).
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}
