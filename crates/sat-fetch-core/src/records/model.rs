use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSION: &str = "jpg";

/// One property's identifier and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Record {
    /// Build a record, normalizing the id. Returns `None` if the normalized id cannot
    /// be used as a file name inside the save directory.
    pub fn new(raw_id: &str, lat: f64, lon: f64) -> Option<Self> {
        let id = normalize_id(raw_id);
        if !is_safe_file_stem(&id) {
            return None;
        }
        Some(Self { id, lat, lon })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, IMAGE_EXTENSION)
    }

    pub fn destination(&self, save_dir: &Path) -> PathBuf {
        save_dir.join(self.file_name())
    }
}

/// Trim whitespace and drop the trailing ".0" left behind when a numeric id was
/// rendered as a float.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(".0")
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

/// A single path component: non-empty, no separators, no NUL, not `.` or `..`.
fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(|c| c == '/' || c == '\\' || c == '\0')
}

/// Ordered records with unique ids. The first occurrence of an id wins.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Deduplicate `records` by id, keeping the first occurrence and its position.
    /// Returns the set together with the number of dropped duplicates.
    pub fn dedup_first_wins(records: impl IntoIterator<Item = Record>) -> (Self, usize) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept = Vec::new();
        let mut dropped = 0usize;

        for record in records {
            if seen.insert(record.id.clone()) {
                kept.push(record);
            } else {
                dropped += 1;
            }
        }

        (Self { records: kept }, dropped)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
