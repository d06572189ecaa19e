pub mod loader;
pub mod model;
pub mod source;
pub mod xlsx;

pub use loader::{load_record_set, LoadOutcome, SourceFailure};
pub use model::{normalize_id, Record, RecordSet};
pub use source::{open_record_source, CsvRecordSource, RawRow, RecordSource};
pub use xlsx::XlsxRecordSource;
