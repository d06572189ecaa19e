pub mod config;
pub mod engine;
pub mod error;
pub mod imagery;
pub mod progress;
pub mod records;

pub use config::AppConfig;
pub use engine::{FetchEngine, FetchOutcome, RunState, RunSummary};
pub use error::{Error, FetchError, FetchFailure};
pub use imagery::{ImageSource, StaticImageSource};
pub use progress::{ProgressReporter, SilentReporter};
pub use records::{
    load_record_set, open_record_source, CsvRecordSource, LoadOutcome, Record, RecordSet,
    RecordSource, XlsxRecordSource,
};
