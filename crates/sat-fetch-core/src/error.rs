use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Source '{source_label}' is missing required column '{column}'")]
    Schema {
        source_label: String,
        column: &'static str,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("No records could be loaded from any source")]
    NoRecords,
}

/// Why a single image request did not produce bytes.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed reading response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Per-record failure reason, captured into the outcome rather than propagated.
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}
