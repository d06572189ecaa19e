use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/sat-fetch.log";

/// HTTP client internals are noisy at debug; keep them at warn unless asked for.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

#[derive(Debug)]
pub struct LogSettings {
    filter: String,
    file_path: PathBuf,
}

impl LogSettings {
    /// `TRACING_LEVEL` wins when set; otherwise `--verbose` picks debug over info.
    pub fn from_env(verbose: bool) -> Self {
        let level = if verbose { "debug" } else { "info" };
        let filter = env::var("TRACING_LEVEL")
            .unwrap_or_else(|_| format!("{},{}", level, QUIET_DEPENDENCIES));
        let file_path = env::var("LOG_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));
        Self { filter, file_path }
    }

    fn file_parts(&self) -> (&Path, &Path) {
        let dir = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self
            .file_path
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new("sat-fetch.log"));
        (dir, name)
    }
}

/// Console output stays compact for the progress bar; the file gets targets and
/// timestamps for per-record failure reasons logged at debug.
pub fn init_logger(settings: &LogSettings) -> WorkerGuard {
    let (dir, name) = settings.file_parts();
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .with(EnvFilter::new(&settings.filter))
        .init();

    debug!(
        "Logging to {} with filter '{}'",
        settings.file_path.display(),
        settings.filter
    );

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_parts_split_directory_and_name() {
        let settings = LogSettings {
            filter: "info".to_string(),
            file_path: PathBuf::from("./logs/run.log"),
        };
        let (dir, name) = settings.file_parts();
        assert_eq!(dir, Path::new("./logs"));
        assert_eq!(name, Path::new("run.log"));

        let bare = LogSettings {
            filter: "info".to_string(),
            file_path: PathBuf::from("run.log"),
        };
        assert_eq!(bare.file_parts().0, Path::new("."));
    }
}
