use std::io::{self, Write};
use std::path::Path;
use tempfile::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistResult {
    Written,
    /// Another writer put a file at the destination first; ours was discarded.
    AlreadyExists,
}

/// Write `data` to `dest` atomically.
///
/// Bytes go to a temp file beside `dest`, are flushed and synced, then linked into
/// place without clobbering. On any error the temp file is removed when it drops, so
/// `dest` is either absent or complete.
pub fn persist_image(dest: &Path, data: &[u8]) -> io::Result<PersistResult> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = Builder::new()
        .prefix(".sat-fetch-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(dest) {
        Ok(_) => Ok(PersistResult::Written),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
            Ok(PersistResult::AlreadyExists)
        }
        Err(err) => Err(err.error),
    }
}
