//! Artifact writing
//!
//! Artifacts are serialized in memory first and written with a temp-file +
//! rename so that a reader never sees a half-written file and a failed run
//! leaves the previous artifact in place.

use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Pretty-print a value as JSON with a trailing newline
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Write `contents` to `path` atomically, creating parent directories
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;

    debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically. Returns the byte count.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<usize> {
    let text = to_pretty_json(value)?;
    write_atomic(path, text.as_bytes())?;
    Ok(text.len())
}
