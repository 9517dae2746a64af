//! On-disk cache of the last-downloaded export.
//!
//! The export changes slowly and overcast.fm asks clients to be gentle, so
//! a download younger than eleven hours is reused verbatim.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::write_atomic;

/// How long a cached export stays fresh.
const MAX_AGE: Duration = Duration::from_secs(11 * 60 * 60);

/// True when the cache file exists and was written less than eleven hours
/// ago. A missing or unreadable file counts as stale, never as an error.
pub fn is_fresh(path: &Path) -> bool {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No usable cache");
            return false;
        }
    };
    match modified.elapsed() {
        Ok(age) => age < MAX_AGE,
        // Modification time in the future reads as freshly written.
        Err(_) => true,
    }
}

/// Reads the cached export.
pub fn load(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cached export '{}'", path.display()))
}

/// Stores a freshly downloaded export, atomically.
pub fn store(path: &Path, contents: &str) -> Result<()> {
    write_atomic(path, contents.as_bytes())
        .with_context(|| format!("Failed to cache export to '{}'", path.display()))
}
