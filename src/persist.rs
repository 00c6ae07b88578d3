//! Atomic file replacement for the persisted index, metadata, and image
//! records
//!
//! Writes go to a temp file in the destination directory and are renamed
//! into place, so a reader never observes a half-written file.

use std::io::Write;
use std::path::Path;

/// Write `bytes` to `path` atomically (temp file + rename)
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
