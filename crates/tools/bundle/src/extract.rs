//! Bundle archive extraction.

use flate2::read::GzDecoder;
use qlrun_core::{Error, Result};
use std::fs::File;
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Extract a gzip-compressed tarball into `dest`.
///
/// Entries are unpacked into a sibling temp directory first and moved into
/// place only once the whole archive has been read, so a failure never
/// leaves a half-extracted `dest` behind.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or decoded, or the
/// destination cannot be written.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    debug!(archive = %archive_path.display(), dest = %dest.display(), "Extracting bundle");

    let temp_dir = dest.with_file_name(format!(
        ".{}.tmp",
        dest.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("extract")
    ));

    // Clean up any previous failed extraction
    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).map_err(|e| Error::io(e, &temp_dir, "remove"))?;
    }
    std::fs::create_dir_all(&temp_dir)
        .map_err(|e| Error::io(e, &temp_dir, "create directory"))?;

    let unpacked = File::open(archive_path)
        .map_err(|e| Error::io(e, archive_path, "open"))
        .and_then(|file| {
            Archive::new(GzDecoder::new(file))
                .unpack(&temp_dir)
                .map_err(|e| Error::io(e, archive_path, "extract"))
        });

    if let Err(e) = unpacked {
        let _ = std::fs::remove_dir_all(&temp_dir);
        return Err(e);
    }

    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| Error::io(e, dest, "remove"))?;
    }
    std::fs::rename(&temp_dir, dest).map_err(|e| Error::io(e, dest, "rename"))?;
    Ok(())
}
