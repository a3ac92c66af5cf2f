use crate::error::{EtlError, Result};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Unpack every entry of an in-memory zip into `dest`, keeping the archive's
/// directory layout and overwriting files that already exist.
/// Returns the paths of the files written.
#[instrument(level = "info", skip(bytes, dest), fields(bytes = bytes.len(), dest = %dest.as_ref().display()))]
pub fn extract_archive<P: AsRef<Path>>(bytes: &[u8], dest: P) -> Result<Vec<PathBuf>> {
    let dest = dest.as_ref();
    let start = Instant::now();
    let written = unpack(bytes, dest).map_err(|source| EtlError::Extraction {
        dest: dest.to_path_buf(),
        source,
    })?;
    info!(files = written.len(), elapsed = ?start.elapsed(), "extracted archive");
    Ok(written)
}

fn unpack(bytes: &[u8], dest: &Path) -> std::result::Result<Vec<PathBuf>, ZipError> {
    fs::create_dir_all(dest)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&out_path)?;
        let n = io::copy(&mut entry, &mut out)?;
        debug!(path = %out_path.display(), bytes = n, "wrote entry");
        written.push(out_path);
    }

    Ok(written)
}
