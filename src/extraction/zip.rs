use crate::error::{Error, Result};
use crate::utils::sibling_output_path;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fan-out extractor for downloaded ZIP archives
///
/// Every file entry is written beside the destination path, named after the
/// destination's stem plus the entry's own extension. `a.prj` and `a.asc`
/// extracted for `out.lcp` become `out.prj` and `out.asc`.
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a single ZIP entry, returning the path written
    fn extract_zip_entry(mut file: ::zip::read::ZipFile, destination: &Path) -> Result<Option<PathBuf>> {
        if file.is_dir() {
            debug!(entry = file.name(), "skipping directory entry");
            return Ok(None);
        }

        let output_path = sibling_output_path(destination, file.name())?;
        debug!(entry = file.name(), ?output_path, "extracting entry");

        let mut outfile = std::fs::File::create(&output_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create {}: {}", output_path.display(), e),
            ))
        })?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to extract {}: {}", file.name(), e),
            ))
        })?;

        Ok(Some(output_path))
    }

    /// Extract every file entry of `archive_path` next to `destination`
    ///
    /// Entries are processed in archive order. A failure stops extraction;
    /// files already written stay on disk.
    pub fn extract(archive_path: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?destination, "attempting ZIP extraction");

        let file = std::fs::File::open(archive_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open ZIP archive: {}", e),
            ))
        })?;

        let mut archive = ::zip::ZipArchive::new(file).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to read ZIP archive {}: {}",
                archive_path.display(),
                e
            )))
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "failed to read ZIP entry {}: {}",
                    i, e
                )))
            })?;

            if let Some(path) = Self::extract_zip_entry(file, destination)? {
                extracted_files.push(path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
