//! Artifact retrieval and extraction
//!
//! The finished job artifact is streamed to a uniquely named scratch file,
//! then unpacked beside the caller's destination path. The scratch file is
//! removed afterwards unless the caller asked to keep it.

mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use zip::ZipExtractor;

use crate::error::{Error, Result};
use crate::service::cancellable;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Prefix of scratch archive file names
pub const SCRATCH_PREFIX: &str = "landscape-dl-";

/// Minimum growth between two progress reports
pub const PROGRESS_STEP_BYTES: u64 = 1024 * 1024;

/// A downloaded archive on local disk
///
/// Removed on drop unless [`ScratchArchive::keep`] was called.
#[derive(Debug)]
pub struct ScratchArchive {
    file: NamedTempFile,
    bytes: u64,
}

impl ScratchArchive {
    /// Location of the archive
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes written
    pub fn len(&self) -> u64 {
        self.bytes
    }

    /// True when the server sent an empty body
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Persist the archive and return its path
    pub fn keep(self) -> Result<PathBuf> {
        let (_file, path) = self.file.keep().map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }

    /// Delete the archive now, reporting failures
    pub fn remove(self) -> Result<()> {
        Ok(self.file.close()?)
    }
}

/// Stream `url` into a fresh scratch file inside `scratch_dir`
///
/// `on_progress` receives the running byte count and the advertised length,
/// at most once per [`PROGRESS_STEP_BYTES`] and always once at the end.
/// The write handle is closed on every exit path; on failure the partial
/// file is deleted.
pub async fn download_to_scratch<F>(
    http: &reqwest::Client,
    url: &Url,
    scratch_dir: &Path,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<ScratchArchive>
where
    F: FnMut(u64, Option<u64>),
{
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(".zip")
        .tempfile_in(scratch_dir)
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create scratch file in {}: {}",
                    scratch_dir.display(),
                    e
                ),
            ))
        })?;
    debug!(%url, scratch = ?scratch.path(), "downloading artifact");

    let mut response = cancellable(cancel, async {
        Ok(http.get(url.clone()).send().await?.error_for_status()?)
    })
    .await?;
    let total = response.content_length();

    let bytes = {
        let mut out = tokio::fs::File::from_std(scratch.reopen()?);
        let mut written = 0u64;
        let mut reported = None;
        while let Some(chunk) =
            cancellable(cancel, async { Ok(response.chunk().await?) }).await?
        {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if written >= reported.unwrap_or(0) + PROGRESS_STEP_BYTES {
                on_progress(written, total);
                reported = Some(written);
            }
        }
        out.flush().await?;
        if reported != Some(written) {
            on_progress(written, total);
        }
        written
    };

    info!(%url, bytes, scratch = ?scratch.path(), "artifact downloaded");
    Ok(ScratchArchive {
        file: scratch,
        bytes,
    })
}

/// Unpack `archive_path` beside `destination` on the blocking pool
pub async fn extract_archive(archive_path: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
    let archive_owned = archive_path.to_path_buf();
    let destination_owned = destination.to_path_buf();

    tokio::task::spawn_blocking(move || ZipExtractor::extract(&archive_owned, &destination_owned))
        .await
        .map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "extraction task panicked: {}",
                e
            )))
        })?
}

/// Download `url` and unpack it beside `destination`
///
/// Returns the files written and, with `keep_archive`, the persisted archive.
pub async fn fetch_and_extract<F>(
    http: &reqwest::Client,
    url: &Url,
    destination: &Path,
    scratch_dir: &Path,
    keep_archive: bool,
    cancel: &CancellationToken,
    on_progress: F,
) -> Result<(Vec<PathBuf>, Option<PathBuf>)>
where
    F: FnMut(u64, Option<u64>),
{
    let scratch = download_to_scratch(http, url, scratch_dir, cancel, on_progress).await?;

    if keep_archive {
        let archive = scratch.keep()?;
        info!(?archive, "keeping downloaded archive");
        let files = extract_archive(&archive, destination).await?;
        return Ok((files, Some(archive)));
    }

    let result = extract_archive(scratch.path(), destination).await;
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.remove() {
        warn!(?path, error = %e, "failed to remove scratch archive");
    }
    Ok((result?, None))
}
