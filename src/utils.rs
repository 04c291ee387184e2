//! Utility functions for output path derivation and URL rewriting

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use url::Url;

/// File stem of the destination path
///
/// # Errors
///
/// Returns an [`Error::Io`] with `InvalidInput` when the path has no file name.
pub fn destination_stem(destination: &Path) -> Result<&std::ffi::OsStr> {
    destination
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("destination has no file name: {}", destination.display()),
            ))
        })
}

/// Output path for an archive entry: destination stem plus the entry's extension
///
/// The stem comes from proper path splitting (last path component, last dot),
/// so `dir/out.lcp` with entry `data/Landscape_1.prj` gives `dir/out.prj`.
/// Entries without an extension are written to the bare stem.
///
/// # Examples
///
/// ```
/// use landscape_dl::utils::sibling_output_path;
/// use std::path::{Path, PathBuf};
///
/// let out = sibling_output_path(Path::new("/data/out.lcp"), "a.prj").unwrap();
/// assert_eq!(out, PathBuf::from("/data/out.prj"));
/// ```
pub fn sibling_output_path(destination: &Path, entry_name: &str) -> Result<PathBuf> {
    let stem = destination_stem(destination)?;

    let mut name = OsString::from(stem);
    if let Some(ext) = Path::new(entry_name).extension() {
        name.push(".");
        name.push(ext);
    }

    Ok(destination.with_file_name(name))
}

/// Set `key` to `value` in the query string, replacing any existing values
///
/// Other parameters keep their order.
pub fn pin_query_param(url: &Url, key: &str, value: &str) -> Url {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pinned = url.clone();
    pinned
        .query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(key, value);
    pinned
}
