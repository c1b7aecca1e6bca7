//! Directory classification. Every function here lists a single directory
//! and never descends.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::AccessError;

pub(crate) fn access_error(path: &Path, source: io::Error) -> AccessError {
    AccessError {
        path: path.to_path_buf(),
        source,
    }
}

/// Returns true iff `path` currently has zero entries.
pub fn is_empty(path: &Path) -> Result<bool, AccessError> {
    is_empty_except(path, &HashSet::new())
}

/// Returns true iff every entry still present in `path` is a subdirectory
/// already confirmed empty during this pass.
///
/// Confirmed children may still exist on disk when the action for them has
/// not run yet (or is side-effect-free), so they are discounted here.
/// Symbolic links are never followed: a link to a directory is an ordinary
/// entry and keeps `path` non-empty.
pub fn is_empty_except(path: &Path, confirmed: &HashSet<OsString>) -> Result<bool, AccessError> {
    let listing = WalkDir::new(path).max_depth(1).follow_links(false);

    for entry in listing {
        let entry = entry.map_err(|e| access_error(path, e.into()))?;
        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(access_error(path, io::Error::other("not a directory")));
            }
            continue;
        }
        if !entry.file_type().is_dir() || !confirmed.contains(entry.file_name()) {
            return Ok(false);
        }
    }
    Ok(true)
}
