//! Mapping between remote object keys and local filesystem paths

use std::path::{Path, PathBuf};

use crate::s3::types::ObjectKey;

/// Compute the path relative to the local root for a downloaded key.
///
/// With `preserve_subpaths` the key's internal separators survive, so nested
/// remote structure is reproduced locally; without it the relative path
/// collapses to the key's basename.
pub fn relative_path(key: &ObjectKey, prefix: &str, preserve_subpaths: bool) -> String {
    // A prefix that is not slash-terminated leaves a leading separator on
    // the remainder; trim it so the later join stays under the local root.
    let rel = key.relative_to(prefix).trim_start_matches('/');

    if rel.is_empty() {
        // Key equal to the prefix itself; fall back to its basename.
        return key.file_name().to_string();
    }

    if preserve_subpaths {
        rel.to_string()
    } else {
        rel.rsplit('/').next().unwrap_or(rel).to_string()
    }
}

/// Map a remote key to its destination under `local_root`.
pub fn map_to_local(
    key: &ObjectKey,
    prefix: &str,
    local_root: &Path,
    preserve_subpaths: bool,
) -> PathBuf {
    local_root.join(relative_path(key, prefix, preserve_subpaths))
}

/// Map a local file name to the remote key it is uploaded under.
pub fn map_to_remote(file_name: &str, prefix: &str) -> ObjectKey {
    if prefix.is_empty() {
        ObjectKey::new(file_name)
    } else if prefix.ends_with('/') {
        ObjectKey::new(format!("{prefix}{file_name}"))
    } else {
        ObjectKey::new(format!("{prefix}/{file_name}"))
    }
}
