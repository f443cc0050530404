//! S3 data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bucket-relative object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for keys ending in `/` — empty "folder" placeholders with no
    /// content of interest. Markers are excluded from listings and transfers.
    pub fn is_directory_marker(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The final path component of the key.
    pub fn file_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.0)
    }

    /// The key with `prefix` stripped from the front when the key starts
    /// with it; otherwise the full key.
    pub fn relative_to<'a>(&'a self, prefix: &str) -> &'a str {
        if prefix.is_empty() {
            return &self.0;
        }
        self.0.strip_prefix(prefix).unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// One page of a paginated listing, directory markers already filtered out.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<ObjectKey>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_marker_detection() {
        assert!(ObjectKey::from("folder/").is_directory_marker());
        assert!(ObjectKey::from("a/b/c/").is_directory_marker());
        assert!(ObjectKey::from("/").is_directory_marker());
        assert!(!ObjectKey::from("file.txt").is_directory_marker());
        assert!(!ObjectKey::from("a/b/file.txt").is_directory_marker());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ObjectKey::from("path/to/myfile.txt").file_name(), "myfile.txt");
        assert_eq!(ObjectKey::from("myfile.txt").file_name(), "myfile.txt");
        assert_eq!(ObjectKey::from("path/to/folder/").file_name(), "folder");
    }

    #[test]
    fn test_relative_to_matching_prefix() {
        let key = ObjectKey::from("egress/2024/data.csv");
        assert_eq!(key.relative_to("egress/"), "2024/data.csv");
    }

    #[test]
    fn test_relative_to_non_matching_prefix() {
        let key = ObjectKey::from("other/data.csv");
        assert_eq!(key.relative_to("egress/"), "other/data.csv");
    }

    #[test]
    fn test_relative_to_empty_prefix() {
        let key = ObjectKey::from("a/b/data.csv");
        assert_eq!(key.relative_to(""), "a/b/data.csv");
    }
}
