//! In-memory file set that the resolver and compiler read from.

use crate::resolver::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single source file handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    /// Store-relative path (no leading slash or `./` once normalized).
    pub path: String,
    /// File contents.
    #[serde(default)]
    pub content: String,
}

impl VirtualFile {
    /// Create a new file.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Normalized mapping of path to contents, built fresh for every build.
///
/// The store is never mutated after construction; builds share it behind an
/// `Arc` so resolve and load hooks always see the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct VirtualFileStore {
    files: HashMap<String, String>,
}

impl VirtualFileStore {
    /// Build a store from a file list, normalizing every path.
    ///
    /// Later files win when two paths normalize to the same key. Paths that
    /// normalize to nothing are skipped.
    pub fn from_files<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = &'a VirtualFile>,
    {
        let mut map = HashMap::new();
        for file in files {
            let path = normalize_path(&file.path);
            if path.is_empty() {
                tracing::debug!(raw_path = %file.path, "Skipping file with empty path");
                continue;
            }
            if map.insert(path.to_string(), file.content.clone()).is_some() {
                tracing::debug!(path = %path, "Duplicate path in file set, keeping the last one");
            }
        }
        Self { files: map }
    }

    /// Get the contents stored at an exact (normalized) path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Check whether an exact (normalized) path exists.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files in the store.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all stored paths in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for VirtualFileStore {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let files: Vec<VirtualFile> = iter
            .into_iter()
            .map(|(path, content)| VirtualFile { path, content })
            .collect();
        Self::from_files(&files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_normalized() {
        let files = vec![
            VirtualFile::new("./src/index.tsx", "a"),
            VirtualFile::new("//src/App.tsx", "b"),
        ];
        let store = VirtualFileStore::from_files(&files);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("src/index.tsx"), Some("a"));
        assert_eq!(store.get("src/App.tsx"), Some("b"));
        assert!(!store.contains("./src/index.tsx"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let files = vec![
            VirtualFile::new("a.ts", "first"),
            VirtualFile::new("/a.ts", "second"),
        ];
        let store = VirtualFileStore::from_files(&files);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.ts"), Some("second"));
    }

    #[test]
    fn test_empty_paths_are_skipped() {
        let files = vec![VirtualFile::new("/", "x"), VirtualFile::new("./", "y")];
        let store = VirtualFileStore::from_files(&files);
        assert!(store.is_empty());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let store: VirtualFileStore = [("src/App.tsx".to_string(), String::new())]
            .into_iter()
            .collect();
        assert!(store.contains("src/App.tsx"));
        assert!(!store.contains("src/app.tsx"));
    }

    #[test]
    fn test_missing_content_defaults_to_empty() {
        let file: VirtualFile = serde_json::from_str(r#"{"path":"a.ts"}"#).unwrap();
        assert_eq!(file.content, "");
    }
}
