//! The host's editable, ordered file set.

use crate::error::WorkspaceError;
use esmpack_core::resolver::normalize_path;
use esmpack_core::{FilesUpdate, VirtualFile};

/// Files being edited on the host, in display order.
///
/// Paths are stored normalized and are unique. The entry, if set, always
/// names an existing file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    files: Vec<VirtualFile>,
    entry: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// All files in order.
    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The explicit entry, if one was set.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        let path = normalize_path(path);
        self.files.iter().find(|f| f.path == path)
    }

    /// Append a new file.
    pub fn add(
        &mut self,
        path: &str,
        content: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        let path = Self::checked_path(path)?;
        if self.position(path).is_some() {
            return Err(WorkspaceError::Duplicate(path.to_string()));
        }
        self.files.push(VirtualFile::new(path, content));
        Ok(())
    }

    /// Replace a file's contents.
    pub fn update(
        &mut self,
        path: &str,
        content: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        let idx = self.index_of(path)?;
        self.files[idx].content = content.into();
        Ok(())
    }

    /// Remove a file, clearing the entry if it pointed there.
    pub fn remove(&mut self, path: &str) -> Result<VirtualFile, WorkspaceError> {
        let idx = self.index_of(path)?;
        let removed = self.files.remove(idx);
        if self.entry.as_deref() == Some(removed.path.as_str()) {
            self.entry = None;
        }
        Ok(removed)
    }

    /// Move a file to a new path, keeping its position and entry status.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), WorkspaceError> {
        let idx = self.index_of(from)?;
        let to = Self::checked_path(to)?;
        if let Some(existing) = self.position(to) {
            if existing != idx {
                return Err(WorkspaceError::Duplicate(to.to_string()));
            }
        }
        if self.entry.as_deref() == Some(self.files[idx].path.as_str()) {
            self.entry = Some(to.to_string());
        }
        self.files[idx].path = to.to_string();
        Ok(())
    }

    /// Pin the entry to an existing file.
    pub fn set_entry(&mut self, path: &str) -> Result<(), WorkspaceError> {
        let idx = self.index_of(path)?;
        self.entry = Some(self.files[idx].path.clone());
        Ok(())
    }

    /// The `files-update` payload for the current state.
    pub fn snapshot(&self) -> FilesUpdate {
        match &self.entry {
            Some(entry) => FilesUpdate::new(self.files.clone(), entry.clone()),
            None => FilesUpdate::without_entry(self.files.clone()),
        }
    }

    fn checked_path(path: &str) -> Result<&str, WorkspaceError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(WorkspaceError::EmptyPath);
        }
        Ok(path)
    }

    fn position(&self, normalized: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == normalized)
    }

    fn index_of(&self, path: &str) -> Result<usize, WorkspaceError> {
        let path = normalize_path(path);
        self.position(path)
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))
    }
}
