//! Error types for esmpack-host.

use esmpack_core::ChannelClosed;
use thiserror::Error;

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors from editing the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// Path is empty after normalization.
    #[error("file path must not be empty")]
    EmptyPath,

    /// Another file already has this path.
    #[error("file already exists: {0}")]
    Duplicate(String),

    /// No file has this path.
    #[error("file not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the host side.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The sandbox context is gone.
    #[error(transparent)]
    Channel(#[from] ChannelClosed),
}
