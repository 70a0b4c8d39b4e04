//! Error types for esmpack-sandbox.

use esmpack_core::{BuildError, ChannelClosed, ConfigError};
use thiserror::Error;

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors that can end a sandbox build cycle or the sandbox itself.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Resolving or compiling the bundle failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Loading or evaluating the compiled module threw.
    #[error("{0}")]
    Evaluation(String),

    /// The runtime rejected the import map.
    #[error("failed to install import map: {0}")]
    ImportMap(String),

    /// Invalid sandbox configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The host side of the channel is gone.
    #[error(transparent)]
    Channel(#[from] ChannelClosed),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_errors_keep_their_message() {
        let err: SandboxError = BuildError::NoEntry.into();
        assert_eq!(err.to_string(), "No entry file provided.");
    }

    #[test]
    fn test_evaluation_error_is_the_thrown_message() {
        let err = SandboxError::Evaluation("App is not defined".into());
        assert_eq!(err.to_string(), "App is not defined");
    }
}
