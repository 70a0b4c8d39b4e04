//! Error types for esmpack-core.

use crate::compiler::{Diagnostic, Severity};
use thiserror::Error;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that end a single build cycle.
///
/// None of these leave the orchestrator in a state that prevents the next
/// build from starting cleanly.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The update carried no entry path and had no files to default from.
    #[error("No entry file provided.")]
    NoEntry,

    /// The entry path is empty or matches nothing in the store.
    #[error("Entry file not found: {0}")]
    EntryNotFound(String),

    /// The compiler failed or reported errors.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The compiler succeeded but produced no usable code.
    #[error("Bundle is empty. Check your entry file exports.")]
    EmptyBundle,
}

/// Errors reported by (or while talking to) the compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler rejected the build with one or more diagnostics.
    #[error("{}", format_failure(.errors))]
    Diagnostics {
        /// Error-level diagnostics, in the order the compiler reported them.
        errors: Vec<Diagnostic>,
    },

    /// The compiler could not be started or went away mid-build.
    #[error("compiler unavailable: {0}")]
    Unavailable(String),

    /// JSON-RPC error from an external compiler process.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// Error code from the compiler process
        code: i32,
        /// Error message from the compiler process
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Diagnostics { errors } => errors,
            _ => &[],
        }
    }
}

fn format_failure(errors: &[Diagnostic]) -> String {
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    let mut out = format!("Build failed with {} {}:", errors.len(), noun);
    for error in errors {
        out.push('\n');
        out.push_str(&error.format(Severity::Error));
    }
    out
}
