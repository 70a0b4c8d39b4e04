//! The host's persistent preview status line.

use chrono::{DateTime, Utc};
use esmpack_core::FilesAck;
use serde::Serialize;
use std::fmt;

/// Where the latest preview build stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum BuildStatus {
    /// Nothing sent yet.
    Idle,
    /// A `files-update` was sent and not yet acknowledged.
    Building,
    Succeeded { warnings: Vec<String> },
    Failed { error: String },
}

impl From<&FilesAck> for BuildStatus {
    fn from(ack: &FilesAck) -> Self {
        if ack.success {
            Self::Succeeded {
                warnings: ack.warnings.clone().unwrap_or_default(),
            }
        } else {
            Self::Failed {
                error: ack
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Waiting for preview"),
            Self::Building => write!(f, "Building..."),
            Self::Succeeded { warnings } if warnings.is_empty() => write!(f, "Preview up to date"),
            Self::Succeeded { warnings } => {
                let noun = if warnings.len() == 1 { "warning" } else { "warnings" };
                write!(f, "Preview up to date ({} {})", warnings.len(), noun)
            }
            Self::Failed { error } => write!(f, "Build failed: {error}"),
        }
    }
}

/// A status plus when it was entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    #[serde(flatten)]
    pub status: BuildStatus,
    pub since: DateTime<Utc>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self {
            status: BuildStatus::Idle,
            since: Utc::now(),
        }
    }

    /// Move to `status`, stamping the transition time.
    pub fn set(&mut self, status: BuildStatus) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "Status changed");
        }
        self.status = status;
        self.since = Utc::now();
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)
    }
}
