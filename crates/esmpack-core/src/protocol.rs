//! Messages exchanged between the host and its preview sandbox.
//!
//! Every message is a JSON object `{"type": ..., "payload": ...}`. Receivers
//! parse incoming data with [`Message::from_value`] and drop anything that
//! does not match a known shape.

use crate::store::VirtualFile;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A message crossing the host/sandbox boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Message {
    /// Sandbox to host: the sandbox is listening.
    IframeReady,
    /// Host to sandbox: rebuild from this file set.
    FilesUpdate(FilesUpdate),
    /// Sandbox to host: outcome of the latest build.
    FilesAck(FilesAck),
}

impl Message {
    /// Parse untyped channel data, returning `None` for anything unrecognized.
    ///
    /// A `files-update` with a missing or null payload is an update with no
    /// files, so the sandbox still answers it.
    pub fn from_value(data: &Value) -> Option<Self> {
        if data.get("type").and_then(Value::as_str) == Some("files-update")
            && data.get("payload").map_or(true, Value::is_null)
        {
            return Some(Self::FilesUpdate(FilesUpdate::default()));
        }
        match Self::deserialize(data) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized message");
                None
            }
        }
    }

    /// Serialize into untyped channel data.
    pub fn to_value(&self) -> Value {
        // Serializing these types cannot fail: every map key is a string.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The wire discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IframeReady => "iframe-ready",
            Self::FilesUpdate(_) => "files-update",
            Self::FilesAck(_) => "files-ack",
        }
    }
}

/// Payload of a `files-update` message.
///
/// Both `{"files": [...], "entry": "..."}` and a bare file array are
/// accepted. List entries without a string path are skipped but still
/// counted by [`file_count`](Self::file_count).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesUpdate {
    pub files: Vec<VirtualFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(skip)]
    skipped: usize,
}

impl FilesUpdate {
    /// Create an update with an explicit entry.
    pub fn new(files: Vec<VirtualFile>, entry: impl Into<String>) -> Self {
        Self {
            files,
            entry: Some(entry.into()),
            skipped: 0,
        }
    }

    /// Create an update whose entry defaults to the first file.
    pub fn without_entry(files: Vec<VirtualFile>) -> Self {
        Self {
            files,
            entry: None,
            skipped: 0,
        }
    }

    /// The entry path: the explicit one, or else the first file's path.
    pub fn entry(&self) -> Option<&str> {
        self.entry
            .as_deref()
            .or_else(|| self.files.first().map(|f| f.path.as_str()))
    }

    /// Number of list entries received, including skipped ones.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.skipped
    }

    fn from_entries(entries: Vec<Value>, entry: Option<String>) -> Self {
        let mut files = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for raw in entries {
            let path = raw.get("path").and_then(Value::as_str);
            match path {
                Some(path) => {
                    let content = raw
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    files.push(VirtualFile::new(path, content));
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "Skipped file entries without a string path");
        }
        Self {
            files,
            entry,
            skipped,
        }
    }
}

impl<'de> Deserialize<'de> for FilesUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            // Listed first: untagged structs also accept sequences.
            List(Vec<Value>),
            Object {
                #[serde(default)]
                files: Option<Value>,
                #[serde(default)]
                entry: Option<Value>,
            },
        }

        let update = match Wire::deserialize(deserializer)? {
            Wire::List(entries) => Self::from_entries(entries, None),
            Wire::Object { files, entry } => {
                let entries = match files {
                    Some(Value::Array(entries)) => entries,
                    _ => Vec::new(),
                };
                let entry = entry.and_then(|e| e.as_str().map(str::to_string));
                Self::from_entries(entries, entry)
            }
        };
        Ok(update)
    }
}

/// Payload of a `files-ack` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesAck {
    pub file_count: usize,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilesAck {
    /// Acknowledge a successful build.
    pub fn success(file_count: usize, warnings: Vec<String>) -> Self {
        Self {
            file_count,
            success: true,
            warnings: Some(warnings),
            error: None,
        }
    }

    /// Acknowledge a failed build.
    pub fn failure(file_count: usize, error: impl Into<String>) -> Self {
        Self {
            file_count,
            success: false,
            warnings: None,
            error: Some(error.into()),
        }
    }
}
