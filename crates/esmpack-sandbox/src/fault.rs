//! Runtime fault capture and the diagnostic overlay.
//!
//! The runtime raises uncaught errors and unhandled rejections through a
//! [`FaultHook`]. The agent drains them and hands each one to the
//! [`FaultReporter`], which renders a persistent overlay until a newer
//! build commits its module.

use crate::surface::{Overlay, Surface};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Element id of the overlay.
pub const OVERLAY_ID: &str = "esmpack-error-overlay";

/// Highest stacking order a browser honors.
pub const OVERLAY_Z_INDEX: u32 = 2_147_483_647;

const OVERLAY_TITLE: &str = "Runtime Error";
const UNKNOWN_MESSAGE: &str = "Unknown error";
const NO_STACK: &str = "(no stack trace)";

/// Where a fault was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// Uncaught synchronous error.
    Error,
    /// Promise rejected with no handler attached.
    UnhandledRejection,
}

impl fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::UnhandledRejection => write!(f, "unhandledrejection"),
        }
    }
}

/// A value thrown or rejected by user code.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultValue {
    /// An error object.
    Error {
        message: Option<String>,
        stack: Option<String>,
    },
    /// A thrown string.
    Text(String),
    /// Any other value that serializes.
    Structured(Value),
    /// A value that could not be serialized (e.g. a cyclic object).
    Unserializable,
}

impl FaultValue {
    /// An error with a message and no stack.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
            stack: None,
        }
    }

    /// Reduce to a message/stack pair.
    pub fn normalize(&self) -> FaultReport {
        match self {
            Self::Error { message, stack } => {
                let message = message.as_deref().filter(|m| !m.is_empty());
                let stack = stack.as_deref().filter(|s| !s.is_empty()).or(message);
                FaultReport {
                    message: message.unwrap_or(UNKNOWN_MESSAGE).to_string(),
                    stack: stack.unwrap_or(NO_STACK).to_string(),
                }
            }
            Self::Text(text) => FaultReport::from_text(text),
            Self::Structured(value) => match serde_json::to_string(value) {
                Ok(text) => FaultReport::from_text(&text),
                Err(_) => FaultReport::unknown(),
            },
            Self::Unserializable => FaultReport::unknown(),
        }
    }
}

/// A fault reduced to displayable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub message: String,
    pub stack: String,
}

impl FaultReport {
    fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::unknown();
        }
        Self {
            message: text.to_string(),
            stack: text.to_string(),
        }
    }

    fn unknown() -> Self {
        Self {
            message: UNKNOWN_MESSAGE.to_string(),
            stack: NO_STACK.to_string(),
        }
    }
}

/// A captured fault on its way to the reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeFault {
    pub value: FaultValue,
    pub origin: FaultOrigin,
}

/// Handle the runtime raises faults through.
#[derive(Debug, Clone)]
pub struct FaultHook {
    tx: mpsc::UnboundedSender<RuntimeFault>,
}

impl FaultHook {
    /// Deliver a fault. Dropped silently once the sandbox is gone.
    pub fn raise(&self, value: FaultValue, origin: FaultOrigin) {
        if self.tx.send(RuntimeFault { value, origin }).is_err() {
            tracing::debug!(%origin, "Fault raised after sandbox shutdown");
        }
    }
}

/// Receiving end of installed fault capture.
pub type FaultReceiver = mpsc::UnboundedReceiver<RuntimeFault>;

#[derive(Debug)]
enum InstallState {
    NotInstalled,
    Installed(FaultHook),
}

/// Escape text for insertion into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders captured faults as an overlay on the sandbox surface.
pub struct FaultReporter {
    surface: Arc<dyn Surface>,
    state: InstallState,
}

impl FaultReporter {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            state: InstallState::NotInstalled,
        }
    }

    /// Start capturing faults.
    ///
    /// Returns the receiver on the first call only; later calls are no-ops
    /// that return `None`.
    pub fn install(&mut self) -> Option<FaultReceiver> {
        if let InstallState::Installed(_) = self.state {
            tracing::debug!("Fault reporter already installed");
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.state = InstallState::Installed(FaultHook { tx });
        tracing::debug!("Fault reporter installed");
        Some(rx)
    }

    /// The hook to hand to the runtime, once installed.
    pub fn hook(&self) -> Option<FaultHook> {
        match &self.state {
            InstallState::Installed(hook) => Some(hook.clone()),
            InstallState::NotInstalled => None,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.state, InstallState::Installed(_))
    }

    /// Render a captured fault.
    pub fn report(&self, fault: &RuntimeFault) -> FaultReport {
        self.show(&fault.value, Some(fault.origin))
    }

    /// Render any value, with an origin in the title when known.
    pub fn show(&self, value: &FaultValue, origin: Option<FaultOrigin>) -> FaultReport {
        let report = value.normalize();
        let title = match origin {
            Some(origin) => format!("{OVERLAY_TITLE} ({origin})"),
            None => OVERLAY_TITLE.to_string(),
        };
        tracing::warn!(title = %title, message = %report.message, "Runtime fault");
        self.surface.render_overlay(&Overlay {
            id: OVERLAY_ID.to_string(),
            z_index: OVERLAY_Z_INDEX,
            title,
            message_html: escape_html(&report.message),
            stack_html: escape_html(&report.stack),
        });
        report
    }

    /// Remove the overlay.
    pub fn clear(&self) {
        self.surface.remove_overlay();
    }
}
