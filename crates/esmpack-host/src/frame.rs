//! The host half of the sync protocol.
//!
//! A [`PreviewFrame`] stands for the embedded sandbox context. It only sends
//! `files-update` once the sandbox has announced `iframe-ready`; anything
//! attempted before that is dropped, not queued, and the readiness
//! transition itself triggers a catch-up send of the current workspace.

use crate::error::Result;
use crate::status::{BuildStatus, StatusLine};
use crate::workspace::Workspace;
use esmpack_core::channel::{self, ContextId, Envelope};
use esmpack_core::{FilesAck, Message, Port};
use tokio::sync::mpsc;

/// Host-side handle on one preview sandbox.
pub struct PreviewFrame {
    port: Port,
    ready: bool,
    status: StatusLine,
    last_ack: Option<FilesAck>,
}

impl PreviewFrame {
    /// Create a frame and the port its sandbox must be started with.
    pub fn new() -> (Self, Port) {
        let (host, sandbox) = channel::pair();
        (Self::with_port(host), sandbox)
    }

    /// Wrap an existing host-side port.
    pub fn with_port(port: Port) -> Self {
        Self {
            port,
            ready: false,
            status: StatusLine::new(),
            last_ack: None,
        }
    }

    /// Whether the sandbox has signaled readiness since its last load.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// The most recent acknowledgment from the sandbox.
    pub fn last_ack(&self) -> Option<&FilesAck> {
        self.last_ack.as_ref()
    }

    /// The sandbox context this frame talks to.
    pub fn sandbox_id(&self) -> ContextId {
        self.port.peer()
    }

    /// Raw delivery handle into the host's inbox, as any context could use.
    pub fn mailbox(&self) -> Option<mpsc::UnboundedSender<Envelope>> {
        self.port.mailbox()
    }

    /// Send the workspace if the sandbox is ready. Returns whether it sent.
    pub fn sync(&mut self, workspace: &Workspace) -> Result<bool> {
        if !self.ready {
            tracing::debug!(files = workspace.len(), "Sandbox not ready, dropping update");
            return Ok(false);
        }
        let update = workspace.snapshot();
        tracing::debug!(
            sandbox = %self.port.peer(),
            files = update.file_count(),
            entry = ?update.entry(),
            "Sending files update"
        );
        self.port.post(&Message::FilesUpdate(update))?;
        self.status.set(BuildStatus::Building);
        Ok(true)
    }

    /// Apply one message from the sandbox.
    pub fn handle(&mut self, message: Message, workspace: &Workspace) -> Result<()> {
        match message {
            Message::IframeReady => {
                tracing::info!(sandbox = %self.port.peer(), "Sandbox ready");
                self.ready = true;
                self.sync(workspace)?;
            }
            Message::FilesAck(ack) => {
                tracing::debug!(
                    file_count = ack.file_count,
                    success = ack.success,
                    "Sandbox acknowledged files update"
                );
                self.status.set(BuildStatus::from(&ack));
                self.last_ack = Some(ack);
            }
            Message::FilesUpdate(_) => {
                tracing::warn!("Ignoring files-update sent by the sandbox");
            }
        }
        Ok(())
    }

    /// Wait for the next message from the sandbox and apply it.
    ///
    /// Returns `None` once the sandbox side is gone.
    pub async fn next_event(&mut self, workspace: &Workspace) -> Result<Option<Message>> {
        let Some(message) = self.port.recv().await else {
            return Ok(None);
        };
        self.handle(message.clone(), workspace)?;
        Ok(Some(message))
    }

    /// The sandbox context was reloaded from scratch.
    ///
    /// Readiness resets and every message in flight to or from the old
    /// instance is lost. Returns the port the new instance must use.
    pub fn reloaded(&mut self) -> Port {
        tracing::info!(sandbox = %self.port.peer(), "Sandbox reloaded, waiting for readiness");
        let (host, sandbox) = channel::pair_with_ids(self.port.id(), self.port.peer());
        self.port = host;
        self.ready = false;
        sandbox
    }
}
