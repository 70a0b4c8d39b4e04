//! Authenticated two-party message channel.
//!
//! Each execution context (the host, the sandbox) owns a [`Port`]. Anyone
//! holding a port's mailbox can deliver an [`Envelope`] to it, but the port
//! only yields messages whose `source` is its known counterpart. Everything
//! else is dropped.

use crate::protocol::Message;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a new random context ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ContextId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Untyped data plus the identity of the context that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: ContextId,
    pub data: Value,
}

/// The counterpart's port has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel closed: peer context is gone")]
pub struct ChannelClosed;

/// Cloneable sending half of a [`Port`], for tasks that post replies.
#[derive(Debug, Clone)]
pub struct PortSender {
    id: ContextId,
    outbox: mpsc::UnboundedSender<Envelope>,
}

impl PortSender {
    /// Post a message to the peer, stamped with this context's id.
    pub fn post(&self, message: &Message) -> Result<(), ChannelClosed> {
        self.post_value(message.to_value())
    }

    /// Post raw data to the peer.
    pub fn post_value(&self, data: Value) -> Result<(), ChannelClosed> {
        self.outbox
            .send(Envelope {
                source: self.id,
                data,
            })
            .map_err(|_| ChannelClosed)
    }

    /// The id stamped on every posted envelope.
    pub fn id(&self) -> ContextId {
        self.id
    }
}

/// One side of a two-party channel.
#[derive(Debug)]
pub struct Port {
    id: ContextId,
    peer: ContextId,
    sender: PortSender,
    mailbox: mpsc::WeakUnboundedSender<Envelope>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl Port {
    /// This context's id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The only context this port accepts messages from.
    pub fn peer(&self) -> ContextId {
        self.peer
    }

    /// A cloneable handle for posting to the peer.
    pub fn sender(&self) -> PortSender {
        self.sender.clone()
    }

    /// Post a message to the peer.
    pub fn post(&self, message: &Message) -> Result<(), ChannelClosed> {
        tracing::trace!(from = %self.id, kind = message.kind(), "Posting message");
        self.sender.post(message)
    }

    /// Raw delivery handle into this port's inbox.
    ///
    /// Any context may use it; the port filters by sender on receipt. `None`
    /// once the peer and every [`PortSender`] for it are gone.
    pub fn mailbox(&self) -> Option<mpsc::UnboundedSender<Envelope>> {
        self.mailbox.upgrade()
    }

    /// Receive the next well-formed message from the peer.
    ///
    /// Envelopes from any other source, and data that is not a known
    /// [`Message`], are dropped. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let envelope = self.inbox.recv().await?;
            if envelope.source != self.peer {
                tracing::warn!(
                    port = %self.id,
                    source = %envelope.source,
                    "Dropping message from foreign sender"
                );
                continue;
            }
            if let Some(message) = Message::from_value(&envelope.data) {
                tracing::trace!(port = %self.id, kind = message.kind(), "Received message");
                return Some(message);
            }
        }
    }
}

/// Create connected ports for two fresh contexts, `(host, sandbox)`.
pub fn pair() -> (Port, Port) {
    pair_with_ids(ContextId::new(), ContextId::new())
}

/// Create connected ports for two known contexts.
///
/// Used when a context is reloaded: it keeps its identity but every
/// in-flight message addressed to the old instance is lost.
pub fn pair_with_ids(a: ContextId, b: ContextId) -> (Port, Port) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let port_a = Port {
        id: a,
        peer: b,
        sender: PortSender {
            id: a,
            outbox: b_tx.clone(),
        },
        mailbox: a_tx.downgrade(),
        inbox: a_rx,
    };
    let port_b = Port {
        id: b,
        peer: a,
        sender: PortSender { id: b, outbox: a_tx },
        mailbox: b_tx.downgrade(),
        inbox: b_rx,
    };
    (port_a, port_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pair_delivers_both_ways() {
        let (host, mut sandbox) = pair();
        host.post(&Message::IframeReady).unwrap();
        assert_eq!(sandbox.recv().await, Some(Message::IframeReady));

        let mut host = host;
        sandbox.post(&Message::IframeReady).unwrap();
        assert_eq!(host.recv().await, Some(Message::IframeReady));
    }

    #[tokio::test]
    async fn test_foreign_sender_is_dropped() {
        let (host, mut sandbox) = pair();
        let stranger = ContextId::new();
        let mailbox = sandbox.mailbox().expect("host is alive");
        mailbox
            .send(Envelope {
                source: stranger,
                data: Message::IframeReady.to_value(),
            })
            .unwrap();
        mailbox
            .send(Envelope {
                source: host.id(),
                data: json!({"type": "something-else"}),
            })
            .unwrap();
        host.post(&Message::IframeReady).unwrap();

        // Only the host's well-formed message survives.
        assert_eq!(sandbox.recv().await, Some(Message::IframeReady));
        drop(mailbox);
        drop(host);
        assert_eq!(sandbox.recv().await, None);
    }

    #[tokio::test]
    async fn test_post_after_peer_dropped_fails() {
        let (host, sandbox) = pair();
        drop(sandbox);
        assert_eq!(host.post(&Message::IframeReady), Err(ChannelClosed));
    }

    #[test]
    fn test_pair_with_ids_keeps_identity() {
        let (a, b) = (ContextId::new(), ContextId::new());
        let (port_a, port_b) = pair_with_ids(a, b);
        assert_eq!(port_a.id(), a);
        assert_eq!(port_a.peer(), b);
        assert_eq!(port_b.id(), b);
        assert_eq!(port_b.sender().id(), b);
    }
}
