//! Outbound signaling
//!
//! Sessions emit [`Envelope`]s through a [`SignalingTransport`]. Delivery is
//! fire-and-forget from the session's point of view: a failed send is logged
//! and never fails the intent that produced it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::jingle::{codec, Action, JingleMessage};
use crate::session::SessionId;

/// One outbound Jingle action addressed to the remote party
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sid: SessionId,
    pub to: String,
    pub message: JingleMessage,
}

impl Envelope {
    pub fn new(sid: SessionId, to: impl Into<String>, message: JingleMessage) -> Self {
        Self {
            sid,
            to: to.into(),
            message,
        }
    }

    pub fn action(&self) -> Action {
        self.message.action()
    }

    /// Wire form of this envelope
    pub fn to_wire(&self) -> WireEnvelope {
        let (action, payload) = codec::encode(&self.message);
        WireEnvelope {
            sid: self.sid.to_string(),
            to: self.to.clone(),
            action: action.as_str().to_string(),
            jingle: payload,
        }
    }
}

/// JSON form of an envelope as exchanged with a signaling server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub sid: String,
    pub to: String,
    pub action: String,
    pub jingle: Value,
}

/// Sink for outbound signaling
pub trait SignalingTransport: Send + Sync {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Transport backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalingTransport for ChannelTransport {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx.send(envelope).map_err(|_| TransportError::Closed)
    }
}
