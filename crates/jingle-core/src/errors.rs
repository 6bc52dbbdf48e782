//! Error types for jingle-core
//!
//! Three families of failure flow through a session:
//!
//! - **Negotiation errors** reported by the [`NegotiationPrimitive`] while an
//!   intent runs its offer/answer cycle. They surface as
//!   [`SessionError::Negotiation`] on the intent's completion and are never
//!   retried.
//! - **Protocol errors** returned to the remote peer when an inbound Jingle
//!   action could not be applied. They carry a [`Condition`] the signaling
//!   layer encodes as an error reply.
//! - **Queue errors** raised when a queued task panicked or exceeded the
//!   configured negotiation timeout.
//!
//! [`NegotiationPrimitive`]: crate::peer::NegotiationPrimitive

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;

/// Result type for local session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Step of an offer/answer cycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationStep {
    CreateOffer,
    CreateAnswer,
    ApplyRemoteOffer,
    ApplyRemoteAnswer,
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateOffer => write!(f, "create offer"),
            Self::CreateAnswer => write!(f, "create answer"),
            Self::ApplyRemoteOffer => write!(f, "apply remote offer"),
            Self::ApplyRemoteAnswer => write!(f, "apply remote answer"),
        }
    }
}

/// Error reported by the negotiation primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PeerError {
    pub message: String,
}

impl PeerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error reported by the signaling transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Signaling channel closed")]
    Closed,

    #[error("Signaling transport error: {0}")]
    Other(String),
}

/// Failure of the negotiation queue itself, independent of what a task does
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The task panicked or the worker went away before it completed
    #[error("Queued task '{0}' aborted before completion")]
    Aborted(String),

    /// The task did not complete within the configured negotiation timeout
    #[error("Queued task '{task}' timed out after {timeout:?}")]
    TimedOut { task: String, timeout: Duration },
}

/// Errors returned by local session intents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Session has ended")]
    SessionEnded,

    #[error("Failed to {step}: {source}")]
    Negotiation {
        step: NegotiationStep,
        #[source]
        source: PeerError,
    },

    #[error("Negotiation task aborted: {0}")]
    TaskAborted(String),

    #[error("Negotiation task '{task}' timed out after {timeout:?}")]
    TaskTimedOut { task: String, timeout: Duration },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    pub fn negotiation(step: NegotiationStep, source: PeerError) -> Self {
        Self::Negotiation { step, source }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }
}

impl From<QueueError> for SessionError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Aborted(task) => Self::TaskAborted(task),
            QueueError::TimedOut { task, timeout } => Self::TaskTimedOut { task, timeout },
        }
    }
}

/// Protocol-level error condition sent back to the remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    GeneralError,
    BadRequest,
    OutOfOrder,
    UnknownSession,
    FeatureNotImplemented,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralError => "general-error",
            Self::BadRequest => "bad-request",
            Self::OutOfOrder => "out-of-order",
            Self::UnknownSession => "unknown-session",
            Self::FeatureNotImplemented => "feature-not-implemented",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reply for an inbound Jingle action
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProtocolError {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn general_error() -> Self {
        Self::new(Condition::GeneralError)
    }

    pub fn bad_request(text: impl Into<String>) -> Self {
        Self::new(Condition::BadRequest).with_text(text)
    }

    pub fn out_of_order() -> Self {
        Self::new(Condition::OutOfOrder)
    }

    pub fn unknown_session() -> Self {
        Self::new(Condition::UnknownSession)
    }

    pub fn feature_not_implemented() -> Self {
        Self::new(Condition::FeatureNotImplemented)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}: {}", self.condition, text),
            None => write!(f, "{}", self.condition),
        }
    }
}

impl From<QueueError> for ProtocolError {
    fn from(error: QueueError) -> Self {
        Self::general_error().with_text(error.to_string())
    }
}
