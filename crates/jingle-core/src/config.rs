//! Session configuration
//!
//! [`SessionConfig`] is plain data: it can be built in code with the `with_*`
//! methods or loaded from YAML/JSON, and is checked with
//! [`SessionConfig::validate`] before a session is built.
//!
//! ```
//! use jingle_core::config::SessionConfig;
//! use std::time::Duration;
//!
//! let config = SessionConfig::new("bob@example.com")
//!     .with_initiator(true)
//!     .with_negotiation_timeout(Duration::from_secs(10));
//! assert!(config.validate().is_ok());
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SessionError};
use crate::session::SessionId;

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Receive flags of a constraint set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandatory {
    #[serde(rename = "OfferToReceiveAudio", default)]
    pub offer_to_receive_audio: bool,
    #[serde(rename = "OfferToReceiveVideo", default)]
    pub offer_to_receive_video: bool,
}

/// Constraints passed to the negotiation primitive for offers and answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<Mandatory>,
}

impl MediaConstraints {
    pub fn new(receive_audio: bool, receive_video: bool) -> Self {
        Self {
            mandatory: Some(Mandatory {
                offer_to_receive_audio: receive_audio,
                offer_to_receive_video: receive_video,
            }),
        }
    }

    /// Constraints used when accepting without explicit ones
    pub fn receive_all() -> Self {
        Self::new(true, true)
    }

    /// Whether audio is not requested by a mandatory constraint set
    pub fn declines_audio(&self) -> bool {
        matches!(self.mandatory, Some(m) if !m.offer_to_receive_audio)
    }

    /// Whether video is not requested by a mandatory constraint set
    pub fn declines_video(&self) -> bool {
        matches!(self.mandatory, Some(m) if !m.offer_to_receive_video)
    }
}

/// Configuration of one media session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<SessionId>,

    /// Address of the remote party
    pub peer: String,

    /// Whether this side will send session-initiate
    #[serde(default)]
    pub initiator: bool,

    /// Constraints used by offers and renegotiation answers
    #[serde(default)]
    pub constraints: MediaConstraints,

    /// Re-send the last local candidate flagged as end-of-candidates once
    /// gathering completes
    #[serde(default)]
    pub signal_end_of_candidates: bool,

    /// Upper bound for a single queued negotiation task, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_timeout_ms: Option<u64>,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl SessionConfig {
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            sid: None,
            peer: peer.into(),
            initiator: false,
            constraints: MediaConstraints::default(),
            signal_end_of_candidates: false,
            negotiation_timeout_ms: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<SessionId>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_initiator(mut self, initiator: bool) -> Self {
        self.initiator = initiator;
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_end_of_candidates(mut self) -> Self {
        self.signal_end_of_candidates = true;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.peer.trim().is_empty() {
            return Err(SessionError::config("Peer address must not be empty"));
        }

        if let Some(sid) = &self.sid {
            if sid.as_str().is_empty() {
                return Err(SessionError::config("Session id must not be empty"));
            }
        }

        if self.negotiation_timeout_ms == Some(0) {
            return Err(SessionError::config("Negotiation timeout must be greater than 0"));
        }

        if self.event_capacity == 0 {
            return Err(SessionError::config("Event capacity must be greater than 0"));
        }

        Ok(())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SessionError::config(format!("Invalid session config: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::config(format!("Invalid session config: {}", e)))
    }

    /// Load from a file, choosing the format by extension (`.json`, else YAML)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SessionError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }
}
