//! Session and connection lifecycle states

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::peer::{IceConnectionState, SignalingState};

/// Jingle session id
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Session lifecycle
///
/// `Starting → Pending → Active → Ended`; `Ended` is terminal and reachable
/// from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Pending,
    Active,
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Media connectivity lifecycle, derived from the ICE state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Starting,
    Connecting,
    Connected,
    Interrupted,
    Disconnected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Connection state an ICE state change maps to
///
/// `None` means the change leaves the connection state untouched.
/// A disconnect while signaling is stable is an interruption that ICE may
/// recover from; during renegotiation it counts as a real disconnect.
pub fn connection_state_for(
    ice: IceConnectionState,
    signaling: SignalingState,
) -> Option<ConnectionState> {
    match ice {
        IceConnectionState::New => None,
        IceConnectionState::Checking => Some(ConnectionState::Connecting),
        IceConnectionState::Connected | IceConnectionState::Completed => Some(ConnectionState::Connected),
        IceConnectionState::Disconnected if signaling == SignalingState::Stable => {
            Some(ConnectionState::Interrupted)
        }
        IceConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        IceConnectionState::Failed => Some(ConnectionState::Failed),
        IceConnectionState::Closed => Some(ConnectionState::Disconnected),
    }
}

/// Whether a session in `state` may process a remote session-initiate
pub fn can_receive_initiate(state: SessionState) -> bool {
    state == SessionState::Starting
}

/// Whether a session in `state` may process a remote session-accept
pub fn can_receive_accept(state: SessionState, is_initiator: bool) -> bool {
    state == SessionState::Pending && is_initiator
}

/// Whether a session in `state` may be accepted locally
pub fn can_accept(state: SessionState) -> bool {
    matches!(state, SessionState::Starting | SessionState::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ice_states_map_to_connection_states() {
        let stable = SignalingState::Stable;
        assert_eq!(connection_state_for(IceConnectionState::New, stable), None);
        assert_eq!(
            connection_state_for(IceConnectionState::Checking, stable),
            Some(ConnectionState::Connecting)
        );
        assert_eq!(
            connection_state_for(IceConnectionState::Completed, stable),
            Some(ConnectionState::Connected)
        );
        assert_eq!(
            connection_state_for(IceConnectionState::Failed, stable),
            Some(ConnectionState::Failed)
        );
        assert_eq!(
            connection_state_for(IceConnectionState::Closed, stable),
            Some(ConnectionState::Disconnected)
        );
    }

    #[test]
    fn disconnect_depends_on_signaling_state() {
        assert_eq!(
            connection_state_for(IceConnectionState::Disconnected, SignalingState::Stable),
            Some(ConnectionState::Interrupted)
        );
        assert_eq!(
            connection_state_for(IceConnectionState::Disconnected, SignalingState::HaveRemoteOffer),
            Some(ConnectionState::Disconnected)
        );
    }

    #[test]
    fn remote_preconditions() {
        assert!(can_receive_initiate(SessionState::Starting));
        assert!(!can_receive_initiate(SessionState::Pending));
        assert!(can_receive_accept(SessionState::Pending, true));
        assert!(!can_receive_accept(SessionState::Pending, false));
        assert!(!can_receive_accept(SessionState::Active, true));
        assert!(can_accept(SessionState::Pending));
        assert!(!can_accept(SessionState::Active));
    }

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from("abc").to_string(), "abc");
    }
}
