//! Session event broadcasting

use tokio::sync::broadcast;
use tracing::trace;

use crate::jingle::{MuteTarget, TerminateReason};
use crate::peer::{DataChannel, MediaStream};
use crate::session::{ConnectionState, SessionState};

/// Observable changes of a media session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    ConnectionStateChanged {
        old: ConnectionState,
        new: ConnectionState,
    },
    RingingChanged(bool),
    PeerStreamAdded(MediaStream),
    PeerStreamRemoved(MediaStream),
    /// The remote party accepted our session-initiate
    Accepted,
    /// The remote party is ringing
    Ringing,
    Hold,
    Resumed,
    Mute(MuteTarget),
    Unmute(MuteTarget),
    ChannelAdded(DataChannel),
    Terminated(TerminateReason),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state-changed",
            Self::ConnectionStateChanged { .. } => "connection-state-changed",
            Self::RingingChanged(_) => "ringing-changed",
            Self::PeerStreamAdded(_) => "peer-stream-added",
            Self::PeerStreamRemoved(_) => "peer-stream-removed",
            Self::Accepted => "accepted",
            Self::Ringing => "ringing",
            Self::Hold => "hold",
            Self::Resumed => "resumed",
            Self::Mute(_) => "mute",
            Self::Unmute(_) => "unmute",
            Self::ChannelAdded(_) => "channel-added",
            Self::Terminated(_) => "terminated",
        }
    }
}

/// Broadcast fan-out of [`SessionEvent`]s to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: SessionEvent) {
        trace!("Emitting {}", event.name());
        let _ = self.tx.send(event);
    }
}
