//! Negotiation primitive abstraction
//!
//! A [`MediaSession`](crate::session::MediaSession) does not own a media
//! engine. It drives an implementation of [`NegotiationPrimitive`] that
//! produces and consumes Jingle descriptions, and listens to the
//! [`PeerEvent`]s it emits on a channel handed to the session builder.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::MediaConstraints;
use crate::errors::PeerError;
use crate::jingle::{Description, MediaKind};

/// One media track of a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: String,
    pub kind: MediaKind,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self { id: id.into(), kind }
    }
}

/// A media stream as seen by the negotiation primitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaStream {
    /// Matches the first token of the `msid` parameter of its sources
    pub id: String,
    #[serde(default)]
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, id: impl Into<String>, kind: MediaKind) -> Self {
        self.tracks.push(MediaTrack::new(id, kind));
        self
    }
}

/// Data channel opened by the remote party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannel {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl DataChannel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            protocol: None,
        }
    }
}

/// ICE connection state reported by the primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Checking => write!(f, "checking"),
            Self::Connected => write!(f, "connected"),
            Self::Completed => write!(f, "completed"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Offer/answer signaling state of the primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::HaveLocalOffer => write!(f, "have-local-offer"),
            Self::HaveRemoteOffer => write!(f, "have-remote-offer"),
            Self::HaveLocalPranswer => write!(f, "have-local-pranswer"),
            Self::HaveRemotePranswer => write!(f, "have-remote-pranswer"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Events emitted by the negotiation primitive
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local candidate was gathered; the description carries it in a transport
    IceCandidate(Description),
    EndOfCandidates,
    IceConnectionStateChange(IceConnectionState),
    AddStream(MediaStream),
    RemoveStream(MediaStream),
    AddChannel(DataChannel),
}

/// Offer/answer engine driven by a media session
///
/// The async operations are only ever called from the session's negotiation
/// queue, one at a time. Implementations must not assume anything about the
/// thread they are polled on.
#[async_trait]
pub trait NegotiationPrimitive: Send + Sync {
    /// Create a local offer and apply it as the local description
    async fn offer(&self, constraints: &MediaConstraints) -> Result<Description, PeerError>;

    /// Create a local answer to the applied remote offer and apply it
    async fn answer(&self, constraints: &MediaConstraints) -> Result<Description, PeerError>;

    /// Apply a remote offer
    async fn handle_offer(&self, offer: Description) -> Result<(), PeerError>;

    /// Apply a remote answer
    async fn handle_answer(&self, answer: Description) -> Result<(), PeerError>;

    /// Apply remote ICE candidates carried in transport contents
    async fn process_ice(&self, candidates: Description) -> Result<(), PeerError>;

    fn add_stream(&self, stream: MediaStream);

    fn remove_stream(&self, stream: &MediaStream);

    fn remote_streams(&self) -> Vec<MediaStream>;

    fn close(&self);

    fn local_description(&self) -> Option<Description>;

    fn remote_description(&self) -> Option<Description>;

    fn signaling_state(&self) -> SignalingState;

    fn ice_connection_state(&self) -> IceConnectionState;

    fn set_initiator(&self, initiator: bool);
}
