//! # jingle-core
//!
//! Jingle media session negotiation engine.
//!
//! A [`MediaSession`] coordinates Jingle signaling with an asynchronous
//! offer/answer [`NegotiationPrimitive`]:
//!
//! - only one offer/answer cycle is ever in flight against the primitive,
//!   enforced by a per-session [`NegotiationQueue`];
//! - local intents (start, accept, add/remove/switch stream) and inbound
//!   actions are turned into correctly ordered negotiation cycles;
//! - SSRC sources and source groups are reconciled incrementally from
//!   source-add / source-remove deltas (see [`sources`]).
//!
//! Outbound signaling goes through a [`SignalingTransport`]; inbound actions
//! are handed to [`MediaSession::process`] or, still in JSON form, to
//! [`MediaSession::process_raw`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jingle_core::prelude::*;
//!
//! async fn call(pc: Arc<dyn NegotiationPrimitive>) -> Result<()> {
//!     let (transport, mut outbound) = ChannelTransport::new();
//!     let config = SessionConfig::new("bob@example.com").with_initiator(true);
//!     let session = SessionBuilder::new(config).build(pc, Arc::new(transport))?;
//!
//!     session.start(None).await?;
//!     let initiate = outbound.recv().await;
//!     assert!(initiate.is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod jingle;
pub mod logging;
pub mod peer;
pub mod queue;
pub mod session;
pub mod sources;
pub mod transport;

pub use config::{MediaConstraints, SessionConfig};
pub use errors::{Condition, PeerError, ProtocolError, QueueError, Result, SessionError, TransportError};
pub use events::SessionEvent;
pub use jingle::{Description, JingleMessage, SessionInfo, TerminateReason};
pub use peer::{NegotiationPrimitive, PeerEvent};
pub use queue::{NegotiationQueue, TaskCompletion};
pub use session::{ConnectionState, MediaSession, Renegotiation, SessionBuilder, SessionId, SessionState};
pub use transport::{ChannelTransport, Envelope, SignalingTransport};

/// Common imports for applications embedding a media session
pub mod prelude {
    pub use crate::config::{MediaConstraints, SessionConfig};
    pub use crate::errors::{Condition, ProtocolError, Result, SessionError};
    pub use crate::events::SessionEvent;
    pub use crate::jingle::{
        Application, Content, Creator, Description, JingleMessage, MediaKind, ReasonCondition, Senders,
        SessionInfo, Source, SourceGroup, TerminateReason,
    };
    pub use crate::peer::{
        DataChannel, IceConnectionState, MediaStream, NegotiationPrimitive, PeerEvent, SignalingState,
    };
    pub use crate::session::{ConnectionState, MediaSession, Renegotiation, SessionBuilder, SessionId, SessionState};
    pub use crate::transport::{ChannelTransport, Envelope, SignalingTransport};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
