//! Session assembly

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, Instrument};

use super::ice::forward_peer_events;
use super::media_session::MediaSession;
use crate::config::SessionConfig;
use crate::errors::{Result, SessionError};
use crate::logging::session_span;
use crate::peer::{MediaStream, NegotiationPrimitive, PeerEvent};
use crate::transport::SignalingTransport;

/// Builder for [`MediaSession`]
///
/// ```no_run
/// # use std::sync::Arc;
/// # use jingle_core::prelude::*;
/// # fn demo(pc: Arc<dyn NegotiationPrimitive>, events: tokio::sync::mpsc::UnboundedReceiver<PeerEvent>) -> Result<()> {
/// let (transport, _outbound) = ChannelTransport::new();
/// let session = SessionBuilder::new(SessionConfig::new("bob@example.com"))
///     .with_peer_events(events)
///     .build(pc, Arc::new(transport))?;
/// let _ = session.start(None);
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    config: SessionConfig,
    stream: Option<MediaStream>,
    peer_events: Option<mpsc::UnboundedReceiver<PeerEvent>>,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stream: None,
            peer_events: None,
        }
    }

    /// Local stream attached before any negotiation
    pub fn with_stream(mut self, stream: MediaStream) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Channel on which the primitive reports its events
    pub fn with_peer_events(mut self, events: mpsc::UnboundedReceiver<PeerEvent>) -> Self {
        self.peer_events = Some(events);
        self
    }

    /// Validate the configuration and create the session
    ///
    /// Must be called from within a tokio runtime; the session's queue
    /// worker and the peer event forwarder are spawned on it. Outside a
    /// runtime this fails with [`SessionError::Config`] before the primitive
    /// is touched.
    pub fn build(
        self,
        pc: Arc<dyn NegotiationPrimitive>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Result<MediaSession> {
        self.config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| SessionError::config(format!("Media sessions need a tokio runtime: {}", e)))?;

        let sid = self.config.sid.clone().unwrap_or_default();
        let session = MediaSession::from_parts(sid, self.config, pc, transport)?;

        let pc = session.primitive();
        pc.set_initiator(session.is_initiator());
        if let Some(stream) = self.stream {
            pc.add_stream(stream);
        }

        if let Some(events) = self.peer_events {
            let span = session_span(session.sid());
            runtime.spawn(forward_peer_events(Arc::downgrade(&session.inner), events).instrument(span));
        }

        info!(sid = %session.sid(), "Created media session with {}", session.peer());
        Ok(session)
    }
}
