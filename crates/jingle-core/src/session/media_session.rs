//! Media session handle, lifecycle control and session-info senders

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn, Instrument};

use super::state::{can_accept, ConnectionState, SessionId, SessionState};
use crate::config::{MediaConstraints, SessionConfig};
use crate::errors::{NegotiationStep, QueueError, Result, SessionError};
use crate::events::{EventEmitter, SessionEvent};
use crate::jingle::{
    Creator, Description, JingleMessage, MediaKind, MuteTarget, ReasonCondition, Senders, SessionInfo,
    TerminateReason,
};
use crate::logging::task_span;
use crate::peer::{MediaStream, NegotiationPrimitive, SignalingState};
use crate::queue::{NegotiationQueue, TaskCompletion};
use crate::sources::strip_unused_labels;
use crate::transport::{Envelope, SignalingTransport};

/// Mutable session data, only touched under the lock and never across an await
pub(crate) struct SessionData {
    pub(crate) state: SessionState,
    pub(crate) connection_state: ConnectionState,
    pub(crate) ringing: bool,
    pub(crate) constraints: MediaConstraints,
    pub(crate) is_initiator: bool,
    pub(crate) end_reason: Option<TerminateReason>,
    pub(crate) last_candidate: Option<Description>,
}

pub(crate) struct SessionInner {
    pub(crate) sid: SessionId,
    pub(crate) config: SessionConfig,
    pub(crate) pc: Arc<dyn NegotiationPrimitive>,
    pub(crate) transport: Arc<dyn SignalingTransport>,
    pub(crate) queue: NegotiationQueue,
    pub(crate) events: EventEmitter,
    pub(crate) data: Mutex<SessionData>,
}

/// One Jingle media session
///
/// Cheap to clone; clones share the same session. Every operation that
/// touches the negotiation primitive runs on the session's negotiation
/// queue and returns a [`TaskCompletion`]. [`end`](Self::end),
/// [`cancel`](Self::cancel) and [`decline`](Self::decline) take effect
/// immediately.
#[derive(Clone)]
pub struct MediaSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("sid", &self.inner.sid)
            .field("peer", &self.inner.config.peer)
            .field("state", &self.state())
            .finish()
    }
}

impl MediaSession {
    pub(crate) fn from_parts(
        sid: SessionId,
        config: SessionConfig,
        pc: Arc<dyn NegotiationPrimitive>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Result<Self> {
        let queue = NegotiationQueue::new(format!("session {}", sid), config.negotiation_timeout())?;
        let events = EventEmitter::new(config.event_capacity);
        let data = SessionData {
            state: SessionState::Starting,
            connection_state: ConnectionState::Starting,
            ringing: false,
            constraints: config.constraints,
            is_initiator: config.initiator,
            end_reason: None,
            last_candidate: None,
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                sid,
                config,
                pc,
                transport,
                queue,
                events,
                data: Mutex::new(data),
            }),
        })
    }

    pub fn sid(&self) -> &SessionId {
        &self.inner.sid
    }

    pub fn peer(&self) -> &str {
        &self.inner.config.peer
    }

    pub fn state(&self) -> SessionState {
        self.inner.data.lock().state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.data.lock().connection_state
    }

    pub fn is_ringing(&self) -> bool {
        self.inner.data.lock().ringing
    }

    pub fn is_initiator(&self) -> bool {
        self.inner.data.lock().is_initiator
    }

    pub fn is_ended(&self) -> bool {
        self.state() == SessionState::Ended
    }

    /// Constraints used for renegotiation answers
    pub fn constraints(&self) -> MediaConstraints {
        self.inner.data.lock().constraints
    }

    /// Reason the session ended with, once it has
    pub fn end_reason(&self) -> Option<TerminateReason> {
        self.inner.data.lock().end_reason.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Number of negotiation tasks queued or running
    pub fn pending_tasks(&self) -> usize {
        self.inner.queue.pending()
    }

    /// Remote streams, or none once the primitive is closed
    pub fn streams(&self) -> Vec<MediaStream> {
        if self.inner.pc.signaling_state() == SignalingState::Closed {
            return Vec::new();
        }
        self.inner.pc.remote_streams()
    }

    pub fn primitive(&self) -> &Arc<dyn NegotiationPrimitive> {
        &self.inner.pc
    }

    // ----------------------------------------------------------------
    // Internal helpers
    // ----------------------------------------------------------------

    pub(crate) fn enqueue<T, E, F>(&self, name: &str, task: F) -> TaskCompletion<T, E>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        debug!(sid = %self.inner.sid, "Queueing {}", name);
        let span = task_span(&self.inner.sid, name);
        self.inner.queue.enqueue(name, task.instrument(span))
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_ended() {
            return Err(SessionError::SessionEnded);
        }
        Ok(())
    }

    /// Send a message to the remote party; failures are logged only
    pub(crate) fn send(&self, message: JingleMessage) {
        let action = message.action();
        let envelope = Envelope::new(self.inner.sid.clone(), self.inner.config.peer.clone(), message);
        match self.inner.transport.send(envelope) {
            Ok(()) => debug!(sid = %self.inner.sid, "Sent {}", action),
            Err(e) => warn!(sid = %self.inner.sid, "Failed to send {}: {}", action, e),
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.inner.events.emit(event);
    }

    pub(crate) fn set_state(&self, new: SessionState) {
        let old = {
            let mut data = self.inner.data.lock();
            std::mem::replace(&mut data.state, new)
        };
        if old != new {
            debug!(sid = %self.inner.sid, "Session state {} -> {}", old, new);
            self.emit(SessionEvent::StateChanged { old, new });
        }
    }

    pub(crate) fn set_connection_state(&self, new: ConnectionState) {
        let old = {
            let mut data = self.inner.data.lock();
            std::mem::replace(&mut data.connection_state, new)
        };
        if old != new {
            info!(sid = %self.inner.sid, "Connection state {} -> {}", old, new);
            self.emit(SessionEvent::ConnectionStateChanged { old, new });
        }
    }

    pub(crate) fn set_ringing(&self, ringing: bool) {
        let changed = {
            let mut data = self.inner.data.lock();
            std::mem::replace(&mut data.ringing, ringing) != ringing
        };
        if changed {
            self.emit(SessionEvent::RingingChanged(ringing));
        }
    }

    pub(crate) fn set_initiator(&self, initiator: bool) {
        self.inner.data.lock().is_initiator = initiator;
        self.inner.pc.set_initiator(initiator);
    }

    pub(crate) fn set_constraints(&self, constraints: MediaConstraints) {
        self.inner.data.lock().constraints = constraints;
    }

    // ----------------------------------------------------------------
    // Session control
    // ----------------------------------------------------------------

    /// Send a session-initiate built from a fresh local offer
    ///
    /// `constraints` default to the configured ones. If the offer cannot be
    /// created the session ends with `failed-application` without notifying
    /// the remote party.
    pub fn start(&self, constraints: Option<MediaConstraints>) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        self.enqueue("start", async move { session.run_start(constraints).await })
    }

    async fn run_start(&self, constraints: Option<MediaConstraints>) -> Result<()> {
        self.ensure_live()?;
        let state = self.state();
        if state != SessionState::Starting {
            return Err(SessionError::invalid_state("start", state));
        }

        let constraints = constraints.unwrap_or_else(|| self.constraints());
        self.set_state(SessionState::Pending);
        self.set_initiator(true);

        let mut offer = match self.inner.pc.offer(&constraints).await {
            Ok(offer) => offer,
            Err(e) => {
                error!(sid = %self.inner.sid, "Could not create offer: {}", e);
                self.end(ReasonCondition::FailedApplication, true);
                return Err(SessionError::negotiation(NegotiationStep::CreateOffer, e));
            }
        };
        self.ensure_live()?;

        apply_media_direction(&mut offer, &constraints);
        offer.contents.iter_mut().for_each(strip_unused_labels);

        info!(sid = %self.inner.sid, "Initiating session with {}", self.peer());
        self.send(JingleMessage::SessionInitiate(offer));
        Ok(())
    }

    /// Accept an incoming session with a session-accept built from a local answer
    ///
    /// Without explicit constraints the answer requests both audio and video.
    /// If the answer cannot be created the session ends with
    /// `failed-application` and the remote party is notified.
    pub fn accept(&self, constraints: Option<MediaConstraints>) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        self.enqueue("accept", async move { session.run_accept(constraints).await })
    }

    async fn run_accept(&self, constraints: Option<MediaConstraints>) -> Result<()> {
        self.ensure_live()?;
        let state = self.state();
        if !can_accept(state) {
            return Err(SessionError::invalid_state("accept", state));
        }

        let constraints = constraints.unwrap_or_else(MediaConstraints::receive_all);
        self.set_constraints(constraints);
        info!(sid = %self.inner.sid, "Accepted incoming session");
        self.set_state(SessionState::Active);

        let mut answer = match self.inner.pc.answer(&constraints).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(sid = %self.inner.sid, "Could not create answer: {}", e);
                self.end(ReasonCondition::FailedApplication, false);
                return Err(SessionError::negotiation(NegotiationStep::CreateAnswer, e));
            }
        };
        self.ensure_live()?;

        answer.contents.iter_mut().for_each(strip_unused_labels);
        self.send(JingleMessage::SessionAccept(answer));
        Ok(())
    }

    /// End the session
    ///
    /// Every current remote stream is reported removed before the primitive
    /// is closed. A session-terminate is sent unless `silent`. Calling this on
    /// an ended session does nothing.
    pub fn end(&self, reason: impl Into<TerminateReason>, silent: bool) {
        let reason = reason.into();
        let old = {
            let mut data = self.inner.data.lock();
            if data.state == SessionState::Ended {
                return;
            }
            data.end_reason = Some(reason.clone());
            data.last_candidate = None;
            std::mem::replace(&mut data.state, SessionState::Ended)
        };
        info!(sid = %self.inner.sid, "Ending session: {}", reason);

        for stream in self.streams() {
            self.emit(SessionEvent::PeerStreamRemoved(stream));
        }
        self.inner.pc.close();

        if !silent {
            self.send(JingleMessage::SessionTerminate(Some(reason.clone())));
        }

        self.emit(SessionEvent::StateChanged {
            old,
            new: SessionState::Ended,
        });
        self.emit(SessionEvent::Terminated(reason));
    }

    pub fn cancel(&self) {
        self.end(ReasonCondition::Cancel, false);
    }

    pub fn decline(&self) {
        self.end(ReasonCondition::Decline, false);
    }

    // ----------------------------------------------------------------
    // Session-info senders
    // ----------------------------------------------------------------

    /// Tell the initiator we are ringing
    pub fn ring(&self) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        self.enqueue("ring", async move {
            session.ensure_live()?;
            info!(sid = %session.inner.sid, "Ringing on incoming session");
            session.set_ringing(true);
            session.send(JingleMessage::SessionInfo(SessionInfo::Ringing));
            Ok(())
        })
    }

    pub fn mute(&self, creator: Creator, name: Option<String>) -> TaskCompletion<(), SessionError> {
        self.send_info("mute", SessionInfo::Mute(MuteTarget::new(creator, name)))
    }

    pub fn unmute(&self, creator: Creator, name: Option<String>) -> TaskCompletion<(), SessionError> {
        self.send_info("unmute", SessionInfo::Unmute(MuteTarget::new(creator, name)))
    }

    pub fn hold(&self) -> TaskCompletion<(), SessionError> {
        self.send_info("hold", SessionInfo::Hold)
    }

    pub fn resume(&self) -> TaskCompletion<(), SessionError> {
        self.send_info("resume", SessionInfo::Resume)
    }

    fn send_info(&self, name: &'static str, info: SessionInfo) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        self.enqueue(name, async move {
            session.ensure_live()?;
            info!(sid = %session.inner.sid, "Sending {} session-info", name);
            session.send(JingleMessage::SessionInfo(info));
            Ok(())
        })
    }
}

/// Mark RTP contents the constraints do not ask to receive as send-only
fn apply_media_direction(offer: &mut Description, constraints: &MediaConstraints) {
    for content in &mut offer.contents {
        if !content.application.is_rtp() {
            continue;
        }
        let declined = match content.application.media {
            Some(MediaKind::Audio) => constraints.declines_audio(),
            Some(MediaKind::Video) => constraints.declines_video(),
            _ => false,
        };
        if declined {
            content.senders = Senders::Initiator;
        }
    }
}
