//! Handlers for Jingle actions received from the remote party
//!
//! Inbound actions are queued like local intents, so a source-add that
//! arrives while a local renegotiation is in flight is applied after it.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::media_session::MediaSession;
use super::state::{can_receive_accept, can_receive_initiate, SessionState};
use crate::errors::{NegotiationStep, PeerError, ProtocolError, SessionError};
use crate::events::SessionEvent;
use crate::jingle::{codec, Description, JingleMessage, SessionInfo, TerminateReason};
use crate::queue::TaskCompletion;
use crate::sources::{apply_source_add, apply_source_remove};

type RemoteResult = std::result::Result<(), ProtocolError>;

impl MediaSession {
    /// Process a typed inbound action
    ///
    /// Resolves to `Ok(())` when the action was applied, or to the error
    /// condition to reply with.
    pub fn process(&self, message: JingleMessage) -> TaskCompletion<(), ProtocolError> {
        let session = self.clone();
        let name = message.action().as_str();
        self.enqueue(name, async move { session.handle_remote(message).await })
    }

    /// Decode and process an inbound `(action, payload)` pair
    pub fn process_raw(&self, action: &str, payload: Value) -> TaskCompletion<(), ProtocolError> {
        match codec::decode(action, payload) {
            Ok(message) => self.process(message),
            Err(e) => {
                warn!(sid = %self.inner.sid, "Rejecting {}: {}", action, e);
                TaskCompletion::ready(Err(e))
            }
        }
    }

    async fn handle_remote(&self, message: JingleMessage) -> RemoteResult {
        if self.is_ended() {
            return match message {
                JingleMessage::SessionTerminate(_) => Ok(()),
                other => {
                    debug!(sid = %self.inner.sid, "Ignoring {} for ended session", other.action());
                    Err(ProtocolError::unknown_session())
                }
            };
        }

        match message {
            JingleMessage::SessionInitiate(offer) => self.on_session_initiate(offer).await,
            JingleMessage::SessionAccept(answer) => self.on_session_accept(answer).await,
            JingleMessage::SessionTerminate(reason) => {
                self.on_session_terminate(reason);
                Ok(())
            }
            JingleMessage::SessionInfo(info) => {
                self.on_session_info(info);
                Ok(())
            }
            JingleMessage::TransportInfo(update) => {
                self.on_transport_info(update).await;
                Ok(())
            }
            JingleMessage::SourceAdd(delta) => self.on_source_add(delta).await,
            JingleMessage::SourceRemove(delta) => self.on_source_remove(delta).await,
        }
    }

    async fn on_session_initiate(&self, offer: Description) -> RemoteResult {
        let state = self.state();
        if !can_receive_initiate(state) {
            warn!(sid = %self.inner.sid, "Unexpected session-initiate while {}", state);
            return Err(ProtocolError::out_of_order());
        }

        info!(sid = %self.inner.sid, "Initiating incoming session from {}", self.peer());
        self.set_state(SessionState::Pending);
        self.set_initiator(false);

        self.inner
            .pc
            .handle_offer(offer)
            .await
            .map_err(|e| self.negotiation_failed(NegotiationStep::ApplyRemoteOffer, e))
    }

    async fn on_session_accept(&self, answer: Description) -> RemoteResult {
        let state = self.state();
        if !can_receive_accept(state, self.is_initiator()) {
            warn!(sid = %self.inner.sid, "Unexpected session-accept while {}", state);
            return Err(ProtocolError::out_of_order());
        }

        self.inner
            .pc
            .handle_answer(answer)
            .await
            .map_err(|e| self.negotiation_failed(NegotiationStep::ApplyRemoteAnswer, e))?;
        self.ensure_remote_live()?;

        info!(sid = %self.inner.sid, "Session accepted by {}", self.peer());
        self.set_state(SessionState::Active);
        self.emit(SessionEvent::Accepted);
        Ok(())
    }

    fn on_session_terminate(&self, reason: Option<TerminateReason>) {
        info!(sid = %self.inner.sid, "Terminating session on remote request");
        self.end(reason.unwrap_or_default(), true);
    }

    fn on_session_info(&self, info: SessionInfo) {
        let event = match info {
            SessionInfo::Ringing => {
                info!(sid = %self.inner.sid, "Outgoing session is ringing");
                self.set_ringing(true);
                SessionEvent::Ringing
            }
            SessionInfo::Hold => SessionEvent::Hold,
            SessionInfo::Resume => SessionEvent::Resumed,
            SessionInfo::Mute(target) => SessionEvent::Mute(target),
            SessionInfo::Unmute(target) => SessionEvent::Unmute(target),
            SessionInfo::Unknown => {
                debug!(sid = %self.inner.sid, "Ignoring empty session-info");
                return;
            }
        };
        debug!(sid = %self.inner.sid, "Remote session-info: {}", event.name());
        self.emit(event);
    }

    async fn on_transport_info(&self, update: Description) {
        if let Err(e) = self.inner.pc.process_ice(update).await {
            warn!(sid = %self.inner.sid, "Could not apply remote candidates: {}", e);
        }
    }

    async fn on_source_add(&self, delta: Description) -> RemoteResult {
        info!(sid = %self.inner.sid, "Adding remote sources {:?}", delta.ssrcs());
        let mut remote = self.remote_snapshot()?;
        let matched = apply_source_add(&mut remote, &delta);
        debug!(sid = %self.inner.sid, "source-add matched {} content(s)", matched);
        self.renegotiate_remote(remote, "adding remote sources").await
    }

    async fn on_source_remove(&self, delta: Description) -> RemoteResult {
        info!(sid = %self.inner.sid, "Removing remote sources {:?}", delta.ssrcs());
        let mut remote = self.remote_snapshot()?;
        let matched = apply_source_remove(&mut remote, &delta);
        debug!(sid = %self.inner.sid, "source-remove matched {} content(s)", matched);
        self.renegotiate_remote(remote, "removing remote sources").await
    }

    fn remote_snapshot(&self) -> Result<Description, ProtocolError> {
        self.inner.pc.remote_description().ok_or_else(|| {
            warn!(sid = %self.inner.sid, "No remote description to update");
            ProtocolError::general_error()
        })
    }

    /// Apply an updated remote description and answer it
    async fn renegotiate_remote(&self, remote: Description, purpose: &str) -> RemoteResult {
        debug!(sid = %self.inner.sid, "Renegotiating for {}", purpose);
        self.inner
            .pc
            .handle_offer(remote)
            .await
            .map_err(|e| self.negotiation_failed(NegotiationStep::ApplyRemoteOffer, e))?;
        self.ensure_remote_live()?;

        let constraints = self.constraints();
        self.inner
            .pc
            .answer(&constraints)
            .await
            .map_err(|e| self.negotiation_failed(NegotiationStep::CreateAnswer, e))?;
        Ok(())
    }

    /// Log a primitive failure and turn it into the reply for the remote party
    fn negotiation_failed(&self, step: NegotiationStep, source: PeerError) -> ProtocolError {
        let err = SessionError::negotiation(step, source);
        error!(sid = %self.inner.sid, "{}", err);
        ProtocolError::general_error().with_text(err.to_string())
    }

    fn ensure_remote_live(&self) -> RemoteResult {
        self.ensure_live().map_err(|_| ProtocolError::unknown_session())
    }
}
