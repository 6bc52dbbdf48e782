//! Reactions to negotiation primitive events

use std::sync::Weak;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::media_session::{MediaSession, SessionInner};
use super::state::{connection_state_for, ConnectionState};
use crate::events::SessionEvent;
use crate::jingle::{Description, JingleMessage, ReasonCondition, Transport};
use crate::peer::{IceConnectionState, PeerEvent};

impl MediaSession {
    /// Apply one event emitted by the negotiation primitive
    pub fn handle_peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::IceCandidate(candidate) => self.on_ice_candidate(candidate),
            PeerEvent::EndOfCandidates => self.on_end_of_candidates(),
            PeerEvent::IceConnectionStateChange(state) => self.on_ice_state_change(state),
            PeerEvent::AddStream(stream) => {
                info!(sid = %self.inner.sid, "Remote stream {} added", stream.id);
                self.emit(SessionEvent::PeerStreamAdded(stream));
            }
            PeerEvent::RemoveStream(stream) => {
                info!(sid = %self.inner.sid, "Remote stream {} removed", stream.id);
                self.emit(SessionEvent::PeerStreamRemoved(stream));
            }
            PeerEvent::AddChannel(channel) => {
                info!(sid = %self.inner.sid, "Data channel {} opened", channel.label);
                self.emit(SessionEvent::ChannelAdded(channel));
            }
        }
    }

    fn on_ice_candidate(&self, candidate: Description) {
        if self.is_ended() {
            return;
        }
        debug!(sid = %self.inner.sid, "Discovered new ICE candidate");
        if self.inner.config.signal_end_of_candidates {
            self.inner.data.lock().last_candidate = Some(candidate.clone());
        }
        self.send(JingleMessage::TransportInfo(candidate));
    }

    fn on_end_of_candidates(&self) {
        debug!(sid = %self.inner.sid, "ICE end of candidates");
        if !self.inner.config.signal_end_of_candidates || self.is_ended() {
            return;
        }

        let Some(mut last) = self.inner.data.lock().last_candidate.take() else {
            warn!(sid = %self.inner.sid, "End of candidates without a gathered candidate");
            return;
        };
        let Some(first) = last.contents.first_mut() else {
            warn!(sid = %self.inner.sid, "Last candidate carries no content");
            return;
        };

        let transport_type = first
            .transport
            .as_ref()
            .map(|transport| transport.transport_type.clone())
            .unwrap_or_else(|| Transport::ICE_UDP.to_string());
        first.transport = Some(Transport::end_of_candidates(transport_type));
        self.send(JingleMessage::TransportInfo(last));
    }

    fn on_ice_state_change(&self, ice: IceConnectionState) {
        let signaling = self.inner.pc.signaling_state();
        debug!(sid = %self.inner.sid, "ICE state {} (signaling {})", ice, signaling);

        let Some(state) = connection_state_for(ice, signaling) else {
            return;
        };
        self.set_connection_state(state);

        if state == ConnectionState::Failed {
            self.end(ReasonCondition::FailedTransport, false);
        }
    }
}

/// Forward primitive events to the session until either side goes away
pub(crate) async fn forward_peer_events(
    session: Weak<SessionInner>,
    mut events: mpsc::UnboundedReceiver<PeerEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        MediaSession { inner }.handle_peer_event(event);
    }
    debug!("Peer event stream closed");
}
