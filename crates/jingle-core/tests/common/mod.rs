#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use jingle_core::config::MediaConstraints;
use jingle_core::errors::{PeerError, TransportError};
use jingle_core::logging::LogSettings;
use jingle_core::jingle::{Action, Application, Candidate, Content, Description, MediaKind, Source, Transport};
use jingle_core::peer::{IceConnectionState, MediaStream, NegotiationPrimitive, PeerEvent, SignalingState};
use jingle_core::transport::{Envelope, SignalingTransport};
use jingle_core::{MediaSession, SessionBuilder, SessionConfig, SessionEvent};

pub fn init_tracing() {
    // Every test in a binary shares the one global subscriber
    let _ = LogSettings::for_tests().init();
}

/// Stream with one audio and one video track
pub fn av_stream(id: &str) -> MediaStream {
    MediaStream::new(id)
        .with_track(format!("{id}-audio"), MediaKind::Audio)
        .with_track(format!("{id}-video"), MediaKind::Video)
}

/// How a scripted primitive step misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fail,
    Panic,
    Stall,
}

#[derive(Default)]
struct MockState {
    local: Option<Description>,
    remote: Option<Description>,
    signaling: Option<SignalingState>,
    ice: Option<IceConnectionState>,
    local_streams: Vec<MediaStream>,
    remote_streams: Vec<MediaStream>,
    initiator: bool,
    calls: Vec<String>,
    faults: HashMap<&'static str, Fault>,
    ssrcs: HashMap<String, u32>,
    connected: bool,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scripted negotiation primitive
///
/// Descriptions are generated from the attached local streams: one rtp
/// content per media kind, one source per track with `cname`, `msid`,
/// `mslabel` and `label` parameters. Remote streams are derived from the
/// msid of applied remote descriptions. ICE reports checking then connected
/// the first time both descriptions are applied with signaling stable.
pub struct MockPeer {
    name: String,
    ssrc_base: u32,
    state: Mutex<MockState>,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl MockPeer {
    pub fn new(name: &str, ssrc_base: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<PeerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let peer = Self {
            name: name.to_string(),
            ssrc_base,
            state: Mutex::new(MockState::default()),
            events,
        };
        (Arc::new(peer), rx)
    }

    /// Make the next call of `step` misbehave
    pub fn inject(&self, step: &'static str, fault: Fault) {
        self.state.lock().faults.insert(step, fault);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, step: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.as_str() == step).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    pub fn is_initiator(&self) -> bool {
        self.state.lock().initiator
    }

    pub fn local_stream_ids(&self) -> Vec<String> {
        self.state.lock().local_streams.iter().map(|s| s.id.clone()).collect()
    }

    pub fn set_remote_description(&self, description: Description) {
        self.state.lock().remote = Some(description);
    }

    pub fn set_signaling_state(&self, signaling: SignalingState) {
        self.state.lock().signaling = Some(signaling);
    }

    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event);
    }

    /// Report one gathered candidate followed by end of gathering
    pub fn gather(&self) {
        let mut transport = Transport::end_of_candidates(Transport::ICE_UDP);
        transport.gathering_complete = false;
        transport.ufrag = Some(format!("{}-ufrag", self.name));
        transport.candidates.push(Candidate {
            foundation: "1".to_string(),
            component: 1,
            protocol: "udp".to_string(),
            priority: 2_130_706_431,
            ip: "192.0.2.10".to_string(),
            port: 40000,
            candidate_type: "host".to_string(),
            generation: 0,
            rel_addr: None,
            rel_port: None,
        });
        let candidate = Description::new(vec![
            Content::new("audio", Application::rtp(MediaKind::Audio)).with_transport(transport)
        ]);
        self.emit(PeerEvent::IceCandidate(candidate));
        self.emit(PeerEvent::EndOfCandidates);
    }

    async fn step(&self, step: &'static str) -> Result<(), PeerError> {
        let fault = {
            let mut state = self.state.lock();
            state.calls.push(step.to_string());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.faults.remove(step)
        };

        // Give any concurrently scheduled work a chance to interleave
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let result = match fault {
            None => Ok(()),
            Some(Fault::Fail) => Err(PeerError::new(format!("{} failed", step))),
            Some(Fault::Panic) => {
                self.state.lock().in_flight -= 1;
                panic!("{} panicked", step);
            }
            Some(Fault::Stall) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        };
        self.state.lock().in_flight -= 1;
        result
    }

    fn build_local(&self) -> Description {
        let mut state = self.state.lock();
        let streams = state.local_streams.clone();
        let mut contents = Vec::new();

        for kind in [MediaKind::Audio, MediaKind::Video] {
            let mut content = Content::new(kind.to_string(), Application::rtp(kind)).with_transport(Transport {
                transport_type: Transport::ICE_UDP.to_string(),
                ufrag: Some(format!("{}-ufrag", self.name)),
                pwd: Some(format!("{}-pwd", self.name)),
                ..Default::default()
            });
            content.application.mux = true;

            for stream in &streams {
                for track in stream.tracks.iter().filter(|t| t.kind == kind) {
                    let next = self.ssrc_base + state.ssrcs.len() as u32 + 1;
                    let ssrc = *state.ssrcs.entry(track.id.clone()).or_insert(next);
                    content.application.sources.push(
                        Source::new(ssrc)
                            .with_parameter("cname", format!("{}-cname", self.name))
                            .with_parameter("msid", format!("{} {}", stream.id, track.id))
                            .with_parameter("mslabel", stream.id.clone())
                            .with_parameter("label", track.id.clone()),
                    );
                }
            }
            contents.push(content);
        }

        let description = Description::new(contents);
        state.local = Some(description.clone());
        description
    }

    fn apply_remote(&self, description: Description, signaling: SignalingState) {
        let streams = streams_in(&description);
        let (added, removed) = {
            let mut state = self.state.lock();
            let added: Vec<MediaStream> = streams
                .iter()
                .filter(|s| !state.remote_streams.iter().any(|r| r.id == s.id))
                .cloned()
                .collect();
            let removed: Vec<MediaStream> = state
                .remote_streams
                .iter()
                .filter(|r| !streams.iter().any(|s| s.id == r.id))
                .cloned()
                .collect();
            state.remote = Some(description);
            state.remote_streams = streams;
            state.signaling = Some(signaling);
            (added, removed)
        };

        for stream in added {
            self.emit(PeerEvent::AddStream(stream));
        }
        for stream in removed {
            self.emit(PeerEvent::RemoveStream(stream));
        }
    }

    fn maybe_connect(&self) {
        let connect = {
            let mut state = self.state.lock();
            let ready = state.local.is_some()
                && state.remote.is_some()
                && state.signaling == Some(SignalingState::Stable)
                && !state.connected;
            if ready {
                state.connected = true;
                state.ice = Some(IceConnectionState::Connected);
            }
            ready
        };
        if connect {
            self.emit(PeerEvent::IceConnectionStateChange(IceConnectionState::Checking));
            self.emit(PeerEvent::IceConnectionStateChange(IceConnectionState::Connected));
        }
    }
}

/// Remote streams named by the msid parameters of a description
pub fn streams_in(description: &Description) -> Vec<MediaStream> {
    let mut streams: Vec<MediaStream> = Vec::new();
    for content in &description.contents {
        let kind = content.application.media.unwrap_or(MediaKind::Audio);
        for source in &content.application.sources {
            let Some(stream_id) = source.stream_id() else { continue };
            let track = source
                .parameters
                .get(1)
                .and_then(|p| p.value.split(' ').nth(1))
                .unwrap_or_default()
                .to_string();
            match streams.iter_mut().find(|s| s.id == stream_id) {
                Some(stream) => {
                    if !stream.tracks.iter().any(|t| t.id == track) {
                        stream.tracks.push(jingle_core::peer::MediaTrack::new(track, kind));
                    }
                }
                None => streams.push(MediaStream::new(stream_id).with_track(track, kind)),
            }
        }
    }
    streams
}

#[async_trait]
impl NegotiationPrimitive for MockPeer {
    async fn offer(&self, _constraints: &MediaConstraints) -> Result<Description, PeerError> {
        self.step("offer").await?;
        let offer = self.build_local();
        self.state.lock().signaling = Some(SignalingState::HaveLocalOffer);
        Ok(offer)
    }

    async fn answer(&self, _constraints: &MediaConstraints) -> Result<Description, PeerError> {
        self.step("answer").await?;
        let answer = self.build_local();
        self.state.lock().signaling = Some(SignalingState::Stable);
        self.maybe_connect();
        Ok(answer)
    }

    async fn handle_offer(&self, offer: Description) -> Result<(), PeerError> {
        self.step("handle_offer").await?;
        self.apply_remote(offer, SignalingState::HaveRemoteOffer);
        Ok(())
    }

    async fn handle_answer(&self, answer: Description) -> Result<(), PeerError> {
        self.step("handle_answer").await?;
        self.apply_remote(answer, SignalingState::Stable);
        self.maybe_connect();
        Ok(())
    }

    async fn process_ice(&self, _candidates: Description) -> Result<(), PeerError> {
        self.step("process_ice").await
    }

    fn add_stream(&self, stream: MediaStream) {
        let mut state = self.state.lock();
        state.calls.push(format!("add_stream:{}", stream.id));
        state.local_streams.push(stream);
    }

    fn remove_stream(&self, stream: &MediaStream) {
        let mut state = self.state.lock();
        state.calls.push(format!("remove_stream:{}", stream.id));
        state.local_streams.retain(|s| s.id != stream.id);
    }

    fn remote_streams(&self) -> Vec<MediaStream> {
        self.state.lock().remote_streams.clone()
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.calls.push("close".to_string());
        state.signaling = Some(SignalingState::Closed);
        state.ice = Some(IceConnectionState::Closed);
    }

    fn local_description(&self) -> Option<Description> {
        self.state.lock().local.clone()
    }

    fn remote_description(&self) -> Option<Description> {
        self.state.lock().remote.clone()
    }

    fn signaling_state(&self) -> SignalingState {
        self.state.lock().signaling.unwrap_or(SignalingState::Stable)
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        self.state.lock().ice.unwrap_or(IceConnectionState::New)
    }

    fn set_initiator(&self, initiator: bool) {
        self.state.lock().initiator = initiator;
    }
}

/// Transport that records every envelope
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Envelope>>,
    closed: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.sent.lock().iter().map(|e| e.action()).collect()
    }

    pub fn last(&self, action: Action) -> Option<Envelope> {
        self.sent.lock().iter().rev().find(|e| e.action() == action).cloned()
    }

    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

impl SignalingTransport for RecordingTransport {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if *self.closed.lock() {
            return Err(TransportError::Closed);
        }
        self.sent.lock().push(envelope);
        Ok(())
    }
}

/// Session wired to a mock primitive and a recording transport
pub struct Harness {
    pub session: MediaSession,
    pub peer: Arc<MockPeer>,
    pub transport: Arc<RecordingTransport>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub fn harness(config: SessionConfig) -> Harness {
    harness_with_stream(config, None)
}

pub fn harness_with_stream(config: SessionConfig, stream: Option<MediaStream>) -> Harness {
    init_tracing();
    let (peer, peer_events) = MockPeer::new("local", 1000);
    let transport = RecordingTransport::new();
    let mut builder = SessionBuilder::new(config).with_peer_events(peer_events);
    if let Some(stream) = stream {
        builder = builder.with_stream(stream);
    }
    let session = builder
        .build(peer.clone(), transport.clone())
        .expect("valid config");
    let events = session.subscribe();
    Harness {
        session,
        peer,
        transport,
        events,
    }
}

/// Wait for the first event matching `pred`, failing after two seconds
pub async fn expect_event<F>(events: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

/// Every event received so far, without waiting
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Poll `cond` until it holds, failing after two seconds
pub async fn wait_until<F: FnMut() -> bool>(mut cond: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Deliver every envelope from `outbound` to `session` in order
pub fn pump(mut outbound: mpsc::UnboundedReceiver<Envelope>, session: MediaSession) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let wire = envelope.to_wire();
            if let Err(e) = session.process_raw(&wire.action, wire.jingle).await {
                tracing::warn!("{} rejected {}: {}", session.sid(), wire.action, e);
            }
        }
    })
}

/// Remote offer seen by a responder: one audio and one video content
/// carrying the sources of `stream_id`, starting at `ssrc`
pub fn remote_offer(stream_id: &str, ssrc: u32) -> Description {
    let source = |ssrc: u32, kind: &str| {
        Source::new(ssrc)
            .with_parameter("cname", "remote-cname")
            .with_parameter("msid", format!("{stream_id} {stream_id}-{kind}"))
    };
    Description::new(vec![
        Content::new("audio", Application::rtp(MediaKind::Audio)).with_source(source(ssrc, "audio")),
        Content::new("video", Application::rtp(MediaKind::Video)).with_source(source(ssrc + 1, "video")),
    ])
}

pub fn ssrc_set(description: &Description) -> HashSet<u32> {
    description.ssrcs().into_iter().collect()
}
