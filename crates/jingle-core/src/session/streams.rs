//! Local stream changes on an established session
//!
//! Adding or removing a local stream changes the SSRCs this side sends. The
//! remote party learns about it from a source-add / source-remove carrying
//! only the affected stream's sources, while the primitive itself is
//! brought up to date by re-applying the current remote description and
//! answering it again.

use tracing::{debug, error, info};

use super::media_session::MediaSession;
use crate::config::MediaConstraints;
use crate::errors::{NegotiationStep, Result, SessionError};
use crate::jingle::{Description, JingleMessage};
use crate::peer::MediaStream;
use crate::queue::TaskCompletion;
use crate::sources::{sources_delta, stream_delta};

/// Whether and how a stream change renegotiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Renegotiation {
    /// Only attach or detach the stream locally
    #[default]
    None,
    /// Renegotiate with the session's current constraints
    Default,
    /// Store these constraints on the session, then renegotiate with them
    Constraints(MediaConstraints),
}

impl From<bool> for Renegotiation {
    fn from(renegotiate: bool) -> Self {
        if renegotiate {
            Self::Default
        } else {
            Self::None
        }
    }
}

impl From<MediaConstraints> for Renegotiation {
    fn from(constraints: MediaConstraints) -> Self {
        Self::Constraints(constraints)
    }
}

impl MediaSession {
    /// Attach a local stream, optionally announcing its sources with a source-add
    pub fn add_stream(
        &self,
        stream: MediaStream,
        renegotiate: impl Into<Renegotiation>,
    ) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        let renegotiate = renegotiate.into();
        self.enqueue("add-stream", async move { session.run_add_stream(stream, renegotiate).await })
    }

    async fn run_add_stream(&self, stream: MediaStream, renegotiate: Renegotiation) -> Result<()> {
        self.ensure_live()?;
        self.inner.pc.add_stream(stream.clone());

        let Some(constraints) = self.renegotiation_constraints(renegotiate) else {
            debug!(sid = %self.inner.sid, "Attached stream {} without renegotiation", stream.id);
            return Ok(());
        };

        let answer = self.renegotiate(&constraints).await.map_err(|e| {
            error!(sid = %self.inner.sid, "Could not renegotiate for adding stream {}: {}", stream.id, e);
            e
        })?;

        match stream_delta(answer, &stream.id) {
            Some(delta) => {
                info!(sid = %self.inner.sid, "Announcing sources of stream {}", stream.id);
                self.send(JingleMessage::SourceAdd(delta));
            }
            None => debug!(sid = %self.inner.sid, "Answer carries no sources for stream {}", stream.id),
        }
        Ok(())
    }

    /// Detach a local stream, optionally withdrawing its sources with a source-remove
    ///
    /// The source-remove is built from the local description before the
    /// stream is detached, since detaching drops its sources.
    pub fn remove_stream(
        &self,
        stream: MediaStream,
        renegotiate: impl Into<Renegotiation>,
    ) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        let renegotiate = renegotiate.into();
        self.enqueue("remove-stream", async move {
            session.run_remove_stream(stream, renegotiate).await
        })
    }

    async fn run_remove_stream(&self, stream: MediaStream, renegotiate: Renegotiation) -> Result<()> {
        self.ensure_live()?;

        let Some(constraints) = self.renegotiation_constraints(renegotiate) else {
            self.inner.pc.remove_stream(&stream);
            debug!(sid = %self.inner.sid, "Detached stream {} without renegotiation", stream.id);
            return Ok(());
        };

        match self.inner.pc.local_description().and_then(|local| stream_delta(local, &stream.id)) {
            Some(delta) => {
                info!(sid = %self.inner.sid, "Withdrawing sources of stream {}", stream.id);
                self.send(JingleMessage::SourceRemove(delta));
            }
            None => debug!(sid = %self.inner.sid, "No local sources for stream {}", stream.id),
        }
        self.inner.pc.remove_stream(&stream);

        self.renegotiate(&constraints).await.map_err(|e| {
            error!(sid = %self.inner.sid, "Could not renegotiate for removing stream {}: {}", stream.id, e);
            e
        })?;
        Ok(())
    }

    /// Replace one local stream by another in a single renegotiation
    ///
    /// Sends the local sources (transport and codec data stripped) as a
    /// source-remove and the answer's sources as a source-add. Contents
    /// without sources are left out of both.
    pub fn switch_stream(&self, old: MediaStream, new: MediaStream) -> TaskCompletion<(), SessionError> {
        let session = self.clone();
        self.enqueue("switch-stream", async move { session.run_switch_stream(old, new).await })
    }

    async fn run_switch_stream(&self, old: MediaStream, new: MediaStream) -> Result<()> {
        self.ensure_live()?;
        info!(sid = %self.inner.sid, "Switching stream {} to {}", old.id, new.id);

        let local = self.inner.pc.local_description().and_then(sources_delta);
        self.inner.pc.remove_stream(&old);
        match local {
            Some(local) => self.send(JingleMessage::SourceRemove(local)),
            None => debug!(sid = %self.inner.sid, "No local sources to withdraw"),
        }

        self.inner.pc.add_stream(new);
        let constraints = self.constraints();
        let answer = self.renegotiate(&constraints).await.map_err(|e| {
            error!(sid = %self.inner.sid, "Could not renegotiate for switching streams: {}", e);
            e
        })?;

        match sources_delta(answer) {
            Some(added) => self.send(JingleMessage::SourceAdd(added)),
            None => debug!(sid = %self.inner.sid, "Answer carries no sources to announce"),
        }
        Ok(())
    }

    fn renegotiation_constraints(&self, renegotiate: Renegotiation) -> Option<MediaConstraints> {
        match renegotiate {
            Renegotiation::None => None,
            Renegotiation::Default => Some(self.constraints()),
            Renegotiation::Constraints(constraints) => {
                self.set_constraints(constraints);
                Some(constraints)
            }
        }
    }

    /// Re-apply the current remote description as an offer and answer it
    async fn renegotiate(&self, constraints: &MediaConstraints) -> Result<Description> {
        let remote = self
            .inner
            .pc
            .remote_description()
            .ok_or_else(|| SessionError::invalid_state("renegotiate", self.state()))?;

        self.inner
            .pc
            .handle_offer(remote)
            .await
            .map_err(|e| SessionError::negotiation(NegotiationStep::ApplyRemoteOffer, e))?;
        self.ensure_live()?;

        let answer = self
            .inner
            .pc
            .answer(constraints)
            .await
            .map_err(|e| SessionError::negotiation(NegotiationStep::CreateAnswer, e))?;
        self.ensure_live()?;

        Ok(answer)
    }
}
