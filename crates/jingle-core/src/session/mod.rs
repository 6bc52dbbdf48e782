//! Media session: lifecycle, local intents and remote action handling
//!
//! A [`MediaSession`] owns one negotiation primitive and one
//! [`NegotiationQueue`](crate::queue::NegotiationQueue). Sessions are built
//! with [`SessionBuilder`]; state changes are observable through
//! [`MediaSession::subscribe`].

mod builder;
mod ice;
mod media_session;
mod remote;
mod state;
mod streams;

pub use builder::SessionBuilder;
pub use media_session::MediaSession;
pub use state::{connection_state_for, ConnectionState, SessionId, SessionState};
pub use streams::Renegotiation;
