//! Jingle signaling payloads
//!
//! Typed descriptions, actions and the JSON boundary codec.

pub mod codec;
pub mod message;
pub mod types;

pub use message::{Action, JingleMessage, MuteTarget, ReasonCondition, SessionInfo, TerminateReason};
pub use types::{
    Application, ApplicationType, Candidate, Content, ContentGroup, Creator, Description,
    Fingerprint, HeaderExtension, MediaKind, Parameter, PayloadType, Senders, Source, SourceGroup,
    Transport,
};
