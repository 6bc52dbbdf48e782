//! Jingle actions and their typed payloads

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{Creator, Description};

/// Every action name defined for a Jingle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    ContentAccept,
    ContentAdd,
    ContentModify,
    ContentReject,
    ContentRemove,
    DescriptionInfo,
    SecurityInfo,
    SessionAccept,
    SessionInfo,
    SessionInitiate,
    SessionTerminate,
    SourceAdd,
    SourceRemove,
    TransportAccept,
    TransportInfo,
    TransportReject,
    TransportReplace,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentAccept => "content-accept",
            Self::ContentAdd => "content-add",
            Self::ContentModify => "content-modify",
            Self::ContentReject => "content-reject",
            Self::ContentRemove => "content-remove",
            Self::DescriptionInfo => "description-info",
            Self::SecurityInfo => "security-info",
            Self::SessionAccept => "session-accept",
            Self::SessionInfo => "session-info",
            Self::SessionInitiate => "session-initiate",
            Self::SessionTerminate => "session-terminate",
            Self::SourceAdd => "source-add",
            Self::SourceRemove => "source-remove",
            Self::TransportAccept => "transport-accept",
            Self::TransportInfo => "transport-info",
            Self::TransportReject => "transport-reject",
            Self::TransportReplace => "transport-replace",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "content-accept" => Self::ContentAccept,
            "content-add" => Self::ContentAdd,
            "content-modify" => Self::ContentModify,
            "content-reject" => Self::ContentReject,
            "content-remove" => Self::ContentRemove,
            "description-info" => Self::DescriptionInfo,
            "security-info" => Self::SecurityInfo,
            "session-accept" => Self::SessionAccept,
            "session-info" => Self::SessionInfo,
            "session-initiate" => Self::SessionInitiate,
            "session-terminate" => Self::SessionTerminate,
            "source-add" => Self::SourceAdd,
            "source-remove" => Self::SourceRemove,
            "transport-accept" => Self::TransportAccept,
            "transport-info" => Self::TransportInfo,
            "transport-reject" => Self::TransportReject,
            "transport-replace" => Self::TransportReplace,
            other => return Err(format!("unknown Jingle action '{other}'")),
        };
        Ok(action)
    }
}

/// Content addressed by a mute/unmute notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteTarget {
    pub creator: Creator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MuteTarget {
    pub fn new(creator: Creator, name: Option<String>) -> Self {
        Self { creator, name }
    }
}

/// Session-info payload, decoded once at the signaling boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInfo {
    Ringing,
    Hold,
    /// Resume from hold (`active` on the wire)
    Resume,
    Mute(MuteTarget),
    Unmute(MuteTarget),
    /// Empty or unrecognised info, accepted as a no-op
    Unknown,
}

/// Reason condition of a session-terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCondition {
    AlternativeSession,
    Busy,
    Cancel,
    ConnectivityError,
    Decline,
    Expired,
    FailedApplication,
    FailedTransport,
    GeneralError,
    Gone,
    IncompatibleParameters,
    MediaError,
    SecurityError,
    Success,
    Timeout,
    UnsupportedApplications,
    UnsupportedTransports,
}

impl ReasonCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlternativeSession => "alternative-session",
            Self::Busy => "busy",
            Self::Cancel => "cancel",
            Self::ConnectivityError => "connectivity-error",
            Self::Decline => "decline",
            Self::Expired => "expired",
            Self::FailedApplication => "failed-application",
            Self::FailedTransport => "failed-transport",
            Self::GeneralError => "general-error",
            Self::Gone => "gone",
            Self::IncompatibleParameters => "incompatible-parameters",
            Self::MediaError => "media-error",
            Self::SecurityError => "security-error",
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::UnsupportedApplications => "unsupported-applications",
            Self::UnsupportedTransports => "unsupported-transports",
        }
    }
}

impl fmt::Display for ReasonCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateReason {
    pub condition: ReasonCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TerminateReason {
    pub fn new(condition: ReasonCondition) -> Self {
        Self {
            condition,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl Default for TerminateReason {
    fn default() -> Self {
        Self::new(ReasonCondition::Success)
    }
}

impl From<ReasonCondition> for TerminateReason {
    fn from(condition: ReasonCondition) -> Self {
        Self::new(condition)
    }
}

impl fmt::Display for TerminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} ({})", self.condition, text),
            None => write!(f, "{}", self.condition),
        }
    }
}

/// A supported Jingle action together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum JingleMessage {
    SessionInitiate(Description),
    SessionAccept(Description),
    SessionInfo(SessionInfo),
    SessionTerminate(Option<TerminateReason>),
    SourceAdd(Description),
    SourceRemove(Description),
    TransportInfo(Description),
}

impl JingleMessage {
    pub fn action(&self) -> Action {
        match self {
            Self::SessionInitiate(_) => Action::SessionInitiate,
            Self::SessionAccept(_) => Action::SessionAccept,
            Self::SessionInfo(_) => Action::SessionInfo,
            Self::SessionTerminate(_) => Action::SessionTerminate,
            Self::SourceAdd(_) => Action::SourceAdd,
            Self::SourceRemove(_) => Action::SourceRemove,
            Self::TransportInfo(_) => Action::TransportInfo,
        }
    }

    /// Description payload, for actions that carry one
    pub fn description(&self) -> Option<&Description> {
        match self {
            Self::SessionInitiate(description)
            | Self::SessionAccept(description)
            | Self::SourceAdd(description)
            | Self::SourceRemove(description)
            | Self::TransportInfo(description) => Some(description),
            Self::SessionInfo(_) | Self::SessionTerminate(_) => None,
        }
    }
}
