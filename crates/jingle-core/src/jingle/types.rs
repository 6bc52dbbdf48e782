//! Jingle description model
//!
//! A [`Description`] is the structured form of a session description as it
//! travels inside Jingle actions: one [`Content`] per media line, each with an
//! RTP [`Application`] carrying its SSRC [`Source`]s and [`SourceGroup`]s, and
//! an optional ICE [`Transport`].
//!
//! Contents are correlated across snapshots by [`Content::name`], never by
//! position or identity.

use serde::{Deserialize, Serialize};

/// Which party created a content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creator {
    #[default]
    Initiator,
    Responder,
}

/// Which parties may send media on a content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Senders {
    #[default]
    Both,
    Initiator,
    Responder,
    None,
}

/// Application format of a content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationType {
    #[default]
    Rtp,
    Other(String),
}

impl From<String> for ApplicationType {
    fn from(value: String) -> Self {
        if value == "rtp" {
            Self::Rtp
        } else {
            Self::Other(value)
        }
    }
}

impl From<ApplicationType> for String {
    fn from(value: ApplicationType) -> Self {
        match value {
            ApplicationType::Rtp => "rtp".to_string(),
            ApplicationType::Other(other) => other,
        }
    }
}

/// Media kind a content or track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Application,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Application => write!(f, "application"),
        }
    }
}

/// Key/value attribute, used for SSRC and payload parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One SSRC entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub ssrc: u32,
    /// Ordered attributes. By convention index 0 is `cname` and index 1 is
    /// `msid` with the value `"<stream-id> <track-id>"`.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Source {
    pub fn new(ssrc: u32) -> Self {
        Self {
            ssrc,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(key, value));
        self
    }

    /// Media stream id carried in parameter slot 1, if present
    pub fn stream_id(&self) -> Option<&str> {
        self.parameters
            .get(1)
            .and_then(|parameter| parameter.value.split(' ').next())
            .filter(|id| !id.is_empty())
    }
}

/// Semantic grouping of SSRCs, e.g. `FID` for RTX pairing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceGroup {
    pub semantics: String,
    #[serde(default)]
    pub sources: Vec<u32>,
}

impl SourceGroup {
    pub fn new(semantics: impl Into<String>, sources: impl Into<Vec<u32>>) -> Self {
        Self {
            semantics: semantics.into(),
            sources: sources.into(),
        }
    }
}

/// RTP payload type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadType {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub clockrate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

fn default_channels() -> u8 {
    1
}

/// RTP header extension mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExtension {
    pub id: u16,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senders: Option<Senders>,
}

/// Application (description) part of a content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub application_type: ApplicationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<PayloadType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_extensions: Vec<HeaderExtension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_groups: Vec<SourceGroup>,
    /// rtcp-mux
    #[serde(default)]
    pub mux: bool,
}

impl Application {
    pub fn rtp(media: MediaKind) -> Self {
        Self {
            application_type: ApplicationType::Rtp,
            media: Some(media),
            ..Default::default()
        }
    }

    pub fn is_rtp(&self) -> bool {
        self.application_type == ApplicationType::Rtp
    }
}

/// ICE candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub foundation: String,
    pub component: u16,
    pub protocol: String,
    pub priority: u32,
    pub ip: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub candidate_type: String,
    #[serde(default)]
    pub generation: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_port: Option<u16>,
}

/// DTLS fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: String,
    pub setup: String,
    pub value: String,
}

/// Transport part of a content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    pub transport_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ufrag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<Fingerprint>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub gathering_complete: bool,
}

impl Transport {
    pub const ICE_UDP: &'static str = "iceUdp";

    /// Transport that only announces the end of candidate gathering
    pub fn end_of_candidates(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            gathering_complete: true,
            ..Default::default()
        }
    }
}

/// One media line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub name: String,
    #[serde(default)]
    pub creator: Creator,
    #[serde(default)]
    pub senders: Senders,
    #[serde(default)]
    pub application: Application,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
}

impl Content {
    pub fn new(name: impl Into<String>, application: Application) -> Self {
        Self {
            name: name.into(),
            creator: Creator::Initiator,
            senders: Senders::Both,
            application,
            transport: None,
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.application.sources.push(source);
        self
    }

    pub fn with_source_group(mut self, group: SourceGroup) -> Self {
        self.application.source_groups.push(group);
        self
    }
}

/// Top-level content grouping, e.g. `BUNDLE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentGroup {
    pub semantics: String,
    #[serde(default)]
    pub contents: Vec<String>,
}

/// Full negotiated state of one side
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ContentGroup>,
}

impl Description {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            groups: Vec::new(),
        }
    }

    pub fn content(&self, name: &str) -> Option<&Content> {
        self.contents.iter().find(|content| content.name == name)
    }

    /// All SSRCs across every content, in order
    pub fn ssrcs(&self) -> Vec<u32> {
        self.contents
            .iter()
            .flat_map(|content| content.application.sources.iter().map(|source| source.ssrc))
            .collect()
    }
}
