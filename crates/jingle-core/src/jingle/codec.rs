//! JSON codec for Jingle payloads at the signaling boundary
//!
//! The signaling transport exchanges `(action, payload)` pairs. Payloads are
//! decoded here exactly once into [`JingleMessage`], so the session layer
//! never inspects loosely-typed fields. Session-info uses the key-presence
//! form (`{"ringing": true}`, `{"mute": {...}}`), checked in the order
//! ringing, hold, active, mute, unmute.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::message::{Action, JingleMessage, MuteTarget, ReasonCondition, SessionInfo, TerminateReason};
use super::types::Description;
use crate::errors::ProtocolError;

/// Encode a message into its action name and JSON payload
pub fn encode(message: &JingleMessage) -> (Action, Value) {
    let payload = match message {
        JingleMessage::SessionInitiate(description)
        | JingleMessage::SessionAccept(description)
        | JingleMessage::SourceAdd(description)
        | JingleMessage::SourceRemove(description)
        | JingleMessage::TransportInfo(description) => {
            serde_json::to_value(description).unwrap_or_else(|_| json!({ "contents": [] }))
        }
        JingleMessage::SessionInfo(info) => encode_session_info(info),
        JingleMessage::SessionTerminate(reason) => match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        },
    };
    (message.action(), payload)
}

/// Decode an inbound `(action, payload)` pair
///
/// Unknown action names are a `bad-request`; well-known actions a media
/// session does not handle are `feature-not-implemented`.
pub fn decode(action: &str, payload: Value) -> Result<JingleMessage, ProtocolError> {
    let action: Action = action.parse().map_err(ProtocolError::bad_request)?;

    let message = match action {
        Action::SessionInitiate => JingleMessage::SessionInitiate(decode_description(action, payload)?),
        Action::SessionAccept => JingleMessage::SessionAccept(decode_description(action, payload)?),
        Action::SourceAdd => JingleMessage::SourceAdd(decode_description(action, payload)?),
        Action::SourceRemove => JingleMessage::SourceRemove(decode_description(action, payload)?),
        Action::TransportInfo => JingleMessage::TransportInfo(decode_description(action, payload)?),
        Action::SessionInfo => JingleMessage::SessionInfo(decode_session_info(&payload)),
        Action::SessionTerminate => JingleMessage::SessionTerminate(decode_reason(&payload)),
        unsupported => {
            debug!("Rejecting unsupported Jingle action {}", unsupported);
            return Err(ProtocolError::feature_not_implemented().with_text(unsupported.as_str()));
        }
    };
    Ok(message)
}

fn decode_description(action: Action, payload: Value) -> Result<Description, ProtocolError> {
    serde_json::from_value(payload)
        .map_err(|e| ProtocolError::bad_request(format!("malformed {action} payload: {e}")))
}

fn encode_session_info(info: &SessionInfo) -> Value {
    match info {
        SessionInfo::Ringing => json!({ "ringing": true }),
        SessionInfo::Hold => json!({ "hold": true }),
        SessionInfo::Resume => json!({ "active": true }),
        SessionInfo::Mute(target) => json!({ "mute": target }),
        SessionInfo::Unmute(target) => json!({ "unmute": target }),
        SessionInfo::Unknown => Value::Object(Map::new()),
    }
}

/// Decode a session-info payload; anything unrecognised is [`SessionInfo::Unknown`]
pub fn decode_session_info(payload: &Value) -> SessionInfo {
    let field = |key: &str| payload.get(key).filter(|value| is_truthy(value));

    if field("ringing").is_some() {
        return SessionInfo::Ringing;
    }
    if field("hold").is_some() {
        return SessionInfo::Hold;
    }
    if field("active").is_some() {
        return SessionInfo::Resume;
    }
    if let Some(value) = field("mute") {
        return SessionInfo::Mute(mute_target(value));
    }
    if let Some(value) = field("unmute") {
        return SessionInfo::Unmute(mute_target(value));
    }
    SessionInfo::Unknown
}

fn mute_target(value: &Value) -> MuteTarget {
    serde_json::from_value(value.clone()).unwrap_or_else(|_| MuteTarget::new(Default::default(), None))
}

fn decode_reason(payload: &Value) -> Option<TerminateReason> {
    match payload.get("reason")? {
        Value::String(condition) => Some(reason_from_condition(condition)),
        value @ Value::Object(_) => serde_json::from_value(value.clone()).ok().or_else(|| {
            value
                .get("condition")
                .and_then(Value::as_str)
                .map(reason_from_condition)
        }),
        _ => None,
    }
}

fn reason_from_condition(condition: &str) -> TerminateReason {
    serde_json::from_value::<ReasonCondition>(Value::String(condition.to_string()))
        .map(TerminateReason::new)
        .unwrap_or_else(|_| TerminateReason::new(ReasonCondition::GeneralError).with_text(condition))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
