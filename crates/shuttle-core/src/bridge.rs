//! Message contract between an isolated-context handler and its injected
//! page-context counterpart.
//!
//! Every message travels as `{ type, uuid, payload }` over same-origin window
//! messaging. The `type` is a closed set (`MessageKind`), each mapped to one
//! typed payload by `BridgeMessage::from_envelope`; there is no dispatch by
//! string concatenation.
//!
//! Messages are accepted only when the `uuid` matches the session and the
//! source window is the receiving window (`BridgeFilter`), so other frames or
//! extensions cannot inject state.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::selector::HandlerKind;
use crate::types::{Extension, PageRect, Position, SelectionRange, TextState};

/// Which side a message is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// isolated → injected
    ToPage,
    /// injected → isolated
    ToIsolated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Initialize,
    SetValue,
    GetValue,
    Unload,
    Ready,
    Value,
    Change,
}

impl MessageKind {
    pub fn direction(self) -> Direction {
        match self {
            MessageKind::Initialize
            | MessageKind::SetValue
            | MessageKind::GetValue
            | MessageKind::Unload => Direction::ToPage,
            MessageKind::Ready | MessageKind::Value | MessageKind::Change => Direction::ToIsolated,
        }
    }
}

/// Raw wire envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub uuid: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializePayload {
    /// Handler name, see `HandlerKind::name`.
    pub name: String,
    /// CSS selector resolving the target element in its tree scope.
    pub selector: String,
    /// Selectors of the open shadow hosts enclosing the target, outermost
    /// first, each relative to the scope containing that host.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValuePayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<Vec<SelectionRange>>,
}

impl SetValuePayload {
    pub fn position(&self) -> Option<Position> {
        match (self.line_number, self.column) {
            (Some(line), Some(column)) => Some(Position::new(line, column)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub line_number: u32,
    pub column: u32,
    #[serde(default)]
    pub extension: Option<Extension>,
    #[serde(default)]
    pub rect: Option<PageRect>,
}

/// A typed bridge message.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeMessage {
    Initialize(InitializePayload),
    SetValue(SetValuePayload),
    GetValue,
    Unload,
    Ready(ReadyPayload),
    Value(TextState),
    Change,
}

#[derive(Serialize, Deserialize)]
struct Empty {}

impl BridgeMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            BridgeMessage::Initialize(_) => MessageKind::Initialize,
            BridgeMessage::SetValue(_) => MessageKind::SetValue,
            BridgeMessage::GetValue => MessageKind::GetValue,
            BridgeMessage::Unload => MessageKind::Unload,
            BridgeMessage::Ready(_) => MessageKind::Ready,
            BridgeMessage::Value(_) => MessageKind::Value,
            BridgeMessage::Change => MessageKind::Change,
        }
    }

    /// Wrap into a wire envelope for `uuid`.
    pub fn into_envelope(self, uuid: &str) -> Result<Envelope> {
        let kind = self.kind();
        let payload = match self {
            BridgeMessage::Initialize(p) => serde_json::to_value(p)?,
            BridgeMessage::SetValue(p) => serde_json::to_value(p)?,
            BridgeMessage::Ready(p) => serde_json::to_value(p)?,
            BridgeMessage::Value(p) => serde_json::to_value(p)?,
            BridgeMessage::GetValue | BridgeMessage::Unload | BridgeMessage::Change => {
                serde_json::to_value(Empty {})?
            }
        };
        Ok(Envelope {
            kind,
            uuid: uuid.to_string(),
            payload,
        })
    }

    /// Decode the payload of an envelope according to its kind.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let payload = envelope.payload.clone();
        let message = match envelope.kind {
            MessageKind::Initialize => BridgeMessage::Initialize(serde_json::from_value(payload)?),
            MessageKind::SetValue => BridgeMessage::SetValue(serde_json::from_value(payload)?),
            MessageKind::GetValue => BridgeMessage::GetValue,
            MessageKind::Unload => BridgeMessage::Unload,
            MessageKind::Ready => BridgeMessage::Ready(serde_json::from_value(payload)?),
            MessageKind::Value => BridgeMessage::Value(serde_json::from_value(payload)?),
            MessageKind::Change => BridgeMessage::Change,
        };
        Ok(message)
    }
}

/// Correlation identity of one isolated handler and its injected peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectionSession {
    pub uuid: String,
    pub kind: HandlerKind,
    pub selector: String,
    pub hosts: Vec<String>,
}

impl InjectionSession {
    pub fn new(uuid: impl Into<String>, kind: HandlerKind, selector: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            kind,
            selector: selector.into(),
            hosts: Vec::new(),
        }
    }

    /// Place the target inside the shadow trees of `hosts`.
    pub fn within(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn filter(&self, side: Direction) -> BridgeFilter {
        BridgeFilter::new(self.uuid.clone(), side)
    }

    pub fn initialize(&self) -> BridgeMessage {
        BridgeMessage::Initialize(InitializePayload {
            name: self.kind.name().to_string(),
            selector: self.selector.clone(),
            hosts: self.hosts.clone(),
        })
    }
}

/// Gate for incoming envelopes.
#[derive(Clone, Debug)]
pub struct BridgeFilter {
    uuid: String,
    accepts: Direction,
}

impl BridgeFilter {
    /// A filter accepting messages addressed to `accepts` for session `uuid`.
    pub fn new(uuid: impl Into<String>, accepts: Direction) -> Self {
        Self {
            uuid: uuid.into(),
            accepts,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Decode `raw` if it is addressed to this session from the same window.
    ///
    /// Returns `None` for anything else; foreign messages are not errors.
    pub fn accept(&self, raw: &serde_json::Value, same_source: bool) -> Option<BridgeMessage> {
        if !same_source {
            return None;
        }
        if raw.get("uuid").and_then(|u| u.as_str()) != Some(self.uuid.as_str()) {
            return None;
        }
        let envelope: Envelope = match serde_json::from_value(raw.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(target: "shuttle::bridge", uuid = %self.uuid, "dropping malformed envelope: {e}");
                return None;
            }
        };
        if envelope.kind.direction() != self.accepts {
            return None;
        }
        match BridgeMessage::from_envelope(&envelope) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(target: "shuttle::bridge", kind = ?envelope.kind, "bad payload: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn session() -> InjectionSession {
        InjectionSession::new("abc-123", HandlerKind::CodeMirror6, "#editor")
    }

    #[test]
    fn test_initialize_envelope_shape() {
        let env = session().initialize().into_envelope("abc-123").unwrap();
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "initialize",
                "uuid": "abc-123",
                "payload": { "name": "CodeMirror6", "selector": "#editor" }
            })
        );
    }

    #[test]
    fn test_initialize_carries_shadow_hosts() {
        let session = session().within(vec!["my-app".into(), "div:nth-child(2)".into()]);
        let env = session.initialize().into_envelope("abc-123").unwrap();
        assert_eq!(env.payload["hosts"], json!(["my-app", "div:nth-child(2)"]));

        let filter = session.filter(Direction::ToPage);
        let raw = serde_json::to_value(&env).unwrap();
        let Some(BridgeMessage::Initialize(init)) = filter.accept(&raw, true) else {
            panic!("initialize not accepted");
        };
        assert_eq!(init.hosts.len(), 2);
        assert_eq!(init.selector, "#editor");
    }

    #[test]
    fn test_accepts_matching_reply() {
        let filter = session().filter(Direction::ToIsolated);
        let raw = json!({
            "type": "value",
            "uuid": "abc-123",
            "payload": { "text": "abd", "lineNumber": 1, "column": 4 }
        });
        let message = filter.accept(&raw, true).unwrap();
        assert_eq!(message, BridgeMessage::Value(TextState::new("abd").with_caret(3)));
    }

    #[test]
    fn test_rejects_wrong_uuid() {
        let filter = session().filter(Direction::ToIsolated);
        let raw = json!({ "type": "change", "uuid": "other", "payload": {} });
        assert!(filter.accept(&raw, true).is_none());
    }

    #[test]
    fn test_rejects_foreign_source() {
        let filter = session().filter(Direction::ToIsolated);
        let raw = json!({ "type": "change", "uuid": "abc-123", "payload": {} });
        assert!(filter.accept(&raw, false).is_none());
        assert_eq!(filter.accept(&raw, true), Some(BridgeMessage::Change));
    }

    #[test]
    fn test_rejects_own_direction() {
        // A page-bound request echoed back through window messaging.
        let filter = session().filter(Direction::ToIsolated);
        let raw = json!({ "type": "getValue", "uuid": "abc-123", "payload": {} });
        assert!(filter.accept(&raw, true).is_none());
    }

    #[test]
    fn test_rejects_unknown_type_and_missing_payload_is_ok() {
        let filter = session().filter(Direction::ToPage);
        let unknown = json!({ "type": "frobnicate", "uuid": "abc-123" });
        assert!(filter.accept(&unknown, true).is_none());
        let unload = json!({ "type": "unload", "uuid": "abc-123" });
        assert_eq!(filter.accept(&unload, true), Some(BridgeMessage::Unload));
    }

    #[test]
    fn test_set_value_payload() {
        let message = BridgeMessage::SetValue(SetValuePayload {
            text: "x".into(),
            line_number: Some(1),
            column: Some(2),
            selections: None,
        });
        let env = message.clone().into_envelope("u").unwrap();
        assert_eq!(env.payload, json!({ "text": "x", "lineNumber": 1, "column": 2 }));
        assert_eq!(BridgeMessage::from_envelope(&env).unwrap(), message);
    }
}
