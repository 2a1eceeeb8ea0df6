//! Messages exchanged with the external editor process.
//!
//! Envelope: `{ "type": ..., "payload": ... }`. Outbound `register` opens a
//! session, `updateText` carries every local change, `keepalive` is the
//! heartbeat. Inbound `updateText` carries remote edits, and `closed` is
//! synthesized locally when the socket goes away.

use serde::{Deserialize, Serialize};

use crate::types::{Extension, PageRect, TextState};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[serde(flatten)]
    pub state: TextState,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub extension: Option<Extension>,
    #[serde(default)]
    pub rect: Option<PageRect>,
}

/// Close event details, as reported by a WebSocket `close` event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseInfo {
    pub code: u16,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub was_clean: bool,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>, was_clean: bool) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TransportMessage {
    Register(RegisterPayload),
    UpdateText(TextState),
    Closed(CloseInfo),
    Keepalive,
}

impl TransportMessage {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// User-facing text for a closed transport, or `None` for a normal close.
pub fn close_message(info: &CloseInfo, server_url: &str) -> Option<String> {
    let reason = if info.reason.is_empty() {
        String::new()
    } else {
        format!(" ({})", info.reason)
    };
    let text = match info.code {
        1000 => return None,
        1001 => "the editor process went away".to_string(),
        1002 => "protocol error on the editor connection".to_string(),
        1003 => "the editor process refused the data it was sent".to_string(),
        1005 => "the editor connection closed without a status".to_string(),
        1006 => format!("failed to connect to {server_url}"),
        1007 => "the editor process received malformed text".to_string(),
        1008 => "the editor process rejected a message by policy".to_string(),
        1009 => "a message was too large for the editor process".to_string(),
        1010 => "the editor process did not negotiate a required extension".to_string(),
        1011 => "the editor process hit an internal error".to_string(),
        1012 => "the editor process is restarting".to_string(),
        1013 => "the editor process is overloaded, try again later".to_string(),
        1014 => "bad gateway between the browser and the editor process".to_string(),
        1015 => format!("TLS handshake with {server_url} failed"),
        code => format!("editor connection closed with code {code}"),
    };
    Some(format!("{text}{reason}"))
}
