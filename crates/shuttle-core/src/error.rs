//! Error types for synchronization.

use miette::Diagnostic;

use crate::transport::CloseInfo;

/// Errors raised while attaching to, reading from, or writing to an editor.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SyncError {
    /// No registered handler claims the element.
    #[error("no handler for <{tag}>")]
    #[diagnostic(
        code(shuttle::no_handler),
        help("fall back to element discovery and let the user pick an editable element")
    )]
    NoHandler { tag: String },

    /// The injected script could not reach the native editor object.
    #[error("editor bridge unavailable: {0}")]
    #[diagnostic(code(shuttle::bridge_unavailable))]
    BridgeUnavailable(String),

    /// The injected script never answered the `initialize` handshake.
    #[error("{name}: no ready reply within {timeout_ms}ms")]
    #[diagnostic(code(shuttle::handshake_timeout))]
    HandshakeTimeout { name: String, timeout_ms: u32 },

    /// The bridge was unloaded while a request was outstanding.
    #[error("editor bridge closed")]
    BridgeClosed,

    /// A message did not match the wire contract.
    #[error("protocol error: {0}")]
    #[diagnostic(code(shuttle::protocol))]
    Protocol(String),

    /// Serialization/deserialization error.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// A key sequence string could not be parsed.
    #[error("invalid key sequence {input:?}: {reason}")]
    #[diagnostic(code(shuttle::keys))]
    KeySequence { input: String, reason: String },

    /// A stored setting is unusable.
    #[error("invalid setting {field}: {reason}")]
    #[diagnostic(code(shuttle::settings))]
    InvalidSetting { field: &'static str, reason: String },

    /// The transport to the external process closed.
    #[error("transport closed with code {}", .0.code)]
    TransportClosed(CloseInfo),

    /// A second hint read was started while one is active.
    #[error("a hint read is already in progress")]
    HintBusy,

    /// A JavaScript call failed.
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<&str> for SyncError {
    fn from(s: &str) -> Self {
        SyncError::Js(s.to_string())
    }
}

impl From<String> for SyncError {
    fn from(s: String) -> Self {
        SyncError::Js(s)
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
