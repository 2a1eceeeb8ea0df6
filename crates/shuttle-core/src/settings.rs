//! User settings, as stored by the options page.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::keys::{self, KeyStroke};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// WebSocket URL of the external editor process.
    pub server_url: String,
    /// Key sequences that cancel hint mode.
    pub exit_sequences: Vec<String>,
    pub hint_alphabet: String,
    /// How long an injected handler waits for `ready`.
    pub handshake_timeout_ms: u32,
    pub diff_timeout_ms: u32,
    /// Above this many UTF-16 units a coarse diff becomes a full replace.
    pub diff_size_ceiling: usize,
    pub keepalive_interval_ms: u32,
    pub scroll_debounce_ms: u32,
    pub max_hint_retries: u32,
    pub page_script_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8765".to_string(),
            exit_sequences: vec!["Escape".to_string(), "Ctrl-g".to_string()],
            hint_alphabet: "asdfghjkl".to_string(),
            handshake_timeout_ms: 10_000,
            diff_timeout_ms: 1_000,
            diff_size_ceiling: 200_000,
            keepalive_interval_ms: 30_000,
            scroll_debounce_ms: 500,
            max_hint_retries: 20,
            page_script_url: "page.js".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.exit_keys()?;
        let mut distinct: Vec<char> = settings.hint_alphabet.chars().collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(SyncError::InvalidSetting {
                field: "hintAlphabet",
                reason: format!("{:?} needs at least two distinct characters", settings.hint_alphabet),
            });
        }
        Ok(settings)
    }

    /// Parsed exit sequences.
    pub fn exit_keys(&self) -> Result<Vec<Vec<KeyStroke>>> {
        self.exit_sequences.iter().map(|s| keys::parse(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = Settings::from_json(r#"{"serverUrl":"ws://localhost:9000","extra":1}"#).unwrap();
        assert_eq!(settings.server_url, "ws://localhost:9000");
        assert_eq!(settings.hint_alphabet, "asdfghjkl");
        assert_eq!(settings.handshake_timeout_ms, 10_000);
        assert_eq!(settings.exit_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_hint_alphabet_without_two_letters() {
        for alphabet in ["", "a", "aaa"] {
            let raw = format!(r#"{{"hintAlphabet":{alphabet:?}}}"#);
            let err = Settings::from_json(&raw).unwrap_err();
            assert!(matches!(err, SyncError::InvalidSetting { field: "hintAlphabet", .. }));
        }
        assert!(Settings::from_json(r#"{"hintAlphabet":"ab"}"#).is_ok());
    }

    #[test]
    fn test_invalid_exit_sequence() {
        let err = Settings::from_json(r#"{"exitSequences":["Ctrl-Nope"]}"#).unwrap_err();
        assert!(matches!(err, SyncError::KeySequence { .. }));
    }
}
