//! Target scoring for simulated clicks.

use serde::{Deserialize, Serialize};

use crate::types::OneOrMany;

/// `{ selector?, innerText? }` as sent by the external process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRequest {
    #[serde(default)]
    pub selector: Option<OneOrMany<String>>,
    #[serde(default)]
    pub inner_text: Option<OneOrMany<String>>,
}

impl ClickRequest {
    /// Selectors to query, joined into one selector list. `*` when absent.
    pub fn selector_list(&self) -> String {
        match &self.selector {
            Some(selectors) => selectors.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
            None => "*".to_string(),
        }
    }

    pub fn fragments(&self) -> Vec<&str> {
        self.inner_text
            .as_ref()
            .map(|t| t.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Index of the candidate whose text contains the most fragments.
///
/// Ties go to the later candidate, which in document order is the more deeply
/// nested (more specific) element. Candidates containing none of the
/// fragments are never chosen; with no fragments the first candidate wins.
pub fn best_match<S: AsRef<str>>(texts: &[S], fragments: &[&str]) -> Option<usize> {
    if fragments.is_empty() {
        return (!texts.is_empty()).then_some(0);
    }
    let mut best: Option<(usize, usize)> = None;
    for (i, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        let score = fragments.iter().filter(|f| text.contains(**f)).count();
        if score == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| score >= top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
