//! Human-authored key sequences such as `"Ctrl-x Space r"`.
//!
//! A sequence is a list of keystrokes separated by single spaces. Each
//! keystroke is any number of `Ctrl-`, `Alt-`, `Meta-` or `Shift-` prefixes
//! followed by a key: a single character, `Space` (also `SPC`, `space`, or a
//! literal space), or a named key such as `Escape`. A bare uppercase letter
//! implies Shift.
//!
//! `format` writes the canonical spelling, so `format(parse(s)) == s` for every
//! canonical input; aliases such as `SPC` come back as `Space`.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{Result, SyncError};

const NAMED_KEYS: &[&str] = &[
    "Escape",
    "Enter",
    "Tab",
    "Backspace",
    "Delete",
    "Insert",
    "Home",
    "End",
    "PageUp",
    "PageDown",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "F1",
    "F2",
    "F3",
    "F4",
    "F5",
    "F6",
    "F7",
    "F8",
    "F9",
    "F10",
    "F11",
    "F12",
];

const MODIFIER_KEYS: &[&str] = &["Shift", "Control", "Alt", "Meta", "AltGraph", "CapsLock"];

/// A single keystroke, shaped like the fields of a DOM `KeyboardEvent`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStroke {
    pub key: SmolStr,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
    pub alt_key: bool,
}

impl KeyStroke {
    /// A keystroke with no modifiers (Shift is still implied by uppercase).
    pub fn plain(key: impl Into<SmolStr>) -> Self {
        Self::from_parts(key, false, false, false, false)
    }

    /// Build from raw event fields, normalizing implicit Shift.
    pub fn from_parts(
        key: impl Into<SmolStr>,
        ctrl_key: bool,
        shift_key: bool,
        meta_key: bool,
        alt_key: bool,
    ) -> Self {
        let key = key.into();
        let shift_key = shift_key || is_upper_letter(&key);
        Self {
            key,
            ctrl_key,
            shift_key,
            meta_key,
            alt_key,
        }
    }

    /// Whether a typed keystroke satisfies this binding.
    ///
    /// With Ctrl, Alt or Meta held some layouts report the shifted or
    /// unshifted letter inconsistently, so letters compare case-insensitively
    /// there; the Shift flag still has to agree. A single non-letter
    /// character already names the shifted symbol (`?`, `!`), so Shift is
    /// ignored for it.
    pub fn matches(&self, typed: &KeyStroke) -> bool {
        let shift_agrees = self.shift_key == typed.shift_key || self.is_symbol();
        if self.ctrl_key != typed.ctrl_key
            || self.alt_key != typed.alt_key
            || self.meta_key != typed.meta_key
            || !shift_agrees
        {
            return false;
        }
        if self.key == typed.key {
            return true;
        }
        (self.ctrl_key || self.alt_key || self.meta_key)
            && self.as_letter().is_some()
            && self.key.eq_ignore_ascii_case(&typed.key)
    }

    fn as_letter(&self) -> Option<char> {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => Some(c),
            _ => None,
        }
    }

    fn is_symbol(&self) -> bool {
        let mut chars = self.key.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if !c.is_alphabetic() && !c.is_whitespace())
    }

    /// Whether this keystroke only carries a modifier press.
    pub fn is_modifier(&self) -> bool {
        MODIFIER_KEYS.contains(&self.key.as_str())
    }

    /// The printable character this keystroke types, if it is unmodified.
    pub fn as_char(&self) -> Option<char> {
        if self.ctrl_key || self.meta_key || self.alt_key {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    fn fmt_into(&self, out: &mut String) {
        if self.ctrl_key {
            out.push_str("Ctrl-");
        }
        if self.alt_key {
            out.push_str("Alt-");
        }
        if self.meta_key {
            out.push_str("Meta-");
        }
        if self.shift_key && !is_upper_letter(&self.key) {
            out.push_str("Shift-");
        }
        if self.key == " " {
            out.push_str("Space");
        } else {
            out.push_str(&self.key);
        }
    }
}

impl std::fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.fmt_into(&mut out);
        f.write_str(&out)
    }
}

fn is_upper_letter(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_alphabetic() && c.is_uppercase(),
        _ => false,
    }
}

fn error(input: &str, reason: impl Into<String>) -> SyncError {
    SyncError::KeySequence {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn resolve_key(input: &str, token: &str, shift: bool) -> Result<SmolStr> {
    match token {
        " " | "Space" | "SPC" | "space" => return Ok(SmolStr::new_static(" ")),
        "Esc" => return Ok(SmolStr::new_static("Escape")),
        _ => {}
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if shift && c.is_alphabetic() => Ok(c.to_uppercase().collect::<String>().into()),
        (Some(_), None) => Ok(token.into()),
        _ if NAMED_KEYS.contains(&token) => Ok(token.into()),
        _ => Err(error(input, format!("unknown key {token:?}"))),
    }
}

/// Parse a key sequence.
pub fn parse(input: &str) -> Result<Vec<KeyStroke>> {
    let mut strokes = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let (mut ctrl, mut shift, mut meta, mut alt) = (false, false, false, false);
        loop {
            let stripped = [
                ("Ctrl-", &mut ctrl),
                ("Alt-", &mut alt),
                ("Meta-", &mut meta),
                ("Shift-", &mut shift),
            ]
            .into_iter()
            .find_map(|(prefix, flag)| {
                let after = rest.strip_prefix(prefix)?;
                (!after.is_empty()).then(|| {
                    *flag = true;
                    after
                })
            });
            match stripped {
                Some(after) => rest = after,
                None => break,
            }
        }

        let key_len = if rest.starts_with(' ') {
            1
        } else {
            rest.find(' ').unwrap_or(rest.len())
        };
        let (token, after) = rest.split_at(key_len);
        let key = resolve_key(input, token, shift)?;
        strokes.push(KeyStroke::from_parts(key, ctrl, shift, meta, alt));

        rest = match after.strip_prefix(' ') {
            Some("") => return Err(error(input, "trailing separator")),
            Some(next) => next,
            None if after.is_empty() => after,
            None => return Err(error(input, "missing separator")),
        };
    }

    Ok(strokes)
}

/// Write keystrokes in canonical form.
pub fn format(strokes: &[KeyStroke]) -> String {
    let mut out = String::new();
    for (i, stroke) in strokes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        stroke.fmt_into(&mut out);
    }
    out
}

/// Tracks progress through several key sequences at once.
///
/// Used for exit bindings: `feed` returns true once any sequence completes.
#[derive(Clone, Debug, Default)]
pub struct SequenceMatcher {
    sequences: Vec<Vec<KeyStroke>>,
    progress: Vec<usize>,
}

impl SequenceMatcher {
    pub fn new(sequences: Vec<Vec<KeyStroke>>) -> Self {
        let sequences: Vec<_> = sequences.into_iter().filter(|s| !s.is_empty()).collect();
        let progress = vec![0; sequences.len()];
        Self {
            sequences,
            progress,
        }
    }

    /// Feed a keystroke; true when a sequence has just been completed.
    pub fn feed(&mut self, stroke: &KeyStroke) -> bool {
        if stroke.is_modifier() {
            return false;
        }
        let mut completed = false;
        for (seq, progress) in self.sequences.iter().zip(self.progress.iter_mut()) {
            if seq[*progress].matches(stroke) {
                *progress += 1;
            } else {
                *progress = usize::from(seq[0].matches(stroke));
            }
            if *progress == seq.len() {
                completed = true;
            }
        }
        if completed {
            self.reset();
        }
        completed
    }

    /// Whether some sequence has been partially typed.
    pub fn in_progress(&self) -> bool {
        self.progress.iter().any(|p| *p > 0)
    }

    pub fn reset(&mut self) {
        self.progress.iter_mut().for_each(|p| *p = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(s: &str) -> String {
        format(&parse(s).unwrap())
    }

    #[test]
    fn test_canonical_roundtrips() {
        for s in ["Ctrl-x f r", "Ctrl-x Space r", "Q", "", "Escape", "Ctrl-Alt-Shift-Tab"] {
            assert_eq!(roundtrip(s), s);
        }
    }

    #[test]
    fn test_space_aliases() {
        for s in ["Space", "SPC", "space", " "] {
            assert_eq!(parse(s).unwrap(), vec![KeyStroke::plain(" ")]);
        }
        assert_eq!(roundtrip("Ctrl-SPC"), "Ctrl-Space");
    }

    #[test]
    fn test_uppercase_implies_shift() {
        let strokes = parse("Q").unwrap();
        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].shift_key);
        assert_eq!(strokes[0].key, "Q");

        let explicit = parse("Shift-q").unwrap();
        assert_eq!(explicit, strokes);
    }

    #[test]
    fn test_ctrl_g() {
        let strokes = parse("Ctrl-g").unwrap();
        assert_eq!(
            strokes,
            vec![KeyStroke::from_parts("g", true, false, false, false)]
        );
    }

    #[test]
    fn test_rejects_unknown_name() {
        assert!(matches!(
            parse("Ctrl-Frobnicate"),
            Err(SyncError::KeySequence { .. })
        ));
        assert!(parse("a ").is_err());
    }

    #[test]
    fn test_literal_dash_key() {
        let strokes = parse("Ctrl--").unwrap();
        assert_eq!(strokes[0].key, "-");
        assert!(strokes[0].ctrl_key);
    }

    #[test]
    fn test_sequence_matcher() {
        let mut matcher = SequenceMatcher::new(vec![
            parse("Escape").unwrap(),
            parse("Ctrl-x Ctrl-c").unwrap(),
        ]);
        let ctrl_x = KeyStroke::from_parts("x", true, false, false, false);
        let ctrl_c = KeyStroke::from_parts("c", true, false, false, false);

        assert!(!matcher.feed(&ctrl_x));
        assert!(matcher.in_progress());
        assert!(matcher.feed(&ctrl_c));
        assert!(!matcher.in_progress());

        assert!(!matcher.feed(&KeyStroke::plain("a")));
        assert!(matcher.feed(&KeyStroke::plain("Escape")));
    }

    #[test]
    fn test_matcher_ignores_modifier_presses() {
        let mut matcher = SequenceMatcher::new(vec![parse("Ctrl-g").unwrap()]);
        assert!(!matcher.feed(&KeyStroke::from_parts("Control", true, false, false, false)));
        assert!(matcher.feed(&KeyStroke::from_parts("g", true, false, false, false)));
    }

    #[test]
    fn test_matches_ignores_letter_case_under_ctrl() {
        let binding = &parse("Ctrl-g").unwrap()[0];
        assert!(binding.matches(&KeyStroke::from_parts("g", true, false, false, false)));
        assert!(binding.matches(&KeyStroke {
            key: "G".into(),
            ctrl_key: true,
            shift_key: false,
            meta_key: false,
            alt_key: false,
        }));
        assert!(!binding.matches(&KeyStroke::plain("g")));
    }

    #[test]
    fn test_shifted_symbol_matches_either_way() {
        let strokes = parse("Ctrl-x ?").unwrap();
        assert!(strokes[1].matches(&KeyStroke::from_parts("?", false, true, false, false)));
        assert!(strokes[1].matches(&KeyStroke::plain("?")));
        assert!(!strokes[1].matches(&KeyStroke::from_parts("?", true, true, false, false)));

        let space = &parse("Space").unwrap()[0];
        assert!(!space.matches(&KeyStroke::from_parts(" ", false, true, false, false)));
    }

    proptest! {
        #[test]
        fn prop_format_is_stable(keys in proptest::collection::vec("[a-zA-Z0-9]|Space|Escape|Tab", 0..6),
                                 ctrl in proptest::collection::vec(any::<bool>(), 6)) {
            let input = keys
                .iter()
                .zip(ctrl.iter())
                .map(|(k, c)| if *c { format!("Ctrl-{k}") } else { k.clone() })
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(roundtrip(&input), input);
        }
    }
}
