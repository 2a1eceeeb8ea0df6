//! Letter-coded hint labels and the incremental reader that matches typed
//! keys against them.

use crate::keys::{KeyStroke, SequenceMatcher};

/// Generate `count` labels over `alphabet`.
///
/// All labels share the shortest length `n` such that `alphabet.len()^n >= count`
/// and are assigned in lexicographic (alphabet) order.
pub fn labels(alphabet: &str, count: usize) -> Vec<String> {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() || count == 0 {
        return Vec::new();
    }
    let base = chars.len();

    let mut len = 1;
    let mut capacity = base;
    while capacity < count && base > 1 {
        len += 1;
        capacity = capacity.saturating_mul(base);
    }

    (0..count.min(capacity))
        .map(|mut index| {
            let mut label = vec![chars[0]; len];
            for slot in label.iter_mut().rev() {
                *slot = chars[index % base];
                index /= base;
            }
            label.into_iter().collect()
        })
        .collect()
}

/// Outcome of feeding one keystroke to a `HintReader`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HintEvent {
    /// Still typing; `remaining` are the indices of labels matching `prefix`.
    Pending {
        prefix: String,
        remaining: Vec<usize>,
    },
    /// A label was completed.
    Selected(usize),
    /// The prefix matched nothing and was reset.
    NoMatch,
    /// An exit sequence was typed.
    Cancelled,
}

/// Incremental reader matching keystrokes against hint labels.
#[derive(Clone, Debug)]
pub struct HintReader {
    labels: Vec<String>,
    prefix: String,
    exit: SequenceMatcher,
}

impl HintReader {
    pub fn new(labels: Vec<String>, exit_sequences: Vec<Vec<KeyStroke>>) -> Self {
        Self {
            labels,
            prefix: String::new(),
            exit: SequenceMatcher::new(exit_sequences),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn matching(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.starts_with(&self.prefix))
            .map(|(i, _)| i)
            .collect()
    }

    fn pending(&self) -> HintEvent {
        HintEvent::Pending {
            prefix: self.prefix.clone(),
            remaining: self.matching(),
        }
    }

    /// Feed a keystroke.
    pub fn feed(&mut self, stroke: &KeyStroke) -> HintEvent {
        if stroke.is_modifier() {
            return self.pending();
        }
        if self.exit.feed(stroke) {
            self.prefix.clear();
            return HintEvent::Cancelled;
        }
        if stroke.key == "Backspace" {
            self.prefix.pop();
            return self.pending();
        }

        let Some(ch) = stroke.as_char() else {
            return self.pending();
        };
        self.prefix.extend(ch.to_lowercase());

        if let Some(index) = self.labels.iter().position(|l| *l == self.prefix) {
            self.prefix.clear();
            return HintEvent::Selected(index);
        }
        if self.matching().is_empty() {
            self.prefix.clear();
            return HintEvent::NoMatch;
        }
        self.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse;

    fn reader(count: usize) -> HintReader {
        HintReader::new(
            labels("asdf", count),
            vec![parse("Escape").unwrap(), parse("Ctrl-g").unwrap()],
        )
    }

    #[test]
    fn test_single_letter_labels() {
        assert_eq!(labels("asdf", 3), vec!["a", "s", "d"]);
    }

    #[test]
    fn test_label_length_grows_with_count() {
        let generated = labels("ab", 5);
        assert_eq!(generated, vec!["aaa", "aab", "aba", "abb", "baa"]);
        assert!(labels("asdf", 16).iter().all(|l| l.len() == 2));
        assert_eq!(labels("asdf", 17)[0].len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(labels("", 4).is_empty());
        assert!(labels("abc", 0).is_empty());
    }

    #[test]
    fn test_select_two_letter_label() {
        let mut reader = reader(6);
        assert_eq!(reader.labels()[4], "sa");
        match reader.feed(&KeyStroke::plain("s")) {
            HintEvent::Pending { prefix, remaining } => {
                assert_eq!(prefix, "s");
                assert_eq!(remaining, vec![4, 5]);
            }
            other => panic!("expected pending, got {other:?}"),
        }
        assert_eq!(reader.feed(&KeyStroke::plain("a")), HintEvent::Selected(4));
    }

    #[test]
    fn test_uppercase_input_matches() {
        let mut reader = reader(3);
        assert_eq!(reader.feed(&KeyStroke::plain("D")), HintEvent::Selected(2));
    }

    #[test]
    fn test_no_match_resets() {
        let mut reader = reader(6);
        assert_eq!(reader.feed(&KeyStroke::plain("x")), HintEvent::NoMatch);
        assert_eq!(reader.prefix(), "");
    }

    #[test]
    fn test_cancel_sequences() {
        let mut reader = reader(6);
        reader.feed(&KeyStroke::plain("s"));
        assert_eq!(reader.feed(&KeyStroke::plain("Escape")), HintEvent::Cancelled);
        assert_eq!(
            reader.feed(&KeyStroke::from_parts("g", true, false, false, false)),
            HintEvent::Cancelled
        );
    }

    #[test]
    fn test_backspace_shortens_prefix() {
        let mut reader = reader(6);
        reader.feed(&KeyStroke::plain("s"));
        reader.feed(&KeyStroke::plain("Backspace"));
        assert_eq!(reader.prefix(), "");
    }
}
