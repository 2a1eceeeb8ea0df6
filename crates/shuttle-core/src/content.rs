//! Content-editable serialization.
//!
//! `extract_text` walks a node tree and produces plain text:
//! - text nodes are kept verbatim
//! - `<div>` children start a new line and recurse
//! - `<br>` is a newline unless it is the last child of its parent
//! - any other element falls back to its outer HTML so nothing is lost
//!
//! `render_html` is the inverse used by `setValue`: one `<div>` per line,
//! escaped, with empty lines rendered as `<div><br></div>`.

use pulldown_cmark_escape::escape_html;

/// What a node is, as far as serialization cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    /// Element with an uppercase tag name.
    Element(String),
    /// Comments, processing instructions and the like.
    Other,
}

/// Read-only view of a DOM node.
pub trait ContentNode: Sized {
    fn kind(&self) -> NodeKind;
    fn children(&self) -> Vec<Self>;
    fn outer_html(&self) -> String;
}

#[derive(Default)]
struct Extractor {
    out: String,
    /// A block just ended; the next content starts on a new line.
    pending_break: bool,
}

impl Extractor {
    fn flush_break(&mut self) {
        if self.pending_break {
            self.out.push('\n');
            self.pending_break = false;
        }
    }

    fn walk<N: ContentNode>(&mut self, children: &[N]) {
        let last = children.len().saturating_sub(1);
        for (i, child) in children.iter().enumerate() {
            match child.kind() {
                NodeKind::Text(text) => {
                    if !text.is_empty() {
                        self.flush_break();
                        self.out.push_str(&text);
                    }
                }
                NodeKind::Element(tag) if tag == "DIV" => {
                    if self.pending_break || (!self.out.is_empty() && !self.out.ends_with('\n')) {
                        self.out.push('\n');
                    }
                    self.pending_break = false;
                    self.walk(&child.children());
                    self.pending_break = true;
                }
                NodeKind::Element(tag) if tag == "BR" => {
                    if i != last {
                        self.flush_break();
                        self.out.push('\n');
                    }
                }
                NodeKind::Element(_) => {
                    self.flush_break();
                    self.out.push_str(&child.outer_html());
                }
                NodeKind::Other => {}
            }
        }
    }
}

/// Serialize the children of `root` to plain text.
pub fn extract_text<N: ContentNode>(root: &N) -> String {
    let mut extractor = Extractor::default();
    extractor.walk(&root.children());
    extractor.out
}

/// Render text as one `<div>` per line.
pub fn render_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.split('\n') {
        out.push_str("<div>");
        if line.is_empty() {
            out.push_str("<br>");
        } else {
            // Writing into a String cannot fail.
            let _ = escape_html(&mut out, line);
        }
        out.push_str("</div>");
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal in-memory node for tests.
    #[derive(Clone, Debug)]
    pub(crate) enum FakeNode {
        Text(String),
        Element(String, Vec<FakeNode>),
    }

    pub(crate) fn text(s: &str) -> FakeNode {
        FakeNode::Text(s.to_string())
    }

    pub(crate) fn el(tag: &str, children: Vec<FakeNode>) -> FakeNode {
        FakeNode::Element(tag.to_uppercase(), children)
    }

    impl ContentNode for FakeNode {
        fn kind(&self) -> NodeKind {
            match self {
                FakeNode::Text(t) => NodeKind::Text(t.clone()),
                FakeNode::Element(tag, _) => NodeKind::Element(tag.clone()),
            }
        }

        fn children(&self) -> Vec<Self> {
            match self {
                FakeNode::Text(_) => Vec::new(),
                FakeNode::Element(_, children) => children.clone(),
            }
        }

        fn outer_html(&self) -> String {
            match self {
                FakeNode::Text(t) => t.clone(),
                FakeNode::Element(tag, children) => {
                    let tag = tag.to_lowercase();
                    let inner: String = children.iter().map(|c| c.outer_html()).collect();
                    format!("<{tag}>{inner}</{tag}>")
                }
            }
        }
    }

    /// Parse the subset of HTML `render_html` emits.
    fn parse_rendered(html: &str) -> FakeNode {
        let mut lines = Vec::new();
        for chunk in html.split("</div>").filter(|c| !c.is_empty()) {
            let body = chunk.trim_start_matches("<div>");
            if body == "<br>" {
                lines.push(el("div", vec![el("br", vec![])]));
            } else {
                let unescaped = body
                    .replace("&lt;", "<")
                    .replace("&gt;", ">")
                    .replace("&quot;", "\"")
                    .replace("&amp;", "&");
                lines.push(el("div", vec![text(&unescaped)]));
            }
        }
        el("div", lines)
    }

    #[test]
    fn test_plain_text_verbatim() {
        let root = el("div", vec![text("hello world")]);
        assert_eq!(extract_text(&root), "hello world");
    }

    #[test]
    fn test_divs_are_lines() {
        let root = el(
            "div",
            vec![
                el("div", vec![text("a")]),
                el("div", vec![el("br", vec![])]),
                el("div", vec![text("b")]),
            ],
        );
        assert_eq!(extract_text(&root), "a\n\nb");
    }

    #[test]
    fn test_leading_text_then_div() {
        let root = el("div", vec![text("a"), el("div", vec![text("b")]), text("c")]);
        assert_eq!(extract_text(&root), "a\nb\nc");
    }

    #[test]
    fn test_br_last_child_ignored() {
        let root = el("div", vec![text("x"), el("br", vec![]), text("y"), el("br", vec![])]);
        assert_eq!(extract_text(&root), "x\ny");
    }

    #[test]
    fn test_unknown_element_keeps_markup() {
        let root = el("div", vec![text("a "), el("b", vec![text("bold")])]);
        assert_eq!(extract_text(&root), "a <b>bold</b>");
    }

    #[test]
    fn test_render_escapes_and_marks_empty_lines() {
        assert_eq!(
            render_html("a<b\n\nc"),
            "<div>a&lt;b</div><div><br></div><div>c</div>"
        );
    }

    #[test]
    fn test_render_extract_roundtrip() {
        for text in ["one", "a\nb", "a\n", "\nlead", "x\n\n\ny", "", "<&>\n\"q\""] {
            let root = parse_rendered(&render_html(text));
            assert_eq!(extract_text(&root), text, "roundtrip of {text:?}");
        }
    }
}
