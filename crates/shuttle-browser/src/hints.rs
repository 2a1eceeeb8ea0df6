//! Letter-hint overlay for picking one of several candidates.
//!
//! Labels are positioned against the current scroll offset, so a scroll
//! during a read tears the overlay down, waits for scrolling to settle and
//! starts over. Restarts are bounded by `maxHintRetries`.

use std::cell::Cell;
use std::pin::pin;

use futures_util::future::{Either, select};
use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo_timers::future::TimeoutFuture;
use tokio::sync::mpsc;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, KeyboardEvent};

use shuttle_core::{HintEvent, HintReader, KeyStroke, Result, Settings, SyncError, labels};

use crate::discovery::Candidate;
use crate::dom::{client_rect, js_err};

const OVERLAY_STYLE: &str = "position: fixed; inset: 0; pointer-events: none; z-index: 2147483647;";
const LABEL_STYLE: &str = "position: fixed; padding: 1px 3px; font: bold 12px monospace; \
     color: #000; background: #ffd76e; border: 1px solid #c38a22; border-radius: 3px;";

/// Guards against concurrent reads in one frame.
#[derive(Debug, Default)]
pub struct HintSlot {
    active: Cell<bool>,
}

struct SlotGuard<'a>(&'a HintSlot);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.active.set(false);
    }
}

impl HintSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    fn claim(&self) -> Result<SlotGuard<'_>> {
        if self.active.replace(true) {
            return Err(SyncError::HintBusy);
        }
        Ok(SlotGuard(self))
    }
}

enum Input {
    Key(KeyStroke),
    Scroll,
}

struct Overlay {
    root: Element,
    labels: Vec<Element>,
}

impl Overlay {
    fn show(document: &Document, candidates: &[Candidate], labels: &[String]) -> Result<Self> {
        let root = document.create_element("div").map_err(js_err)?;
        root.set_attribute("style", OVERLAY_STYLE).map_err(js_err)?;
        let mut nodes = Vec::with_capacity(labels.len());
        for (candidate, label) in candidates.iter().zip(labels) {
            let rect = client_rect(&candidate.area);
            let node = document.create_element("span").map_err(js_err)?;
            node.set_attribute(
                "style",
                &format!("{LABEL_STYLE} left: {}px; top: {}px;", rect.left.max(0.0), rect.top.max(0.0)),
            )
            .map_err(js_err)?;
            node.set_text_content(Some(label.as_str()));
            root.append_child(&node).map_err(js_err)?;
            nodes.push(node);
        }
        let body = document.body().ok_or(SyncError::Js("document has no body".into()))?;
        body.append_child(&root).map_err(js_err)?;
        Ok(Self {
            root,
            labels: nodes,
        })
    }

    /// Hide labels that no longer match the typed prefix.
    fn filter(&self, remaining: &[usize]) {
        for (i, node) in self.labels.iter().enumerate() {
            if let Some(node) = node.dyn_ref::<HtmlElement>() {
                let display = if remaining.contains(&i) { "" } else { "none" };
                let _ = node.style().set_property("display", display);
            }
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.root.remove();
    }
}

/// Wait until no scroll event has arrived for `debounce_ms`.
async fn settle(rx: &mut mpsc::UnboundedReceiver<Input>, debounce_ms: u32) {
    loop {
        let timeout = pin!(TimeoutFuture::new(debounce_ms));
        let next = pin!(rx.recv());
        match select(next, timeout).await {
            Either::Left((Some(_), _)) => continue,
            Either::Left((None, _)) | Either::Right(_) => return,
        }
    }
}

/// Show hints over `candidates` and resolve to the one the user types.
///
/// `Ok(None)` on cancel or when the retry bound is exhausted.
pub async fn read_hint(
    slot: &HintSlot,
    document: &Document,
    candidates: &[Candidate],
    settings: &Settings,
) -> Result<Option<Element>> {
    let _guard = slot.claim()?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let names = labels(&settings.hint_alphabet, candidates.len());
    let exit = settings.exit_keys()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _keys = {
        let tx = tx.clone();
        EventListener::new_with_options(
            document,
            "keydown",
            EventListenerOptions {
                phase: EventListenerPhase::Capture,
                passive: false,
            },
            move |event| {
                let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                event.prevent_default();
                event.stop_propagation();
                let stroke = KeyStroke::from_parts(
                    key.key(),
                    key.ctrl_key(),
                    key.shift_key(),
                    key.meta_key(),
                    key.alt_key(),
                );
                let _ = tx.send(Input::Key(stroke));
            },
        )
    };
    let _scroll = EventListener::new_with_options(
        document,
        "scroll",
        EventListenerOptions::run_in_capture_phase(),
        move |_| {
            let _ = tx.send(Input::Scroll);
        },
    );

    let mut attempts = 0;
    'read: loop {
        if attempts > settings.max_hint_retries {
            tracing::warn!(attempts, "page kept scrolling, giving up on hint read");
            return Ok(None);
        }
        attempts += 1;

        let overlay = Overlay::show(document, candidates, &names)?;
        let mut reader = HintReader::new(names.clone(), exit.clone());
        while let Some(input) = rx.recv().await {
            match input {
                Input::Scroll => {
                    drop(overlay);
                    settle(&mut rx, settings.scroll_debounce_ms).await;
                    continue 'read;
                }
                Input::Key(stroke) => match reader.feed(&stroke) {
                    HintEvent::Pending { remaining, .. } => overlay.filter(&remaining),
                    HintEvent::NoMatch => overlay.filter(&(0..names.len()).collect::<Vec<_>>()),
                    HintEvent::Selected(index) => {
                        return Ok(candidates.get(index).map(|c| c.elem.clone()));
                    }
                    HintEvent::Cancelled => return Ok(None),
                },
            }
        }
        return Ok(None);
    }
}
