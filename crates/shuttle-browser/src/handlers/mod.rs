//! The uniform handler contract.
//!
//! `Handler` is a closed set of variants sharing `HandlerBase` by
//! composition. Plain fields and content-editable regions are driven
//! directly; every rich editor goes through `InjectedHandler`, which is
//! parameterized by `HandlerKind` and talks to the matching in-page adapter.

mod base;
mod content_editable;
mod injected;
mod textarea;

use std::rc::Rc;

use web_sys::Element;

use shuttle_core::{
    HandlerKind, LoadedState, Result, SetValueOptions, Settings, TextState, select_handler,
};

pub use base::{ChangeCallback, HandlerBase, ValueSetHook};
pub use content_editable::ContentEditableHandler;
pub use injected::InjectedHandler;
pub use textarea::TextareaHandler;

use crate::bridge::ScriptInjector;
use crate::dom::DomElement;

/// Per-document state handed to every handler the orchestrator creates.
#[derive(Clone)]
pub struct HandlerContext {
    pub settings: Rc<Settings>,
    pub injector: Rc<ScriptInjector>,
}

impl HandlerContext {
    pub fn new(settings: Rc<Settings>) -> Self {
        let injector = Rc::new(ScriptInjector::new(settings.page_script_url.clone()));
        Self { settings, injector }
    }
}

pub enum Handler {
    Textarea(TextareaHandler),
    ContentEditable(ContentEditableHandler),
    Injected(InjectedHandler),
}

impl Handler {
    /// Build the highest-priority handler claiming `elem`.
    pub fn make(elem: Element, ctx: &HandlerContext) -> Result<Self> {
        let kind = select_handler(&DomElement(elem.clone()))?;
        tracing::debug!(%kind, "selected handler");
        Ok(match kind {
            kind if kind.is_injected() => {
                Handler::Injected(InjectedHandler::new(kind, elem, ctx.clone())?)
            }
            HandlerKind::Textarea => Handler::Textarea(TextareaHandler::new(elem)?),
            _ => Handler::ContentEditable(ContentEditableHandler::new(elem)),
        })
    }

    /// Whether any handler claims `elem`.
    pub fn can_handle(elem: &Element) -> bool {
        select_handler(&DomElement(elem.clone())).is_ok()
    }

    /// The element to highlight when offering `elem` for selection.
    pub fn hint_area(elem: &Element) -> Option<Element> {
        shuttle_core::hint_area(&DomElement(elem.clone())).map(|DomElement(e)| e)
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Textarea(_) => HandlerKind::Textarea,
            Handler::ContentEditable(_) => HandlerKind::ContentEditable,
            Handler::Injected(h) => h.kind(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn base(&self) -> &HandlerBase {
        match self {
            Handler::Textarea(h) => h.base(),
            Handler::ContentEditable(h) => h.base(),
            Handler::Injected(h) => h.base(),
        }
    }

    pub fn elem(&self) -> &Element {
        self.base().elem()
    }

    pub async fn load(&self) -> Result<LoadedState> {
        match self {
            Handler::Textarea(h) => h.load(),
            Handler::ContentEditable(h) => h.load(),
            Handler::Injected(h) => h.load().await,
        }
    }

    pub async fn get_value(&self) -> Result<TextState> {
        match self {
            Handler::Textarea(h) => Ok(h.get_value()),
            Handler::ContentEditable(h) => Ok(h.get_value()),
            Handler::Injected(h) => h.get_value().await,
        }
    }

    pub fn set_value(&self, text: &str, opts: &SetValueOptions) -> Result<()> {
        match self {
            Handler::Textarea(h) => h.set_value(text, opts),
            Handler::ContentEditable(h) => h.set_value(text, opts),
            Handler::Injected(h) => h.set_value(text, opts),
        }
    }

    pub fn bind_change(&self, callback: ChangeCallback) {
        match self {
            Handler::Textarea(h) => h.bind_change(callback),
            Handler::ContentEditable(h) => h.bind_change(callback),
            Handler::Injected(h) => h.bind_change(callback),
        }
    }

    pub fn unbind_change(&self, callback: &ChangeCallback) {
        match self {
            Handler::Textarea(h) => h.unbind_change(callback),
            Handler::ContentEditable(h) => h.unbind_change(callback),
            Handler::Injected(h) => h.unbind_change(callback),
        }
    }
}
