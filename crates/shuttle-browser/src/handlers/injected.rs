//! Proxy handler for editors only reachable from the page's own realm.

use web_sys::Element;

use shuttle_core::{
    HandlerKind, InjectionSession, LoadedState, Position, Result, SetValueOptions, TextState,
};

use super::HandlerContext;
use super::base::{ChangeCallback, HandlerBase};
use crate::bridge::PageBridge;
use crate::dom::{page_rect, random_uuid, shadow_hosts, unique_selector};

pub struct InjectedHandler {
    base: HandlerBase,
    kind: HandlerKind,
    bridge: PageBridge,
    ctx: HandlerContext,
}

impl InjectedHandler {
    pub fn new(kind: HandlerKind, elem: Element, ctx: HandlerContext) -> Result<Self> {
        let session = InjectionSession::new(random_uuid()?, kind, unique_selector(&elem))
            .within(shadow_hosts(&elem));
        tracing::debug!(uuid = %session.uuid, kind = %kind, selector = %session.selector, "new injected handler");
        Ok(Self {
            bridge: PageBridge::new(session)?,
            base: HandlerBase::new(elem),
            kind,
            ctx,
        })
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn base(&self) -> &HandlerBase {
        &self.base
    }

    pub fn bridge(&self) -> &PageBridge {
        &self.bridge
    }

    pub async fn load(&self) -> Result<LoadedState> {
        let ready = self
            .bridge
            .connect(&self.ctx.injector, self.ctx.settings.handshake_timeout_ms)
            .await?;
        let state = self.bridge.request_value().await?;
        Ok(LoadedState {
            state: state.with_position(Position::new(ready.line_number, ready.column)),
            extension: ready.extension,
            rect: ready.rect.or_else(|| Some(page_rect(self.base.elem()))),
        })
    }

    pub async fn get_value(&self) -> Result<TextState> {
        self.bridge.request_value().await
    }

    pub fn set_value(&self, text: &str, opts: &SetValueOptions) -> Result<()> {
        self.bridge.set_value(text, opts)?;
        self.base.emit_value_set(opts);
        Ok(())
    }

    pub fn bind_change(&self, callback: ChangeCallback) {
        self.base.add_callback(callback);
        self.bridge.on_change(Some(self.base.notifier()));
    }

    /// Unsubscribe; the last unsubscribe unloads the page-side adapter.
    pub fn unbind_change(&self, callback: &ChangeCallback) {
        if self.base.remove_callback(callback) {
            self.bridge.on_change(None);
            self.bridge.unload();
        }
    }
}

impl Drop for InjectedHandler {
    fn drop(&mut self) {
        if self.ctx.injector.is_injected() {
            self.bridge.unload();
        }
    }
}

