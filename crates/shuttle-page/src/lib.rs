//! Page-context half of shuttle.
//!
//! Injected into the host page so it can reach editor objects the extension's
//! isolated world cannot see. It listens for bridge messages addressed to the
//! page, attaches the matching adapter and answers on the same channel.

mod adapters;
mod js;
mod listener;
mod logging;

pub use adapters::{Adapter, Ace, CkEditor4, CkEditor5, CodeMirror5, CodeMirror6, Monaco, MonacoStrategy};

use wasm_bindgen::prelude::*;

#[cfg_attr(not(test), wasm_bindgen(start))]
pub fn start() {
    logging::init();
    if let Err(e) = listener::install() {
        tracing::error!("bridge listener not installed: {e}");
    }
}
