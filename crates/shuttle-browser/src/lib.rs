//! Content-script side of shuttle.
//!
//! This crate drives editors from the extension's isolated context and talks
//! to the external editor process. It assumes a `wasm32-unknown-unknown`
//! target environment.
//!
//! # Architecture
//!
//! - `handlers`: the uniform handler contract and its three variants
//!   (plain field, content-editable, injected proxy)
//! - `bridge`: postMessage client for the injected page script
//! - `discovery` / `hints`: candidate enumeration and the letter-hint picker
//! - `transport`: WebSocket link to the external process
//! - `orchestrator`: one sync session from element choice to teardown
//!
//! # Re-exports
//!
//! This crate re-exports `shuttle-core` for convenience.

pub use shuttle_core;
pub use shuttle_core::*;

pub mod banner;
pub mod bridge;
pub mod click;
pub mod discovery;
pub mod dom;
pub mod handlers;
pub mod hints;
pub mod logging;
pub mod orchestrator;
pub mod transport;

pub use bridge::{PageBridge, ScriptInjector};
pub use handlers::{
    ChangeCallback, ContentEditableHandler, Handler, HandlerContext, InjectedHandler,
    TextareaHandler,
};
pub use orchestrator::Orchestrator;
pub use transport::SocketTransport;
