//! shuttle-core: editor-agnostic synchronization logic.
//!
//! This crate provides:
//! - The uniform text model shared by every handler (`TextState`, `LoadedState`)
//! - `diff`: minimal change ranges for editors that key state to offsets
//! - `keys` / `hints`: key-sequence parsing and hint label matching
//! - `content`: content-editable serialization over an abstract node tree
//! - `selector`: first-match handler selection over an abstract element probe
//! - `bridge` / `transport`: message contracts for the injected script and the
//!   external process
//! - `echo`: origin tokens that keep externally applied changes from echoing back
//!
//! Nothing here touches the DOM; `shuttle-browser` and `shuttle-page` provide the
//! `wasm32` implementations.

pub mod bridge;
pub mod click;
pub mod content;
pub mod diff;
pub mod echo;
pub mod error;
pub mod hints;
pub mod keys;
pub mod language;
pub mod selector;
pub mod settings;
pub mod text;
pub mod transport;
pub mod types;

pub use bridge::{
    BridgeFilter, BridgeMessage, Direction, Envelope, InitializePayload, InjectionSession,
    MessageKind, ReadyPayload, SetValuePayload,
};
pub use click::{ClickRequest, best_match};
pub use content::{ContentNode, NodeKind, extract_text, render_html};
pub use diff::{DiffChange, DiffOptions, apply_changes, compute_changes};
pub use echo::{ChangeOrigin, EchoSuppressor, OriginToken};
pub use error::{Result, SyncError};
pub use hints::{HintEvent, HintReader, labels};
pub use keys::{KeyStroke, SequenceMatcher};
pub use language::extension_for;
pub use selector::{ElementProbe, HandlerKind, closest, hint_area, select_handler};
pub use settings::Settings;
pub use smol_str::SmolStr;
pub use text::{clamp_selection, offset_at, position_at, utf16_len};
pub use transport::{CloseInfo, RegisterPayload, TransportMessage, close_message};
pub use types::{
    Extension, LoadedState, OneOrMany, PageRect, Position, SelectionRange, SetValueOptions,
    TextState,
};
