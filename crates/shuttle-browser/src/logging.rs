//! Console logging for the content script.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the panic hook and the tracing subscriber. Safe to call repeatedly.
pub fn init() {
    INIT.call_once(|| {
        console_error_panic_hook::set_once();

        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    });
}
