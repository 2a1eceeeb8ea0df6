//! Dismissible on-page error banner.

use gloo_events::EventListener;
use web_sys::Document;

use shuttle_core::{Result, SyncError};

use crate::dom::js_err;

const BANNER_ID: &str = "shuttle-banner";
const BANNER_STYLE: &str = "position: fixed; top: 0; left: 0; right: 0; z-index: 2147483647; \
     padding: 6px 12px; font: 13px sans-serif; color: #fff; background: #b3261e;";
const CLOSE_STYLE: &str = "float: right; cursor: pointer; margin-left: 12px;";

/// Show `text` in the page banner, replacing any banner already shown.
pub fn show(document: &Document, text: &str) -> Result<()> {
    if let Some(old) = document.get_element_by_id(BANNER_ID) {
        old.remove();
    }

    let banner = document.create_element("div").map_err(js_err)?;
    banner.set_id(BANNER_ID);
    banner.set_attribute("role", "alert").map_err(js_err)?;
    banner.set_attribute("style", BANNER_STYLE).map_err(js_err)?;

    let close = document.create_element("span").map_err(js_err)?;
    close.set_attribute("style", CLOSE_STYLE).map_err(js_err)?;
    close.set_text_content(Some("\u{2715}"));
    {
        let banner = banner.clone();
        EventListener::once(&close, "click", move |_| banner.remove()).forget();
    }
    banner.append_child(&close).map_err(js_err)?;

    let message = document.create_element("span").map_err(js_err)?;
    message.set_text_content(Some(text));
    banner.append_child(&message).map_err(js_err)?;

    let body = document
        .body()
        .ok_or(SyncError::Js("document has no body".into()))?;
    body.append_child(&banner).map_err(js_err)?;
    tracing::info!("banner: {text}");
    Ok(())
}
