//! Synthetic click on the element best matching a `ClickRequest`.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MouseEvent, MouseEventInit};

use shuttle_core::{ClickRequest, Result, best_match};

use crate::dom::js_err;

fn visible_text(elem: &Element) -> String {
    match elem.dyn_ref::<HtmlElement>() {
        Some(html) => html.inner_text(),
        None => elem.text_content().unwrap_or_default(),
    }
}

/// Click the best match for `request`; returns whether anything was clicked.
pub fn simulate_click(document: &Document, request: &ClickRequest) -> Result<bool> {
    let list = document
        .query_selector_all(&request.selector_list())
        .map_err(js_err)?;
    let elems: Vec<Element> = (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect();
    let texts: Vec<String> = elems.iter().map(visible_text).collect();

    let Some(index) = best_match(&texts, &request.fragments()) else {
        tracing::debug!(selector = %request.selector_list(), "no click target");
        return Ok(false);
    };
    let target = &elems[index];

    for kind in ["mousedown", "mouseup", "click"] {
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_button(0);
        let event = MouseEvent::new_with_mouse_event_init_dict(kind, &init).map_err(js_err)?;
        target.dispatch_event(&event).map_err(js_err)?;
    }
    Ok(true)
}
