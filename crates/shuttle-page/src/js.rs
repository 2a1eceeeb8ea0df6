//! Reflection helpers for duck-typed access to page objects.

use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

use shuttle_core::{PageRect, Result, SyncError};

pub fn js_err(err: JsValue) -> SyncError {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return SyncError::Js(String::from(e.message()));
    }
    SyncError::Js(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

pub fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

/// `target[key]`, or `None` when missing or when the getter throws.
pub fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    if !is_present(target) {
        return None;
    }
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(is_present)
}

pub fn path(target: &JsValue, keys: &[&str]) -> Option<JsValue> {
    keys.iter()
        .try_fold(target.clone(), |value, key| get(&value, key))
}

pub fn global(name: &str) -> Option<JsValue> {
    get(&js_sys::global(), name)
}

pub fn has_method(target: &JsValue, name: &str) -> bool {
    get(target, name).is_some_and(|f| f.is_function())
}

/// Call `target[name](...args)` with `target` as `this`.
pub fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue> {
    let func: Function = get(target, name)
        .and_then(|f| f.dyn_into().ok())
        .ok_or_else(|| SyncError::BridgeUnavailable(format!("{name} is not a function")))?;
    let args: Array = args.iter().cloned().collect();
    Reflect::apply(&func, target, &args).map_err(js_err)
}

pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| SyncError::Protocol(e.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| SyncError::Protocol(e.to_string()))
}

/// Bounding box of `elem` translated through reachable parent frames.
pub fn page_rect(elem: &Element) -> PageRect {
    let r = elem.get_bounding_client_rect();
    let mut rect = PageRect::new(r.x(), r.y(), r.width(), r.height());
    let mut win = elem.owner_document().and_then(|d| d.default_view());
    while let Some(w) = win {
        let Ok(Some(frame)) = w.frame_element() else {
            break;
        };
        let outer = frame.get_bounding_client_rect();
        rect = rect.translate(outer.x(), outer.y());
        win = frame.owner_document().and_then(|d| d.default_view());
    }
    rect
}
