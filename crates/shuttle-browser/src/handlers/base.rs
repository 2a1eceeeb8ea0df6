//! Defaults shared by every handler variant.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use web_sys::{Element, Event, EventInit};

use shuttle_core::{EchoSuppressor, Result, SetValueOptions};

use crate::dom::js_err;

/// Called whenever the user edits the bound element.
pub type ChangeCallback = Rc<dyn Fn()>;

/// Observer of `set_value` calls.
pub type ValueSetHook = Rc<dyn Fn(&SetValueOptions)>;

/// Element ownership, change subscribers and echo suppression.
pub struct HandlerBase {
    elem: Element,
    callbacks: Rc<RefCell<Vec<ChangeCallback>>>,
    listeners: RefCell<Vec<EventListener>>,
    value_set: RefCell<Vec<ValueSetHook>>,
    echo: EchoSuppressor,
}

impl HandlerBase {
    pub fn new(elem: Element) -> Self {
        Self {
            elem,
            callbacks: Rc::default(),
            listeners: RefCell::default(),
            value_set: RefCell::default(),
            echo: EchoSuppressor::new(),
        }
    }

    pub fn elem(&self) -> &Element {
        &self.elem
    }

    pub fn echo(&self) -> &EchoSuppressor {
        &self.echo
    }

    pub fn add_callback(&self, callback: ChangeCallback) {
        self.callbacks.borrow_mut().push(callback);
    }

    /// Remove `callback`; returns true when no subscriber is left.
    pub fn remove_callback(&self, callback: &ChangeCallback) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        callbacks.retain(|cb| !Rc::ptr_eq(cb, callback));
        callbacks.is_empty()
    }

    /// A closure fanning one native notification out to every subscriber,
    /// unless it was caused by our own write.
    pub fn notifier(&self) -> Rc<dyn Fn()> {
        let callbacks = self.callbacks.clone();
        let echo = self.echo.clone();
        Rc::new(move || {
            if echo.is_suppressed() {
                tracing::trace!("dropping change caused by set_value");
                return;
            }
            // Subscribers may unbind from inside the callback.
            let snapshot: Vec<_> = callbacks.borrow().clone();
            for cb in snapshot {
                cb();
            }
        })
    }

    /// Subscribe `callback`, listening for `events` on the element.
    pub fn bind_native(&self, callback: ChangeCallback, events: &[&'static str]) {
        self.add_callback(callback);
        let mut listeners = self.listeners.borrow_mut();
        if !listeners.is_empty() {
            return;
        }
        for event in events {
            let notify = self.notifier();
            listeners.push(EventListener::new(&self.elem, *event, move |_| notify()));
        }
    }

    pub fn unbind_native(&self, callback: &ChangeCallback) {
        if self.remove_callback(callback) {
            self.listeners.borrow_mut().clear();
        }
    }

    pub fn on_value_set(&self, hook: ValueSetHook) {
        self.value_set.borrow_mut().push(hook);
    }

    pub fn emit_value_set(&self, opts: &SetValueOptions) {
        let hooks: Vec<_> = self.value_set.borrow().clone();
        for hook in hooks {
            hook(opts);
        }
    }

    /// Dispatch a bubbling `input` event so page scripts see the new value.
    pub fn dispatch_input(&self, opts: &SetValueOptions) -> Result<()> {
        if !opts.trigger_dom_event {
            return Ok(());
        }
        let init = EventInit::new();
        init.set_bubbles(true);
        let event = Event::new_with_event_init_dict("input", &init).map_err(js_err)?;
        self.elem.dispatch_event(&event).map_err(js_err)?;
        Ok(())
    }
}
