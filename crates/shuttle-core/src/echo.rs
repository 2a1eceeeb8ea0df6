//! Echo suppression.
//!
//! A change applied on behalf of the remote side must not be reported back
//! as a local edit. Instead of a flag toggled around the write, each write
//! holds an `OriginToken`; change notifications observed while any token is
//! alive are attributed to the bridge and dropped. Tokens nest, so a write
//! that triggers another write stays suppressed until the outermost guard
//! drops, and the counter cannot be left stuck by an early return.

use std::cell::Cell;
use std::rc::Rc;

/// Who caused an observed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The user edited the page.
    Local,
    /// A write issued through the bridge; carries that write's sequence number.
    Bridge(u64),
}

#[derive(Debug, Default)]
struct State {
    depth: Cell<usize>,
    next_seq: Cell<u64>,
    current: Cell<Option<u64>>,
}

#[derive(Clone, Debug, Default)]
pub struct EchoSuppressor {
    state: Rc<State>,
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a bridge-originated write.
    #[must_use = "suppression ends when the token is dropped"]
    pub fn begin(&self) -> OriginToken {
        let seq = self.state.next_seq.get();
        self.state.next_seq.set(seq.wrapping_add(1));
        let previous = self.state.current.replace(Some(seq));
        self.state.depth.set(self.state.depth.get() + 1);
        OriginToken {
            state: self.state.clone(),
            seq,
            previous,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.state.depth.get() > 0
    }

    /// Attribute a change observed right now.
    pub fn classify(&self) -> ChangeOrigin {
        match self.state.current.get() {
            Some(seq) if self.is_suppressed() => ChangeOrigin::Bridge(seq),
            _ => ChangeOrigin::Local,
        }
    }

    /// Run `f` with suppression held.
    pub fn suppress<R>(&self, f: impl FnOnce() -> R) -> R {
        let _token = self.begin();
        f()
    }
}

/// RAII guard returned by [`EchoSuppressor::begin`].
#[derive(Debug)]
pub struct OriginToken {
    state: Rc<State>,
    seq: u64,
    previous: Option<u64>,
}

impl OriginToken {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for OriginToken {
    fn drop(&mut self) {
        self.state.depth.set(self.state.depth.get().saturating_sub(1));
        self.state.current.set(self.previous);
    }
}
