//! Global dispatch callbacks
//!
//! Every successful chord dispatch is reported to all callbacks registered
//! here, in registration order, before the binding's own subscribers run.
//! Sequence matches are not reported on the bus.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::source::{KeyEvent, Target};

/// Callback receiving `(event, identity, target)` for each chord dispatch
pub type DispatchCallback = Rc<dyn Fn(&KeyEvent, &str, Target)>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    callbacks: Vec<(u64, DispatchCallback)>,
}

/// Ordered list of global dispatch observers
#[derive(Clone, Default)]
pub struct CallbackBus {
    inner: Rc<RefCell<BusInner>>,
}

impl CallbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; the returned handle removes it again
    pub fn subscribe(&self, callback: impl Fn(&KeyEvent, &str, Target) + 'static) -> Unsubscribe {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.push((id, Rc::new(callback)));

        Unsubscribe {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Invoke every callback synchronously, in registration order
    pub(crate) fn notify(&self, event: &KeyEvent, identity: &str, target: Target) {
        let callbacks: Vec<DispatchCallback> = self
            .inner
            .borrow()
            .callbacks
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event, identity, target);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().callbacks.clear();
    }
}

/// Handle that removes one callback from its bus
#[must_use = "dropping the handle keeps the callback registered"]
pub struct Unsubscribe {
    bus: Weak<RefCell<BusInner>>,
    id: u64,
}

impl Unsubscribe {
    /// Remove the callback. Has no effect if the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}
