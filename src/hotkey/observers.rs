//! Per-binding multicast channel
//!
//! Each registered hotkey owns an [`Observers`] list. Subscribers are called
//! in subscription order; closing the list drops every subscriber so that
//! long-lived observers terminate with the binding.

use std::cell::RefCell;
use std::rc::Rc;

/// Identifies a subscriber within one [`Observers`] list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct ObserverList<T> {
    next_id: u64,
    closed: bool,
    subscribers: Vec<(ObserverId, Rc<dyn Fn(&T)>)>,
}

/// An ordered list of callbacks notified with a shared value
pub struct Observers<T> {
    inner: RefCell<ObserverList<T>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(ObserverList {
                next_id: 0,
                closed: false,
                subscribers: Vec::new(),
            }),
        }
    }

    /// A list that is closed from the start and never notifies anyone
    pub fn closed() -> Self {
        let observers = Self::new();
        observers.close();
        observers
    }

    /// Add a subscriber. Subscribing to a closed list is a no-op.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ObserverId {
        let mut inner = self.inner.borrow_mut();
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        if !inner.closed {
            inner.subscribers.push((id, Rc::new(callback)));
        }
        id
    }

    /// Remove a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Call every subscriber with `value`. Returns how many were called.
    pub fn notify(&self, value: &T) -> usize {
        let subscribers: Vec<Rc<dyn Fn(&T)>> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for callback in &subscribers {
            callback(value);
        }
        subscribers.len()
    }

    /// Drop all subscribers and refuse new ones
    pub fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.closed = true;
        inner.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}
