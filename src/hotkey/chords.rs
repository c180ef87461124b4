//! Single-chord hotkey registry
//!
//! One entry per normalized identity across all targets. Each entry owns a
//! listener on its target and trigger; the listener is detached exactly when
//! the entry leaves the registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use super::binding::{Hotkey, HotkeyError};
use super::bus::CallbackBus;
use super::keys::{normalize_keys, Platform};
use super::observers::{ObserverId, Observers};
use super::source::{EventSource, FocusQuery, KeyEvent, KeyHandler, ListenerId};

struct ChordEntry {
    /// Registration number; also gives the listing order
    id: u64,
    hotkey: Hotkey,
    listener: ListenerId,
    channel: Rc<Observers<KeyEvent>>,
}

#[derive(Default)]
struct ChordTable {
    entries: HashMap<String, ChordEntry>,
    next_id: u64,
}

pub(crate) struct ChordShared {
    table: RefCell<ChordTable>,
    source: Rc<dyn EventSource>,
    focus: Rc<dyn FocusQuery>,
    bus: CallbackBus,
    platform: Platform,
}

impl ChordShared {
    pub(crate) fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    /// Remove `identity`, optionally only if it is still registration `expected`
    fn remove(&self, identity: &str, expected: Option<u64>) -> bool {
        let entry = {
            let mut table = self.table.borrow_mut();
            let current = table
                .entries
                .get(identity)
                .is_some_and(|entry| expected.map_or(true, |id| id == entry.id));
            if current {
                table.entries.remove(identity)
            } else {
                None
            }
        };

        let Some(entry) = entry else {
            return false;
        };

        entry.channel.close();
        self.source.detach(entry.listener);
        debug!(keys = %identity, "shortcut removed");
        true
    }

    fn dispatch(&self, identity: &str, entry_id: u64, event: &KeyEvent) {
        if event.token() != identity {
            return;
        }

        let (hotkey, channel) = {
            let table = self.table.borrow();
            match table.entries.get(identity) {
                Some(entry) if entry.id == entry_id => {
                    (entry.hotkey.clone(), Rc::clone(&entry.channel))
                }
                // Removed while this event was already in flight
                _ => return,
            }
        };

        if let Some(focused) = self.focus.current_focus() {
            if hotkey.excluded_tags().iter().any(|tag| tag.matches(&focused.tag)) {
                trace!(keys = %identity, tag = %focused.tag, "shortcut suppressed by focus");
                return;
            }
        }

        if hotkey.prevent_default {
            event.prevent_default();
        }

        trace!(keys = %identity, target = %hotkey.target, "shortcut dispatched");
        self.bus.notify(event, identity, hotkey.target);
        channel.notify(event);
    }
}

/// Registry of single-chord hotkeys
#[derive(Clone)]
pub struct ChordRegistry {
    shared: Rc<ChordShared>,
}

impl ChordRegistry {
    pub fn new(
        source: Rc<dyn EventSource>,
        focus: Rc<dyn FocusQuery>,
        bus: CallbackBus,
        platform: Platform,
    ) -> Self {
        Self {
            shared: Rc::new(ChordShared {
                table: RefCell::new(ChordTable::default()),
                source,
                focus,
                bus,
                platform,
            }),
        }
    }

    /// Register a chord. A duplicate identity is logged and yields an inert
    /// subscription; the existing binding is left untouched.
    pub fn register(&self, hotkey: Hotkey) -> ChordSubscription {
        match self.try_register(hotkey) {
            Ok(subscription) => subscription,
            Err(err) => {
                error!(%err, "hotkey registration rejected");
                ChordSubscription::inert(err.keys().to_string())
            }
        }
    }

    fn try_register(&self, hotkey: Hotkey) -> Result<ChordSubscription, HotkeyError> {
        let identity = normalize_keys(&hotkey.keys, self.shared.platform);

        let entry_id = {
            let mut table = self.shared.table.borrow_mut();
            if table.entries.contains_key(&identity) {
                return Err(HotkeyError::DuplicateChord { keys: identity });
            }
            let id = table.next_id;
            table.next_id += 1;
            id
        };

        let handler: KeyHandler = {
            let shared = Rc::downgrade(&self.shared);
            let identity = identity.clone();
            Rc::new(move |event: &KeyEvent| {
                if let Some(shared) = shared.upgrade() {
                    shared.dispatch(&identity, entry_id, event);
                }
            })
        };
        let listener = self.shared.source.listen(hotkey.target, hotkey.trigger, handler);
        let channel = Rc::new(Observers::new());

        debug!(
            keys = %identity,
            target = %hotkey.target,
            trigger = %hotkey.trigger,
            "shortcut registered"
        );

        self.shared.table.borrow_mut().entries.insert(
            identity.clone(),
            ChordEntry {
                id: entry_id,
                hotkey,
                listener,
                channel: Rc::clone(&channel),
            },
        );

        Ok(ChordSubscription {
            identity,
            entry_id: Some(entry_id),
            channel,
            registry: Rc::downgrade(&self.shared),
        })
    }

    /// Remove an already-normalized identity. Returns false if it was not bound.
    pub fn remove(&self, identity: &str) -> bool {
        self.shared.remove(identity, None)
    }

    /// Snapshot of the registered hotkeys in registration order
    pub fn hotkeys(&self) -> Vec<Hotkey> {
        let table = self.shared.table.borrow();
        let mut entries: Vec<&ChordEntry> = table.entries.values().collect();
        entries.sort_by_key(|entry| entry.id);
        entries.into_iter().map(|entry| entry.hotkey.clone()).collect()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.shared.table.borrow().entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every chord, detaching all listeners
    pub fn clear(&self) {
        let identities: Vec<String> = self.shared.table.borrow().entries.keys().cloned().collect();
        for identity in identities {
            self.shared.remove(&identity, None);
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ChordShared> {
        Rc::downgrade(&self.shared)
    }
}

/// Handle returned by chord registration.
///
/// The registry owns the listener; this handle can observe dispatched events
/// and cancel the registration. Dropping it does not unregister anything.
pub struct ChordSubscription {
    identity: String,
    entry_id: Option<u64>,
    channel: Rc<Observers<KeyEvent>>,
    registry: Weak<ChordShared>,
}

impl ChordSubscription {
    fn inert(identity: String) -> Self {
        Self {
            identity,
            entry_id: None,
            channel: Rc::new(Observers::closed()),
            registry: Weak::new(),
        }
    }

    /// Normalized identity this handle was registered under
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Observe events dispatched to this binding
    pub fn subscribe(&self, callback: impl Fn(&KeyEvent) + 'static) -> ObserverId {
        self.channel.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.channel.unsubscribe(id)
    }

    /// True once the binding is gone, or if registration was rejected
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Tear down this registration. Idempotent; a later registration of the
    /// same keys is not affected.
    pub fn cancel(&self) {
        if let (Some(entry_id), Some(registry)) = (self.entry_id, self.registry.upgrade()) {
            registry.remove(&self.identity, Some(entry_id));
        }
        self.channel.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::binding::{FocusTag, Trigger};
    use crate::hotkey::source::{FocusTracker, FocusedElement, LocalEventSource, Target};
    use std::cell::Cell;

    struct Fixture {
        source: Rc<LocalEventSource>,
        focus: FocusTracker,
        bus: CallbackBus,
        registry: ChordRegistry,
    }

    fn fixture() -> Fixture {
        let source = Rc::new(LocalEventSource::new());
        let focus = FocusTracker::new();
        let bus = CallbackBus::new();
        let registry = ChordRegistry::new(
            source.clone(),
            Rc::new(focus.clone()),
            bus.clone(),
            Platform::Pc,
        );
        Fixture {
            source,
            focus,
            bus,
            registry,
        }
    }

    fn press(source: &LocalEventSource, descriptor: &str) -> KeyEvent {
        let event = KeyEvent::parse(descriptor, Platform::Pc);
        source.emit(Target::DOCUMENT, Trigger::KeyDown, &event);
        event
    }

    fn counter(subscription: &ChordSubscription) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        subscription.subscribe(move |_| inner.set(inner.get() + 1));
        count
    }

    #[test]
    fn test_register_and_dispatch() {
        let fx = fixture();
        let sub = fx.registry.register(Hotkey::new("Shift.Control.K"));
        assert_eq!(sub.identity(), "control.shift.k");
        let hits = counter(&sub);

        let event = press(&fx.source, "control.shift.k");
        assert_eq!(hits.get(), 1);
        assert!(event.is_default_prevented());

        press(&fx.source, "control.k");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let fx = fixture();
        let first = fx.registry.register(Hotkey::new("control.k"));
        let second = fx.registry.register(Hotkey::new("Control.K").group("other"));
        let first_hits = counter(&first);
        let second_hits = counter(&second);

        assert!(!first.is_closed());
        assert!(second.is_closed());
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.source.listener_count(), 1);

        press(&fx.source, "control.k");
        assert_eq!(first_hits.get(), 1);
        assert_eq!(second_hits.get(), 0);
        assert_eq!(fx.registry.hotkeys()[0].group, None);
    }

    #[test]
    fn test_cancel_removes_entry_and_listener() {
        let fx = fixture();
        let sub = fx.registry.register(Hotkey::new("control.k"));
        let hits = counter(&sub);

        sub.cancel();
        sub.cancel();
        assert!(sub.is_closed());
        assert!(fx.registry.is_empty());
        assert_eq!(fx.source.listener_count(), 0);

        press(&fx.source, "control.k");
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_remove_then_register_again() {
        let fx = fixture();
        let old = fx.registry.register(Hotkey::new("control.k"));
        assert!(fx.registry.remove("control.k"));
        assert!(old.is_closed());
        assert!(!fx.registry.remove("control.k"));

        let new = fx.registry.register(Hotkey::new("control.k"));
        let hits = counter(&new);

        // A stale handle must not tear down the new registration
        old.cancel();
        assert!(fx.registry.contains("control.k"));

        press(&fx.source, "control.k");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_focus_filtering() {
        let fx = fixture();
        let blocked = fx.registry.register(Hotkey::new("control.k"));
        let allowed = fx
            .registry
            .register(Hotkey::new("control.j").allow_in([FocusTag::Input]));
        let blocked_hits = counter(&blocked);
        let allowed_hits = counter(&allowed);

        for tag in ["INPUT", "select", "TEXTAREA"] {
            fx.focus.focus(FocusedElement::new(tag));
            let event = press(&fx.source, "control.k");
            assert!(!event.is_default_prevented());
        }
        assert_eq!(blocked_hits.get(), 0);

        fx.focus.focus(FocusedElement::new("INPUT"));
        press(&fx.source, "control.j");
        assert_eq!(allowed_hits.get(), 1);

        fx.focus.focus(FocusedElement::new("TEXTAREA"));
        press(&fx.source, "control.j");
        assert_eq!(allowed_hits.get(), 1);

        fx.focus.focus(FocusedElement::new("DIV"));
        press(&fx.source, "control.k");
        assert_eq!(blocked_hits.get(), 1);
    }

    #[test]
    fn test_bus_runs_before_binding_subscribers() {
        let fx = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));
        let sub = fx.registry.register(Hotkey::new("control.k").target(Target::DOCUMENT));

        let seen = Rc::clone(&order);
        sub.subscribe(move |_| seen.borrow_mut().push("binding".to_string()));
        let seen = Rc::clone(&order);
        let _unsubscribe = fx.bus.subscribe(move |_: &KeyEvent, keys: &str, target: Target| {
            seen.borrow_mut().push(format!("bus:{keys}:{target}"));
        });

        press(&fx.source, "control.k");
        assert_eq!(*order.borrow(), vec!["bus:control.k:document", "binding"]);
    }

    #[test]
    fn test_prevent_default_opt_out() {
        let fx = fixture();
        fx.registry.register(Hotkey::new("shift.?").prevent_default(false));
        let event = press(&fx.source, "shift.?");
        assert!(!event.is_default_prevented());
    }

    #[test]
    fn test_keyup_trigger_and_target() {
        let fx = fixture();
        let panel = Target::new(3);
        let sub = fx
            .registry
            .register(Hotkey::new("escape").target(panel).trigger(Trigger::KeyUp));
        let hits = counter(&sub);

        let event = KeyEvent::new("Escape");
        fx.source.emit(panel, Trigger::KeyDown, &event);
        fx.source.emit(Target::DOCUMENT, Trigger::KeyUp, &event);
        assert_eq!(hits.get(), 0);

        fx.source.emit(panel, Trigger::KeyUp, &event);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_hotkeys_snapshot_in_order() {
        let fx = fixture();
        for keys in ["control.c", "control.a", "control.b"] {
            fx.registry.register(Hotkey::new(keys));
        }
        let mut listed = fx.registry.hotkeys();
        let keys: Vec<&str> = listed.iter().map(|h| h.keys.as_str()).collect();
        assert_eq!(keys, vec!["control.c", "control.a", "control.b"]);

        listed[0].description = Some("mutated".to_string());
        assert_eq!(fx.registry.hotkeys()[0].description, None);
    }

    #[test]
    fn test_unregister_from_inside_callback() {
        let fx = fixture();
        let sub = fx.registry.register(Hotkey::new("control.k"));
        let registry = fx.registry.clone();
        sub.subscribe(move |_| {
            registry.remove("control.k");
        });

        press(&fx.source, "control.k");
        assert!(fx.registry.is_empty());
        assert_eq!(fx.source.listener_count(), 0);
    }

    #[test]
    fn test_clear() {
        let fx = fixture();
        let a = fx.registry.register(Hotkey::new("control.a"));
        fx.registry.register(Hotkey::new("control.b"));
        fx.registry.clear();
        assert!(fx.registry.is_empty());
        assert!(a.is_closed());
        assert_eq!(fx.source.listener_count(), 0);
    }
}
