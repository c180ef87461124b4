//! Key event source and focus query collaborators
//!
//! The engine never talks to a keyboard directly. It attaches handlers to an
//! [`EventSource`] keyed by target and trigger, and asks a [`FocusQuery`]
//! which element currently has focus. [`LocalEventSource`] and
//! [`FocusTracker`] are in-process implementations of both.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::binding::Trigger;
use super::keys::{keystroke_token, ModifierState, Platform, KEY_SEPARATOR};

/// Opaque handle of an element that key listeners attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target(u32);

impl Target {
    /// The document root, default target of every hotkey
    pub const DOCUMENT: Target = Target(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Target::DOCUMENT {
            write!(f, "document")
        } else {
            write!(f, "target#{}", self.0)
        }
    }
}

/// A keyboard event as delivered by an event source
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// Key name as reported by the platform, e.g. `k`, `?`, `Escape`
    pub key: String,
    /// Modifiers held while the key was pressed
    pub modifiers: ModifierState,
    default_prevented: Cell<bool>,
}

impl KeyEvent {
    /// Create an event for a key with no modifiers held
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_modifiers(key, ModifierState::default())
    }

    pub fn with_modifiers(key: impl Into<String>, modifiers: ModifierState) -> Self {
        Self {
            key: key.into(),
            modifiers,
            default_prevented: Cell::new(false),
        }
    }

    /// Build an event from a single chord descriptor such as `control.shift.k`
    pub fn parse(descriptor: &str, platform: Platform) -> Self {
        let mut modifiers = ModifierState::default();
        let mut tokens: Vec<&str> = descriptor.split(KEY_SEPARATOR).map(str::trim).collect();
        let key = tokens.pop().unwrap_or_default();
        for token in tokens {
            modifiers.apply(&token.to_lowercase(), platform);
        }
        Self::with_modifiers(key, modifiers)
    }

    /// Identity-shaped token for this keystroke
    pub fn token(&self) -> String {
        keystroke_token(&self.key, self.modifiers)
    }

    /// Cancel the platform's default action for this event
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Handler invoked for every key event on a listener's target and trigger
pub type KeyHandler = Rc<dyn Fn(&KeyEvent)>;

/// Identifies an attached listener so it can be detached later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Subscription mechanism for key events, keyed by target and trigger
pub trait EventSource {
    /// Attach a handler. It receives every event of `trigger` kind on `target`.
    fn listen(&self, target: Target, trigger: Trigger, handler: KeyHandler) -> ListenerId;

    /// Detach a handler. Unknown or already detached ids are ignored.
    fn detach(&self, id: ListenerId);
}

struct Listener {
    id: ListenerId,
    target: Target,
    trigger: Trigger,
    handler: KeyHandler,
}

/// In-process event source; events are pushed in with [`LocalEventSource::emit`]
#[derive(Default)]
pub struct LocalEventSource {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl LocalEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener of `target` and `trigger`, in
    /// attachment order. Returns the number of handlers invoked.
    pub fn emit(&self, target: Target, trigger: Trigger, event: &KeyEvent) -> usize {
        // Snapshot so handlers may attach or detach listeners while we iterate
        let matching: Vec<(ListenerId, KeyHandler)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.trigger == trigger)
            .map(|l| (l.id, Rc::clone(&l.handler)))
            .collect();

        trace!(%target, %trigger, key = %event.key, listeners = matching.len(), "emitting key event");

        let mut delivered = 0;
        for (id, handler) in matching {
            // Skip listeners detached by an earlier handler of this same event
            if !self.is_attached(id) {
                continue;
            }
            handler(event);
            delivered += 1;
        }
        delivered
    }

    /// Number of attached listeners across all targets
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn is_attached(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|l| l.id == id)
    }
}

impl EventSource for LocalEventSource {
    fn listen(&self, target: Target, trigger: Trigger, handler: KeyHandler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            target,
            trigger,
            handler,
        });
        trace!(?id, %target, %trigger, "listener attached");
        id
    }

    fn detach(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
        trace!(?id, "listener detached");
    }
}

/// The element that currently has keyboard focus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedElement {
    /// Element tag name, e.g. `INPUT` or `DIV`
    pub tag: String,
    /// Element accepts free text editing outside of form controls
    pub content_editable: bool,
}

impl FocusedElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content_editable: false,
        }
    }

    pub fn content_editable(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content_editable: true,
        }
    }

    /// Form controls and content-editable elements accept typed text
    pub fn is_editable(&self) -> bool {
        self.content_editable
            || ["INPUT", "TEXTAREA", "SELECT"]
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(&self.tag))
    }
}

/// Answers which element currently has focus
pub trait FocusQuery {
    fn current_focus(&self) -> Option<FocusedElement>;
}

/// Settable focus state; clones share the same focus
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    focused: Rc<RefCell<Option<FocusedElement>>>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self, element: FocusedElement) {
        *self.focused.borrow_mut() = Some(element);
    }

    pub fn blur(&self) {
        *self.focused.borrow_mut() = None;
    }
}

impl FocusQuery for FocusTracker {
    fn current_focus(&self) -> Option<FocusedElement> {
        self.focused.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_handler(count: &Rc<Cell<usize>>) -> KeyHandler {
        let count = Rc::clone(count);
        Rc::new(move |_event: &KeyEvent| count.set(count.get() + 1))
    }

    #[test]
    fn test_parse_event() {
        let event = KeyEvent::parse("shift.control.K", Platform::Pc);
        assert!(event.modifiers.control);
        assert!(event.modifiers.shift);
        assert_eq!(event.key, "K");
        assert_eq!(event.token(), "control.shift.k");

        let event = KeyEvent::parse("command.s", Platform::Apple);
        assert!(event.modifiers.meta);
        assert_eq!(event.token(), "meta.s");
    }

    #[test]
    fn test_prevent_default() {
        let event = KeyEvent::new("k");
        assert!(!event.is_default_prevented());
        event.prevent_default();
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_emit_routes_by_target_and_trigger() {
        let source = LocalEventSource::new();
        let count = Rc::new(Cell::new(0));
        source.listen(Target::DOCUMENT, Trigger::KeyDown, counting_handler(&count));
        source.listen(Target::new(7), Trigger::KeyDown, counting_handler(&count));
        source.listen(Target::DOCUMENT, Trigger::KeyUp, counting_handler(&count));

        let delivered = source.emit(Target::DOCUMENT, Trigger::KeyDown, &KeyEvent::new("a"));
        assert_eq!(delivered, 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_detach() {
        let source = LocalEventSource::new();
        let count = Rc::new(Cell::new(0));
        let id = source.listen(Target::DOCUMENT, Trigger::KeyDown, counting_handler(&count));
        assert_eq!(source.listener_count(), 1);

        source.detach(id);
        source.detach(id);
        assert_eq!(source.listener_count(), 0);
        assert_eq!(source.emit(Target::DOCUMENT, Trigger::KeyDown, &KeyEvent::new("a")), 0);
    }

    #[test]
    fn test_detach_during_emit_skips_listener() {
        let source = Rc::new(LocalEventSource::new());
        let count = Rc::new(Cell::new(0));
        let victim: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let detacher = {
            let source = Rc::downgrade(&source);
            let victim = Rc::clone(&victim);
            Rc::new(move |_event: &KeyEvent| {
                if let (Some(source), Some(id)) = (source.upgrade(), victim.get()) {
                    source.detach(id);
                }
            })
        };
        source.listen(Target::DOCUMENT, Trigger::KeyDown, detacher);
        let id = source.listen(Target::DOCUMENT, Trigger::KeyDown, counting_handler(&count));
        victim.set(Some(id));

        assert_eq!(source.emit(Target::DOCUMENT, Trigger::KeyDown, &KeyEvent::new("a")), 1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_focus_tracker() {
        let focus = FocusTracker::new();
        assert_eq!(focus.current_focus(), None);

        let shared = focus.clone();
        shared.focus(FocusedElement::new("input"));
        assert!(focus.current_focus().is_some_and(|el| el.is_editable()));

        focus.focus(FocusedElement::new("DIV"));
        assert!(!shared.current_focus().is_some_and(|el| el.is_editable()));

        focus.focus(FocusedElement::content_editable("DIV"));
        assert!(focus.current_focus().is_some_and(|el| el.is_editable()));

        focus.blur();
        assert_eq!(shared.current_focus(), None);
    }
}
