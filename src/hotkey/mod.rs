//! Hotkey definitions and single-chord dispatch
//!
//! Descriptors are normalized into identities, chords are registered against
//! an abstract key event source, and every dispatch passes through focus
//! filtering and the global callback bus.

mod binding;
mod bus;
mod chords;
pub mod keys;
mod observers;
mod source;

pub use binding::{FocusTag, Hotkey, HotkeyEntry, HotkeyError, HotkeyGroup, Trigger};
pub use bus::{CallbackBus, DispatchCallback, Unsubscribe};
pub use chords::{ChordRegistry, ChordSubscription};
pub use keys::{normalize_keys, ModifierState, Platform};
pub use observers::{ObserverId, Observers};
pub use source::{
    EventSource, FocusQuery, FocusTracker, FocusedElement, KeyEvent, KeyHandler, ListenerId,
    LocalEventSource, Target,
};
