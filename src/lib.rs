//! hotkeys-engine: keybinding engine for chord and sequence hotkeys
//!
//! Provides:
//! - Canonical key identities (`control.shift.k`, `g>g`) across platforms
//! - A chord registry with one binding per identity, focus filtering and a
//!   global dispatch callback bus
//! - Per-target sequence detection with a debounce window
//! - A grouped help listing built from every registered binding
//!
//! The keyboard itself is abstracted behind [`EventSource`] and the focused
//! element behind [`FocusQuery`]. Sequence debounce timers run on the
//! engine's [`LocalTimers`], which the caller drives with
//! [`LocalTimers::run_until`].
//!
//! ```no_run
//! use std::rc::Rc;
//! use hotkeys_engine::{FocusTracker, Hotkey, Hotkeys, LocalEventSource};
//!
//! let source = Rc::new(LocalEventSource::new());
//! let engine = Hotkeys::new(source.clone(), Rc::new(FocusTracker::new()));
//!
//! let search = engine.register_chord(Hotkey::new("control.k").group("nav"));
//! search.subscribe(|event| println!("search via {}", event.key));
//! ```

pub mod config;
pub mod engine;
pub mod hotkey;
pub mod sequence;
pub mod summary;

pub use config::Config;
pub use engine::{Hotkeys, KeyList, DEFAULT_HELP_KEYS};
pub use hotkey::{
    normalize_keys, ChordSubscription, EventSource, FocusQuery, FocusTag, FocusTracker,
    FocusedElement, Hotkey, HotkeyEntry, HotkeyError, HotkeyGroup, KeyEvent, LocalEventSource,
    ModifierState, Platform, Target, Trigger, Unsubscribe,
};
pub use sequence::{
    LocalTimers, SequenceChannel, SlotState, TimerScheduler, DEFAULT_SEQUENCE_DEBOUNCE,
};
pub use summary::build_groups;
