//! The hotkeys engine facade
//!
//! Owns one chord registry, one sequence engine and one callback bus. Several
//! engines can live side by side; none of their state is global.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::hotkey::keys::{normalize_keys, Platform};
use crate::hotkey::{
    CallbackBus, ChordRegistry, ChordSubscription, EventSource, FocusQuery, Hotkey, HotkeyGroup,
    KeyEvent, Target, Unsubscribe,
};
use crate::sequence::{LocalTimers, SequenceChannel, SequenceEngine};
use crate::summary::build_groups;

/// Default keys of the help trigger
pub const DEFAULT_HELP_KEYS: &str = "shift.?";

/// One or more key descriptors, for [`Hotkeys::unregister`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyList(Vec<String>);

impl KeyList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for KeyList {
    fn from(keys: &str) -> Self {
        Self(vec![keys.to_string()])
    }
}

impl From<String> for KeyList {
    fn from(keys: String) -> Self {
        Self(vec![keys])
    }
}

impl From<Vec<String>> for KeyList {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<Vec<&str>> for KeyList {
    fn from(keys: Vec<&str>) -> Self {
        Self(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyList {
    fn from(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeyList {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Keybinding engine over an event source and a focus query
pub struct Hotkeys {
    chords: ChordRegistry,
    sequences: SequenceEngine,
    callbacks: CallbackBus,
    timers: LocalTimers,
    focus: Rc<dyn FocusQuery>,
    platform: Platform,
}

impl Hotkeys {
    /// Create an engine for the host platform
    pub fn new(source: Rc<dyn EventSource>, focus: Rc<dyn FocusQuery>) -> Self {
        Self::with_platform(source, focus, Platform::host())
    }

    pub fn with_platform(
        source: Rc<dyn EventSource>,
        focus: Rc<dyn FocusQuery>,
        platform: Platform,
    ) -> Self {
        let callbacks = CallbackBus::new();
        let chords = ChordRegistry::new(
            Rc::clone(&source),
            Rc::clone(&focus),
            callbacks.clone(),
            platform,
        );
        let timers = LocalTimers::new();
        let sequences = SequenceEngine::new(source, Rc::new(timers.clone()), platform);

        debug!(%platform, "hotkeys engine created");
        Self {
            chords,
            sequences,
            callbacks,
            timers,
            focus,
            platform,
        }
    }

    /// Create an engine using the platform and debounce from `config`
    pub fn from_config(
        source: Rc<dyn EventSource>,
        focus: Rc<dyn FocusQuery>,
        config: &Config,
    ) -> Self {
        let engine = Self::with_platform(source, focus, config.platform);
        engine.set_sequence_debounce(config.sequence_debounce);
        engine
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Task set running sequence debounce timers. Sequences only match while
    /// it is driven with [`LocalTimers::run_until`].
    pub fn timers(&self) -> &LocalTimers {
        &self.timers
    }

    /// Normalize a descriptor the way this engine keys its registries
    pub fn normalize(&self, keys: &str) -> String {
        normalize_keys(keys, self.platform)
    }

    /// Register a single-chord hotkey
    pub fn register_chord(&self, hotkey: Hotkey) -> ChordSubscription {
        self.chords.register(hotkey)
    }

    /// Register a multi-chord sequence such as `g>g`
    pub fn register_sequence(&self, hotkey: Hotkey) -> SequenceChannel {
        self.sequences.register(hotkey)
    }

    /// Remove chords and sequences bound to the given descriptors
    pub fn unregister(&self, keys: impl Into<KeyList>) {
        let keys: KeyList = keys.into();
        for keys in keys.iter() {
            let identity = self.normalize(keys);
            let chord = self.chords.remove(&identity);
            let sequences = self.sequences.remove_everywhere(&identity);
            debug!(keys = %identity, chord, sequences, "unregistered");
        }
    }

    /// Debounce window for sequence slots created after this call
    pub fn set_sequence_debounce(&self, debounce: Duration) {
        self.sequences.set_debounce(debounce);
    }

    pub fn sequence_debounce(&self) -> Duration {
        self.sequences.debounce()
    }

    /// Observe every chord dispatch as `(event, identity, target)`
    pub fn on_dispatch(
        &self,
        callback: impl Fn(&KeyEvent, &str, Target) + 'static,
    ) -> Unsubscribe {
        self.callbacks.subscribe(callback)
    }

    /// Snapshot of registered chord hotkeys
    pub fn hotkeys(&self) -> Vec<Hotkey> {
        self.chords.hotkeys()
    }

    /// Snapshot of registered sequence hotkeys across all targets
    pub fn sequence_hotkeys(&self) -> Vec<Hotkey> {
        self.sequences.hotkeys()
    }

    /// Grouped help listing of chords followed by sequences
    pub fn summary_groups(&self) -> Vec<HotkeyGroup> {
        let chords = self.chords.hotkeys();
        let sequences = self.sequences.hotkeys();
        build_groups(chords.iter().chain(sequences.iter()), self.platform)
    }

    /// Register a hidden chord that calls `open` to show the help listing.
    ///
    /// `open` is skipped while an editable element has focus, or once no
    /// chord is registered.
    pub fn register_help_trigger(
        &self,
        open: impl Fn() + 'static,
        keys: Option<&str>,
    ) -> ChordSubscription {
        let keys = keys.unwrap_or(DEFAULT_HELP_KEYS);
        let subscription = self.register_chord(
            Hotkey::new(keys)
                .show_in_help(false)
                .prevent_default(false),
        );

        let focus = Rc::clone(&self.focus);
        let chords = self.chords.downgrade();
        subscription.subscribe(move |_event| {
            if focus.current_focus().is_some_and(|el| el.is_editable()) {
                return;
            }
            // The trigger's own chord counts
            if chords.upgrade().map_or(0, |c| c.len()) >= 1 {
                open();
            }
        });

        subscription
    }

    /// Drop every binding, detach all listeners and cancel all timers
    pub fn shutdown(&self) {
        self.chords.clear();
        self.sequences.clear();
        self.callbacks.clear();
        info!("hotkeys engine shut down");
    }
}

impl Drop for Hotkeys {
    fn drop(&mut self) {
        self.chords.clear();
        self.sequences.clear();
    }
}
