//! Per-target sequence accumulator
//!
//! Each slot moves through `Idle → Accumulating → (Matched | TimedOut) → Idle`.
//! Keystrokes append to the buffer and re-arm the debounce timer; when the
//! timer fires the buffer is compared against the slot's bindings and reset.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::hotkey::keys::SEQUENCE_SEPARATOR;
use crate::hotkey::{Hotkey, ListenerId, Observers};

/// Accumulator state of one slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    /// Buffer empty, no timer armed
    #[default]
    Idle,
    /// At least one keystroke buffered, timer armed
    Accumulating,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotState::Idle => write!(f, "Idle"),
            SlotState::Accumulating => write!(f, "Accumulating"),
        }
    }
}

/// Result of a debounce timer firing
pub(crate) enum Finish {
    /// Timer was superseded or cancelled; nothing happened
    Stale,
    /// Buffer matched a binding
    Matched {
        keys: String,
        hotkey: Hotkey,
        channel: Rc<Observers<Hotkey>>,
    },
    /// Buffer matched nothing and was discarded
    TimedOut { keys: String },
}

pub(crate) struct SequenceEntry {
    pub(crate) id: u64,
    pub(crate) hotkey: Hotkey,
    pub(crate) channel: Rc<Observers<Hotkey>>,
}

pub(crate) struct SequenceSlot {
    /// Creation number; orders slots in listings
    pub(crate) created: u64,
    pub(crate) listener: ListenerId,
    /// Fixed when the slot is created
    pub(crate) debounce: Duration,
    state: SlotState,
    buffer: Vec<String>,
    timer_id: u64,
    timer: Option<AbortHandle>,
    entries: HashMap<String, SequenceEntry>,
}

impl SequenceSlot {
    pub(crate) fn new(created: u64, listener: ListenerId, debounce: Duration) -> Self {
        Self {
            created,
            listener,
            debounce,
            state: SlotState::Idle,
            buffer: Vec::new(),
            timer_id: 0,
            timer: None,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn state(&self) -> SlotState {
        self.state
    }

    /// The buffered keystrokes joined into sequence form
    pub(crate) fn buffered(&self) -> String {
        self.buffer.join(&SEQUENCE_SEPARATOR.to_string())
    }

    /// Append a keystroke and invalidate any armed timer.
    /// Returns the id the replacement timer must carry.
    pub(crate) fn push_keystroke(&mut self, token: String) -> u64 {
        self.buffer.push(token);
        self.cancel_timer();
        self.timer_id += 1;
        if self.state == SlotState::Idle {
            self.transition_to(SlotState::Accumulating);
        }
        self.timer_id
    }

    /// Attach the task handle of the timer armed for the current id
    pub(crate) fn arm(&mut self, handle: AbortHandle) {
        self.timer = Some(handle);
    }

    /// Finalize the buffer for the timer `timer_id`
    pub(crate) fn finish(&mut self, timer_id: u64) -> Finish {
        if timer_id != self.timer_id || self.state != SlotState::Accumulating {
            return Finish::Stale;
        }

        self.timer = None;
        let keys = self.buffered();
        self.buffer.clear();

        let finish = match self.entries.get(&keys) {
            Some(entry) => {
                debug!(%keys, "sequence matched");
                Finish::Matched {
                    keys,
                    hotkey: entry.hotkey.clone(),
                    channel: Rc::clone(&entry.channel),
                }
            }
            None => {
                debug!(%keys, "sequence timed out without a match");
                Finish::TimedOut { keys }
            }
        };

        self.transition_to(SlotState::Idle);
        finish
    }

    pub(crate) fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub(crate) fn insert(&mut self, identity: String, entry: SequenceEntry) {
        self.entries.insert(identity, entry);
    }

    pub(crate) fn remove(&mut self, identity: &str) -> Option<SequenceEntry> {
        self.entries.remove(identity)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered hotkeys in registration order
    pub(crate) fn hotkeys(&self) -> Vec<Hotkey> {
        let mut entries: Vec<&SequenceEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.id);
        entries.into_iter().map(|entry| entry.hotkey.clone()).collect()
    }

    /// Drop the buffer without comparing it against any binding
    pub(crate) fn discard(&mut self) {
        self.cancel_timer();
        self.timer_id += 1;
        self.buffer.clear();
        if self.state != SlotState::Idle {
            self.transition_to(SlotState::Idle);
        }
    }

    /// Cancel the timer, close every channel and drop all bindings
    pub(crate) fn shutdown(&mut self) {
        self.discard();
        for (_, entry) in self.entries.drain() {
            entry.channel.close();
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn transition_to(&mut self, new_state: SlotState) {
        debug!(
            from = %self.state,
            to = %new_state,
            buffered = self.buffer.len(),
            "sequence slot transition"
        );
        self.state = new_state;
    }
}

impl Drop for SequenceSlot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{EventSource, KeyEvent, LocalEventSource, Target, Trigger};

    fn slot_with(keys: &[&str]) -> SequenceSlot {
        let source = LocalEventSource::new();
        let listener = source.listen(Target::DOCUMENT, Trigger::KeyDown, Rc::new(|_: &KeyEvent| {}));
        let mut slot = SequenceSlot::new(0, listener, Duration::from_millis(250));
        for (id, keys) in keys.iter().enumerate() {
            slot.insert(
                keys.to_string(),
                SequenceEntry {
                    id: id as u64,
                    hotkey: Hotkey::new(*keys),
                    channel: Rc::new(Observers::new()),
                },
            );
        }
        slot
    }

    #[test]
    fn test_initial_state() {
        let slot = slot_with(&["g>g"]);
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.buffered(), "");
    }

    #[test]
    fn test_accumulate_then_match() {
        let mut slot = slot_with(&["g>g", "g>i"]);
        slot.push_keystroke("g".to_string());
        assert_eq!(slot.state(), SlotState::Accumulating);
        let timer = slot.push_keystroke("g".to_string());
        assert_eq!(slot.buffered(), "g>g");

        match slot.finish(timer) {
            Finish::Matched { keys, hotkey, .. } => {
                assert_eq!(keys, "g>g");
                assert_eq!(hotkey.keys, "g>g");
            }
            _ => panic!("expected a match"),
        }
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.buffered(), "");
    }

    #[test]
    fn test_timeout_discards_buffer() {
        let mut slot = slot_with(&["g>g"]);
        let timer = slot.push_keystroke("g".to_string());

        assert!(matches!(slot.finish(timer), Finish::TimedOut { keys } if keys == "g"));
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.buffered(), "");
    }

    #[test]
    fn test_superseded_timer_is_stale() {
        let mut slot = slot_with(&["g>g"]);
        let first = slot.push_keystroke("g".to_string());
        let second = slot.push_keystroke("g".to_string());

        assert!(matches!(slot.finish(first), Finish::Stale));
        assert_eq!(slot.state(), SlotState::Accumulating);
        assert!(matches!(slot.finish(second), Finish::Matched { .. }));
        assert!(matches!(slot.finish(second), Finish::Stale));
    }

    #[test]
    fn test_discard_drops_buffer() {
        let mut slot = slot_with(&["g>g"]);
        let timer = slot.push_keystroke("g".to_string());

        slot.discard();
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.buffered(), "");
        assert!(matches!(slot.finish(timer), Finish::Stale));
    }

    #[test]
    fn test_removed_identity_fails_to_match() {
        let mut slot = slot_with(&["g>g"]);
        slot.push_keystroke("g".to_string());
        let timer = slot.push_keystroke("g".to_string());
        assert!(slot.remove("g>g").is_some());

        assert!(matches!(slot.finish(timer), Finish::TimedOut { .. }));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_shutdown_closes_channels() {
        let mut slot = slot_with(&["g>g", "d>d"]);
        let channel = match slot.remove("g>g") {
            Some(entry) => {
                let channel = Rc::clone(&entry.channel);
                slot.insert("g>g".to_string(), entry);
                channel
            }
            None => panic!("entry missing"),
        };
        let timer = slot.push_keystroke("g".to_string());

        slot.shutdown();
        assert!(channel.is_closed());
        assert_eq!(slot.len(), 0);
        assert_eq!(slot.state(), SlotState::Idle);
        assert!(matches!(slot.finish(timer), Finish::Stale));
    }

    #[test]
    fn test_hotkeys_in_registration_order() {
        let slot = slot_with(&["z>z", "a>a", "m>m"]);
        let keys: Vec<String> = slot.hotkeys().into_iter().map(|h| h.keys).collect();
        assert_eq!(keys, vec!["z>z", "a>a", "m>m"]);
    }
}
