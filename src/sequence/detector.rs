//! Multi-chord sequence detection
//!
//! One [`SequenceSlot`] per target. All sequences on a target share the slot's
//! listener and debounce timer. Timers come from a [`TimerScheduler`]; a
//! keystroke that cannot arm one is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, trace};

use super::machine::{Finish, SequenceEntry, SequenceSlot, SlotState};
use super::timers::TimerScheduler;
use crate::hotkey::keys::{normalize_keys, Platform};
use crate::hotkey::{
    EventSource, Hotkey, HotkeyError, KeyEvent, KeyHandler, ObserverId, Observers, Target,
};

/// Debounce window used until [`SequenceEngine::set_debounce`] is called
pub const DEFAULT_SEQUENCE_DEBOUNCE: Duration = Duration::from_millis(250);

struct SlotTable {
    slots: HashMap<Target, SequenceSlot>,
    debounce: Duration,
    next_id: u64,
}

struct SequenceShared {
    table: RefCell<SlotTable>,
    source: Rc<dyn EventSource>,
    timers: Rc<dyn TimerScheduler>,
    platform: Platform,
}

impl SequenceShared {
    fn on_keystroke(shared: &Rc<Self>, target: Target, event: &KeyEvent) {
        let mut table = shared.table.borrow_mut();
        let Some(slot) = table.slots.get_mut(&target) else {
            return;
        };

        let timer_id = slot.push_keystroke(event.token());
        let weak = Rc::downgrade(shared);
        let fire = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_timeout(target, timer_id);
            }
        });
        match shared.timers.schedule(slot.debounce, fire) {
            Some(timer) => slot.arm(timer),
            None => slot.discard(),
        }
    }

    fn on_timeout(&self, target: Target, timer_id: u64) {
        let finish = match self.table.borrow_mut().slots.get_mut(&target) {
            Some(slot) => slot.finish(timer_id),
            None => return,
        };

        // Channel subscribers run with no borrow held
        match finish {
            Finish::Matched {
                keys,
                hotkey,
                channel,
            } => {
                debug!(%keys, %target, "sequence dispatched");
                channel.notify(&hotkey);
            }
            Finish::TimedOut { keys } => trace!(%keys, %target, "sequence buffer discarded"),
            Finish::Stale => {}
        }
    }

    fn remove_identity(&self, target: Target, identity: &str) -> bool {
        let (entry, emptied) = {
            let mut table = self.table.borrow_mut();
            let Some(slot) = table.slots.get_mut(&target) else {
                return false;
            };
            let Some(entry) = slot.remove(identity) else {
                return false;
            };
            let emptied = if slot.is_empty() {
                table.slots.remove(&target)
            } else {
                None
            };
            (entry, emptied)
        };

        entry.channel.close();
        debug!(keys = %identity, %target, "sequence removed");

        if let Some(mut slot) = emptied {
            slot.shutdown();
            self.source.detach(slot.listener);
            debug!(%target, "sequence slot destroyed");
        }
        true
    }

    /// Targets with a live slot, oldest first
    fn targets(&self) -> Vec<Target> {
        let table = self.table.borrow();
        let mut slots: Vec<(&Target, &SequenceSlot)> = table.slots.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.created);
        slots.into_iter().map(|(target, _)| *target).collect()
    }
}

/// Per-target sequence detector
#[derive(Clone)]
pub struct SequenceEngine {
    shared: Rc<SequenceShared>,
}

impl SequenceEngine {
    pub fn new(
        source: Rc<dyn EventSource>,
        timers: Rc<dyn TimerScheduler>,
        platform: Platform,
    ) -> Self {
        Self {
            shared: Rc::new(SequenceShared {
                table: RefCell::new(SlotTable {
                    slots: HashMap::new(),
                    debounce: DEFAULT_SEQUENCE_DEBOUNCE,
                    next_id: 0,
                }),
                source,
                timers,
                platform,
            }),
        }
    }

    /// Register a sequence on its target. A sequence already bound on the
    /// same target is logged and yields an inert channel.
    pub fn register(&self, hotkey: Hotkey) -> SequenceChannel {
        let target = hotkey.target;
        match self.try_register(hotkey) {
            Ok(channel) => channel,
            Err(err) => {
                error!(%err, "sequence registration rejected");
                SequenceChannel::inert(err.keys().to_string(), target)
            }
        }
    }

    fn try_register(&self, hotkey: Hotkey) -> Result<SequenceChannel, HotkeyError> {
        let identity = normalize_keys(&hotkey.keys, self.shared.platform);
        let target = hotkey.target;
        let trigger = hotkey.trigger;

        let mut table = self.shared.table.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;

        let channel = Rc::new(Observers::new());
        let entry = SequenceEntry {
            id,
            hotkey,
            channel: Rc::clone(&channel),
        };

        if let Some(slot) = table.slots.get_mut(&target) {
            if slot.contains(&identity) {
                return Err(HotkeyError::DuplicateSequence {
                    keys: identity,
                    target,
                });
            }
            slot.insert(identity.clone(), entry);
        } else {
            let handler: KeyHandler = {
                let weak = Rc::downgrade(&self.shared);
                Rc::new(move |event: &KeyEvent| {
                    if let Some(shared) = weak.upgrade() {
                        SequenceShared::on_keystroke(&shared, target, event);
                    }
                })
            };
            let listener = self.shared.source.listen(target, trigger, handler);
            let mut slot = SequenceSlot::new(id, listener, table.debounce);
            slot.insert(identity.clone(), entry);
            debug!(%target, %trigger, debounce_ms = table.debounce.as_millis() as u64, "sequence slot created");
            table.slots.insert(target, slot);
        }

        debug!(keys = %identity, %target, "sequence registered");
        Ok(SequenceChannel {
            identity,
            target,
            channel,
        })
    }

    /// Change the debounce window for slots created from now on
    pub fn set_debounce(&self, debounce: Duration) {
        self.shared.table.borrow_mut().debounce = debounce;
        debug!(debounce_ms = debounce.as_millis() as u64, "sequence debounce changed");
    }

    pub fn debounce(&self) -> Duration {
        self.shared.table.borrow().debounce
    }

    /// Debounce window of the slot on `target`, if one exists
    pub fn slot_debounce(&self, target: Target) -> Option<Duration> {
        self.shared
            .table
            .borrow()
            .slots
            .get(&target)
            .map(|slot| slot.debounce)
    }

    /// Remove an already-normalized identity from one target's slot
    pub fn remove_identity(&self, target: Target, identity: &str) -> bool {
        self.shared.remove_identity(target, identity)
    }

    /// Remove an already-normalized identity from every slot.
    /// Returns the number of slots it was removed from.
    pub fn remove_everywhere(&self, identity: &str) -> usize {
        self.shared
            .targets()
            .into_iter()
            .filter(|target| self.shared.remove_identity(*target, identity))
            .count()
    }

    /// Sequence hotkeys of every target, slot by slot
    pub fn hotkeys(&self) -> Vec<Hotkey> {
        let table = self.shared.table.borrow();
        self.shared
            .targets()
            .iter()
            .filter_map(|target| table.slots.get(target))
            .flat_map(SequenceSlot::hotkeys)
            .collect()
    }

    /// Accumulator state of the slot on `target`
    pub fn state(&self, target: Target) -> Option<SlotState> {
        self.shared
            .table
            .borrow()
            .slots
            .get(&target)
            .map(SequenceSlot::state)
    }

    pub fn slot_count(&self) -> usize {
        self.shared.table.borrow().slots.len()
    }

    /// Number of registered sequences across all targets
    pub fn len(&self) -> usize {
        self.shared.table.borrow().slots.values().map(SequenceSlot::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every slot, cancelling timers and detaching listeners
    pub fn clear(&self) {
        let slots: Vec<SequenceSlot> = self
            .shared
            .table
            .borrow_mut()
            .slots
            .drain()
            .map(|(_, slot)| slot)
            .collect();

        for mut slot in slots {
            slot.shutdown();
            self.shared.source.detach(slot.listener);
        }
    }
}

/// Handle returned by sequence registration; emits the hotkey on each match
pub struct SequenceChannel {
    identity: String,
    target: Target,
    channel: Rc<Observers<Hotkey>>,
}

impl SequenceChannel {
    fn inert(identity: String, target: Target) -> Self {
        Self {
            identity,
            target,
            channel: Rc::new(Observers::closed()),
        }
    }

    /// Normalized sequence identity
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Observe matches of this sequence
    pub fn subscribe(&self, callback: impl Fn(&Hotkey) + 'static) -> ObserverId {
        self.channel.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.channel.unsubscribe(id)
    }

    /// True once the sequence is removed, or if registration was rejected
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}
