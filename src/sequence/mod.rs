//! Sequence detection
//!
//! Turns a stream of keystrokes per target into sequence strings such as
//! `g>g`, finalized once the debounce window passes without another key.

mod detector;
mod machine;
mod timers;

pub use detector::{SequenceChannel, SequenceEngine, DEFAULT_SEQUENCE_DEBOUNCE};
pub use machine::SlotState;
pub use timers::{LocalTimers, TimerScheduler};
