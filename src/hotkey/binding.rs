//! Hotkey definitions, help-summary types and registration errors

use serde::{Deserialize, Serialize};

use super::source::Target;

/// Which key event kind a hotkey listens for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    KeyDown,
    KeyUp,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::KeyDown => write!(f, "keydown"),
            Trigger::KeyUp => write!(f, "keyup"),
        }
    }
}

/// Editable element kinds that suppress hotkeys while focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FocusTag {
    Input,
    Select,
    Textarea,
}

impl FocusTag {
    /// All tags that block dispatch unless explicitly allowed
    pub const ALL: [FocusTag; 3] = [FocusTag::Input, FocusTag::Select, FocusTag::Textarea];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusTag::Input => "INPUT",
            FocusTag::Select => "SELECT",
            FocusTag::Textarea => "TEXTAREA",
        }
    }

    /// Match an element tag name, ignoring case
    pub fn matches(&self, tag_name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(tag_name)
    }
}

/// A single keybinding, chord or sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    /// Key descriptor, e.g. `control.k` or `g>g`
    pub keys: String,
    /// Help-summary group
    pub group: Option<String>,
    /// Element the listener is attached to
    pub target: Target,
    /// Key event kind to listen for
    pub trigger: Trigger,
    /// Editable elements in which the hotkey still fires
    pub allow_in: Vec<FocusTag>,
    /// Help-summary description
    pub description: Option<String>,
    /// Whether the hotkey is listed in the help summary
    pub show_in_help: bool,
    /// Cancel the event's default action on dispatch
    pub prevent_default: bool,
}

impl Hotkey {
    /// Create a hotkey with default options
    pub fn new(keys: impl Into<String>) -> Self {
        Self {
            keys: keys.into(),
            group: None,
            target: Target::DOCUMENT,
            trigger: Trigger::KeyDown,
            allow_in: Vec::new(),
            description: None,
            show_in_help: true,
            prevent_default: true,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn allow_in(mut self, tags: impl IntoIterator<Item = FocusTag>) -> Self {
        self.allow_in = tags.into_iter().collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn show_in_help(mut self, show: bool) -> Self {
        self.show_in_help = show;
        self
    }

    pub fn prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    /// Focus tags that suppress this hotkey: every editable kind not in `allow_in`
    pub fn excluded_tags(&self) -> Vec<FocusTag> {
        FocusTag::ALL
            .into_iter()
            .filter(|tag| !self.allow_in.contains(tag))
            .collect()
    }
}

/// One help-summary line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyEntry {
    pub keys: String,
    pub description: Option<String>,
}

/// Hotkeys sharing a group, in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyGroup {
    pub group: Option<String>,
    pub hotkeys: Vec<HotkeyEntry>,
}

/// Errors that can occur while registering hotkeys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyError {
    #[error("duplicated shortcut `{keys}`")]
    DuplicateChord { keys: String },

    #[error("duplicated sequence `{keys}` on {target}")]
    DuplicateSequence { keys: String, target: Target },
}

impl HotkeyError {
    /// Normalized identity the rejected registration was for
    pub fn keys(&self) -> &str {
        match self {
            HotkeyError::DuplicateChord { keys } => keys,
            HotkeyError::DuplicateSequence { keys, .. } => keys,
        }
    }
}
