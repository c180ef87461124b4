//! Notices printed by the playground
//!
//! One JSON object per line on stdout, tagged by `type`.

use hotkeys_engine::{HotkeyGroup, Target};
use serde::{Deserialize, Serialize};

/// Something the engine reported while processing input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A chord hotkey fired
    ChordDispatched {
        keys: String,
        target: Target,
        /// Whether the chord cancelled the event's default action
        default_prevented: bool,
    },

    /// A sequence hotkey matched after its debounce window
    SequenceMatched {
        keys: String,
        target: Target,
        description: Option<String>,
    },

    /// The help trigger fired
    HelpRequested { groups: Vec<HotkeyGroup> },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ChordDispatched { keys, target, .. } => {
                write!(f, "CHORD {} on {}", keys, target)
            }
            Notice::SequenceMatched { keys, target, .. } => {
                write!(f, "SEQUENCE {} on {}", keys, target)
            }
            Notice::HelpRequested { groups } => {
                write!(f, "HELP ({} groups)", groups.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_serialization() {
        let notice = Notice::ChordDispatched {
            keys: "control.k".to_string(),
            target: Target::DOCUMENT,
            default_prevented: true,
        };
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("chord_dispatched"));
        assert!(json.contains("control.k"));
    }

    #[test]
    fn test_notice_deserialization() {
        let json = r#"{"type":"sequence_matched","keys":"g>g","target":0,"description":null}"#;
        let notice: Notice = serde_json::from_str(json).unwrap();
        assert!(matches!(notice, Notice::SequenceMatched { ref keys, .. } if keys == "g>g"));
        assert_eq!(notice.to_string(), "SEQUENCE g>g on document");
    }
}
