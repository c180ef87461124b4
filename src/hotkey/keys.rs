//! Key descriptor normalization and modifier tracking
//!
//! A descriptor such as `"Shift.Control.K"` or `"g>g"` is reduced to a
//! canonical identity string. Chords use `.` between tokens, sequences use
//! `>` between chords. Modifiers always come out in the order control, alt,
//! shift, meta.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the modifier tokens and the key of a chord
pub const KEY_SEPARATOR: char = '.';

/// Separator between chords of a sequence
pub const SEQUENCE_SEPARATOR: char = '>';

/// Host platform family, used to resolve the `command` alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// macOS / iOS: `command` is the meta key
    Apple,
    /// Everything else: `command` is the control key
    Pc,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn host() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::Apple
        } else {
            Platform::Pc
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Apple => write!(f, "apple"),
            Platform::Pc => write!(f, "pc"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apple" | "mac" | "macos" => Ok(Platform::Apple),
            "pc" | "linux" | "windows" => Ok(Platform::Pc),
            other => Err(format!("unknown platform `{other}`")),
        }
    }
}

/// Tracks which modifier keys are held for a single chord
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Alt/Option key is held
    pub alt: bool,
    /// Shift key is held
    pub shift: bool,
    /// Meta (Command on Apple, Windows/Super elsewhere) is held
    pub meta: bool,
}

impl ModifierState {
    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.control && !self.alt && !self.shift && !self.meta
    }

    /// Record a modifier token. Returns false if the token is not a modifier.
    pub fn apply(&mut self, token: &str, platform: Platform) -> bool {
        match token {
            "control" | "ctrl" => self.control = true,
            "alt" | "option" => self.alt = true,
            "shift" => self.shift = true,
            "meta" => self.meta = true,
            "command" | "cmd" | "mod" => match platform {
                Platform::Apple => self.meta = true,
                Platform::Pc => self.control = true,
            },
            _ => return false,
        }
        true
    }

    /// Canonical modifier tokens in identity order
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::with_capacity(4);
        if self.control {
            tokens.push("control");
        }
        if self.alt {
            tokens.push("alt");
        }
        if self.shift {
            tokens.push("shift");
        }
        if self.meta {
            tokens.push("meta");
        }
        tokens
    }
}

/// Canonicalize a chord or sequence descriptor for the given platform.
///
/// Never fails: malformed input still yields a (possibly meaningless)
/// identity. The result is stable under repeated normalization.
pub fn normalize_keys(descriptor: &str, platform: Platform) -> String {
    descriptor
        .split(SEQUENCE_SEPARATOR)
        .map(|chord| normalize_chord(chord, platform))
        .collect::<Vec<_>>()
        .join(&SEQUENCE_SEPARATOR.to_string())
}

fn normalize_chord(chord: &str, platform: Platform) -> String {
    let lowered = chord.to_lowercase();
    let tokens: Vec<&str> = lowered.split(KEY_SEPARATOR).map(str::trim).collect();

    // split() always yields at least one item
    let Some((key, leading)) = tokens.split_last() else {
        return String::new();
    };

    let mut modifiers = ModifierState::default();
    let mut unknown = Vec::new();
    for token in leading {
        if !modifiers.apply(token, platform) {
            unknown.push(*token);
        }
    }

    let mut parts: Vec<&str> = modifiers.tokens();
    parts.extend(unknown);
    parts.push(*key);
    parts.join(&KEY_SEPARATOR.to_string())
}

/// Token for a live keystroke: canonical modifiers followed by the key name
pub fn keystroke_token(key: &str, modifiers: ModifierState) -> String {
    let key = match key {
        " " => "space".to_string(),
        other => other.to_lowercase(),
    };

    let mut parts: Vec<&str> = modifiers.tokens();
    parts.push(key.as_str());
    parts.join(&KEY_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = ModifierState::default();
        assert!(state.is_empty());
        assert!(state.tokens().is_empty());
    }

    #[test]
    fn test_modifier_order_is_canonical() {
        assert_eq!(
            normalize_keys("meta.shift.alt.control.k", Platform::Pc),
            "control.alt.shift.meta.k"
        );
        assert_eq!(normalize_keys("Shift.Control.K", Platform::Pc), "control.shift.k");
    }

    #[test]
    fn test_command_alias_follows_platform() {
        assert_eq!(normalize_keys("command.s", Platform::Apple), "meta.s");
        assert_eq!(normalize_keys("command.s", Platform::Pc), "control.s");
        assert_eq!(normalize_keys("cmd.shift.p", Platform::Apple), "shift.meta.p");
        assert_eq!(normalize_keys("ctrl.option.x", Platform::Apple), "control.alt.x");
    }

    #[test]
    fn test_sequences_normalize_per_chord() {
        assert_eq!(normalize_keys("G>G", Platform::Pc), "g>g");
        assert_eq!(
            normalize_keys("shift.control.x>alt.c", Platform::Pc),
            "control.shift.x>alt.c"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "control.k",
            "Shift.?",
            "command.shift.p",
            "g>g",
            "hyper.control.k",
            " control . k ",
            "",
            "control..",
            "escape",
        ];
        for platform in [Platform::Apple, Platform::Pc] {
            for input in inputs {
                let once = normalize_keys(input, platform);
                assert_eq!(normalize_keys(&once, platform), once, "input {input:?}");
                assert_eq!(normalize_keys(input, platform), once);
            }
        }
    }

    #[test]
    fn test_unknown_tokens_follow_modifiers() {
        assert_eq!(
            normalize_keys("hyper.shift.control.k", Platform::Pc),
            "control.shift.hyper.k"
        );
    }

    #[test]
    fn test_duplicate_modifiers_collapse() {
        assert_eq!(normalize_keys("ctrl.control.k", Platform::Pc), "control.k");
        assert_eq!(normalize_keys("command.control.k", Platform::Pc), "control.k");
    }

    #[test]
    fn test_keystroke_token() {
        let modifiers = ModifierState {
            control: true,
            shift: true,
            ..Default::default()
        };
        assert_eq!(keystroke_token("K", modifiers), "control.shift.k");
        assert_eq!(keystroke_token(" ", ModifierState::default()), "space");
        assert_eq!(keystroke_token("?", ModifierState { shift: true, ..Default::default() }), "shift.?");
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("apple".parse::<Platform>(), Ok(Platform::Apple));
        assert_eq!("PC".parse::<Platform>(), Ok(Platform::Pc));
        assert!("amiga".parse::<Platform>().is_err());
    }
}
