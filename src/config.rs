//! Configuration loading and management

use std::time::Duration;

use anyhow::{Context, Result};

use crate::engine::DEFAULT_HELP_KEYS;
use crate::hotkey::keys::Platform;
use crate::sequence::DEFAULT_SEQUENCE_DEBOUNCE;

/// Debounce window in milliseconds
pub const ENV_SEQUENCE_DEBOUNCE: &str = "HOTKEYS_SEQUENCE_DEBOUNCE_MS";
/// Key descriptor of the help trigger
pub const ENV_HELP_KEYS: &str = "HOTKEYS_HELP_KEYS";
/// `apple` or `pc`
pub const ENV_PLATFORM: &str = "HOTKEYS_PLATFORM";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inactivity window that finalizes a sequence buffer
    pub sequence_debounce: Duration,

    /// Keys that open the help listing
    pub help_keys: String,

    /// Platform used to resolve the `command` alias
    pub platform: Platform,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sequence_debounce: DEFAULT_SEQUENCE_DEBOUNCE,
            help_keys: DEFAULT_HELP_KEYS.to_string(),
            platform: Platform::host(),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SEQUENCE_DEBOUNCE) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_SEQUENCE_DEBOUNCE}: `{raw}`"))?;
            config.sequence_debounce = Duration::from_millis(millis);
        }

        if let Some(keys) = lookup(ENV_HELP_KEYS) {
            if !keys.trim().is_empty() {
                config.help_keys = keys.trim().to_string();
            }
        }

        if let Some(raw) = lookup(ENV_PLATFORM) {
            config.platform = raw
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {ENV_PLATFORM}"))?;
        }

        Ok(config)
    }
}
