//! Grouped help listing

use crate::hotkey::keys::{normalize_keys, Platform};
use crate::hotkey::{Hotkey, HotkeyEntry, HotkeyGroup};

/// Group hotkeys for display.
///
/// Hidden hotkeys are skipped, keys are shown in normalized form, and groups
/// appear in the order their first member is seen. Hotkeys without a group
/// share one unnamed bucket.
pub fn build_groups<'a>(
    hotkeys: impl IntoIterator<Item = &'a Hotkey>,
    platform: Platform,
) -> Vec<HotkeyGroup> {
    let mut groups: Vec<HotkeyGroup> = Vec::new();

    for hotkey in hotkeys.into_iter().filter(|h| h.show_in_help) {
        let entry = HotkeyEntry {
            keys: normalize_keys(&hotkey.keys, platform),
            description: hotkey.description.clone(),
        };

        match groups.iter_mut().find(|g| g.group == hotkey.group) {
            Some(group) => group.hotkeys.push(entry),
            None => groups.push(HotkeyGroup {
                group: hotkey.group.clone(),
                hotkeys: vec![entry],
            }),
        }
    }

    groups
}
