//! Process-wide boolean info state

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Named boolean flags plus the set of active windows.
///
/// Flag names are case-insensitive. Unknown flags read as `false`.
#[derive(Debug, Default)]
pub struct InfoManager {
    flags: RwLock<HashMap<String, bool>>,
    active_windows: RwLock<HashSet<i32>>,
}

impl InfoManager {
    /// Create an empty info manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named flag
    pub fn set_bool(&self, name: &str, value: bool) {
        log::trace!("Info flag '{}' = {}", name, value);
        self.flags.write().insert(name.to_ascii_lowercase(), value);
    }

    /// Read a named flag
    pub fn get_bool(&self, name: &str) -> bool {
        self.flags
            .read()
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(false)
    }

    /// Remove a named flag
    pub fn clear_bool(&self, name: &str) {
        self.flags.write().remove(&name.to_ascii_lowercase());
    }

    /// Replace the set of active (shown) window ids
    pub fn set_active_windows(&self, ids: impl IntoIterator<Item = i32>) {
        let mut active = self.active_windows.write();
        active.clear();
        active.extend(ids);
    }

    /// Whether a window is currently shown
    pub fn is_window_active(&self, id: i32) -> bool {
        self.active_windows.read().contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_case_insensitive() {
        let info = InfoManager::new();
        info.set_bool("Player.Playing", true);
        assert!(info.get_bool("player.playing"));
        assert!(!info.get_bool("player.paused"));

        info.clear_bool("PLAYER.PLAYING");
        assert!(!info.get_bool("player.playing"));
    }

    #[test]
    fn test_active_windows() {
        let info = InfoManager::new();
        info.set_active_windows([10000, 10025]);
        assert!(info.is_window_active(10025));
        info.set_active_windows([10000]);
        assert!(!info.is_window_active(10025));
    }
}
