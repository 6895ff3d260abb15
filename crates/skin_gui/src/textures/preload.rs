//! Batch texture preloading

use super::texture_manager::{TextureKey, TextureManager};

/// Texture names collected from a control tree before allocation.
///
/// Registering a name only records intent; nothing is decoded until the
/// batch is committed and the manager flushes its preload queue.
#[derive(Debug, Default)]
pub struct PreloadBatch {
    keys: Vec<TextureKey>,
}

impl PreloadBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a texture name; duplicates and empty names are ignored
    pub fn register(&mut self, key: TextureKey) {
        if !key.is_empty() && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Number of distinct names registered
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if nothing was registered
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered names in registration order
    pub fn keys(&self) -> &[TextureKey] {
        &self.keys
    }

    /// Hand the names to the manager's preload queue
    pub fn commit(self, textures: &TextureManager) {
        if !self.keys.is_empty() {
            textures.queue_preload(self.keys);
        }
    }
}
