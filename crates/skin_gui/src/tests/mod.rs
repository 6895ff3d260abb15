//! Cross-module scenarios: whole windows against the texture cache

mod lifecycle;

use std::path::Path;
use std::sync::Arc;

use crate::config::{GuiConfig, TextureConfig};
use crate::context::GuiContext;
use crate::controls::DefaultControlFactory;
use crate::textures::MemoryLoader;

fn test_config() -> GuiConfig {
    GuiConfig {
        textures: TextureConfig {
            unused_grace_ms: 0,
            extra_paths: Vec::new(),
        },
        ..GuiConfig::default()
    }
}

/// Context whose textures are the in-memory `files` (name, frame count)
pub(crate) fn context_with(files: &[(&str, usize)]) -> Arc<GuiContext> {
    GuiContext::with_parts(
        test_config(),
        Box::new(MemoryLoader::new(files)),
        Box::new(DefaultControlFactory),
    )
}

/// Context reading skin XML and images from `skin_root` on disk
pub(crate) fn context_on_disk(skin_root: &Path) -> Arc<GuiContext> {
    let mut config = test_config();
    config.skin.path = skin_root.to_path_buf();
    GuiContext::new(config)
}
