//! GUI runtime context
//!
//! Owns the process-wide services every window works against: graphics
//! state, the texture cache, info flags, the active skin and the control
//! factory. Built once at startup and shared by `Arc`.

use std::sync::Arc;

use crate::config::GuiConfig;
use crate::controls::{ControlFactory, DefaultControlFactory};
use crate::info::InfoManager;
use crate::render::GraphicsContext;
use crate::skin::SkinInfo;
use crate::textures::{ImageFileLoader, TextureLoader, TextureManager};

/// Shared GUI services
pub struct GuiContext {
    /// Configuration the context was built from
    pub config: GuiConfig,
    /// Graphics lock and render state
    pub graphics: GraphicsContext,
    /// Texture cache
    pub textures: TextureManager,
    /// Global condition flags
    pub info: InfoManager,
    /// Active skin
    pub skin: SkinInfo,
    /// Builds controls from skin XML
    pub factory: Box<dyn ControlFactory>,
}

impl std::fmt::Debug for GuiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiContext")
            .field("skin", &self.skin.root())
            .field("display", &self.config.display.resolution)
            .finish_non_exhaustive()
    }
}

impl GuiContext {
    /// Context decoding textures from disk
    pub fn new(config: GuiConfig) -> Arc<Self> {
        Self::with_loader(config, Box::new(ImageFileLoader))
    }

    /// Context with a custom texture loader
    pub fn with_loader(config: GuiConfig, loader: Box<dyn TextureLoader>) -> Arc<Self> {
        Self::with_parts(config, loader, Box::new(DefaultControlFactory))
    }

    /// Context with a custom loader and control factory
    pub fn with_parts(
        config: GuiConfig,
        loader: Box<dyn TextureLoader>,
        factory: Box<dyn ControlFactory>,
    ) -> Arc<Self> {
        let skin = SkinInfo::new(&config.skin);
        let textures = TextureManager::new(&config.textures, loader);
        textures.add_texture_path(skin.media_path());
        let graphics = GraphicsContext::new(config.display.resolution);

        log::info!(
            "GUI context: skin {:?}, display {}x{}",
            skin.root(),
            config.display.resolution.width,
            config.display.resolution.height
        );

        Arc::new(Self {
            config,
            graphics,
            textures,
            info: InfoManager::new(),
            skin,
            factory,
        })
    }
}
