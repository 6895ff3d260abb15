//! Static or animated image

use std::any::Any;

use super::{Control, ControlBase, ControlError, ControlType, DrawContext};
use crate::foundation::math::Rect;
use crate::render::RenderTarget;
use crate::textures::{GuiTexture, PreloadBatch, TextureManager};

/// Draws one texture stretched over its rectangle; never focusable
#[derive(Debug)]
pub struct ImageControl {
    base: ControlBase,
    texture: GuiTexture,
}

impl ImageControl {
    /// Image showing `texture`
    pub fn new(id: i32, rect: Rect, texture: &str) -> Self {
        Self {
            base: ControlBase::new(id, rect),
            texture: GuiTexture::new(texture),
        }
    }

    /// The bound texture
    pub fn texture(&self) -> &GuiTexture {
        &self.texture
    }

    /// Switch to another texture, moving the cache reference if allocated
    pub fn set_file_name(&mut self, name: &str, textures: &TextureManager) {
        self.texture.set_file_name(name, textures);
    }
}

impl Control for ImageControl {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn control_type(&self) -> ControlType {
        ControlType::Image
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pre_alloc_resources(&self, batch: &mut PreloadBatch) {
        self.texture.pre_alloc(batch);
    }

    fn acquire_resources(&mut self, textures: &TextureManager) -> Result<(), ControlError> {
        self.texture.allocate(textures);
        Ok(())
    }

    fn release_resources(&mut self, textures: &TextureManager) {
        self.texture.free(textures);
    }

    fn process_content(&mut self, now_ms: u32, textures: &TextureManager) {
        self.texture.process(now_ms, textures);
    }

    fn render_content(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        // Images drawn outside the visibility pass may not have been allocated yet
        if !self.base.is_allocated() {
            if let Err(err) = self.alloc_resources(draw.textures) {
                log::error!("Image {} failed to allocate during render: {}", self.base.id(), err);
                return;
            }
        }
        self.texture.render(&self.base.rect(), draw.textures, draw.graphics, target);
    }
}
