//! A control's binding to a cached texture

use super::preload::PreloadBatch;
use super::texture_manager::{FrameInfo, TextureKey, TextureManager};
use crate::foundation::math::Rect;
use crate::render::{GraphicsContext, RenderTarget};

/// One texture drawn by a control.
///
/// Holds at most one reference on the cache entry, taken by
/// [`GuiTexture::allocate`] and dropped by [`GuiTexture::free`]. Frame
/// handles are only reachable while allocated.
#[derive(Debug, Default)]
pub struct GuiTexture {
    key: Option<TextureKey>,
    /// Frames returned by the last load; 0 means nothing is referenced
    frame_count: usize,
    allocated: bool,
    current_frame: usize,
    frame_started_ms: Option<u32>,
    loops_done: u32,
}

impl GuiTexture {
    /// Texture bound to `name`; an empty name draws nothing
    pub fn new(name: &str) -> Self {
        Self::with_color_key(name, 0)
    }

    /// Texture bound to `name` with a color key
    pub fn with_color_key(name: &str, color_key: u32) -> Self {
        let key = TextureKey::new(name, color_key);
        Self {
            key: (!key.is_empty()).then_some(key),
            ..Self::default()
        }
    }

    /// Bound cache key, if any
    pub fn key(&self) -> Option<&TextureKey> {
        self.key.as_ref()
    }

    /// True between [`Self::allocate`] and [`Self::free`]
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Number of frames available while allocated
    pub fn frame_count(&self) -> usize {
        if self.allocated {
            self.frame_count
        } else {
            0
        }
    }

    /// Index of the frame currently shown
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Rebind to a different texture, moving the reference if allocated.
    ///
    /// Returns true if the binding changed.
    pub fn set_file_name(&mut self, name: &str, textures: &TextureManager) -> bool {
        let key = TextureKey::new(name, self.key.as_ref().map_or(0, TextureKey::color_key));
        if self.key.as_ref() == Some(&key) || (self.key.is_none() && key.is_empty()) {
            return false;
        }
        let was_allocated = self.allocated;
        self.free(textures);
        self.key = (!key.is_empty()).then_some(key);
        if was_allocated {
            self.allocate(textures);
        }
        true
    }

    /// Register the texture name with a preload batch
    pub fn pre_alloc(&self, batch: &mut PreloadBatch) {
        if let Some(key) = &self.key {
            batch.register(key.clone());
        }
    }

    /// Take a reference on the cached texture.
    ///
    /// Idempotent. Returns false if the texture could not be loaded; the
    /// texture still counts as allocated and simply draws nothing.
    pub fn allocate(&mut self, textures: &TextureManager) -> bool {
        if self.allocated {
            return self.frame_count > 0;
        }
        self.allocated = true;
        self.current_frame = 0;
        self.frame_started_ms = None;
        self.loops_done = 0;
        self.frame_count = self.key.as_ref().map_or(0, |key| textures.load(key));
        self.frame_count > 0
    }

    /// Drop the reference taken by [`Self::allocate`]; idempotent
    pub fn free(&mut self, textures: &TextureManager) {
        if !self.allocated {
            return;
        }
        if self.frame_count > 0 {
            if let Some(key) = &self.key {
                textures.release(key);
            }
        }
        self.allocated = false;
        self.frame_count = 0;
        self.current_frame = 0;
        self.frame_started_ms = None;
    }

    /// Frame currently shown, if allocated
    pub fn frame(&self, textures: &TextureManager) -> Option<FrameInfo> {
        if !self.allocated || self.frame_count == 0 {
            return None;
        }
        self.key
            .as_ref()
            .and_then(|key| textures.get_frame(key, self.current_frame))
    }

    /// Advance frame animation to `now_ms`
    pub fn process(&mut self, now_ms: u32, textures: &TextureManager) {
        if !self.allocated || self.frame_count < 2 {
            return;
        }
        let Some(key) = self.key.as_ref() else {
            return;
        };
        let started = *self.frame_started_ms.get_or_insert(now_ms);
        let Some(frame) = textures.get_frame(key, self.current_frame) else {
            return;
        };
        if now_ms.saturating_sub(started) < frame.delay_ms {
            return;
        }

        let loops = textures.loop_count(key);
        if self.current_frame + 1 < self.frame_count {
            self.current_frame += 1;
        } else if loops == 0 || self.loops_done + 1 < loops {
            self.loops_done += 1;
            self.current_frame = 0;
        } else {
            // Finished all loops; hold the last frame
            return;
        }
        self.frame_started_ms = Some(now_ms);
    }

    /// Draw the current frame into `rect` (skin coordinates)
    pub fn render(
        &self,
        rect: &Rect,
        textures: &TextureManager,
        graphics: &GraphicsContext,
        target: &mut dyn RenderTarget,
    ) {
        if let Some(frame) = self.frame(textures) {
            target.draw_texture(frame.handle, graphics.map_rect(rect), graphics.final_alpha());
        }
    }
}
