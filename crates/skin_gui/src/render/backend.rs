//! Render target abstraction

use thiserror::Error;

use crate::foundation::math::Rect;
use crate::textures::TextureHandle;

/// Errors reported by render targets
#[derive(Debug, Error)]
pub enum RenderError {
    /// A pass was begun while another was open, or ended without one
    #[error("Render pass misuse: {0}")]
    PassState(&'static str),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Output surface for one frame of GUI rendering.
///
/// Coordinates arrive already mapped to display pixels.
pub trait RenderTarget {
    /// Begin rendering a window
    fn begin_pass(&mut self, window_id: i32) -> Result<(), RenderError>;

    /// Draw one texture frame
    fn draw_texture(&mut self, handle: TextureHandle, rect: Rect, alpha: f32);

    /// Draw a text run
    fn draw_text(&mut self, text: &str, rect: Rect, alpha: f32);

    /// Finish the current window
    fn end_pass(&mut self) -> Result<(), RenderError>;
}

/// One recorded draw
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Start of a window's commands
    BeginWindow(i32),
    /// Texture quad
    Texture {
        /// Backend texture
        handle: TextureHandle,
        /// Destination in display pixels
        rect: Rect,
        /// Final alpha
        alpha: f32,
    },
    /// Text run
    Text {
        /// Label text
        text: String,
        /// Destination in display pixels
        rect: Rect,
        /// Final alpha
        alpha: f32,
    },
    /// End of a window's commands
    EndWindow,
}

/// Render target that records commands instead of drawing
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    open: bool,
}

impl DrawList {
    /// Create an empty draw list
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of texture draws recorded
    pub fn texture_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Texture { .. }))
            .count()
    }

    /// Number of text draws recorded
    pub fn text_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Text { .. }))
            .count()
    }

    /// Discard recorded commands
    pub fn clear(&mut self) {
        self.commands.clear();
        self.open = false;
    }
}

impl RenderTarget for DrawList {
    fn begin_pass(&mut self, window_id: i32) -> Result<(), RenderError> {
        if self.open {
            return Err(RenderError::PassState("begin_pass while a pass is open"));
        }
        self.open = true;
        self.commands.push(DrawCommand::BeginWindow(window_id));
        Ok(())
    }

    fn draw_texture(&mut self, handle: TextureHandle, rect: Rect, alpha: f32) {
        self.commands.push(DrawCommand::Texture { handle, rect, alpha });
    }

    fn draw_text(&mut self, text: &str, rect: Rect, alpha: f32) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            rect,
            alpha,
        });
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        if !self.open {
            return Err(RenderError::PassState("end_pass without begin_pass"));
        }
        self.open = false;
        self.commands.push(DrawCommand::EndWindow);
        Ok(())
    }
}
