//! Rendering state and output
//!
//! The GUI core never talks to a graphics API directly. Controls map their
//! rectangles through the shared [`GraphicsContext`] and emit commands to a
//! [`RenderTarget`]; [`DrawList`] is the recording target used by headless
//! runs and tests.

mod backend;
mod graphics_context;

pub use backend::{DrawCommand, DrawList, RenderError, RenderTarget};
pub use graphics_context::{GraphicsContext, GraphicsGuard, RenderState};
