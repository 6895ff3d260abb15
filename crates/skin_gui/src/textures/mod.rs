//! Texture management
//!
//! - [`TextureManager`]: process-wide, reference-counted cache of decoded
//!   (possibly animated) textures with deferred reclamation
//! - [`PreloadBatch`]: collects texture names for a whole control tree before
//!   any bytes are decoded
//! - [`GuiTexture`]: a control's binding to one cached texture
//! - [`TextureLoader`]: the storage/decoder collaborator, with the default
//!   [`ImageFileLoader`] backed by the `image` crate

mod gui_texture;
mod image_loader;
mod preload;
mod texture_manager;

pub use gui_texture::GuiTexture;
pub use image_loader::{DecodedFrame, DecodedTexture, ImageData, ImageFileLoader, TextureLoader};
pub use preload::PreloadBatch;
pub use texture_manager::{FrameInfo, TextureHandle, TextureKey, TextureManager};

#[cfg(test)]
pub(crate) use texture_manager::tests::{manager_with as texture_manager_for_tests, MemoryLoader};

use thiserror::Error;

/// Texture loading errors
#[derive(Debug, Error)]
pub enum TextureError {
    /// No search path contains the file
    #[error("Texture not found: {0}")]
    NotFound(String),

    /// The file exists but could not be decoded
    #[error("Failed to decode texture {name}: {reason}")]
    Decode {
        /// Texture name
        name: String,
        /// Decoder message
        reason: String,
    },

    /// IO error while reading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
