//! Image loading utilities for texture data
//!
//! Provides PNG and animated GIF loading for the texture cache.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};

use super::TextureError;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load a still image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref).map_err(|e| TextureError::Decode {
            name: path_ref.display().to_string(),
            reason: e.to_string(),
        })?;

        // Convert to RGBA8 format (standard for GPU upload)
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes).map_err(|e| TextureError::Decode {
            name: "<memory>".to_string(),
            reason: e.to_string(),
        })?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self { data, width, height }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// One decoded frame of a texture
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Pixels
    pub image: ImageData,
    /// How long the frame is shown, in milliseconds (0 for still images)
    pub delay_ms: u32,
}

/// A decoded texture: one frame for still images, several for animations
#[derive(Debug, Clone)]
pub struct DecodedTexture {
    /// Frames in display order
    pub frames: Vec<DecodedFrame>,
    /// Number of times the animation plays; 0 loops forever
    pub loops: u32,
}

impl DecodedTexture {
    /// Single-frame texture
    pub fn still(image: ImageData) -> Self {
        Self {
            frames: vec![DecodedFrame { image, delay_ms: 0 }],
            loops: 0,
        }
    }
}

/// Storage and decoding collaborator used by the texture manager
pub trait TextureLoader: Send + Sync {
    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Decode the file at `path`
    fn decode(&self, path: &Path) -> Result<DecodedTexture, TextureError>;
}

/// Loader reading images from the filesystem with the `image` crate.
///
/// GIF files decode every frame with its delay; other formats decode to a
/// single still frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl ImageFileLoader {
    fn decode_gif(path: &Path) -> Result<DecodedTexture, TextureError> {
        let decode_err = |e: image::ImageError| TextureError::Decode {
            name: path.display().to_string(),
            reason: e.to_string(),
        };

        let reader = BufReader::new(File::open(path)?);
        let decoder = GifDecoder::new(reader).map_err(decode_err)?;
        let frames = decoder.into_frames().collect_frames().map_err(decode_err)?;

        let frames: Vec<DecodedFrame> = frames
            .into_iter()
            .map(|frame| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay_ms = if denom == 0 { 0 } else { numer / denom };
                let buffer = frame.into_buffer();
                let (width, height) = buffer.dimensions();
                DecodedFrame {
                    image: ImageData {
                        data: buffer.into_raw(),
                        width,
                        height,
                    },
                    delay_ms,
                }
            })
            .collect();

        if frames.is_empty() {
            return Err(TextureError::Decode {
                name: path.display().to_string(),
                reason: "animation has no frames".to_string(),
            });
        }

        log::debug!("Decoded {} animation frames from {:?}", frames.len(), path);
        Ok(DecodedTexture { frames, loops: 0 })
    }
}

impl TextureLoader for ImageFileLoader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn decode(&self, path: &Path) -> Result<DecodedTexture, TextureError> {
        if !path.is_file() {
            return Err(TextureError::NotFound(path.display().to_string()));
        }
        match ImageFormat::from_path(path) {
            Ok(ImageFormat::Gif) => Self::decode_gif(path),
            _ => ImageData::from_file(path).map(DecodedTexture::still),
        }
    }
}
