//! # GUI Runtime Configuration
//!
//! Configuration for the display, the active skin, the texture cache and
//! window defaults. Every section has sensible defaults so a partial file
//! only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::Config;
use crate::foundation::math::Resolution;

/// Top-level GUI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Actual output resolution that skin coordinates are scaled to
    pub display: DisplayConfig,
    /// Skin location and the resolutions it provides
    pub skin: SkinConfig,
    /// Texture cache tuning
    pub textures: TextureConfig,
    /// Defaults applied to every window
    pub windows: WindowDefaults,
}

impl Config for GuiConfig {}

/// Display settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Output resolution
    pub resolution: Resolution,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::HD_1080,
        }
    }
}

/// A resolution folder provided by the skin (e.g. `720p` at 1280x720)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinResolution {
    /// Folder under the skin root holding window XML for this resolution
    pub folder: String,
    /// Coordinate resolution the XML in that folder is authored against
    pub resolution: Resolution,
}

/// Skin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    /// Skin root directory
    pub path: PathBuf,
    /// Resolution folders in lookup order
    pub resolutions: Vec<SkinResolution>,
    /// Media folder (relative to the skin root) searched for textures
    pub media_folder: String,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("skin"),
            resolutions: vec![SkinResolution {
                folder: "720p".to_string(),
                resolution: Resolution::HD_720,
            }],
            media_folder: "media".to_string(),
        }
    }
}

/// Texture cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// How long a texture with no references stays cached before cleanup reclaims it
    pub unused_grace_ms: u64,
    /// Extra directories searched for textures
    pub extra_paths: Vec<PathBuf>,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            unused_grace_ms: 1000,
            extra_paths: Vec::new(),
        }
    }
}

/// Defaults applied to windows when they are loaded
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDefaults {
    /// Free control resources while hidden
    pub dynamic_resource_alloc: bool,
    /// Restore the last focused control when a window is shown again
    pub save_last_control: bool,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            dynamic_resource_alloc: true,
            save_last_control: true,
        }
    }
}
