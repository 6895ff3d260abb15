//! # Skin GUI
//!
//! The window and control core of a skinnable media-center interface.
//! Windows are described by skin XML, built into per-window control trees
//! and driven through a load / allocate / render / free lifecycle against a
//! shared, reference-counted texture cache.
//!
//! ## Features
//!
//! - **Skin loading**: window XML from per-resolution folders, scaled to the display
//! - **Conditional visibility**: controls, animations, origins and dialogs follow
//!   boolean conditions over global flags and control state
//! - **Dynamic resource allocation**: hidden controls give their textures back
//! - **Texture cache**: two-phase preload, animated frames, deferred reclamation
//! - **Message routing**: focus navigation, clicks and broadcasts between windows and controls
//! - **Addon windows**: runtime-created windows driven by third-party callbacks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skin_gui::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GuiConfig::load_from_file("gui.toml")?;
//!     let context = GuiContext::new(config);
//!     let mut windows = WindowManager::new(context);
//!
//!     windows.register(10000, "Home.xml");
//!     windows.activate_window(10000);
//!
//!     let mut frame = DrawList::new();
//!     windows.process(0);
//!     windows.render(&mut frame)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod context;
pub mod controls;
pub mod foundation;
pub mod info;
pub mod messages;
pub mod render;
pub mod skin;
pub mod textures;
pub mod window;

#[cfg(test)]
mod tests;

pub use context::GuiContext;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::{Config, GuiConfig},
        context::GuiContext,
        controls::{Control, ControlFactory, ControlTree, DefaultControlFactory},
        foundation::{
            math::{Point, Rect, Resolution},
            time::FrameClock,
        },
        info::{Condition, InfoManager, PropertyValue},
        messages::{Action, Direction, Message, MessageId},
        render::{DrawList, RenderTarget},
        textures::TextureManager,
        window::{AddonCallbacks, AddonWindowBridge, LoadType, Window, WindowManager},
    };
}
