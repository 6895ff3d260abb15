//! Windows
//!
//! A [`Window`] owns one control tree and drives its load, allocation,
//! message and render lifecycle. The [`WindowManager`] owns every window,
//! tracks which one is active and which dialogs sit above it, and routes
//! messages and actions. Addons reach windows through [`AddonWindowBridge`].

mod addon;
mod manager;
#[allow(clippy::module_inception)]
mod window;

pub use addon::{AddonCallbacks, AddonState, AddonWindowBridge, ADDON_WINDOW_END, ADDON_WINDOW_START};
pub use manager::WindowManager;
pub use window::{LoadType, Window, WindowOrigin, WINDOW_INVALID};
