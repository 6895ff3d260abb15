//! Global info state and compiled visibility conditions
//!
//! Skins describe visibility, origins and conditional animations with boolean
//! expressions such as `Player.Playing + !Control.HasFocus(10)`. They are
//! compiled once into a [`Condition`] at load time and evaluated every frame
//! against a [`ConditionContext`].

mod condition;
mod info_manager;
mod properties;

pub use condition::{Condition, ConditionError, InfoTerm};
pub use info_manager::InfoManager;
pub use properties::{PropertyBag, PropertyValue};

use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Per-control state visible to conditions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlFlags: u8 {
        /// Control is currently visible
        const VISIBLE = 0b0001;
        /// Control has input focus
        const FOCUSED = 0b0010;
        /// Control is in its selected state (radio buttons)
        const SELECTED = 0b0100;
        /// Control accepts input
        const ENABLED = 0b1000;
    }
}

/// Snapshot of control state flags keyed by control id.
///
/// Built by the window before each visibility pass, so conditions that refer
/// to other controls see a consistent view regardless of evaluation order.
pub type ControlStates = HashMap<i32, ControlFlags>;

/// Everything a condition may be evaluated against
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Process-wide info flags
    pub info: &'a InfoManager,
    /// Properties of the window owning the condition
    pub properties: Option<&'a PropertyBag>,
    /// Control state snapshot of the owning window
    pub controls: Option<&'a ControlStates>,
}

impl<'a> ConditionContext<'a> {
    /// Context with global info only
    pub fn global(info: &'a InfoManager) -> Self {
        Self {
            info,
            properties: None,
            controls: None,
        }
    }

    /// Context scoped to a window
    pub fn for_window(info: &'a InfoManager, properties: &'a PropertyBag, controls: &'a ControlStates) -> Self {
        Self {
            info,
            properties: Some(properties),
            controls: Some(controls),
        }
    }

    fn control_flags(&self, id: i32) -> ControlFlags {
        self.controls
            .and_then(|controls| controls.get(&id).copied())
            .unwrap_or_default()
    }
}
