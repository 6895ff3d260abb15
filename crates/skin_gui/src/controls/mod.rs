//! Controls
//!
//! Every element of a window implements [`Control`]. Shared behaviour (the
//! visibility/allocation state machine, focus, navigation and the common
//! messages) lives in provided trait methods working on the embedded
//! [`ControlBase`]; concrete controls override the small hooks
//! ([`Control::acquire_resources`], [`Control::render_content`],
//! [`Control::handle_message`], ...) for what is specific to them.
//!
//! Controls are owned by a per-window [`ControlTree`] arena.

pub mod animation;
mod base;
mod button;
mod factory;
mod group;
mod image;
mod label;
mod list;
mod radio_button;
mod tree;

pub use animation::{Animation, AnimationEffect, AnimationProcess, AnimationState, AnimationType, Easing, Tween};
pub use base::{ControlBase, VisibleState};
pub use button::ButtonControl;
pub use factory::{populate, ControlFactory, DefaultControlFactory};
pub(crate) use factory::lenient_condition;
pub use group::GroupControl;
pub use image::ImageControl;
pub use label::LabelControl;
pub use list::{ListControl, ListItem};
pub use radio_button::RadioButtonControl;
pub use tree::ControlTree;

use std::any::Any;
use thiserror::Error;

use crate::info::{ConditionContext, ControlFlags};
use crate::messages::{Action, Message, MessageId};
use crate::render::{GraphicsContext, RenderTarget};
use crate::textures::{PreloadBatch, TextureManager};

/// Errors raised while a control acquires its resources
#[derive(Debug, Error)]
pub enum ControlError {
    /// A resource could not be acquired
    #[error("Control {control_id}: {reason}")]
    Resource {
        /// Control id
        control_id: i32,
        /// What failed
        reason: String,
    },

    /// The control panicked; it is left unallocated
    #[error("Control {0} panicked")]
    Panicked(i32),
}

/// Concrete control kind, used for typed lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    /// [`ImageControl`]
    Image,
    /// [`LabelControl`]
    Label,
    /// [`ButtonControl`]
    Button,
    /// [`RadioButtonControl`]
    RadioButton,
    /// [`GroupControl`]
    Group,
    /// [`ListControl`]
    List,
}

impl ControlType {
    /// Skin XML type name
    pub fn name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Label => "label",
            Self::Button => "button",
            Self::RadioButton => "radiobutton",
            Self::Group => "group",
            Self::List => "list",
        }
    }
}

/// Control state carried across a window close/open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedState {
    /// Radio button selection
    Selected(bool),
    /// Container selection
    Position(usize),
}

/// Shared services for one render pass
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    /// Texture cache
    pub textures: &'a TextureManager,
    /// Graphics state (origin, transforms, scaling)
    pub graphics: &'a GraphicsContext,
    /// Frame time in milliseconds
    pub now_ms: u32,
}

/// A node of the window's control tree
pub trait Control: Send + std::fmt::Debug {
    /// Shared state
    fn base(&self) -> &ControlBase;

    /// Shared state, mutable
    fn base_mut(&mut self) -> &mut ControlBase;

    /// Concrete kind
    fn control_type(&self) -> ControlType;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Control id
    fn id(&self) -> i32 {
        self.base().id()
    }

    // ---- hooks ----

    /// Register texture names with a preload batch
    fn pre_alloc_resources(&self, _batch: &mut PreloadBatch) {}

    /// Take texture references. A missing texture is not an error; the
    /// control simply draws less.
    fn acquire_resources(&mut self, _textures: &TextureManager) -> Result<(), ControlError> {
        Ok(())
    }

    /// Drop every reference taken by [`Self::acquire_resources`]
    fn release_resources(&mut self, _textures: &TextureManager) {}

    /// Per-frame work after animation (texture frame animation, scrolling)
    fn process_content(&mut self, _now_ms: u32, _textures: &TextureManager) {}

    /// Draw the control's own content
    fn render_content(&mut self, _draw: &DrawContext<'_>, _target: &mut dyn RenderTarget) {}

    /// Whether this kind of control can ever take focus
    fn is_focusable(&self) -> bool {
        false
    }

    /// Selected state, for radio buttons and similar
    fn is_selected(&self) -> bool {
        false
    }

    /// Handle a message addressed to this control; return false to fall
    /// through to the common handling
    fn handle_message(&mut self, _message: &mut Message, _out: &mut Vec<Message>) -> bool {
        false
    }

    /// Handle an action while focused; return false to fall through to
    /// directional navigation
    fn handle_action(&mut self, _action: Action, _out: &mut Vec<Message>) -> bool {
        false
    }

    /// State to restore the next time the window opens
    fn save_state(&self) -> Option<SavedState> {
        None
    }

    /// Restore a state from [`Self::save_state`]
    fn restore_state(&mut self, _state: SavedState) {}

    // ---- provided ----

    /// Focusable, visible and enabled
    fn can_focus(&self) -> bool {
        self.is_focusable() && self.base().is_visible() && self.base().is_enabled()
    }

    /// Flags seen by `Control.*` conditions
    fn state_flags(&self) -> ControlFlags {
        self.base().flags(self.is_selected())
    }

    /// Acquire resources if not already allocated
    fn alloc_resources(&mut self, textures: &TextureManager) -> Result<(), ControlError> {
        if self.base().is_allocated() {
            return Ok(());
        }
        if let Err(err) = self.acquire_resources(textures) {
            self.release_resources(textures);
            return Err(err);
        }
        self.base_mut().set_allocated(true);
        Ok(())
    }

    /// Release resources. Animations survive unless `reset_animations`.
    fn free_resources(&mut self, textures: &TextureManager, reset_animations: bool) {
        if self.base().is_allocated() {
            self.release_resources(textures);
            self.base_mut().set_allocated(false);
        }
        if reset_animations {
            let base = self.base_mut();
            base.reset_animations(false);
            base.set_processed(false);
        }
    }

    /// Free a hidden dynamic control, allocate a shown one.
    ///
    /// `parent_shown` is false when an ancestor group is hidden.
    fn allocate_on_demand(&mut self, textures: &TextureManager, parent_shown: bool) {
        let base = self.base();
        let shown = parent_shown && base.is_shown();
        if !shown {
            if base.dynamic_resource_alloc() && base.is_allocated() {
                log::trace!("Freeing hidden control {}", base.id());
                self.free_resources(textures, false);
            }
        } else if !base.is_allocated() {
            if let Err(err) = self.alloc_resources(textures) {
                log::error!("Failed to allocate control {}: {}", self.id(), err);
            }
        }
    }

    /// Recompute visibility against `ctx`
    fn update_visibility(&mut self, ctx: &ConditionContext<'_>) {
        self.base_mut().update_visibility(ctx);
    }

    /// Draw the control under its animation transform; no-op unless shown
    fn render(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        if !self.base().is_shown() {
            return;
        }
        draw.graphics.add_transform(self.base().transform());
        self.render_content(draw, target);
        draw.graphics.remove_transform();
        self.base_mut().set_processed(true);
    }

    /// Dispatch a message: control-specific handling first, then the
    /// common focus/visibility/enable messages
    fn on_message(&mut self, message: &mut Message, out: &mut Vec<Message>) -> bool {
        if message.control_id != self.id() {
            return false;
        }
        if self.handle_message(message, out) {
            return true;
        }
        match message.id {
            MessageId::SetFocus => {
                if !self.can_focus() {
                    log::error!(
                        "Control {} in window {} asked to focus, but it can't",
                        self.id(),
                        self.base().parent_window()
                    );
                    return false;
                }
                self.base_mut().set_focus(true);
                out.push(Message::new(MessageId::Focused, self.base().parent_window(), self.id()));
                true
            }
            MessageId::LostFocus => {
                self.base_mut().set_focus(false);
                true
            }
            MessageId::Visible => {
                self.base_mut().set_visible(true);
                true
            }
            MessageId::Hidden => {
                self.base_mut().set_visible(false);
                true
            }
            MessageId::Enabled => {
                self.base_mut().set_enabled(true);
                true
            }
            MessageId::Disabled => {
                self.base_mut().set_enabled(false);
                true
            }
            _ => false,
        }
    }

    /// Handle a user action while focused
    fn on_action(&mut self, action: Action, out: &mut Vec<Message>) -> bool {
        if !self.base().has_focus() {
            return false;
        }
        if self.handle_action(action, out) {
            return true;
        }
        let Some(direction) = action.direction() else {
            return false;
        };
        if self.base().navigation(direction).is_none() {
            return false;
        }
        out.push(
            Message::new(MessageId::Move, self.base().parent_window(), self.id()).with_param1(direction.raw()),
        );
        true
    }
}
