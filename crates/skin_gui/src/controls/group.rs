//! Control group

use std::any::Any;

use super::{Control, ControlBase, ControlType};
use crate::foundation::math::Rect;

/// A control whose children are positioned relative to it.
///
/// Children live in the window's [`super::ControlTree`]; the group itself
/// only keeps focus bookkeeping. It can take focus whenever one of its
/// children can, passing it on to the last focused child or its default
/// control.
#[derive(Debug)]
pub struct GroupControl {
    base: ControlBase,
    default_control: Option<i32>,
    last_focused: Option<i32>,
}

impl GroupControl {
    /// Empty group
    pub fn new(id: i32, rect: Rect) -> Self {
        Self {
            base: ControlBase::new(id, rect),
            default_control: None,
            last_focused: None,
        }
    }

    /// Child focused when the group receives focus
    pub fn default_control(&self) -> Option<i32> {
        self.default_control
    }

    /// Set the default child
    pub fn set_default_control(&mut self, id: Option<i32>) {
        self.default_control = id.filter(|id| *id != 0);
    }

    /// Child that last had focus
    pub fn last_focused(&self) -> Option<i32> {
        self.last_focused
    }

    pub(crate) fn set_last_focused(&mut self, id: Option<i32>) {
        self.last_focused = id;
    }
}

impl Control for GroupControl {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn control_type(&self) -> ControlType {
        ControlType::Group
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
