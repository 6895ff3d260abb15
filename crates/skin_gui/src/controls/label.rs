//! Text label

use std::any::Any;

use super::{Control, ControlBase, ControlType, DrawContext};
use crate::foundation::math::Rect;
use crate::messages::{Message, MessageId};
use crate::render::RenderTarget;

/// Single line of text
#[derive(Debug)]
pub struct LabelControl {
    base: ControlBase,
    label: String,
}

impl LabelControl {
    /// Label showing `text`
    pub fn new(id: i32, rect: Rect, text: &str) -> Self {
        Self {
            base: ControlBase::new(id, rect),
            label: text.to_string(),
        }
    }

    /// Current text
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the text
    pub fn set_label(&mut self, text: &str) {
        self.label = text.to_string();
    }
}

impl Control for LabelControl {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn control_type(&self) -> ControlType {
        ControlType::Label
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_message(&mut self, message: &mut Message, _out: &mut Vec<Message>) -> bool {
        match message.id {
            MessageId::LabelSet => {
                self.label = message.label.clone();
                true
            }
            MessageId::LabelReset => {
                self.label.clear();
                true
            }
            _ => false,
        }
    }

    fn render_content(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        if !self.label.is_empty() {
            target.draw_text(&self.label, draw.graphics.map_rect(&self.base.rect()), draw.graphics.final_alpha());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_messages() {
        let mut label = LabelControl::new(2, Rect::default(), "Hello");
        let mut out = Vec::new();

        assert!(label.on_message(&mut Message::new(MessageId::LabelSet, 1, 2).with_label("World"), &mut out));
        assert_eq!(label.label(), "World");
        assert!(label.on_message(&mut Message::new(MessageId::LabelReset, 1, 2), &mut out));
        assert_eq!(label.label(), "");
        assert!(!label.can_focus());
    }
}
