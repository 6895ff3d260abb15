//! Push button

use std::any::Any;

use super::{Control, ControlBase, ControlError, ControlType, DrawContext};
use crate::foundation::math::Rect;
use crate::messages::{Action, Message, MessageId};
use crate::render::RenderTarget;
use crate::textures::{GuiTexture, PreloadBatch, TextureManager};

/// Focusable button with focus/no-focus textures and a label.
///
/// `Select` while focused sends `Clicked` to the window.
#[derive(Debug)]
pub struct ButtonControl {
    base: ControlBase,
    texture_focus: GuiTexture,
    texture_no_focus: GuiTexture,
    label: String,
}

impl ButtonControl {
    /// Button without textures or label
    pub fn new(id: i32, rect: Rect) -> Self {
        Self {
            base: ControlBase::new(id, rect),
            texture_focus: GuiTexture::default(),
            texture_no_focus: GuiTexture::default(),
            label: String::new(),
        }
    }

    /// Set the focused and unfocused textures
    #[must_use]
    pub fn with_textures(mut self, focus: &str, no_focus: &str) -> Self {
        self.texture_focus = GuiTexture::new(focus);
        self.texture_no_focus = GuiTexture::new(no_focus);
        self
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Current label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the label
    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    /// Texture drawn while focused
    pub fn focus_texture(&self) -> &GuiTexture {
        &self.texture_focus
    }

    /// Texture drawn while not focused
    pub fn no_focus_texture(&self) -> &GuiTexture {
        &self.texture_no_focus
    }

    pub(super) fn click_message(&self) -> Message {
        Message::new(MessageId::Clicked, self.base.parent_window(), self.base.id())
    }
}

impl Control for ButtonControl {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn control_type(&self) -> ControlType {
        ControlType::Button
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pre_alloc_resources(&self, batch: &mut PreloadBatch) {
        self.texture_focus.pre_alloc(batch);
        self.texture_no_focus.pre_alloc(batch);
    }

    fn acquire_resources(&mut self, textures: &TextureManager) -> Result<(), ControlError> {
        self.texture_focus.allocate(textures);
        self.texture_no_focus.allocate(textures);
        Ok(())
    }

    fn release_resources(&mut self, textures: &TextureManager) {
        self.texture_focus.free(textures);
        self.texture_no_focus.free(textures);
    }

    fn process_content(&mut self, now_ms: u32, textures: &TextureManager) {
        self.texture_focus.process(now_ms, textures);
        self.texture_no_focus.process(now_ms, textures);
    }

    fn render_content(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        let rect = self.base.rect();
        let texture = if self.base.has_focus() {
            &self.texture_focus
        } else {
            &self.texture_no_focus
        };
        texture.render(&rect, draw.textures, draw.graphics, target);
        if !self.label.is_empty() {
            target.draw_text(&self.label, draw.graphics.map_rect(&rect), draw.graphics.final_alpha());
        }
    }

    fn is_focusable(&self) -> bool {
        true
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

    fn handle_action(&mut self, action: Action, out: &mut Vec<Message>) -> bool {
        if action == Action::Select {
            out.push(self.click_message());
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, DrawList, GraphicsContext};
    use crate::textures::texture_manager_for_tests;

    #[test]
    fn test_select_clicks() {
        let mut button = ButtonControl::new(10, Rect::default());
        button.base_mut().set_parent_window(3);
        button.base_mut().set_focus(true);

        let mut out = Vec::new();
        assert!(button.on_action(Action::Select, &mut out));
        assert_eq!(out, vec![Message::new(MessageId::Clicked, 3, 10)]);
    }

    #[test]
    fn test_renders_texture_for_focus_state() {
        let textures = texture_manager_for_tests(&[("focus.png", 1), ("nofocus.png", 1)]);
        let graphics = GraphicsContext::default();
        let mut button = ButtonControl::new(10, Rect::new(0.0, 0.0, 50.0, 20.0))
            .with_textures("focus.png", "nofocus.png")
            .with_label("OK");
        button.alloc_resources(&textures).unwrap();
        let draw = DrawContext {
            textures: &textures,
            graphics: &graphics,
            now_ms: 0,
        };

        let mut list = DrawList::new();
        button.render(&draw, &mut list);
        let unfocused = list.commands()[0].clone();

        button.base_mut().set_focus(true);
        list.clear();
        button.render(&draw, &mut list);
        assert_ne!(list.commands()[0], unfocused);
        assert!(matches!(list.commands()[1], DrawCommand::Text { .. }));

        button.free_resources(&textures, true);
        assert_eq!(textures.ref_count(button.focus_texture().key().unwrap()), Some(0));
    }
}
