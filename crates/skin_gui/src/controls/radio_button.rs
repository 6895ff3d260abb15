//! Toggle button

use std::any::Any;

use super::button::ButtonControl;
use super::{Control, ControlBase, ControlError, ControlType, DrawContext, SavedState};
use crate::foundation::math::Rect;
use crate::messages::{Action, Message, MessageId};
use crate::render::RenderTarget;
use crate::textures::{GuiTexture, PreloadBatch, TextureManager};

/// A button with a selected state shown by an extra on/off texture
#[derive(Debug)]
pub struct RadioButtonControl {
    button: ButtonControl,
    radio_on: GuiTexture,
    radio_off: GuiTexture,
    radio_rect: Rect,
    selected: bool,
}

impl RadioButtonControl {
    /// Wrap a button
    pub fn new(button: ButtonControl) -> Self {
        let rect = button.base().rect();
        let size = rect.height.min(rect.width);
        Self {
            button,
            radio_on: GuiTexture::default(),
            radio_off: GuiTexture::default(),
            radio_rect: Rect::new(rect.right() - size, rect.y, size, size),
            selected: false,
        }
    }

    /// Set the on/off indicator textures
    #[must_use]
    pub fn with_radio_textures(mut self, on: &str, off: &str) -> Self {
        self.radio_on = GuiTexture::new(on);
        self.radio_off = GuiTexture::new(off);
        self
    }

    /// The wrapped button
    pub fn button(&self) -> &ButtonControl {
        &self.button
    }

    /// Current label
    pub fn label(&self) -> &str {
        self.button.label()
    }

    /// Replace the label
    pub fn set_label(&mut self, label: &str) {
        self.button.set_label(label);
    }

    /// Selected state
    pub fn selected(&self) -> bool {
        self.selected
    }

    /// Set the selected state
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Control for RadioButtonControl {
    fn base(&self) -> &ControlBase {
        self.button.base()
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        self.button.base_mut()
    }

    fn control_type(&self) -> ControlType {
        ControlType::RadioButton
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pre_alloc_resources(&self, batch: &mut PreloadBatch) {
        self.button.pre_alloc_resources(batch);
        self.radio_on.pre_alloc(batch);
        self.radio_off.pre_alloc(batch);
    }

    fn acquire_resources(&mut self, textures: &TextureManager) -> Result<(), ControlError> {
        self.button.acquire_resources(textures)?;
        self.radio_on.allocate(textures);
        self.radio_off.allocate(textures);
        Ok(())
    }

    fn release_resources(&mut self, textures: &TextureManager) {
        self.button.release_resources(textures);
        self.radio_on.free(textures);
        self.radio_off.free(textures);
    }

    fn process_content(&mut self, now_ms: u32, textures: &TextureManager) {
        self.button.process_content(now_ms, textures);
        self.radio_on.process(now_ms, textures);
        self.radio_off.process(now_ms, textures);
    }

    fn render_content(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        self.button.render_content(draw, target);
        let indicator = if self.selected { &self.radio_on } else { &self.radio_off };
        indicator.render(&self.radio_rect, draw.textures, draw.graphics, target);
    }

    fn is_focusable(&self) -> bool {
        true
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    fn handle_message(&mut self, message: &mut Message, out: &mut Vec<Message>) -> bool {
        match message.id {
            MessageId::SetSelected => {
                self.selected = true;
                true
            }
            MessageId::SetDeselected => {
                self.selected = false;
                true
            }
            _ => self.button.handle_message(message, out),
        }
    }

    fn handle_action(&mut self, action: Action, out: &mut Vec<Message>) -> bool {
        if action == Action::Select {
            self.selected = !self.selected;
            out.push(self.button.click_message());
            return true;
        }
        false
    }

    fn save_state(&self) -> Option<SavedState> {
        Some(SavedState::Selected(self.selected))
    }

    fn restore_state(&mut self, state: SavedState) {
        if let SavedState::Selected(selected) = state {
            self.selected = selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::ControlFlags;

    #[test]
    fn test_click_toggles_selection() {
        let mut radio = RadioButtonControl::new(ButtonControl::new(4, Rect::new(0.0, 0.0, 100.0, 20.0)));
        radio.base_mut().set_focus(true);
        let mut out = Vec::new();

        assert!(radio.on_action(Action::Select, &mut out));
        assert!(radio.selected());
        assert!(radio.state_flags().contains(ControlFlags::SELECTED));
        assert_eq!(out[0].id, MessageId::Clicked);

        radio.on_action(Action::Select, &mut out);
        assert!(!radio.selected());
    }

    #[test]
    fn test_selection_messages_and_state() {
        let mut radio = RadioButtonControl::new(ButtonControl::new(4, Rect::default()));
        let mut out = Vec::new();
        assert!(radio.on_message(&mut Message::new(MessageId::SetSelected, 1, 4), &mut out));
        assert_eq!(radio.save_state(), Some(SavedState::Selected(true)));

        radio.on_message(&mut Message::new(MessageId::SetDeselected, 1, 4), &mut out);
        radio.restore_state(SavedState::Selected(true));
        assert!(radio.selected());

        assert!(radio.on_message(&mut Message::new(MessageId::LabelSet, 1, 4).with_label("Shuffle"), &mut out));
        assert_eq!(radio.label(), "Shuffle");
    }
}
