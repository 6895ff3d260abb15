//! Scrolling list container

use std::any::Any;

use super::{Control, ControlBase, ControlError, ControlType, DrawContext, SavedState};
use crate::foundation::math::Rect;
use crate::info::{PropertyBag, PropertyValue};
use crate::messages::{Action, Message, MessageId};
use crate::render::RenderTarget;
use crate::textures::{GuiTexture, PreloadBatch, TextureManager};

/// One entry of a [`ListControl`]
#[derive(Debug, Default)]
pub struct ListItem {
    /// Main text
    pub label: String,
    /// Secondary text
    pub label2: String,
    /// Item path or identifier
    pub path: String,
    /// Free-form properties
    pub properties: PropertyBag,
    icon: GuiTexture,
}

impl ListItem {
    /// Item with a label
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Set the icon texture (applied on the next allocation pass)
    #[must_use]
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = GuiTexture::new(icon);
        self
    }

    /// Icon binding
    pub fn icon(&self) -> &GuiTexture {
        &self.icon
    }
}

/// Vertical list of [`ListItem`]s with one selected position
#[derive(Debug)]
pub struct ListControl {
    base: ControlBase,
    items: Vec<ListItem>,
    selected: usize,
    offset: usize,
    item_height: f32,
    texture_focus: GuiTexture,
    texture_no_focus: GuiTexture,
    properties: PropertyBag,
    content: String,
    /// Icons of removed items, released on the next pass
    retired: Vec<GuiTexture>,
}

impl ListControl {
    /// Empty list with rows of `item_height`
    pub fn new(id: i32, rect: Rect, item_height: f32) -> Self {
        Self {
            base: ControlBase::new(id, rect),
            items: Vec::new(),
            selected: 0,
            offset: 0,
            item_height: item_height.max(1.0),
            texture_focus: GuiTexture::default(),
            texture_no_focus: GuiTexture::default(),
            properties: PropertyBag::new(),
            content: String::new(),
            retired: Vec::new(),
        }
    }

    /// Row background textures
    #[must_use]
    pub fn with_textures(mut self, focus: &str, no_focus: &str) -> Self {
        self.texture_focus = GuiTexture::new(focus);
        self.texture_no_focus = GuiTexture::new(no_focus);
        self
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an item; no position, or one past the end, appends
    pub fn add_item(&mut self, item: ListItem, position: Option<usize>) {
        match position {
            Some(pos) if pos < self.items.len() => {
                self.items.insert(pos, item);
                if pos <= self.selected {
                    self.selected += 1;
                }
            }
            _ => self.items.push(item),
        }
    }

    /// Remove and return the item at `position`
    pub fn remove_item(&mut self, position: usize) -> Option<String> {
        if position >= self.items.len() {
            return None;
        }
        let mut item = self.items.remove(position);
        self.retired.push(std::mem::take(&mut item.icon));
        if self.selected > position || self.selected >= self.items.len() {
            self.selected = self.selected.saturating_sub(1);
        }
        Some(item.label)
    }

    /// Remove every item
    pub fn clear(&mut self) {
        for mut item in self.items.drain(..) {
            self.retired.push(std::mem::take(&mut item.icon));
        }
        self.selected = 0;
        self.offset = 0;
    }

    /// Item at `position`
    pub fn item(&self, position: usize) -> Option<&ListItem> {
        self.items.get(position)
    }

    /// Item at `position`, mutable
    pub fn item_mut(&mut self, position: usize) -> Option<&mut ListItem> {
        self.items.get_mut(position)
    }

    /// Selected position (0 when empty)
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Select `position`; ignored if out of range
    pub fn select(&mut self, position: usize) -> bool {
        if position < self.items.len() {
            self.selected = position;
            true
        } else {
            false
        }
    }

    /// Selected item
    pub fn selected_item(&self) -> Option<&ListItem> {
        self.items.get(self.selected)
    }

    /// Container property (keys are case-insensitive)
    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.set(key, value);
    }

    /// Container property
    pub fn property(&self, key: &str) -> PropertyValue {
        self.properties.get(key)
    }

    /// Content type hint (`movies`, `files`, ...)
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Set the content type hint
    pub fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
    }

    /// Rows that fit in the control
    pub fn rows(&self) -> usize {
        ((self.base.rect().height / self.item_height).floor() as usize).max(1)
    }

    fn move_selection(&mut self, delta: isize, out: &mut Vec<Message>) -> bool {
        let Some(target) = self.selected.checked_add_signed(delta) else {
            return false;
        };
        if target >= self.items.len() {
            return false;
        }
        self.selected = target;
        out.push(
            Message::new(MessageId::SelChanged, self.base.parent_window(), self.base.id())
                .with_param1(i32::try_from(target).unwrap_or(i32::MAX)),
        );
        true
    }

    fn scroll_to_selection(&mut self) {
        let rows = self.rows();
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + rows {
            self.offset = self.selected + 1 - rows;
        }
    }
}

impl Control for ListControl {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn control_type(&self) -> ControlType {
        ControlType::List
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
        for item in &self.items {
            item.icon.pre_alloc(batch);
        }
    }

    fn acquire_resources(&mut self, textures: &TextureManager) -> Result<(), ControlError> {
        self.texture_focus.allocate(textures);
        self.texture_no_focus.allocate(textures);
        for item in &mut self.items {
            item.icon.allocate(textures);
        }
        Ok(())
    }

    fn release_resources(&mut self, textures: &TextureManager) {
        self.texture_focus.free(textures);
        self.texture_no_focus.free(textures);
        for item in &mut self.items {
            item.icon.free(textures);
        }
        for mut icon in self.retired.drain(..) {
            icon.free(textures);
        }
    }

    fn process_content(&mut self, now_ms: u32, textures: &TextureManager) {
        for mut icon in self.retired.drain(..) {
            icon.free(textures);
        }
        if self.base.is_allocated() {
            // items added since allocation
            for item in &mut self.items {
                item.icon.allocate(textures);
                item.icon.process(now_ms, textures);
            }
        }
        self.scroll_to_selection();
    }

    fn render_content(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        let rect = self.base.rect();
        let focused = self.base.has_focus();
        for (row, index) in (self.offset..self.items.len()).take(self.rows()).enumerate() {
            let row_rect = Rect::new(rect.x, rect.y + row as f32 * self.item_height, rect.width, self.item_height);
            let background = if focused && index == self.selected {
                &self.texture_focus
            } else {
                &self.texture_no_focus
            };
            background.render(&row_rect, draw.textures, draw.graphics, target);

            let item = &self.items[index];
            let icon_rect = Rect::new(row_rect.x, row_rect.y, self.item_height, self.item_height);
            item.icon.render(&icon_rect, draw.textures, draw.graphics, target);
            if !item.label.is_empty() {
                target.draw_text(&item.label, draw.graphics.map_rect(&row_rect), draw.graphics.final_alpha());
            }
        }
    }

    fn is_focusable(&self) -> bool {
        true
    }

    fn handle_message(&mut self, message: &mut Message, _out: &mut Vec<Message>) -> bool {
        match message.id {
            MessageId::ItemSelect => {
                if let Ok(position) = usize::try_from(message.param1) {
                    self.select(position);
                }
                true
            }
            MessageId::ItemSelected => {
                message.param1 = i32::try_from(self.selected).unwrap_or(i32::MAX);
                true
            }
            MessageId::LabelAdd => {
                self.add_item(ListItem::new(&message.label), None);
                true
            }
            MessageId::LabelReset => {
                self.clear();
                true
            }
            MessageId::RefreshThumbs => {
                // drop icons so the next pass reloads them from the cache
                for item in &mut self.items {
                    let fresh = item.icon.key().map_or_else(GuiTexture::default, |key| {
                        GuiTexture::with_color_key(key.source(), key.color_key())
                    });
                    self.retired.push(std::mem::replace(&mut item.icon, fresh));
                }
                true
            }
            _ => false,
        }
    }

    fn handle_action(&mut self, action: Action, out: &mut Vec<Message>) -> bool {
        let page = isize::try_from(self.rows()).unwrap_or(1);
        match action {
            Action::MoveUp => self.move_selection(-1, out),
            Action::MoveDown => self.move_selection(1, out),
            Action::PageUp => {
                let step = page.min(isize::try_from(self.selected).unwrap_or(0));
                step > 0 && self.move_selection(-step, out)
            }
            Action::PageDown => {
                let remaining = self.items.len().saturating_sub(self.selected + 1);
                let step = page.min(isize::try_from(remaining).unwrap_or(0));
                step > 0 && self.move_selection(step, out)
            }
            Action::Select if !self.items.is_empty() => {
                out.push(
                    Message::new(MessageId::Clicked, self.base.parent_window(), self.base.id())
                        .with_param1(i32::try_from(self.selected).unwrap_or(i32::MAX)),
                );
                true
            }
            _ => false,
        }
    }

    fn save_state(&self) -> Option<SavedState> {
        Some(SavedState::Position(self.selected))
    }

    fn restore_state(&mut self, state: SavedState) {
        if let SavedState::Position(position) = state {
            self.select(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Direction;
    use crate::textures::{texture_manager_for_tests, TextureKey};

    fn list_with(labels: &[&str]) -> ListControl {
        let mut list = ListControl::new(50, Rect::new(0.0, 0.0, 200.0, 60.0), 20.0);
        for label in labels {
            list.add_item(ListItem::new(label), None);
        }
        list.base_mut().set_focus(true);
        list
    }

    #[test]
    fn test_navigation_moves_selection_then_leaves() {
        let mut list = list_with(&["a", "b"]);
        list.base_mut().set_navigation(Direction::Down, Some(60));
        let mut out = Vec::new();

        assert!(list.on_action(Action::MoveDown, &mut out));
        assert_eq!(list.selected(), 1);
        assert_eq!(out[0].id, MessageId::SelChanged);

        out.clear();
        assert!(list.on_action(Action::MoveDown, &mut out));
        assert_eq!(out[0].id, MessageId::Move, "at the end the list hands focus on");
        assert_eq!(list.selected(), 1);
    }

    #[test]
    fn test_item_messages() {
        let mut list = list_with(&["a", "b", "c"]);
        let mut out = Vec::new();

        list.on_message(&mut Message::new(MessageId::ItemSelect, 1, 50).with_param1(2), &mut out);
        let mut query = Message::new(MessageId::ItemSelected, 1, 50);
        assert!(list.on_message(&mut query, &mut out));
        assert_eq!(query.param1, 2);

        list.on_message(&mut Message::new(MessageId::LabelAdd, 1, 50).with_label("d"), &mut out);
        assert_eq!(list.len(), 4);
        list.on_message(&mut Message::new(MessageId::LabelReset, 1, 50), &mut out);
        assert!(list.is_empty());
    }

    #[test]
    fn test_insert_and_remove_keep_selection() {
        let mut list = list_with(&["a", "b", "c"]);
        list.select(1);
        list.add_item(ListItem::new("z"), Some(0));
        assert_eq!(list.selected_item().unwrap().label, "b");

        assert_eq!(list.remove_item(0).as_deref(), Some("z"));
        assert_eq!(list.selected_item().unwrap().label, "b");
        assert_eq!(list.remove_item(9), None);
    }

    #[test]
    fn test_page_down_scrolls() {
        let mut list = list_with(&["a", "b", "c", "d", "e", "f", "g"]);
        let textures = texture_manager_for_tests(&[]);
        let mut out = Vec::new();
        assert!(list.on_action(Action::PageDown, &mut out));
        assert_eq!(list.selected(), 3);
        list.process_content(0, &textures);
        assert_eq!(list.offset, 1);
    }

    #[test]
    fn test_icons_follow_allocation() {
        let textures = texture_manager_for_tests(&[("icon.png", 1)]);
        let key = TextureKey::from_name("icon.png");
        let mut list = list_with(&[]);
        list.alloc_resources(&textures).unwrap();

        list.add_item(ListItem::new("a").with_icon("icon.png"), None);
        list.process_content(0, &textures);
        assert_eq!(textures.ref_count(&key), Some(1));

        list.remove_item(0);
        list.process_content(0, &textures);
        assert_eq!(textures.ref_count(&key), Some(0));
    }
}
