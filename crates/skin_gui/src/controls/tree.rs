//! Per-window control arena
//!
//! Controls are stored in a slotmap and linked parent → children in
//! z-order. Lifecycle passes walk the tree in document order: visibility and
//! animation top-down, allocation and freeing children-before-group. A
//! failing or panicking control is logged and skipped; its siblings are
//! still processed.

use slotmap::SecondaryMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::group::GroupControl;
use super::{Control, ControlError, ControlType, DrawContext, SavedState};
use crate::foundation::collections::{ControlArena, ControlKey};
use crate::info::{ConditionContext, ControlStates};
use crate::messages::{Action, Message};
use crate::render::RenderTarget;
use crate::textures::{PreloadBatch, TextureManager};

#[derive(Debug)]
struct Node {
    control: Box<dyn Control>,
    parent: Option<ControlKey>,
    children: Vec<ControlKey>,
}

/// Arena owning a window's controls
#[derive(Debug)]
pub struct ControlTree {
    nodes: ControlArena<Node>,
    root: ControlKey,
}

fn guarded<R>(control_id: i32, f: impl FnOnce() -> R) -> Result<R, ControlError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|_| ControlError::Panicked(control_id))
}

impl ControlTree {
    /// Tree whose root is `root` (the window's own group)
    pub fn new(root: GroupControl) -> Self {
        let mut nodes = ControlArena::with_key();
        let root = nodes.insert(Node {
            control: Box::new(root),
            parent: None,
            children: Vec::new(),
        });
        Self { nodes, root }
    }

    /// Root group key
    pub fn root(&self) -> ControlKey {
        self.root
    }

    /// Number of controls, excluding the root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// True if only the root remains
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `control` as the last child of `parent`
    pub fn add(&mut self, parent: ControlKey, control: Box<dyn Control>) -> Option<ControlKey> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let key = self.nodes.insert(Node {
            control,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(key);
        Some(key)
    }

    /// Remove a control and its subtree, releasing their resources first
    pub fn remove(&mut self, key: ControlKey, textures: &TextureManager) -> bool {
        if key == self.root || !self.nodes.contains_key(key) {
            return false;
        }
        for k in self.post_order(key) {
            self.nodes[k].control.free_resources(textures, true);
        }
        for k in self.post_order(key) {
            self.nodes.remove(k);
        }
        for node in self.nodes.values_mut() {
            node.children.retain(|child| *child != key);
        }
        true
    }

    /// Release everything and drop every control except the root
    pub fn clear(&mut self, textures: &TextureManager) {
        self.free_resources(textures, true);
        let root = self.root;
        self.nodes.retain(|key, _| key == root);
        self.nodes[root].children.clear();
    }

    /// Control by key
    pub fn get(&self, key: ControlKey) -> Option<&dyn Control> {
        self.nodes.get(key).map(|node| node.control.as_ref())
    }

    /// Control by key, mutable
    pub fn get_mut(&mut self, key: ControlKey) -> Option<&mut (dyn Control + 'static)> {
        self.nodes.get_mut(key).map(|node| node.control.as_mut())
    }

    /// The root group
    pub fn root_control(&self) -> &dyn Control {
        self.nodes[self.root].control.as_ref()
    }

    /// The root group, mutable
    pub fn root_control_mut(&mut self) -> &mut (dyn Control + 'static) {
        self.nodes[self.root].control.as_mut()
    }

    /// Children of `key` in z-order
    pub fn children(&self, key: ControlKey) -> &[ControlKey] {
        self.nodes.get(key).map_or(&[], |node| node.children.as_slice())
    }

    /// Parent of `key`
    pub fn parent(&self, key: ControlKey) -> Option<ControlKey> {
        self.nodes.get(key).and_then(|node| node.parent)
    }

    fn pre_order(&self, from: ControlKey) -> Vec<ControlKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![from];
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.nodes[key].children.iter().rev());
        }
        out
    }

    fn post_order(&self, from: ControlKey) -> Vec<ControlKey> {
        fn visit(tree: &ControlTree, key: ControlKey, out: &mut Vec<ControlKey>) {
            for &child in &tree.nodes[key].children {
                visit(tree, child, out);
            }
            out.push(key);
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        visit(self, from, &mut out);
        out
    }

    /// Every control except the root, in document order
    pub fn keys(&self) -> Vec<ControlKey> {
        let mut keys = self.pre_order(self.root);
        keys.remove(0);
        keys
    }

    /// First control with `id` in document order
    pub fn find(&self, id: i32) -> Option<ControlKey> {
        self.keys().into_iter().find(|&key| self.nodes[key].control.id() == id)
    }

    /// First control with `id`
    pub fn control(&self, id: i32) -> Option<&dyn Control> {
        self.find(id).map(|key| self.nodes[key].control.as_ref())
    }

    /// First control with `id`, mutable
    pub fn control_mut(&mut self, id: i32) -> Option<&mut (dyn Control + 'static)> {
        self.find(id).map(|key| self.nodes[key].control.as_mut())
    }

    /// First control of concrete type `T`, in document order
    pub fn first_of<T: Control + 'static>(&mut self) -> Option<&mut T> {
        let key = self
            .keys()
            .into_iter()
            .find(|&key| self.nodes[key].control.as_any().is::<T>())?;
        self.nodes[key].control.as_any_mut().downcast_mut::<T>()
    }

    /// Condition flags of every identified control (first occurrence per id)
    pub fn control_states(&self) -> ControlStates {
        let mut states = ControlStates::new();
        for key in self.keys() {
            let control = &self.nodes[key].control;
            if control.id() != 0 {
                states.entry(control.id()).or_insert_with(|| control.state_flags());
            }
        }
        states
    }

    /// Set the owning window id on every control
    pub fn set_parent_window(&mut self, window_id: i32) {
        for node in self.nodes.values_mut() {
            node.control.base_mut().set_parent_window(window_id);
        }
    }

    /// Apply a dynamic allocation policy to every control
    pub fn set_dynamic_resource_alloc(&mut self, dynamic: bool) {
        for node in self.nodes.values_mut() {
            node.control.base_mut().set_dynamic_resource_alloc(dynamic);
        }
    }

    /// Keys with whether every ancestor is shown
    fn with_parent_shown(&self, order: &[ControlKey]) -> SecondaryMap<ControlKey, bool> {
        let mut shown = SecondaryMap::new();
        let mut parent_shown = SecondaryMap::new();
        for &key in order {
            let inherited = self.nodes[key].parent.map_or(true, |p| shown.get(p).copied().unwrap_or(true));
            parent_shown.insert(key, inherited);
            shown.insert(key, inherited && self.nodes[key].control.base().is_shown());
        }
        parent_shown
    }

    fn wants_allocation(&self, key: ControlKey, parent_shown: bool) -> bool {
        let base = self.nodes[key].control.base();
        !base.dynamic_resource_alloc() || (parent_shown && base.is_shown())
    }

    /// Register textures of every control the next allocation pass will allocate
    pub fn pre_alloc_resources(&self, batch: &mut PreloadBatch) {
        let parent_shown = self.with_parent_shown(&self.pre_order(self.root));
        for key in self.post_order(self.root) {
            if self.wants_allocation(key, parent_shown[key]) {
                self.nodes[key].control.pre_alloc_resources(batch);
            }
        }
    }

    /// Allocate non-dynamic controls and every shown dynamic control.
    ///
    /// Returns the number of controls that failed.
    pub fn alloc_resources(&mut self, textures: &TextureManager) -> usize {
        let parent_shown = self.with_parent_shown(&self.pre_order(self.root));
        let mut failures = 0;
        for key in self.post_order(self.root) {
            if !self.wants_allocation(key, parent_shown[key]) {
                continue;
            }
            let control = &mut self.nodes[key].control;
            let id = control.id();
            let result = guarded(id, || control.alloc_resources(textures)).and_then(|r| r);
            if let Err(err) = result {
                log::error!("Allocation failed: {}", err);
                failures += 1;
            }
        }
        failures
    }

    /// Free every control, children before their group
    pub fn free_resources(&mut self, textures: &TextureManager, reset_animations: bool) {
        for key in self.post_order(self.root) {
            let control = &mut self.nodes[key].control;
            let id = control.id();
            if guarded(id, || control.free_resources(textures, reset_animations)).is_err() {
                log::error!("Control {} panicked while freeing resources", id);
            }
        }
    }

    /// Evaluate visibility without animating
    pub fn set_initial_visibility(&mut self, ctx: &ConditionContext<'_>) {
        for key in self.pre_order(self.root) {
            self.nodes[key].control.base_mut().set_initial_visibility(ctx);
        }
    }

    /// Update visibility top-down; with `textures`, each control is
    /// allocated or freed on demand right after its visibility changes
    pub fn update_visibility(&mut self, ctx: &ConditionContext<'_>, textures: Option<&TextureManager>) {
        let order = self.pre_order(self.root);
        let mut shown: SecondaryMap<ControlKey, bool> = SecondaryMap::new();
        for key in order {
            let parent_shown = self.nodes[key]
                .parent
                .map_or(true, |p| shown.get(p).copied().unwrap_or(true));
            let control = &mut self.nodes[key].control;
            control.update_visibility(ctx);
            if let Some(textures) = textures {
                let id = control.id();
                if guarded(id, || control.allocate_on_demand(textures, parent_shown)).is_err() {
                    log::error!("Control {} panicked during allocation", id);
                }
            }
            shown.insert(key, parent_shown && control.base().is_shown());
        }
    }

    /// Allocate or free every control to match its current shown state.
    ///
    /// Run after [`Self::animate`]: a visible animation shows its control
    /// there, and the control must hold its textures before it is drawn.
    pub fn allocate_on_demand(&mut self, textures: &TextureManager) {
        let mut shown: SecondaryMap<ControlKey, bool> = SecondaryMap::new();
        for key in self.pre_order(self.root) {
            let parent_shown = self.nodes[key]
                .parent
                .map_or(true, |p| shown.get(p).copied().unwrap_or(true));
            let control = &mut self.nodes[key].control;
            let id = control.id();
            if guarded(id, || control.allocate_on_demand(textures, parent_shown)).is_err() {
                log::error!("Control {} panicked during allocation", id);
            }
            shown.insert(key, parent_shown && control.base().is_shown());
        }
    }

    /// Advance animations and per-frame content. Returns true while any
    /// animation is running.
    pub fn animate(&mut self, now_ms: u32, textures: &TextureManager) -> bool {
        let mut running = false;
        for key in self.pre_order(self.root) {
            let control = &mut self.nodes[key].control;
            running |= control.base_mut().animate(now_ms);
            if control.base().is_allocated() {
                control.process_content(now_ms, textures);
            }
        }
        running
    }

    /// Queue an animation on every control
    pub fn queue_animation(&mut self, kind: super::AnimationType, ctx: Option<&ConditionContext<'_>>) {
        for node in self.nodes.values_mut() {
            node.control.base_mut().queue_animation(kind, ctx);
        }
    }

    /// Reset every animation (conditional ones too)
    pub fn reset_animations(&mut self) {
        for node in self.nodes.values_mut() {
            let base = node.control.base_mut();
            base.reset_animations(true);
            base.set_processed(false);
        }
    }

    /// True while any control runs an animation of `kind`
    pub fn is_animating(&self, kind: super::AnimationType) -> bool {
        self.nodes.values().any(|node| node.control.base().is_animating(kind))
    }

    /// Render the tree; groups offset their children by their position
    pub fn render(&mut self, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        self.render_node(self.root, draw, target);
    }

    fn render_node(&mut self, key: ControlKey, draw: &DrawContext<'_>, target: &mut dyn RenderTarget) {
        let children = self.nodes[key].children.clone();
        let control = &mut self.nodes[key].control;
        if !control.base().is_shown() {
            return;
        }
        if children.is_empty() {
            control.render(draw, target);
            return;
        }

        let rect = control.base().rect();
        draw.graphics.add_transform(control.base().transform());
        control.render_content(draw, target);
        draw.graphics.set_origin(rect.x, rect.y);
        for child in children {
            self.render_node(child, draw, target);
        }
        draw.graphics.restore_origin();
        draw.graphics.remove_transform();
        self.nodes[key].control.base_mut().set_processed(true);
    }

    /// Offer a message to each control in document order until one handles it
    pub fn dispatch(&mut self, message: &mut Message, out: &mut Vec<Message>) -> bool {
        for key in self.keys() {
            let control = &mut self.nodes[key].control;
            if control.id() != message.control_id {
                continue;
            }
            let id = control.id();
            match guarded(id, || control.on_message(message, out)) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => log::error!("Message {:?} dispatch failed: {}", message.id, err),
            }
        }
        false
    }

    /// Deliver a message to one control
    pub fn send_to(&mut self, key: ControlKey, message: &mut Message, out: &mut Vec<Message>) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        let control = &mut node.control;
        let id = control.id();
        guarded(id, || control.on_message(message, out)).unwrap_or_else(|err| {
            log::error!("Message {:?} dispatch failed: {}", message.id, err);
            false
        })
    }

    /// Deliver a user action to one control
    pub fn action_to(&mut self, key: ControlKey, action: Action, out: &mut Vec<Message>) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        let control = &mut node.control;
        let id = control.id();
        guarded(id, || control.on_action(action, out)).unwrap_or_else(|err| {
            log::error!("Action {:?} failed: {}", action, err);
            false
        })
    }

    fn is_group(&self, key: ControlKey) -> bool {
        self.nodes[key].control.control_type() == ControlType::Group
    }

    /// Whether `key` can take focus; a group can if any child can
    pub fn can_focus(&self, key: ControlKey) -> bool {
        let node = &self.nodes[key];
        if self.is_group(key) {
            let base = node.control.base();
            base.is_visible() && base.is_enabled() && node.children.iter().any(|&c| self.can_focus(c))
        } else {
            node.control.can_focus()
        }
    }

    fn find_in(&self, group: ControlKey, id: i32) -> Option<ControlKey> {
        self.pre_order(group)
            .into_iter()
            .skip(1)
            .find(|&key| self.nodes[key].control.id() == id)
    }

    /// Where focus lands when `key` is focused: groups hand it to their last
    /// focused child, then their default control, then the first focusable child
    pub fn focus_target(&self, key: ControlKey) -> Option<ControlKey> {
        if !self.is_group(key) {
            return self.can_focus(key).then_some(key);
        }
        let group = self.nodes[key].control.as_any().downcast_ref::<GroupControl>();
        let preferred = group
            .into_iter()
            .flat_map(|g| [g.last_focused(), g.default_control()])
            .flatten()
            .filter_map(|id| self.find_in(key, id))
            .find(|&k| self.can_focus(k));
        preferred
            .or_else(|| self.nodes[key].children.iter().copied().find(|&c| self.can_focus(c)))
            .and_then(|k| self.focus_target(k))
    }

    /// First focusable control with `id`, resolved through groups
    pub fn first_focusable(&self, id: i32) -> Option<ControlKey> {
        self.keys()
            .into_iter()
            .filter(|&key| self.nodes[key].control.id() == id && self.can_focus(key))
            .find_map(|key| self.focus_target(key))
    }

    /// Currently focused control
    pub fn focused(&self) -> Option<ControlKey> {
        self.keys()
            .into_iter()
            .find(|&key| !self.is_group(key) && self.nodes[key].control.base().has_focus())
    }

    /// Record `key` as the last focused child of each enclosing group
    pub fn note_focus(&mut self, key: ControlKey) {
        let id = self.nodes[key].control.id();
        let mut current = self.nodes[key].parent;
        while let Some(parent) = current {
            if let Some(group) = self.nodes[parent].control.as_any_mut().downcast_mut::<GroupControl>() {
                group.set_last_focused(Some(id));
            }
            current = self.nodes[parent].parent;
        }
    }

    /// Saved states of identified controls
    pub fn save_states(&self) -> Vec<(i32, SavedState)> {
        self.keys()
            .into_iter()
            .filter_map(|key| {
                let control = &self.nodes[key].control;
                (control.id() != 0)
                    .then(|| control.save_state())
                    .flatten()
                    .map(|state| (control.id(), state))
            })
            .collect()
    }

    /// Restore saved states by id
    pub fn restore_states(&mut self, states: &[(i32, SavedState)]) {
        for &(id, state) in states {
            if let Some(control) = self.control_mut(id) {
                control.restore_state(state);
            }
        }
    }
}
