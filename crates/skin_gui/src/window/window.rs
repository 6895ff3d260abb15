//! A skin window: control tree plus window-level state

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use super::addon::{AddonCallbacks, AddonState};
use crate::context::GuiContext;
use crate::controls::{
    lenient_condition, populate, Animation, AnimationType, Control, ControlTree, DrawContext, GroupControl,
    SavedState,
};
use crate::foundation::math::{Point, Rect, Resolution};
use crate::info::{Condition, ConditionContext, PropertyBag, PropertyValue};
use crate::messages::{Action, Direction, Message, MessageId};
use crate::render::{RenderError, RenderTarget};
use crate::skin::xml::parse_bool;
use crate::skin::{SkinError, SkinInfo, XmlElement};

/// Id a window takes when its skin file cannot be loaded
pub const WINDOW_INVALID: i32 = 9999;

/// When a window's skin file is parsed and dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadType {
    /// Parse on every show, unload on every hide
    #[default]
    LoadEveryTime,
    /// Parse once when the GUI starts, keep the tree while hidden
    LoadOnGuiInit,
    /// Parse on first show and keep the tree afterwards
    KeepInMemory,
}

/// Alternative window anchor, used while its condition holds
#[derive(Debug, Clone)]
pub struct WindowOrigin {
    /// Left edge in skin coordinates
    pub x: f32,
    /// Top edge in skin coordinates
    pub y: f32,
    /// `None` always matches
    pub condition: Option<Condition>,
}

/// A top-level window or dialog
pub struct Window {
    id: i32,
    /// Id the window was registered with; restored before each load attempt
    requested_id: i32,
    xml_file: String,
    context: Arc<GuiContext>,
    skin: Option<SkinInfo>,
    tree: ControlTree,

    loaded: bool,
    allocated: bool,
    load_type: LoadType,
    dynamic_resource_alloc: bool,
    save_last_control: bool,

    coords_res: Resolution,
    relative_coords: bool,
    position: Point,
    origins: Vec<WindowOrigin>,
    camera: Option<Point>,

    is_dialog: bool,
    previous_window: Option<i32>,
    default_control: Option<i32>,
    default_always: bool,
    last_focused: Option<i32>,
    visible_condition: Option<Condition>,
    render_order: i32,
    overlay: Option<bool>,

    properties: PropertyBag,
    saved_states: Vec<(i32, SavedState)>,
    active: bool,
    closing: bool,
    now_ms: u32,
    addon: Option<AddonState>,
    outbox: Vec<Message>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("xml_file", &self.xml_file)
            .field("loaded", &self.loaded)
            .field("allocated", &self.allocated)
            .field("controls", &self.tree.len())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_precision_loss)]
fn root_group(res: Resolution) -> GroupControl {
    GroupControl::new(0, Rect::new(0.0, 0.0, res.width as f32, res.height as f32))
}

impl Window {
    /// Window `id` built from `xml_file` in the active skin
    pub fn new(id: i32, xml_file: &str, context: Arc<GuiContext>) -> Self {
        let defaults = context.config.windows;
        let coords_res = context.skin.default_resolution();
        Self {
            id,
            requested_id: id,
            xml_file: xml_file.to_string(),
            skin: None,
            tree: ControlTree::new(root_group(coords_res)),
            loaded: false,
            allocated: false,
            load_type: LoadType::default(),
            dynamic_resource_alloc: defaults.dynamic_resource_alloc,
            save_last_control: defaults.save_last_control,
            coords_res,
            relative_coords: false,
            position: Point::new(0.0, 0.0),
            origins: Vec::new(),
            camera: None,
            is_dialog: false,
            previous_window: None,
            default_control: None,
            default_always: false,
            last_focused: None,
            visible_condition: None,
            render_order: 0,
            overlay: None,
            properties: PropertyBag::new(),
            saved_states: Vec::new(),
            active: false,
            closing: false,
            now_ms: 0,
            addon: None,
            outbox: Vec::new(),
            context,
        }
    }

    // ---- identity and state ----

    /// Window id, [`WINDOW_INVALID`] while the last load attempt has failed
    pub fn id(&self) -> i32 {
        self.id
    }

    /// False once loading the skin file has failed
    pub fn is_valid(&self) -> bool {
        self.id != WINDOW_INVALID
    }

    /// Skin file name
    pub fn xml_file(&self) -> &str {
        &self.xml_file
    }

    /// Shared services
    pub fn context(&self) -> &Arc<GuiContext> {
        &self.context
    }

    /// Skin file parsed into the control tree
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Control resources resident
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Shown (between init and deinit)
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deinitialised but still playing its close animation
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Declared `<type>dialog</type>`
    pub fn is_dialog(&self) -> bool {
        self.is_dialog
    }

    /// Mark as a dialog (addon dialogs have no skin type)
    pub fn set_dialog(&mut self, dialog: bool) {
        self.is_dialog = dialog;
    }

    /// Load policy
    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    /// Change the load policy
    pub fn set_load_type(&mut self, load_type: LoadType) {
        self.load_type = load_type;
    }

    /// Whether controls free their resources while hidden
    pub fn dynamic_resource_alloc(&self) -> bool {
        self.dynamic_resource_alloc
    }

    /// Change the dynamic allocation policy for the window and its controls
    pub fn set_dynamic_resource_alloc(&mut self, dynamic: bool) {
        self.dynamic_resource_alloc = dynamic;
        self.tree.set_dynamic_resource_alloc(dynamic);
    }

    /// Keep the focused control across hide/show
    pub fn set_save_last_control(&mut self, save: bool) {
        self.save_last_control = save;
    }

    /// Coordinate resolution the skin file was authored against
    pub fn coords_res(&self) -> Resolution {
        self.coords_res
    }

    /// Override the coordinate resolution
    pub fn set_coords_res(&mut self, res: Resolution) {
        self.coords_res = res;
    }

    /// Window to return to on back, from `<previouswindow>`
    pub fn previous_window(&self) -> Option<i32> {
        self.previous_window
    }

    /// Control focused on show
    pub fn default_control(&self) -> Option<i32> {
        self.default_control
    }

    /// Control focused when the window was last hidden
    pub fn last_focused(&self) -> Option<i32> {
        self.last_focused
    }

    /// Condition under which a dialog opens by itself
    pub fn visible_condition(&self) -> Option<&Condition> {
        self.visible_condition.as_ref()
    }

    /// Render order (`<zorder>`)
    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    /// Overlay policy (`<allowoverlay>`), `None` when unspecified
    pub fn allow_overlay(&self) -> Option<bool> {
        self.overlay
    }

    /// Camera position for perspective effects
    pub fn camera(&self) -> Option<Point> {
        self.camera
    }

    /// Controls positioned relative to the window origin
    pub fn relative_coords(&self) -> bool {
        self.relative_coords
    }

    /// Alternative origins in priority order
    pub fn origins(&self) -> &[WindowOrigin] {
        &self.origins
    }

    /// Control tree
    pub fn tree(&self) -> &ControlTree {
        &self.tree
    }

    /// Control tree, mutable
    pub fn tree_mut(&mut self) -> &mut ControlTree {
        &mut self.tree
    }

    /// Control with `id`
    pub fn control(&self, id: i32) -> Option<&dyn Control> {
        self.tree.control(id)
    }

    /// Id of the focused control
    pub fn focused_control_id(&self) -> Option<i32> {
        self.tree
            .focused()
            .and_then(|key| self.tree.get(key))
            .map(Control::id)
    }

    /// Messages the window could not consume (clicks, selection changes)
    pub fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    // ---- properties ----

    /// Set a window property
    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.set(key, value);
    }

    /// Window property, empty if unset
    pub fn property(&self, key: &str) -> PropertyValue {
        self.properties.get(key)
    }

    /// All properties
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Drop every property
    pub fn clear_properties(&mut self) {
        self.properties.clear();
    }

    // ---- addon hooks ----

    pub(crate) fn set_skin(&mut self, skin: SkinInfo) {
        self.skin = Some(skin);
    }

    pub(crate) fn set_addon(&mut self, state: AddonState) {
        self.addon = Some(state);
    }

    /// Created through the addon bridge
    pub fn is_addon(&self) -> bool {
        self.addon.is_some()
    }

    pub(crate) fn addon_mut(&mut self) -> Option<&mut AddonState> {
        self.addon.as_mut()
    }

    /// Install addon callbacks; returns false for non-addon windows
    pub fn set_callbacks(&mut self, callbacks: Box<dyn AddonCallbacks>) -> bool {
        match self.addon.as_mut() {
            Some(addon) => {
                addon.callbacks = Some(callbacks);
                true
            }
            None => false,
        }
    }

    fn addon_media_dir(&self) -> Option<PathBuf> {
        self.addon.as_ref().map(|addon| addon.media_dir.clone())
    }

    fn with_callbacks(&mut self, f: impl FnOnce(&mut dyn AddonCallbacks, i32) -> bool) -> bool {
        let id = self.id;
        self.addon
            .as_mut()
            .and_then(|addon| addon.callbacks.as_mut())
            .is_some_and(|callbacks| f(callbacks.as_mut(), id))
    }

    // ---- loading ----

    /// Parse the skin file unless already loaded.
    ///
    /// On failure the window id becomes [`WINDOW_INVALID`] and false is returned.
    pub fn load(&mut self) -> bool {
        if self.loaded {
            return true;
        }
        self.id = self.requested_id;
        let skin = self.skin.as_ref().unwrap_or(&self.context.skin);
        match skin.load_window(&self.xml_file) {
            Ok((root, res)) => self.load_from_xml(&root, res),
            Err(err) => {
                log::error!("Failed to load window {} from '{}': {}", self.id, self.xml_file, err);
                self.id = WINDOW_INVALID;
                false
            }
        }
    }

    /// Build the window from an already parsed `<window>` element
    pub fn load_from_xml(&mut self, root: &XmlElement, res: Resolution) -> bool {
        if self.loaded {
            return true;
        }
        self.id = self.requested_id;
        if let Err(err) = self.parse_window(root, res) {
            log::error!("Invalid window {} ('{}'): {}", self.id, self.xml_file, err);
            self.tree.clear(&self.context.textures);
            self.id = WINDOW_INVALID;
            return false;
        }
        self.tree.set_parent_window(self.id);
        self.loaded = true;
        self.on_window_loaded();

        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        self.tree.set_initial_visibility(&ctx);

        log::debug!("Loaded window {} with {} controls", self.id, self.tree.len());
        true
    }

    fn parse_window(&mut self, root: &XmlElement, res: Resolution) -> Result<(), SkinError> {
        self.coords_res = res;
        self.is_dialog = root
            .child_text("type")
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("dialog"));
        self.previous_window = root.child_value("previouswindow")?;
        self.default_control = root.child_value::<i32>("defaultcontrol")?.filter(|id| *id != 0);
        self.default_always = root
            .child("defaultcontrol")
            .and_then(|el| el.attr("always"))
            .is_some_and(parse_bool);
        self.visible_condition = root.child_text("visible").and_then(lenient_condition);
        self.render_order = root.child_value("zorder")?.unwrap_or(0);
        self.overlay = root.child_bool("allowoverlay");

        self.relative_coords = false;
        self.position = Point::new(0.0, 0.0);
        self.origins.clear();
        if let Some(coords) = root.child("coordinates") {
            self.relative_coords = coords.child_value::<i32>("system")? == Some(1);
            self.position = Point::new(
                coords.child_value("posx")?.unwrap_or(0.0),
                coords.child_value("posy")?.unwrap_or(0.0),
            );
            for origin in coords.children_named("origin") {
                self.origins.push(WindowOrigin {
                    x: origin.attr_value("x")?.unwrap_or(0.0),
                    y: origin.attr_value("y")?.unwrap_or(0.0),
                    condition: origin.attr("condition").and_then(lenient_condition),
                });
            }
        }
        self.camera = match root.child("camera") {
            Some(camera) => Some(Point::new(
                camera.attr_value("x")?.unwrap_or(0.0),
                camera.attr_value("y")?.unwrap_or(0.0),
            )),
            None => None,
        };

        let mut group = root_group(res);
        for element in root.children_named("animation") {
            for animation in Animation::parse(element)? {
                group.base_mut().add_animation(animation);
            }
        }
        self.tree = ControlTree::new(group);
        if let Some(controls) = root.child("controls") {
            let parent = self.tree.root();
            populate(self.context.factory.as_ref(), &mut self.tree, parent, controls);
        }
        Ok(())
    }

    /// Called once the tree is built
    fn on_window_loaded(&mut self) {
        self.tree.set_dynamic_resource_alloc(self.dynamic_resource_alloc);
    }

    // ---- resources ----

    /// Load the skin file if needed, preload every texture the tree uses,
    /// then allocate the tree. Returns false if the window could not be loaded.
    pub fn alloc_resources(&mut self, force_load: bool) -> bool {
        let context = Arc::clone(&self.context);
        let _lock = context.graphics.lock();
        log::debug!("Allocating window {} (force load: {})", self.id, force_load);

        if (force_load || !self.loaded) && !self.load() {
            return false;
        }

        let textures = &context.textures;
        let media_dir = self.addon_media_dir();
        if let Some(dir) = &media_dir {
            textures.add_texture_path(dir);
        }

        let mut batch = textures.start_preload();
        self.tree.pre_alloc_resources(&mut batch);
        let registered = batch.len();
        batch.commit(textures);
        let decoded = textures.flush_preload();
        let failures = self.tree.alloc_resources(textures);

        if let Some(dir) = &media_dir {
            textures.remove_texture_path(dir);
        }

        self.allocated = true;
        log::debug!(
            "Window {} allocated: {} textures registered, {} decoded, {} control failures",
            self.id,
            registered,
            decoded,
            failures
        );
        true
    }

    /// Release every control resource; unload the tree too when the window
    /// loads every time or `force_unload` is set
    pub fn free_resources(&mut self, force_unload: bool) {
        let context = Arc::clone(&self.context);
        let _lock = context.graphics.lock();

        self.allocated = false;
        self.tree.free_resources(&context.textures, true);
        if self.load_type == LoadType::LoadEveryTime || force_unload {
            self.clear_all();
        }
        log::debug!("Window {} freed (loaded: {})", self.id, self.loaded);
    }

    fn clear_all(&mut self) {
        self.tree.clear(&self.context.textures);
        self.loaded = false;
        self.properties.clear();
        self.visible_condition = None;
        self.origins.clear();
        self.dynamic_resource_alloc = self.context.config.windows.dynamic_resource_alloc;
    }

    // ---- show / hide ----

    fn set_initial_visibility(&mut self) {
        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        self.tree.set_initial_visibility(&ctx);
    }

    /// Reset animations, evaluate visibility around restoring saved control
    /// state, focus a control and start the open animation
    pub fn on_init_window(&mut self) {
        self.active = true;
        self.closing = false;
        self.tree.reset_animations();

        // restored state can change other controls' visibility
        self.set_initial_visibility();
        self.restore_control_states();
        self.set_initial_visibility();

        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        self.tree.queue_animation(AnimationType::WindowOpen, Some(&ctx));
        log::debug!("Window {} initialised", self.id);
    }

    /// Save control state, drop focus and start the close animation; the
    /// window frees itself once the animation is done
    pub fn on_deinit_window(&mut self, next_window: i32) {
        self.save_control_states();

        if let Some(key) = self.tree.focused() {
            let id = self.tree.get(key).map_or(0, Control::id);
            let mut lost = Message::new(MessageId::LostFocus, self.id, id).with_param1(next_window);
            let mut out = Vec::new();
            self.tree.send_to(key, &mut lost, &mut out);
        }

        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        self.tree.queue_animation(AnimationType::WindowClose, Some(&ctx));

        self.active = false;
        let rendered = self.tree.root_control().base().has_processed();
        if rendered && self.tree.is_animating(AnimationType::WindowClose) {
            self.closing = true;
        } else {
            self.finish_close();
        }
        log::debug!("Window {} deinitialised (next: {})", self.id, next_window);
    }

    fn finish_close(&mut self) {
        self.closing = false;
        if self.dynamic_resource_alloc {
            self.free_resources(false);
        }
    }

    fn save_control_states(&mut self) {
        self.saved_states = self.tree.save_states();
        self.last_focused = if self.save_last_control && !self.default_always {
            self.focused_control_id()
        } else {
            None
        };
    }

    fn restore_control_states(&mut self) {
        let states = std::mem::take(&mut self.saved_states);
        self.tree.restore_states(&states);
        self.saved_states = states;

        let focus = if self.default_always {
            self.default_control
        } else {
            self.last_focused.or(self.default_control)
        };
        if let Some(id) = focus {
            self.focus_control(id);
        }
    }

    // ---- messages ----

    /// Handle a message. Panics raised while handling it are caught here and
    /// reported as unhandled.
    pub fn on_message(&mut self, message: &mut Message) -> bool {
        let id = self.id;
        let kind = message.id;
        catch_unwind(AssertUnwindSafe(|| self.handle_message(message))).unwrap_or_else(|_| {
            log::error!("Window {} panicked while handling {:?}", id, kind);
            false
        })
    }

    fn handle_message(&mut self, message: &mut Message) -> bool {
        match message.id {
            MessageId::WindowInit => {
                if (self.dynamic_resource_alloc || !self.allocated) && !self.alloc_resources(false) {
                    return false;
                }
                self.on_init_window();
                self.with_callbacks(|callbacks, id| callbacks.on_init(id));
                true
            }
            MessageId::WindowDeinit => {
                self.on_deinit_window(message.param1);
                true
            }
            MessageId::SetFocus => message.control_id == 0 || self.focus_control(message.control_id),
            MessageId::Focused => {
                let control_id = message.control_id;
                self.last_focused = Some(control_id);
                if let Some(key) = self.tree.find(control_id) {
                    self.tree.note_focus(key);
                }
                self.with_callbacks(|callbacks, id| callbacks.on_focus(id, control_id));
                true
            }
            MessageId::UnfocusAll => {
                if let Some(key) = self.tree.focused() {
                    let id = self.tree.get(key).map_or(0, Control::id);
                    let mut lost = Message::new(MessageId::LostFocus, self.id, id).with_param1(id);
                    let mut out = Vec::new();
                    self.tree.send_to(key, &mut lost, &mut out);
                }
                true
            }
            MessageId::Move => {
                Direction::from_raw(message.param1).is_some_and(|direction| self.on_move(message.control_id, direction))
            }
            MessageId::Clicked => {
                let control_id = message.control_id;
                if self.with_callbacks(|callbacks, id| callbacks.on_click(id, control_id)) {
                    return true;
                }
                self.outbox.push(message.clone());
                false
            }
            MessageId::SelChanged => {
                self.outbox.push(message.clone());
                false
            }
            MessageId::NotifyAll => {
                self.notify_all(message);
                true
            }
            _ => self.send_to_controls(message),
        }
    }

    fn notify_all(&mut self, message: &Message) {
        let Some(inner) = message.notified_id() else {
            log::error!("Window {}: broadcast without a valid inner message", self.id);
            return;
        };
        // addon windows only take broadcasts that leave their content intact
        if self.addon.is_some() && !matches!(inner, MessageId::PageChange | MessageId::WindowResize) {
            return;
        }
        let mut out = Vec::new();
        for key in self.tree.keys() {
            let control_id = self.tree.get(key).map_or(0, Control::id);
            let mut forwarded = Message::new(inner, message.sender_id, control_id)
                .with_param1(message.param2)
                .with_label(message.label.clone());
            self.tree.send_to(key, &mut forwarded, &mut out);
        }
        self.process_control_messages(out);
    }

    fn send_to_controls(&mut self, message: &mut Message) -> bool {
        let mut out = Vec::new();
        let handled = self.tree.dispatch(message, &mut out);
        if !handled && message.control_id != 0 && self.tree.find(message.control_id).is_none() {
            log::error!(
                "Window {}: {:?} sent to missing control {}",
                self.id,
                message.id,
                message.control_id
            );
        }
        self.process_control_messages(out);
        handled
    }

    /// Handle what controls sent back to their window
    fn process_control_messages(&mut self, out: Vec<Message>) {
        for mut message in out {
            if message.sender_id == self.id {
                self.handle_message(&mut message);
            } else {
                self.outbox.push(message);
            }
        }
    }

    /// Move focus to `control_id`, or to the control focus lands on when it
    /// is a group. The previously focused control loses focus first.
    pub fn focus_control(&mut self, control_id: i32) -> bool {
        let mut out = Vec::new();
        if let Some(current) = self.tree.focused() {
            let id = self.tree.get(current).map_or(0, Control::id);
            let mut lost = Message::new(MessageId::LostFocus, self.id, id).with_param1(control_id);
            self.tree.send_to(current, &mut lost, &mut out);
        }

        let target = self
            .tree
            .first_focusable(control_id)
            .or_else(|| self.tree.find(control_id));
        let Some(target) = target else {
            log::error!("Window {}: cannot focus missing control {}", self.id, control_id);
            self.process_control_messages(out);
            return false;
        };

        let target_id = self.tree.get(target).map_or(control_id, Control::id);
        let mut focus = Message::new(MessageId::SetFocus, self.id, target_id);
        let handled = self.tree.send_to(target, &mut focus, &mut out);
        self.process_control_messages(out);
        handled
    }

    /// Follow navigation links from `from_control` in `direction` until a
    /// focusable control is found. A chain that revisits a control, or ends
    /// without a target, leaves focus unchanged.
    pub fn on_move(&mut self, from_control: i32, direction: Direction) -> bool {
        let Some(mut key) = self
            .tree
            .first_focusable(from_control)
            .or_else(|| self.tree.find(from_control))
        else {
            return false;
        };

        let mut history = Vec::new();
        let mut next = from_control;
        loop {
            history.push(next);
            let Some(target) = self.tree.get(key).and_then(|c| c.base().navigation(direction)) else {
                return false;
            };
            next = target;
            if history.contains(&next) {
                log::trace!("Window {}: navigation cycle at control {}", self.id, next);
                return false;
            }
            if self.tree.first_focusable(next).is_some() {
                break;
            }
            match self.tree.find(next) {
                Some(found) => key = found,
                None => return false,
            }
        }
        self.focus_control(next)
    }

    /// Handle a user action: addon callback first, then the focused control.
    /// With nothing focused the default control is focused instead.
    pub fn on_action(&mut self, action: Action) -> bool {
        let id = self.id;
        catch_unwind(AssertUnwindSafe(|| self.handle_action(action))).unwrap_or_else(|_| {
            log::error!("Window {} panicked while handling {:?}", id, action);
            false
        })
    }

    fn handle_action(&mut self, action: Action) -> bool {
        if self.with_callbacks(|callbacks, id| callbacks.on_action(id, action)) {
            return true;
        }
        match self.tree.focused() {
            Some(key) => {
                let mut out = Vec::new();
                let handled = self.tree.action_to(key, action, &mut out);
                self.process_control_messages(out);
                handled
            }
            None => {
                if let Some(default) = self.default_control {
                    self.focus_control(default);
                }
                false
            }
        }
    }

    // ---- per frame ----

    /// Update visibility (allocating and freeing on demand), advance
    /// animations and finish a pending close. Returns true while animating.
    pub fn process(&mut self, now_ms: u32) -> bool {
        if !self.loaded {
            return false;
        }
        self.now_ms = now_ms;

        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        let textures = self.allocated.then_some(&self.context.textures);
        self.tree.update_visibility(&ctx, textures);
        let running = self.tree.animate(now_ms, &self.context.textures);
        if let Some(textures) = textures {
            self.tree.allocate_on_demand(textures);
        }

        if self.closing && !self.tree.is_animating(AnimationType::WindowClose) {
            self.finish_close();
        }
        running
    }

    /// Origin for this frame: the first origin whose condition holds, else
    /// the window position
    pub fn resolve_origin(&self) -> Point {
        let states = self.tree.control_states();
        let ctx = ConditionContext::for_window(&self.context.info, &self.properties, &states);
        self.origins
            .iter()
            .find(|origin| origin.condition.as_ref().map_or(true, |c| c.evaluate(&ctx)))
            .map_or(self.position, |origin| Point::new(origin.x, origin.y))
    }

    /// Draw the window into `target`; nothing is drawn unless allocated
    pub fn render(&mut self, target: &mut dyn RenderTarget) -> Result<(), RenderError> {
        if !self.loaded || !self.allocated {
            return Ok(());
        }
        let context = Arc::clone(&self.context);
        let graphics = &context.graphics;
        let _lock = graphics.lock();

        graphics.set_rendering_resolution(self.coords_res, true);
        graphics.set_camera_position(self.camera);
        let origin = self.resolve_origin();

        target.begin_pass(self.id)?;
        let media_dir = self.addon_media_dir();
        if let Some(dir) = &media_dir {
            context.textures.add_texture_path(dir);
        }

        graphics.set_origin(origin.x, origin.y);
        let draw = DrawContext {
            textures: &context.textures,
            graphics,
            now_ms: self.now_ms,
        };
        self.tree.render(&draw, target);
        graphics.restore_origin();

        if let Some(dir) = &media_dir {
            context.textures.remove_texture_path(dir);
        }
        target.end_pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::RadioButtonControl;
    use crate::render::DrawList;
    use crate::tests::context_with;
    use crate::textures::TextureKey;

    const WINDOW: &str = r#"
        <window>
            <defaultcontrol always="false">2</defaultcontrol>
            <zorder>1</zorder>
            <coordinates>
                <system>1</system>
                <posx>40</posx><posy>30</posy>
                <origin x="10" y="10" condition="false">first</origin>
                <origin x="20" y="20" condition="panel">second</origin>
                <origin x="30" y="30">third</origin>
            </coordinates>
            <controls>
                <control type="image" id="1"><texture>bg.png</texture><width>100</width><height>50</height></control>
                <control type="button" id="2"><ondown>3</ondown><texturefocus>focus.png</texturefocus></control>
                <control type="button" id="3"><onup>2</onup><ondown>4</ondown></control>
                <control type="button" id="4"><ondown>3</ondown></control>
            </controls>
        </window>"#;

    fn window(files: &[(&str, usize)]) -> Window {
        let context = context_with(files);
        let mut window = Window::new(100, "test.xml", context);
        let root = XmlElement::parse(WINDOW).unwrap();
        assert!(window.load_from_xml(&root, Resolution::HD_720));
        window
    }

    #[test]
    fn test_load_reads_window_fields() {
        let window = window(&[]);
        assert!(window.is_loaded());
        assert_eq!(window.default_control(), Some(2));
        assert_eq!(window.render_order(), 1);
        assert!(window.relative_coords());
        assert_eq!(window.origins().len(), 3);
        assert_eq!(window.tree().len(), 4);
        assert_eq!(window.control(2).unwrap().base().parent_window(), 100);
    }

    #[test]
    fn test_second_load_is_a_no_op() {
        let mut window = window(&[]);
        let before = window.tree().keys();
        let root = XmlElement::parse("<window><controls/></window>").unwrap();
        assert!(window.load_from_xml(&root, Resolution::HD_1080));
        assert!(window.load());
        assert_eq!(window.tree().keys(), before);
        assert_eq!(window.coords_res(), Resolution::HD_720);
    }

    #[test]
    fn test_missing_skin_file_invalidates_window() {
        let context = context_with(&[]);
        let mut window = Window::new(100, "missing.xml", context);
        assert!(!window.load());
        assert!(!window.is_valid());
        assert_eq!(window.id(), WINDOW_INVALID);
        assert!(!window.alloc_resources(false));
        assert!(!window.is_allocated());
    }

    #[test]
    fn test_retry_after_failed_load_restores_id() {
        let context = context_with(&[]);
        let mut window = Window::new(100, "missing.xml", context);
        assert!(!window.load());
        assert_eq!(window.id(), WINDOW_INVALID);

        let root = XmlElement::parse("<window><controls><control type=\"label\" id=\"5\"/></controls></window>").unwrap();
        assert!(window.load_from_xml(&root, Resolution::HD_720));
        assert!(window.is_valid());
        assert_eq!(window.id(), 100);
        assert_eq!(window.control(5).unwrap().base().parent_window(), 100);
    }

    #[test]
    fn test_oversized_animation_timing_still_loads() {
        let context = context_with(&[]);
        let mut window = Window::new(100, "anim.xml", context);
        let root = XmlElement::parse(
            r#"<window>
                <animation effect="fade" delay="4294967000" time="1000">WindowOpen</animation>
                <controls/>
            </window>"#,
        )
        .unwrap();
        assert!(window.load_from_xml(&root, Resolution::HD_720));
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        assert!(window.is_valid());
        window.process(0);
        window.process(u32::MAX);
    }

    #[test]
    fn test_origin_prefers_first_satisfied_condition() {
        let window = window(&[]);
        window.context().info.set_bool("panel", true);
        for _ in 0..3 {
            assert_eq!(window.resolve_origin(), Point::new(20.0, 20.0));
        }
        window.context().info.set_bool("panel", false);
        assert_eq!(window.resolve_origin(), Point::new(30.0, 30.0));
    }

    #[test]
    fn test_init_focuses_default_control() {
        let mut window = window(&[("bg.png", 1), ("focus.png", 1)]);
        assert!(window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0)));
        assert!(window.is_allocated());
        assert!(window.is_active());
        assert_eq!(window.focused_control_id(), Some(2));
        assert_eq!(window.last_focused(), Some(2));
    }

    #[test]
    fn test_navigation_follows_links() {
        let mut window = window(&[]);
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        assert!(window.on_action(Action::MoveDown));
        assert_eq!(window.focused_control_id(), Some(3));
        assert!(!window.control(2).unwrap().base().has_focus());
    }

    #[test]
    fn test_navigation_cycle_terminates_without_focus_change() {
        let mut window = window(&[]);
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        window.on_message(&mut Message::new(MessageId::Disabled, 0, 3));
        window.on_message(&mut Message::new(MessageId::Disabled, 0, 4));

        // 2 -> 3 (disabled) -> 4 (disabled) -> 3: revisits 3
        assert!(!window.on_move(2, Direction::Down));
        assert_eq!(window.focused_control_id(), Some(2));
    }

    #[test]
    fn test_message_to_missing_control_is_not_handled() {
        let mut window = window(&[]);
        assert!(!window.on_message(&mut Message::new(MessageId::LabelSet, 0, 77).with_label("x")));
    }

    #[test]
    fn test_click_goes_to_outbox() {
        let mut window = window(&[]);
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        window.on_action(Action::Select);
        let outbox = window.take_outbox();
        assert_eq!(outbox, vec![Message::new(MessageId::Clicked, 100, 2)]);
    }

    #[test]
    fn test_force_unload_releases_everything() {
        let mut window = window(&[("bg.png", 1), ("focus.png", 1)]);
        window.set_load_type(LoadType::KeepInMemory);
        window.set_property("Ready", true);
        assert!(window.alloc_resources(false));
        let bg = TextureKey::from_name("bg.png");
        assert_eq!(window.context().textures.ref_count(&bg), Some(1));

        window.free_resources(false);
        assert!(window.is_loaded(), "kept in memory");
        assert_eq!(window.context().textures.ref_count(&bg), Some(0));

        window.alloc_resources(false);
        window.free_resources(true);
        assert!(!window.is_loaded());
        assert!(!window.is_allocated());
        assert!(window.tree().is_empty());
        assert!(window.properties().is_empty());
        assert_eq!(window.context().textures.ref_count(&bg), Some(0));
    }

    #[test]
    fn test_state_restored_before_visibility_is_recomputed() {
        let context = context_with(&[]);
        let mut window = Window::new(7, "test.xml", context);
        window.set_load_type(LoadType::KeepInMemory);
        let root = XmlElement::parse(
            r#"<window><controls>
                <control type="radiobutton" id="5"/>
                <control type="button" id="6"><visible>Control.IsSelected(5)</visible></control>
            </controls></window>"#,
        )
        .unwrap();
        window.load_from_xml(&root, Resolution::HD_720);

        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        window.on_message(&mut Message::new(MessageId::SetSelected, 0, 5));
        window.process(0);
        assert!(window.control(6).unwrap().base().is_visible());
        window.on_message(&mut Message::new(MessageId::WindowDeinit, 0, 0));

        // a fresh radio button would hide 6 again; the restored one keeps it
        let radio = window.tree_mut().control_mut(5).unwrap();
        radio.as_any_mut().downcast_mut::<RadioButtonControl>().unwrap().set_selected(false);
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        assert!(window.control(6).unwrap().base().is_visible());
        assert!(window
            .control(5)
            .unwrap()
            .as_any()
            .downcast_ref::<RadioButtonControl>()
            .unwrap()
            .selected());
    }

    #[test]
    fn test_render_applies_resolved_origin() {
        let mut window = window(&[("bg.png", 1)]);
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        window.process(0);
        let mut list = DrawList::new();
        window.render(&mut list).unwrap();

        let graphics = &window.context().graphics;
        assert_eq!(graphics.stack_depth(), 0);
        let first_texture = list.commands().iter().find_map(|cmd| match cmd {
            crate::render::DrawCommand::Texture { rect, .. } => Some(*rect),
            _ => None,
        });
        // 720p coordinates on a 1080p display, origin (30, 30)
        assert_eq!(first_texture, Some(Rect::new(45.0, 45.0, 150.0, 75.0)));
    }
}
