//! Addon windows
//!
//! Third-party addons create windows and dialogs at runtime, either empty or
//! from a skin file shipped with the addon, and drive them through
//! [`AddonWindowBridge`]. Every call resolves a window id and then runs an
//! ordinary window or control operation.

use std::path::{Path, PathBuf};

use super::manager::WindowManager;
use super::window::{LoadType, Window};
use crate::config::SkinConfig;
use crate::controls::{Control, ListControl, ListItem};
use crate::foundation::math::Resolution;
use crate::info::PropertyValue;
use crate::messages::{Action, Message, MessageId};
use crate::skin::{SkinInfo, XmlElement};

/// First id handed to addon windows
pub const ADDON_WINDOW_START: i32 = 14000;

/// One past the last id handed to addon windows
pub const ADDON_WINDOW_END: i32 = 14100;

/// Events an addon receives from its window. Returning true marks the
/// event as consumed; the default implementations consume nothing.
pub trait AddonCallbacks: Send {
    /// The window was shown
    fn on_init(&mut self, _window_id: i32) -> bool {
        false
    }

    /// A control was clicked
    fn on_click(&mut self, _window_id: i32, _control_id: i32) -> bool {
        false
    }

    /// A control took focus
    fn on_focus(&mut self, _window_id: i32, _control_id: i32) -> bool {
        false
    }

    /// A user action arrived before the focused control saw it
    fn on_action(&mut self, _window_id: i32, _action: Action) -> bool {
        false
    }
}

/// Per-window addon data
pub struct AddonState {
    /// Installed callbacks
    pub callbacks: Option<Box<dyn AddonCallbacks>>,
    /// Addon media folder, searched for textures while the window allocates and renders
    pub media_dir: PathBuf,
    /// Window that was active when this one was shown
    pub old_window: Option<i32>,
}

impl std::fmt::Debug for AddonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonState")
            .field("callbacks", &self.callbacks.is_some())
            .field("media_dir", &self.media_dir)
            .field("old_window", &self.old_window)
            .finish()
    }
}

/// Skin layout of an addon rooted at `addon_path`
fn addon_skin(addon_path: &Path, base: &SkinConfig) -> SkinInfo {
    SkinInfo::new(&SkinConfig {
        path: addon_path.join("resources").join("skins").join("Default"),
        resolutions: base.resolutions.clone(),
        media_folder: base.media_folder.clone(),
    })
}

/// Addon-facing window operations on top of a [`WindowManager`]
#[derive(Debug)]
pub struct AddonWindowBridge<'a> {
    manager: &'a mut WindowManager,
}

impl<'a> AddonWindowBridge<'a> {
    /// Bridge operating on `manager`
    pub fn new(manager: &'a mut WindowManager) -> Self {
        Self { manager }
    }

    fn free_id(&self) -> Option<i32> {
        (ADDON_WINDOW_START..ADDON_WINDOW_END).find(|id| !self.manager.contains(*id))
    }

    fn addon_window(&mut self, id: i32) -> Option<&mut Window> {
        match self.manager.window_mut(id) {
            Some(window) if window.is_addon() => Some(window),
            Some(_) => {
                log::error!("Window {} is not an addon window", id);
                None
            }
            None => {
                log::error!("Unknown addon window {}", id);
                None
            }
        }
    }

    // ---- lifetime ----

    /// Create a window (or dialog) and register it.
    ///
    /// With `xml_file` the layout comes from the addon's own skin folder;
    /// without it the window starts empty. Returns the new id, or `None`
    /// when every addon id is taken or the skin file cannot be loaded.
    pub fn create_window(&mut self, xml_file: Option<&str>, addon_path: &Path, dialog: bool) -> Option<i32> {
        let Some(id) = self.free_id() else {
            log::error!(
                "No free addon window id in {}..{}",
                ADDON_WINDOW_START,
                ADDON_WINDOW_END
            );
            return None;
        };

        let context = std::sync::Arc::clone(self.manager.context());
        let skin = addon_skin(addon_path, &context.config.skin);
        let media_dir = skin.media_path();
        let mut window = Window::new(id, xml_file.unwrap_or_default(), context);
        window.set_load_type(LoadType::KeepInMemory);
        window.set_addon(AddonState {
            callbacks: None,
            media_dir,
            old_window: None,
        });

        let loaded = match xml_file {
            Some(_) => {
                window.set_skin(skin);
                window.load()
            }
            None => match XmlElement::parse("<window><controls/></window>") {
                Ok(root) => window.load_from_xml(&root, Resolution::HD_720),
                Err(err) => {
                    log::error!("Failed to build empty addon window: {}", err);
                    false
                }
            },
        };
        if !loaded {
            return None;
        }
        window.set_dialog(dialog);

        log::debug!("Created addon {} {}", if dialog { "dialog" } else { "window" }, id);
        self.manager.add(window).then_some(id)
    }

    /// Destroy an addon window: switch away if it is showing, drop its
    /// properties, free it with unload and unregister it
    pub fn destroy_window(&mut self, id: i32) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        let dialog = window.is_dialog();
        let old_window = window.addon_mut().and_then(|addon| addon.old_window);

        if dialog {
            if self.manager.is_dialog_open(id) {
                self.manager.close_dialog(id);
            }
        } else if self.manager.active_window() == Some(id) {
            match old_window.filter(|old| self.manager.contains(*old)) {
                Some(old) => {
                    self.manager.activate_window(old);
                }
                None => {
                    self.manager.previous_window();
                }
            }
        }

        let Some(mut window) = self.manager.remove(id) else {
            return false;
        };
        window.clear_properties();
        window.free_resources(true);
        log::debug!("Destroyed addon window {}", id);
        true
    }

    /// Install the addon's event callbacks
    pub fn set_callbacks(&mut self, id: i32, callbacks: Box<dyn AddonCallbacks>) -> bool {
        self.addon_window(id).is_some_and(|window| window.set_callbacks(callbacks))
    }

    // ---- show / close ----

    /// Show the window, remembering what was active so [`Self::close`] can return to it
    pub fn show(&mut self, id: i32) -> bool {
        let active = self.manager.active_window();
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        let dialog = window.is_dialog();
        if let Some(addon) = window.addon_mut() {
            addon.old_window = active.filter(|old| *old != id);
        }
        if dialog {
            self.manager.open_dialog(id, false)
        } else {
            self.manager.activate_window(id)
        }
    }

    /// Show as a modal dialog. The call returns at once; the dialog stays
    /// on top and takes input until closed.
    pub fn do_modal(&mut self, id: i32) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        if window.is_dialog() {
            self.manager.open_dialog(id, true)
        } else {
            self.show(id)
        }
    }

    /// Close the window, returning to the window that was active when it was shown
    pub fn close(&mut self, id: i32) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        if window.is_dialog() {
            return self.manager.close_dialog(id);
        }
        let old_window = window.addon_mut().and_then(|addon| addon.old_window.take());
        if self.manager.active_window() != Some(id) {
            return false;
        }
        match old_window.filter(|old| self.manager.contains(*old)) {
            Some(old) => self.manager.activate_window(old),
            None => self.manager.previous_window(),
        }
    }

    // ---- focus ----

    /// Id of the focused control
    pub fn focus_id(&mut self, id: i32) -> Option<i32> {
        self.addon_window(id).and_then(|window| window.focused_control_id())
    }

    /// Focus `control_id`
    pub fn set_focus_id(&mut self, id: i32, control_id: i32) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        window.on_message(&mut Message::new(MessageId::SetFocus, id, control_id))
    }

    // ---- controls ----

    fn control_message(&mut self, id: i32, message: Message) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        let mut message = message;
        window.on_message(&mut message)
    }

    /// Set a control's label
    pub fn set_control_label(&mut self, id: i32, control_id: i32, label: &str) -> bool {
        self.control_message(id, Message::new(MessageId::LabelSet, id, control_id).with_label(label))
    }

    /// Show or hide a control
    pub fn set_control_visible(&mut self, id: i32, control_id: i32, visible: bool) -> bool {
        let kind = if visible { MessageId::Visible } else { MessageId::Hidden };
        self.control_message(id, Message::new(kind, id, control_id))
    }

    /// Enable or disable a control
    pub fn set_control_enabled(&mut self, id: i32, control_id: i32, enabled: bool) -> bool {
        let kind = if enabled { MessageId::Enabled } else { MessageId::Disabled };
        self.control_message(id, Message::new(kind, id, control_id))
    }

    /// Select or deselect a radio button
    pub fn set_control_selected(&mut self, id: i32, control_id: i32, selected: bool) -> bool {
        let kind = if selected {
            MessageId::SetSelected
        } else {
            MessageId::SetDeselected
        };
        self.control_message(id, Message::new(kind, id, control_id))
    }

    /// Control `control_id` as a `T`. A control of another type is logged
    /// and yields `None`.
    pub fn control<T: Control + 'static>(&mut self, id: i32, control_id: i32) -> Option<&mut T> {
        let window = self.addon_window(id)?;
        let Some(control) = window.tree_mut().control_mut(control_id) else {
            log::error!("Window {}: no control {}", id, control_id);
            return None;
        };
        let actual = control.control_type();
        let typed = control.as_any_mut().downcast_mut::<T>();
        if typed.is_none() {
            log::error!(
                "Window {}: control {} is a {}, not the requested type",
                id,
                control_id,
                actual.name()
            );
        }
        typed
    }

    // ---- properties ----

    /// Set a window property; keys are case-insensitive
    pub fn set_property(&mut self, id: i32, key: &str, value: impl Into<PropertyValue>) -> bool {
        let Some(window) = self.addon_window(id) else {
            return false;
        };
        window.set_property(&key.to_ascii_lowercase(), value);
        true
    }

    /// Window property, empty if unset
    pub fn property(&mut self, id: i32, key: &str) -> PropertyValue {
        self.addon_window(id)
            .map_or_else(|| PropertyValue::String(String::new()), |window| {
                window.property(&key.to_ascii_lowercase())
            })
    }

    /// Window property as a string
    pub fn property_string(&mut self, id: i32, key: &str) -> String {
        self.property(id, key).as_string()
    }

    /// Window property as an integer (0 if unset or not numeric)
    pub fn property_int(&mut self, id: i32, key: &str) -> i64 {
        self.property(id, key).as_integer()
    }

    /// Window property as a boolean
    pub fn property_bool(&mut self, id: i32, key: &str) -> bool {
        self.property(id, key).as_boolean()
    }

    /// Window property as a double
    pub fn property_double(&mut self, id: i32, key: &str) -> f64 {
        self.property(id, key).as_double()
    }

    /// Drop every window property
    pub fn clear_properties(&mut self, id: i32) -> bool {
        self.addon_window(id).map(Window::clear_properties).is_some()
    }

    // ---- list ----

    /// Run `f` on the window's view container (its first list)
    fn with_list<R>(&mut self, id: i32, f: impl FnOnce(&mut ListControl) -> R) -> Option<R> {
        let window = self.addon_window(id)?;
        match window.tree_mut().first_of::<ListControl>() {
            Some(list) => Some(f(list)),
            None => {
                log::error!("Window {} has no list container", id);
                None
            }
        }
    }

    /// Insert an item; `None` appends
    pub fn add_item(&mut self, id: i32, item: ListItem, position: Option<usize>) -> bool {
        self.with_list(id, |list| list.add_item(item, position)).is_some()
    }

    /// Remove the item at `position`, returning its label
    pub fn remove_item(&mut self, id: i32, position: usize) -> Option<String> {
        self.with_list(id, |list| list.remove_item(position)).flatten()
    }

    /// Remove every item
    pub fn clear_list(&mut self, id: i32) -> bool {
        self.with_list(id, ListControl::clear).is_some()
    }

    /// Number of items (0 without a container)
    pub fn list_size(&mut self, id: i32) -> usize {
        self.with_list(id, |list| list.len()).unwrap_or(0)
    }

    /// Label of the item at `position`
    pub fn list_item_label(&mut self, id: i32, position: usize) -> Option<String> {
        self.with_list(id, |list| list.item(position).map(|item| item.label.clone()))
            .flatten()
    }

    /// Selected position
    pub fn current_list_position(&mut self, id: i32) -> Option<usize> {
        self.with_list(id, |list| (!list.is_empty()).then(|| list.selected()))
            .flatten()
    }

    /// Select `position`
    pub fn set_current_list_position(&mut self, id: i32, position: usize) -> bool {
        self.with_list(id, |list| list.select(position)).unwrap_or(false)
    }

    /// Set a property on the container
    pub fn set_container_property(&mut self, id: i32, key: &str, value: impl Into<PropertyValue>) -> bool {
        let key = key.to_ascii_lowercase();
        self.with_list(id, |list| list.set_property(&key, value)).is_some()
    }

    /// Set the container's content type (`movies`, `songs`, ...)
    pub fn set_container_content(&mut self, id: i32, content: &str) -> bool {
        self.with_list(id, |list| list.set_content(content)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{ButtonControl, LabelControl, RadioButtonControl};
    use crate::foundation::math::Rect;
    use crate::tests::context_with;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl AddonCallbacks for Recorder {
        fn on_init(&mut self, window_id: i32) -> bool {
            self.events.lock().push(format!("init {window_id}"));
            true
        }

        fn on_click(&mut self, _window_id: i32, control_id: i32) -> bool {
            self.events.lock().push(format!("click {control_id}"));
            true
        }

        fn on_focus(&mut self, _window_id: i32, control_id: i32) -> bool {
            self.events.lock().push(format!("focus {control_id}"));
            true
        }
    }

    fn manager() -> WindowManager {
        WindowManager::new(context_with(&[]))
    }

    fn add_controls(bridge: &mut AddonWindowBridge<'_>, id: i32) {
        let window = bridge.addon_window(id).unwrap();
        let tree = window.tree_mut();
        let root = tree.root();
        tree.add(root, Box::new(ButtonControl::new(1, Rect::new(0.0, 0.0, 100.0, 30.0))));
        tree.add(root, Box::new(RadioButtonControl::new(ButtonControl::new(2, Rect::default()))));
        tree.add(root, Box::new(LabelControl::new(3, Rect::default(), "")));
        tree.add(root, Box::new(ListControl::new(50, Rect::new(0.0, 40.0, 300.0, 200.0), 40.0)));
        tree.set_parent_window(id);
    }

    #[test]
    fn test_ids_come_from_reserved_range() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let first = bridge.create_window(None, Path::new("addon"), false).unwrap();
        let second = bridge.create_window(None, Path::new("addon"), true).unwrap();
        assert_eq!(first, ADDON_WINDOW_START);
        assert_eq!(second, ADDON_WINDOW_START + 1);

        assert!(bridge.destroy_window(first));
        assert_eq!(bridge.create_window(None, Path::new("addon"), false), Some(first));
    }

    #[test]
    fn test_exhausted_range_fails() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        for _ in ADDON_WINDOW_START..ADDON_WINDOW_END {
            assert!(bridge.create_window(None, Path::new("addon"), false).is_some());
        }
        assert_eq!(bridge.create_window(None, Path::new("addon"), false), None);
    }

    #[test]
    fn test_missing_addon_skin_file_fails() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        assert_eq!(bridge.create_window(Some("script.xml"), Path::new("nowhere"), false), None);
        assert!(!manager.contains(ADDON_WINDOW_START));
    }

    #[test]
    fn test_properties_are_case_insensitive() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let id = bridge.create_window(None, Path::new("addon"), false).unwrap();

        assert!(bridge.set_property(id, "Count", 3));
        assert_eq!(bridge.property_int(id, "COUNT"), 3);
        assert_eq!(bridge.property_string(id, "count"), "3");
        bridge.set_property(id, "Ready", true);
        assert!(bridge.property_bool(id, "ready"));
        bridge.set_property(id, "Ratio", 0.5);
        assert!((bridge.property_double(id, "ratio") - 0.5).abs() < f64::EPSILON);

        assert!(bridge.clear_properties(id));
        assert_eq!(bridge.property_string(id, "count"), "");
    }

    #[test]
    fn test_show_and_close_return_to_previous_window() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let first = bridge.create_window(None, Path::new("addon"), false).unwrap();
        let second = bridge.create_window(None, Path::new("addon"), false).unwrap();

        assert!(bridge.show(first));
        assert!(bridge.show(second));
        assert_eq!(manager.active_window(), Some(second));

        let mut bridge = AddonWindowBridge::new(&mut manager);
        assert!(bridge.close(second));
        assert_eq!(manager.active_window(), Some(first));
    }

    #[test]
    fn test_destroy_active_window_switches_away() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let first = bridge.create_window(None, Path::new("addon"), false).unwrap();
        let second = bridge.create_window(None, Path::new("addon"), false).unwrap();
        bridge.show(first);
        bridge.show(second);
        bridge.set_property(second, "k", "v");

        assert!(bridge.destroy_window(second));
        assert_eq!(manager.active_window(), Some(first));
        assert!(!manager.contains(second));
    }

    #[test]
    fn test_modal_dialog_takes_actions() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let window = bridge.create_window(None, Path::new("addon"), false).unwrap();
        let dialog = bridge.create_window(None, Path::new("addon"), true).unwrap();
        bridge.show(window);
        assert!(bridge.do_modal(dialog));
        assert!(manager.is_dialog_open(dialog));
        assert_eq!(manager.active_window(), Some(window));

        // Back closes the topmost dialog
        manager.on_action(Action::Back);
        assert!(!manager.is_dialog_open(dialog));
    }

    #[test]
    fn test_callbacks_see_init_focus_and_click() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let id = bridge.create_window(None, Path::new("addon"), false).unwrap();
        add_controls(&mut bridge, id);
        let recorder = Recorder::default();
        let events = Arc::clone(&recorder.events);
        assert!(bridge.set_callbacks(id, Box::new(recorder)));

        bridge.show(id);
        assert!(bridge.set_focus_id(id, 1));
        assert_eq!(bridge.focus_id(id), Some(1));
        manager.on_action(Action::Select);

        assert_eq!(*events.lock(), vec!["init 14000", "focus 1", "click 1"]);
        assert!(manager.take_events().is_empty(), "click consumed by the addon");
    }

    #[test]
    fn test_control_access_checks_type() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let id = bridge.create_window(None, Path::new("addon"), false).unwrap();
        add_controls(&mut bridge, id);

        assert!(bridge.set_control_label(id, 3, "Hello"));
        assert_eq!(bridge.control::<LabelControl>(id, 3).unwrap().label(), "Hello");
        assert!(bridge.control::<ButtonControl>(id, 3).is_none());
        assert!(bridge.control::<LabelControl>(id, 99).is_none());

        assert!(bridge.set_control_selected(id, 2, true));
        assert!(bridge.control::<RadioButtonControl>(id, 2).unwrap().selected());
        assert!(bridge.set_control_visible(id, 1, false));
        assert!(!bridge.control::<ButtonControl>(id, 1).unwrap().base().is_visible());
    }

    #[test]
    fn test_list_items_crud() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let id = bridge.create_window(None, Path::new("addon"), false).unwrap();
        add_controls(&mut bridge, id);

        assert!(bridge.add_item(id, ListItem::new("b"), None));
        assert!(bridge.add_item(id, ListItem::new("a"), Some(0)));
        assert!(bridge.add_item(id, ListItem::new("c"), None));
        assert_eq!(bridge.list_size(id), 3);
        assert_eq!(bridge.list_item_label(id, 0).as_deref(), Some("a"));

        assert!(bridge.set_current_list_position(id, 2));
        assert_eq!(bridge.current_list_position(id), Some(2));
        assert_eq!(bridge.remove_item(id, 1).as_deref(), Some("b"));
        assert_eq!(bridge.list_size(id), 2);

        assert!(bridge.set_container_content(id, "songs"));
        assert!(bridge.set_container_property(id, "Sort", "title"));
        let list = bridge.control::<ListControl>(id, 50).unwrap();
        assert_eq!(list.content(), "songs");
        assert_eq!(list.property("sort").as_string(), "title");

        assert!(bridge.clear_list(id));
        assert_eq!(bridge.list_size(id), 0);
        assert_eq!(bridge.current_list_position(id), None);
    }

    #[test]
    fn test_window_without_list_has_no_items() {
        let mut manager = manager();
        let mut bridge = AddonWindowBridge::new(&mut manager);
        let id = bridge.create_window(None, Path::new("addon"), false).unwrap();
        assert!(!bridge.add_item(id, ListItem::new("x"), None));
        assert_eq!(bridge.list_size(id), 0);
    }
}
