//! Window registry, navigation history, dialogs and message routing

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use super::addon::AddonWindowBridge;
use super::window::{LoadType, Window};
use crate::context::GuiContext;
use crate::info::ConditionContext;
use crate::messages::{Action, Message, MessageId, MessageQueue};
use crate::render::{RenderError, RenderTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenDialog {
    id: i32,
    modal: bool,
}

/// Owns every window and decides which of them are shown
#[derive(Debug)]
pub struct WindowManager {
    context: Arc<GuiContext>,
    windows: BTreeMap<i32, Window>,
    /// Active window is the last entry
    history: Vec<i32>,
    /// Open dialogs, topmost last
    dialogs: Vec<OpenDialog>,
    queue: MessageQueue,
    events: Vec<Message>,
    now_ms: u32,
}

impl WindowManager {
    /// Empty manager over `context`
    pub fn new(context: Arc<GuiContext>) -> Self {
        Self {
            context,
            windows: BTreeMap::new(),
            history: Vec::new(),
            dialogs: Vec::new(),
            queue: MessageQueue::new(),
            events: Vec::new(),
            now_ms: 0,
        }
    }

    /// Shared services
    pub fn context(&self) -> &Arc<GuiContext> {
        &self.context
    }

    /// Addon operations on this manager
    pub fn addon_bridge(&mut self) -> AddonWindowBridge<'_> {
        AddonWindowBridge::new(self)
    }

    // ---- registry ----

    /// Register a window; a second window with the same id is refused
    pub fn add(&mut self, window: Window) -> bool {
        let id = window.id();
        if self.windows.contains_key(&id) {
            log::error!("Window {} is already registered", id);
            return false;
        }
        self.windows.insert(id, window);
        true
    }

    /// Register a skin window built from `xml_file`
    pub fn register(&mut self, id: i32, xml_file: &str) -> bool {
        self.add(Window::new(id, xml_file, Arc::clone(&self.context)))
    }

    /// Unregister a window. It is dropped from the history and the open
    /// dialogs; resources are left to the caller.
    pub fn remove(&mut self, id: i32) -> Option<Window> {
        self.history.retain(|entry| *entry != id);
        self.dialogs.retain(|dialog| dialog.id != id);
        self.publish_active();
        self.windows.remove(&id)
    }

    /// True if `id` is registered
    pub fn contains(&self, id: i32) -> bool {
        self.windows.contains_key(&id)
    }

    /// Registered window ids in ascending order
    pub fn ids(&self) -> Vec<i32> {
        self.windows.keys().copied().collect()
    }

    /// Registered window
    pub fn window(&self, id: i32) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Registered window, mutable
    pub fn window_mut(&mut self, id: i32) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    /// Load every window marked to load when the GUI starts. Returns how many loaded.
    pub fn initialize(&mut self) -> usize {
        let mut loaded = 0;
        for window in self.windows.values_mut() {
            if window.load_type() == LoadType::LoadOnGuiInit && window.load() {
                loaded += 1;
            }
        }
        log::info!("Window manager initialised: {} windows preloaded", loaded);
        loaded
    }

    /// Close everything and unload every window
    pub fn shutdown(&mut self) {
        for dialog in std::mem::take(&mut self.dialogs).into_iter().rev() {
            self.deinit(dialog.id, 0);
        }
        if let Some(active) = self.history.pop() {
            self.deinit(active, 0);
        }
        self.history.clear();
        self.queue.clear();
        for window in self.windows.values_mut() {
            window.free_resources(true);
        }
        self.context.textures.cleanup_all();
        self.publish_active();
        log::info!("Window manager shut down");
    }

    // ---- navigation ----

    /// Active (non-dialog) window
    pub fn active_window(&self) -> Option<i32> {
        self.history.last().copied()
    }

    /// Window ids in activation order, active last
    pub fn history(&self) -> &[i32] {
        &self.history
    }

    fn publish_active(&self) {
        let active = self.history.last().copied();
        self.context
            .info
            .set_active_windows(active.into_iter().chain(self.dialogs.iter().map(|d| d.id)));
    }

    fn init(&mut self, id: i32, previous: i32) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        let mut init = Message::new(MessageId::WindowInit, 0, 0).with_param1(previous);
        let handled = window.on_message(&mut init);
        self.collect_events(id);
        handled
    }

    fn deinit(&mut self, id: i32, next: i32) {
        if let Some(window) = self.windows.get_mut(&id) {
            let mut deinit = Message::new(MessageId::WindowDeinit, 0, 0).with_param1(next);
            window.on_message(&mut deinit);
        }
        self.collect_events(id);
    }

    fn collect_events(&mut self, id: i32) {
        if let Some(window) = self.windows.get_mut(&id) {
            self.events.extend(window.take_outbox());
        }
    }

    /// Make `id` the active window. Dialogs are opened modeless instead.
    ///
    /// A window already in the history is returned to, dropping what was
    /// opened after it. If the new window fails to initialise the previous
    /// one is restored.
    pub fn activate_window(&mut self, id: i32) -> bool {
        let Some(window) = self.windows.get(&id) else {
            log::error!("Cannot activate unknown window {}", id);
            return false;
        };
        if window.is_dialog() {
            return self.open_dialog(id, false);
        }
        let current = self.active_window();
        if current == Some(id) {
            return true;
        }
        log::debug!("Activating window {} (from {:?})", id, current);

        if let Some(current) = current {
            self.deinit(current, id);
        }
        let saved_history = self.history.clone();
        match self.history.iter().position(|entry| *entry == id) {
            Some(pos) => self.history.truncate(pos + 1),
            None => self.history.push(id),
        }

        if !self.init(id, current.unwrap_or(0)) {
            log::error!("Window {} failed to initialise", id);
            self.history = saved_history;
            if let Some(current) = current {
                self.init(current, id);
            }
            self.publish_active();
            return false;
        }
        self.publish_active();
        true
    }

    /// Go back: to the active window's `<previouswindow>` if it names one,
    /// else to the window before it in the history
    pub fn previous_window(&mut self) -> bool {
        let Some(current) = self.active_window() else {
            return false;
        };
        let declared = self
            .windows
            .get(&current)
            .and_then(Window::previous_window)
            .filter(|id| self.windows.contains_key(id));
        let target = declared.or_else(|| {
            self.history
                .len()
                .checked_sub(2)
                .map(|index| self.history[index])
        });
        let Some(target) = target else {
            log::debug!("No previous window for {}", current);
            return false;
        };

        self.deinit(current, target);
        self.history.pop();
        match self.history.iter().position(|entry| *entry == target) {
            Some(pos) => self.history.truncate(pos + 1),
            None => self.history.push(target),
        }
        let ok = self.init(target, current);
        self.publish_active();
        ok
    }

    // ---- dialogs ----

    /// Show `id` above the active window; a modal dialog takes all input
    pub fn open_dialog(&mut self, id: i32, modal: bool) -> bool {
        if !self.windows.contains_key(&id) {
            log::error!("Cannot open unknown dialog {}", id);
            return false;
        }
        if self.is_dialog_open(id) {
            return true;
        }
        let previous = self.topmost();
        self.dialogs.push(OpenDialog { id, modal });
        if !self.init(id, previous.unwrap_or(0)) {
            log::error!("Dialog {} failed to initialise", id);
            self.dialogs.retain(|dialog| dialog.id != id);
            self.publish_active();
            return false;
        }
        log::debug!("Opened {} dialog {}", if modal { "modal" } else { "modeless" }, id);
        self.publish_active();
        true
    }

    /// Close an open dialog
    pub fn close_dialog(&mut self, id: i32) -> bool {
        if !self.is_dialog_open(id) {
            return false;
        }
        self.dialogs.retain(|dialog| dialog.id != id);
        let next = self.topmost().unwrap_or(0);
        self.deinit(id, next);
        self.publish_active();
        log::debug!("Closed dialog {}", id);
        true
    }

    /// True if `id` is an open dialog
    pub fn is_dialog_open(&self, id: i32) -> bool {
        self.dialogs.iter().any(|dialog| dialog.id == id)
    }

    /// True if any open dialog is modal
    pub fn has_modal_dialog(&self) -> bool {
        self.dialogs.iter().any(|dialog| dialog.modal)
    }

    /// Open dialog ids, topmost last
    pub fn open_dialogs(&self) -> Vec<i32> {
        self.dialogs.iter().map(|dialog| dialog.id).collect()
    }

    /// Topmost open dialog, else the active window
    pub fn topmost(&self) -> Option<i32> {
        self.dialogs
            .last()
            .map(|dialog| dialog.id)
            .or_else(|| self.active_window())
    }

    /// Windows that get input, topmost first. A modal dialog hides
    /// everything beneath it.
    fn input_chain(&self) -> Vec<i32> {
        let mut chain = Vec::new();
        for dialog in self.dialogs.iter().rev() {
            chain.push(dialog.id);
            if dialog.modal {
                return chain;
            }
        }
        chain.extend(self.active_window());
        chain
    }

    /// Open dialogs whose `<visible>` condition holds, close those whose condition failed
    fn update_auto_dialogs(&mut self) {
        let ctx = ConditionContext::global(&self.context.info);
        let mut to_open = Vec::new();
        let mut to_close = Vec::new();
        for (id, window) in &self.windows {
            if !window.is_dialog() {
                continue;
            }
            let Some(condition) = window.visible_condition() else {
                continue;
            };
            let wanted = condition.evaluate(&ctx);
            let open = self.dialogs.iter().any(|dialog| dialog.id == *id);
            if wanted && !open {
                to_open.push(*id);
            } else if !wanted && open {
                to_close.push(*id);
            }
        }
        for id in to_open {
            log::debug!("Dialog {} opened by its visibility condition", id);
            self.open_dialog(id, false);
        }
        for id in to_close {
            log::debug!("Dialog {} closed by its visibility condition", id);
            self.close_dialog(id);
        }
    }

    // ---- messages ----

    /// Deliver a message now.
    ///
    /// `NotifyAll` goes to every loaded window. A message for a specific
    /// window goes there; otherwise it is offered to the input chain,
    /// topmost first, until one window handles it.
    pub fn send_message(&mut self, message: &Message, window: Option<i32>) -> bool {
        if message.id == MessageId::NotifyAll {
            let ids: Vec<i32> = self
                .windows
                .iter()
                .filter(|(_, w)| w.is_loaded())
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                if let Some(target) = self.windows.get_mut(&id) {
                    target.on_message(&mut message.clone());
                }
                self.collect_events(id);
            }
            return true;
        }

        let targets = match window {
            Some(id) => vec![id],
            None => self.input_chain(),
        };
        for id in targets {
            let Some(target) = self.windows.get_mut(&id) else {
                log::error!("{:?} sent to unknown window {}", message.id, id);
                continue;
            };
            let handled = target.on_message(&mut message.clone());
            self.collect_events(id);
            if handled {
                return true;
            }
        }
        false
    }

    /// Queue a message for the next [`Self::process`] after `delay_ms`
    pub fn post_message(&mut self, message: Message, window: Option<i32>, delay_ms: u32) {
        self.queue
            .post(self.now_ms.saturating_add(delay_ms), window, message);
    }

    /// Messages windows produced but did not consume (clicks, selection
    /// changes), in order
    pub fn take_events(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.events)
    }

    /// Route an action: the input chain gets it topmost first. An
    /// unhandled `Back` closes the topmost dialog or goes to the previous window.
    pub fn on_action(&mut self, action: Action) -> bool {
        for id in self.input_chain() {
            let Some(window) = self.windows.get_mut(&id) else {
                continue;
            };
            let handled = window.on_action(action);
            self.collect_events(id);
            if handled {
                return true;
            }
            if self.is_dialog_open(id) {
                if action == Action::Back {
                    return self.close_dialog(id);
                }
                if self.dialogs.iter().any(|d| d.id == id && d.modal) {
                    return false;
                }
            }
        }
        action == Action::Back && self.previous_window()
    }

    // ---- per frame ----

    fn visible_ids(&self) -> Vec<i32> {
        let mut ids: Vec<(bool, i32, usize, i32)> = self
            .windows
            .iter()
            .filter(|(_, w)| w.is_active() || w.is_closing())
            .map(|(id, w)| {
                let stack = self.dialogs.iter().position(|d| d.id == *id).unwrap_or(0);
                (w.is_dialog(), w.render_order(), stack, *id)
            })
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, _, _, id)| id).collect()
    }

    /// Deliver due messages, open/close condition dialogs, process every
    /// shown window and reclaim unused textures. Returns true while any
    /// window is animating.
    pub fn process(&mut self, now_ms: u32) -> bool {
        self.now_ms = now_ms;
        for envelope in self.queue.drain_due(now_ms) {
            self.send_message(&envelope.message, envelope.window);
        }
        self.update_auto_dialogs();

        let mut animating = false;
        for id in self.visible_ids() {
            if let Some(window) = self.windows.get_mut(&id) {
                animating |= window.process(now_ms);
            }
            self.collect_events(id);
        }

        let reclaimed = self.context.textures.cleanup(Instant::now());
        if reclaimed > 0 {
            log::trace!("Reclaimed {} unused textures", reclaimed);
        }
        animating
    }

    /// Draw the active window, closing windows and dialogs in render order
    pub fn render(&mut self, target: &mut dyn RenderTarget) -> Result<(), RenderError> {
        for id in self.visible_ids() {
            if let Some(window) = self.windows.get_mut(&id) {
                window.render(target)?;
            }
        }
        self.context.graphics.reset_stack();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{ButtonControl, Control};
    use crate::foundation::math::{Rect, Resolution};
    use crate::skin::XmlElement;
    use crate::tests::context_with;

    const HOME: i32 = 10000;
    const SETTINGS: i32 = 10004;
    const INFO: i32 = 12003;

    fn window_from(manager: &WindowManager, id: i32, xml: &str) -> Window {
        let mut window = Window::new(id, "inline.xml", Arc::clone(manager.context()));
        window.set_load_type(LoadType::KeepInMemory);
        let root = XmlElement::parse(xml).unwrap();
        assert!(window.load_from_xml(&root, Resolution::HD_720));
        window
    }

    fn manager() -> WindowManager {
        let mut manager = WindowManager::new(context_with(&[("bg.png", 1)]));
        let home = window_from(
            &manager,
            HOME,
            r#"<window><defaultcontrol>2</defaultcontrol><controls>
                <control type="image" id="1"><texture>bg.png</texture></control>
                <control type="button" id="2"/>
            </controls></window>"#,
        );
        let settings = window_from(
            &manager,
            SETTINGS,
            r#"<window><previouswindow>10000</previouswindow><controls>
                <control type="button" id="5"/>
            </controls></window>"#,
        );
        let info = window_from(
            &manager,
            INFO,
            r#"<window><type>dialog</type><visible>showinfo</visible><controls>
                <control type="button" id="9"/>
            </controls></window>"#,
        );
        assert!(manager.add(home));
        assert!(manager.add(settings));
        assert!(manager.add(info));
        manager
    }

    #[test]
    fn test_duplicate_id_is_refused() {
        let mut manager = manager();
        let duplicate = Window::new(HOME, "other.xml", Arc::clone(manager.context()));
        assert!(!manager.add(duplicate));
    }

    #[test]
    fn test_activation_deinits_previous_window() {
        let mut manager = manager();
        assert!(manager.activate_window(HOME));
        assert!(manager.window(HOME).unwrap().is_active());
        assert!(manager.context().info.is_window_active(HOME));

        assert!(manager.activate_window(SETTINGS));
        assert!(!manager.window(HOME).unwrap().is_active());
        assert_eq!(manager.history(), &[HOME, SETTINGS]);
        assert!(!manager.context().info.is_window_active(HOME));
    }

    #[test]
    fn test_returning_to_history_entry_truncates() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.activate_window(SETTINGS);
        manager.activate_window(HOME);
        assert_eq!(manager.history(), &[HOME]);
    }

    #[test]
    fn test_previous_window_prefers_declared_target() {
        let mut manager = manager();
        manager.activate_window(SETTINGS);
        assert!(manager.previous_window());
        assert_eq!(manager.active_window(), Some(HOME));
        assert!(!manager.previous_window(), "home declares nothing and has no history");
    }

    #[test]
    fn test_unknown_window_is_not_activated() {
        let mut manager = manager();
        assert!(!manager.activate_window(4242));
        assert_eq!(manager.active_window(), None);
    }

    #[test]
    fn test_invalid_window_restores_previous() {
        let mut manager = manager();
        manager.register(10025, "missing.xml");
        manager.activate_window(HOME);
        assert!(!manager.activate_window(10025));
        assert_eq!(manager.active_window(), Some(HOME));
        assert!(manager.window(HOME).unwrap().is_active());
    }

    #[test]
    fn test_condition_dialog_opens_and_closes() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.process(0);
        assert!(!manager.is_dialog_open(INFO));

        manager.context().info.set_bool("showinfo", true);
        manager.process(16);
        assert!(manager.is_dialog_open(INFO));
        assert_eq!(manager.topmost(), Some(INFO));

        manager.context().info.set_bool("showinfo", false);
        manager.process(32);
        assert!(!manager.is_dialog_open(INFO));
    }

    #[test]
    fn test_messages_go_to_topmost_handler() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.open_dialog(INFO, false);

        // only the home window has control 2
        let label = Message::new(MessageId::Hidden, 0, 2);
        assert!(manager.send_message(&label, None));
        assert!(!manager.window(HOME).unwrap().control(2).unwrap().base().is_visible());
    }

    #[test]
    fn test_modal_dialog_blocks_actions_below() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.open_dialog(INFO, true);
        assert!(manager.has_modal_dialog());
        assert!(!manager.on_action(Action::Select));
        assert!(manager.take_events().is_empty());
    }

    #[test]
    fn test_unhandled_click_becomes_event() {
        let mut manager = manager();
        manager.activate_window(HOME);
        assert!(manager.on_action(Action::Select));
        let events = manager.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, MessageId::Clicked);
        assert_eq!(events[0].control_id, 2);
    }

    #[test]
    fn test_posted_message_waits_for_its_time() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.process(100);
        manager.post_message(Message::new(MessageId::Disabled, 0, 2), Some(HOME), 50);

        manager.process(120);
        assert!(manager.window(HOME).unwrap().control(2).unwrap().base().is_enabled());
        manager.process(150);
        assert!(!manager.window(HOME).unwrap().control(2).unwrap().base().is_enabled());
    }

    #[test]
    fn test_broadcast_reaches_loaded_windows() {
        let mut manager = manager();
        let tree = manager.window_mut(SETTINGS).unwrap().tree_mut();
        let root = tree.root();
        tree.add(root, Box::new(ButtonControl::new(2, Rect::default())));

        let broadcast = Message::notify_all(0, MessageId::Disabled).with_param2(0);
        assert!(manager.send_message(&broadcast, None));
        for id in [HOME, SETTINGS] {
            let window = manager.window(id).unwrap();
            assert!(window.tree().keys().iter().all(|key| {
                let control = window.tree().get(*key).unwrap();
                !control.base().is_enabled()
            }));
        }
    }

    #[test]
    fn test_shutdown_unloads_everything() {
        let mut manager = manager();
        manager.activate_window(HOME);
        manager.shutdown();
        assert_eq!(manager.active_window(), None);
        assert!(manager.ids().iter().all(|id| !manager.window(*id).unwrap().is_loaded()));
        assert_eq!(manager.context().textures.entry_count(), 0);
    }
}
