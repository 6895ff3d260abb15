//! Window/control message protocol
//!
//! Windows and controls talk through [`Message`] values rather than direct
//! calls. A handler returns `true` when it consumed the message, which lets
//! the router decide whether to fall through to default behaviour.
//!
//! Key principles:
//! - Messages are plain values addressed by window id and control id
//! - Handlers return bool (true = consumed, stops forwarding)
//! - Queuing support (immediate + deferred delivery)

mod queue;

pub use queue::{Envelope, MessageQueue};

/// Message identifiers understood by windows and controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageId {
    /// Window is being shown
    WindowInit = 1,
    /// Window is being hidden
    WindowDeinit = 2,
    /// A control was activated
    Clicked = 3,
    /// Selection inside a container changed
    SelChanged = 4,
    /// A control gained focus (sent up to the window)
    Focused = 5,
    /// A control lost focus
    LostFocus = 6,
    /// Navigation request: control_id is the target, param1 the direction
    Move = 7,
    /// Give focus to control_id
    SetFocus = 8,
    /// Broadcast wrapper: param1 carries the inner message id
    NotifyAll = 9,
    /// Select item param1 in a container
    ItemSelect = 10,
    /// Query the selected item of a container (answer in param1)
    ItemSelected = 11,
    /// Thumbnails changed, containers should rebind textures
    RefreshThumbs = 12,
    /// Set the label of a control
    LabelSet = 13,
    /// Append an item/label to a container
    LabelAdd = 14,
    /// Clear the label(s) of a control
    LabelReset = 15,
    /// Force a control visible
    Visible = 16,
    /// Force a control hidden
    Hidden = 17,
    /// Enable a control
    Enabled = 18,
    /// Disable a control
    Disabled = 19,
    /// Select a radio button
    SetSelected = 20,
    /// Deselect a radio button
    SetDeselected = 21,
    /// Container page changed
    PageChange = 22,
    /// Display resolution changed
    WindowResize = 23,
    /// Remove focus from every control
    UnfocusAll = 24,
}

impl MessageId {
    const ALL: [Self; 24] = [
        Self::WindowInit,
        Self::WindowDeinit,
        Self::Clicked,
        Self::SelChanged,
        Self::Focused,
        Self::LostFocus,
        Self::Move,
        Self::SetFocus,
        Self::NotifyAll,
        Self::ItemSelect,
        Self::ItemSelected,
        Self::RefreshThumbs,
        Self::LabelSet,
        Self::LabelAdd,
        Self::LabelReset,
        Self::Visible,
        Self::Hidden,
        Self::Enabled,
        Self::Disabled,
        Self::SetSelected,
        Self::SetDeselected,
        Self::PageChange,
        Self::WindowResize,
        Self::UnfocusAll,
    ];

    /// Numeric value (used when a message id travels in a parameter)
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Message id from its numeric value
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.raw() == raw)
    }
}

/// A message addressed to a window and optionally one of its controls
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// What the message means
    pub id: MessageId,
    /// Window (or control) that produced the message; 0 = anyone
    pub sender_id: i32,
    /// Control the message targets or concerns
    pub control_id: i32,
    /// First parameter
    pub param1: i32,
    /// Second parameter
    pub param2: i32,
    /// Text payload
    pub label: String,
}

impl Message {
    /// Create a message with zero parameters and no label
    pub fn new(id: MessageId, sender_id: i32, control_id: i32) -> Self {
        Self {
            id,
            sender_id,
            control_id,
            param1: 0,
            param2: 0,
            label: String::new(),
        }
    }

    /// Broadcast `inner` to every window
    pub fn notify_all(sender_id: i32, inner: MessageId) -> Self {
        Self::new(MessageId::NotifyAll, sender_id, 0).with_param1(inner.raw())
    }

    /// Set param1 (builder pattern)
    #[must_use]
    pub fn with_param1(mut self, param1: i32) -> Self {
        self.param1 = param1;
        self
    }

    /// Set param2 (builder pattern)
    #[must_use]
    pub fn with_param2(mut self, param2: i32) -> Self {
        self.param2 = param2;
        self
    }

    /// Set the label (builder pattern)
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Inner message id of a `NotifyAll` broadcast
    pub fn notified_id(&self) -> Option<MessageId> {
        if self.id == MessageId::NotifyAll {
            MessageId::from_raw(self.param1)
        } else {
            None
        }
    }

    /// Direction carried by a `Move` message
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_raw(self.param1)
    }
}

/// Navigation direction between controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up
    Up,
    /// Down
    Down,
    /// Left
    Left,
    /// Right
    Right,
}

impl Direction {
    /// Numeric value for message parameters
    pub const fn raw(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => 2,
            Self::Left => 3,
            Self::Right => 4,
        }
    }

    /// Direction from its numeric value
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Up),
            2 => Some(Self::Down),
            3 => Some(Self::Left),
            4 => Some(Self::Right),
            _ => None,
        }
    }
}

/// User actions delivered to the focused window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Navigate up
    MoveUp,
    /// Navigate down
    MoveDown,
    /// Navigate left
    MoveLeft,
    /// Navigate right
    MoveRight,
    /// Activate the focused control
    Select,
    /// Go back / close
    Back,
    /// Open the context menu
    ContextMenu,
    /// Page up in containers
    PageUp,
    /// Page down in containers
    PageDown,
}

impl Action {
    /// Navigation direction of a move action
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::MoveUp => Some(Direction::Up),
            Self::MoveDown => Some(Direction::Down),
            Self::MoveLeft => Some(Direction::Left),
            Self::MoveRight => Some(Direction::Right),
            _ => None,
        }
    }
}
