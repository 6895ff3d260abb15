//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a control stored in a window's control arena.
    ///
    /// Keys stay valid across free/alloc cycles and are only invalidated
    /// when the control is removed from the tree.
    pub struct ControlKey;
}

/// Arena of controls keyed by [`ControlKey`]
pub type ControlArena<T> = SlotMap<ControlKey, T>;
