//! State shared by every control
//!
//! [`ControlBase`] owns identity, geometry, the visibility state machine,
//! allocation flags, focus and the animation set. Concrete controls embed
//! one and expose it through [`super::Control::base`].

use crate::foundation::math::{Rect, TransformMatrix};
use crate::info::{Condition, ConditionContext, ControlFlags};
use crate::messages::Direction;

use super::animation::{Animation, AnimationProcess, AnimationState, AnimationType};

/// Cached visibility of a control for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibleState {
    /// Shown
    #[default]
    Visible,
    /// Not shown
    Hidden,
    /// Changing visibility: a hide animation is still running, or a show
    /// animation is waiting out its delay. Treated as shown for allocation
    /// and rendering.
    Delayed,
}

fn nav_slot(direction: Direction) -> usize {
    match direction {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

/// Identity, geometry, visibility, allocation and animation state
#[derive(Debug, Clone)]
pub struct ControlBase {
    id: i32,
    parent_window: i32,
    rect: Rect,

    visible_condition: Option<Condition>,
    visible_from_condition: bool,
    visible: VisibleState,
    force_hidden: bool,
    enabled: bool,
    has_focus: bool,

    allocated: bool,
    dynamic_resource_alloc: bool,
    has_processed: bool,

    animations: Vec<Animation>,
    transform: TransformMatrix,
    navigation: [Option<i32>; 4],
}

impl ControlBase {
    /// Create a visible, enabled, unallocated control
    pub fn new(id: i32, rect: Rect) -> Self {
        Self {
            id,
            parent_window: 0,
            rect,
            visible_condition: None,
            visible_from_condition: true,
            visible: VisibleState::Visible,
            force_hidden: false,
            enabled: true,
            has_focus: false,
            allocated: false,
            dynamic_resource_alloc: true,
            has_processed: false,
            animations: Vec::new(),
            transform: TransformMatrix::identity(),
            navigation: [None; 4],
        }
    }

    /// Control id (unique within its window, 0 for anonymous controls)
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Id of the owning window
    pub fn parent_window(&self) -> i32 {
        self.parent_window
    }

    pub(crate) fn set_parent_window(&mut self, window_id: i32) {
        self.parent_window = window_id;
    }

    /// Position and size in the window's coordinate resolution
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Move and resize
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    /// Replace the visibility condition
    pub fn set_visible_condition(&mut self, condition: Option<Condition>) {
        self.visible_condition = condition;
    }

    /// Visibility condition, if any
    pub fn visible_condition(&self) -> Option<&Condition> {
        self.visible_condition.as_ref()
    }

    /// Cached visibility state
    pub fn visible_state(&self) -> VisibleState {
        self.visible
    }

    /// Fully visible and not forced hidden
    pub fn is_visible(&self) -> bool {
        !self.force_hidden && self.visible == VisibleState::Visible
    }

    /// Visible or delayed; such a control keeps its resources and is drawn
    pub fn is_shown(&self) -> bool {
        !self.force_hidden && self.visible != VisibleState::Hidden
    }

    /// Explicit show/hide on top of the visibility condition
    pub fn set_visible(&mut self, visible: bool) {
        self.force_hidden = !visible;
        if self.force_hidden && self.is_animating(AnimationType::Visible) {
            self.reset_animation(AnimationType::Visible);
        }
    }

    /// Enabled state
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Focus state
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Gain or lose focus, queueing the focus/unfocus animation
    pub fn set_focus(&mut self, focus: bool) {
        if focus && !self.has_focus {
            self.queue_animation(AnimationType::Focus, None);
        } else if !focus && self.has_focus {
            self.queue_animation(AnimationType::Unfocus, None);
        }
        self.has_focus = focus;
    }

    /// True while texture references are held
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    pub(crate) fn set_allocated(&mut self, allocated: bool) {
        self.allocated = allocated;
    }

    /// Whether resources are freed when the control is hidden
    pub fn dynamic_resource_alloc(&self) -> bool {
        self.dynamic_resource_alloc
    }

    /// Toggle freeing of resources while hidden
    pub fn set_dynamic_resource_alloc(&mut self, dynamic: bool) {
        self.dynamic_resource_alloc = dynamic;
    }

    /// True once the control has been rendered since its last reset
    pub fn has_processed(&self) -> bool {
        self.has_processed
    }

    pub(crate) fn set_processed(&mut self, processed: bool) {
        self.has_processed = processed;
    }

    /// Navigation target in `direction`
    pub fn navigation(&self, direction: Direction) -> Option<i32> {
        self.navigation[nav_slot(direction)]
    }

    /// Set the navigation target in `direction`
    pub fn set_navigation(&mut self, direction: Direction, target: Option<i32>) {
        self.navigation[nav_slot(direction)] = target.filter(|id| *id != 0);
    }

    /// Add an animation
    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.push(animation);
    }

    /// Animations in declaration order
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Transform produced by the last [`Self::animate`]
    pub fn transform(&self) -> TransformMatrix {
        self.transform
    }

    /// Status flags for condition evaluation (`selected` comes from the control)
    pub fn flags(&self, selected: bool) -> ControlFlags {
        let mut flags = ControlFlags::empty();
        flags.set(ControlFlags::VISIBLE, self.is_visible());
        flags.set(ControlFlags::FOCUSED, self.has_focus);
        flags.set(ControlFlags::SELECTED, selected);
        flags.set(ControlFlags::ENABLED, self.enabled);
        flags
    }

    fn find_animation(&self, kind: AnimationType, ctx: Option<&ConditionContext<'_>>) -> Option<usize> {
        self.animations.iter().position(|anim| {
            anim.kind() == kind && ctx.map_or(true, |ctx| anim.condition_met(ctx))
        })
    }

    /// True if an animation of `kind` is queued or running
    pub fn is_animating(&self, kind: AnimationType) -> bool {
        self.animations.iter().any(|anim| {
            anim.kind() == kind
                && (anim.queued_process() == AnimationProcess::Normal
                    || (anim.process() == AnimationProcess::Normal
                        && matches!(anim.state(), AnimationState::InProcess | AnimationState::Delayed)))
        })
    }

    /// Reset every animation of `kind`
    pub fn reset_animation(&mut self, kind: AnimationType) {
        for anim in self.animations.iter_mut().filter(|a| a.kind() == kind) {
            anim.reset();
        }
    }

    /// Reset animations; conditional ones are kept unless `include_conditional`
    pub fn reset_animations(&mut self, include_conditional: bool) {
        for anim in &mut self.animations {
            if include_conditional || anim.kind() != AnimationType::Conditional {
                anim.reset();
            }
        }
        self.transform = TransformMatrix::identity();
    }

    fn check_animation(&mut self, kind: AnimationType) -> bool {
        if (!self.is_visible() || !self.has_processed) && kind == AnimationType::WindowClose {
            // never drawn, so there is nothing to close; drop a pending open
            self.reset_animation(AnimationType::WindowOpen);
            return false;
        }
        if !self.is_visible() {
            if kind == AnimationType::Hidden && !self.is_animating(AnimationType::Visible) {
                self.update_states(kind, AnimationProcess::Normal, AnimationState::Applied);
                return false;
            }
            if kind == AnimationType::WindowOpen {
                return false;
            }
        }
        true
    }

    /// Start the animation for `kind`, reversing its opposite if that is mid-flight.
    ///
    /// With no animation for `kind`, visibility changes take effect at once.
    pub fn queue_animation(&mut self, kind: AnimationType, ctx: Option<&ConditionContext<'_>>) {
        if !self.check_animation(kind) {
            return;
        }
        let reverse = kind.reverse().and_then(|r| self.find_animation(r, None));
        let forward = self.find_animation(kind, ctx);

        if let Some(r) = reverse.filter(|&r| {
            let anim = &self.animations[r];
            anim.is_reversible()
                && matches!(anim.state(), AnimationState::InProcess | AnimationState::Delayed)
        }) {
            self.animations[r].queue(AnimationProcess::Reverse);
            if let Some(f) = forward {
                self.animations[f].reset();
            }
        } else if let Some(f) = forward {
            self.animations[f].queue(AnimationProcess::Normal);
            if let Some(r) = reverse {
                self.animations[r].reset();
            }
        } else if kind == AnimationType::Hidden {
            self.visible = VisibleState::Hidden;
        } else if kind == AnimationType::Visible {
            self.visible = if self.visible_from_condition {
                VisibleState::Visible
            } else {
                VisibleState::Hidden
            };
        }
    }

    /// Evaluate the visibility condition without animating, and prime
    /// conditional animations
    pub fn set_initial_visibility(&mut self, ctx: &ConditionContext<'_>) {
        if let Some(condition) = &self.visible_condition {
            self.visible_from_condition = condition.evaluate(ctx);
            self.visible = if self.visible_from_condition {
                VisibleState::Visible
            } else {
                VisibleState::Hidden
            };
        }
        let center = self.rect.center();
        for anim in &mut self.animations {
            if anim.kind() == AnimationType::Conditional {
                anim.set_initial_condition(ctx, center);
            }
        }
    }

    /// Re-evaluate the visibility condition, queueing show/hide animations
    /// on a change, and update conditional animations
    pub fn update_visibility(&mut self, ctx: &ConditionContext<'_>) {
        if let Some(condition) = &self.visible_condition {
            let was_visible = self.visible_from_condition;
            self.visible_from_condition = condition.evaluate(ctx);
            if !was_visible && self.visible_from_condition {
                self.queue_animation(AnimationType::Visible, Some(ctx));
            } else if was_visible && !self.visible_from_condition {
                self.queue_animation(AnimationType::Hidden, Some(ctx));
            }
        }
        for anim in &mut self.animations {
            if anim.kind() == AnimationType::Conditional {
                anim.update_condition(ctx);
            }
        }
    }

    /// Advance animations to `now_ms` and rebuild the transform.
    ///
    /// Returns true if any animation is still running.
    pub fn animate(&mut self, now_ms: u32) -> bool {
        let start_anim = self.has_processed || self.visible == VisibleState::Delayed;
        let center = self.rect.center();
        let mut transform = TransformMatrix::identity();
        let mut changed = false;

        for i in 0..self.animations.len() {
            self.animations[i].animate(now_ms, start_anim);
            let (kind, process, state) = {
                let anim = &self.animations[i];
                (anim.kind(), anim.process(), anim.state())
            };
            self.update_states(kind, process, state);
            changed |= process != AnimationProcess::None;
            transform = transform * self.animations[i].render_transform(center);
        }
        self.transform = transform;
        changed
    }

    fn shown_from_condition(&self) -> VisibleState {
        if self.visible_from_condition {
            VisibleState::Visible
        } else {
            VisibleState::Hidden
        }
    }

    fn update_states(&mut self, kind: AnimationType, process: AnimationProcess, state: AnimationState) {
        match (kind, process) {
            (AnimationType::Visible, AnimationProcess::Reverse) => {
                // show undone: in flight keeps it on screen, finished hides it
                self.visible = if state == AnimationState::Applied {
                    VisibleState::Hidden
                } else {
                    VisibleState::Delayed
                };
            }
            (AnimationType::Visible | AnimationType::WindowOpen, AnimationProcess::Normal) => {
                self.visible = if state == AnimationState::Delayed {
                    VisibleState::Delayed
                } else {
                    self.shown_from_condition()
                };
            }
            (AnimationType::Hidden, AnimationProcess::Normal) => {
                self.visible = if state == AnimationState::Applied {
                    VisibleState::Hidden
                } else {
                    VisibleState::Delayed
                };
            }
            (AnimationType::Hidden, AnimationProcess::Reverse) => {
                self.visible = self.shown_from_condition();
            }
            _ => {}
        }
    }
}
