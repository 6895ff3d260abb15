//! Shared graphics state
//!
//! Holds the display and skin resolutions, the origin/transform stack used
//! while rendering nested controls, and the window camera. The lock is
//! reentrant: a window holds it for a whole allocation pass while the
//! controls it allocates call back into the context.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;

use crate::foundation::math::{Point, Rect, Resolution, TransformMatrix};

/// Guard returned by [`GraphicsContext::lock`]
pub type GraphicsGuard<'a> = ReentrantMutexGuard<'a, RefCell<RenderState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEntry {
    Origin,
    Transform,
}

/// Mutable rendering state behind the graphics lock
#[derive(Debug)]
pub struct RenderState {
    display: Resolution,
    coords: Resolution,
    scale: (f32, f32),
    /// Accumulated transforms; the last element is the current one
    stack: Vec<(StackEntry, TransformMatrix)>,
    camera: Option<Point>,
}

impl RenderState {
    fn current(&self) -> TransformMatrix {
        self.stack.last().map_or_else(TransformMatrix::identity, |(_, m)| *m)
    }

    fn push(&mut self, kind: StackEntry, transform: TransformMatrix) {
        let combined = self.current() * transform;
        self.stack.push((kind, combined));
    }

    fn pop(&mut self, kind: StackEntry) {
        match self.stack.last() {
            Some((top, _)) if *top == kind => {
                self.stack.pop();
            }
            Some((top, _)) => {
                log::error!("Graphics stack mismatch: popping {:?} but top is {:?}", kind, top);
                self.stack.pop();
            }
            None => log::error!("Graphics stack underflow popping {:?}", kind),
        }
    }
}

/// Process-wide graphics context
#[derive(Debug)]
pub struct GraphicsContext {
    state: ReentrantMutex<RefCell<RenderState>>,
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self::new(Resolution::default())
    }
}

impl GraphicsContext {
    /// Create a context rendering to `display`
    pub fn new(display: Resolution) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(RenderState {
                display,
                coords: display,
                scale: (1.0, 1.0),
                stack: Vec::new(),
                camera: None,
            })),
        }
    }

    /// Take the graphics lock; may be re-entered by the same thread
    pub fn lock(&self) -> GraphicsGuard<'_> {
        self.state.lock()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RenderState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Display resolution
    pub fn display_resolution(&self) -> Resolution {
        self.with_state(|s| s.display)
    }

    /// Change the display resolution; the skin scale is recomputed
    pub fn set_display_resolution(&self, display: Resolution) {
        self.with_state(|s| {
            s.display = display;
            s.scale = s.coords.scale_to(display);
        });
    }

    /// Resolution the current skin coordinates are authored in
    pub fn coords_resolution(&self) -> Resolution {
        self.with_state(|s| s.coords)
    }

    /// Set the skin coordinate resolution for the window being processed.
    ///
    /// With `need_scaling` false coordinates are used as display pixels.
    pub fn set_rendering_resolution(&self, coords: Resolution, need_scaling: bool) {
        self.with_state(|s| {
            s.coords = coords;
            s.scale = if need_scaling {
                coords.scale_to(s.display)
            } else {
                (1.0, 1.0)
            };
        });
    }

    /// Current skin-to-display scale factors
    pub fn scale(&self) -> (f32, f32) {
        self.with_state(|s| s.scale)
    }

    /// Offset subsequent drawing by `(x, y)` relative to the current origin
    pub fn set_origin(&self, x: f32, y: f32) {
        self.with_state(|s| s.push(StackEntry::Origin, TransformMatrix::translation(x, y)));
    }

    /// Undo the matching [`Self::set_origin`]
    pub fn restore_origin(&self) {
        self.with_state(|s| s.pop(StackEntry::Origin));
    }

    /// Current origin in skin coordinates
    pub fn origin(&self) -> Point {
        self.with_state(|s| s.current().transform_point(Point::new(0.0, 0.0)))
    }

    /// Compose `transform` onto the current transform
    pub fn add_transform(&self, transform: TransformMatrix) {
        self.with_state(|s| s.push(StackEntry::Transform, transform));
    }

    /// Undo the matching [`Self::add_transform`]
    pub fn remove_transform(&self) {
        self.with_state(|s| s.pop(StackEntry::Transform));
    }

    /// Depth of the origin/transform stack
    pub fn stack_depth(&self) -> usize {
        self.with_state(|s| s.stack.len())
    }

    /// Drop every pushed origin and transform
    pub fn reset_stack(&self) {
        self.with_state(|s| {
            if !s.stack.is_empty() {
                log::warn!("Resetting {} unbalanced graphics stack entries", s.stack.len());
                s.stack.clear();
            }
        });
    }

    /// Set or clear the camera position used for stereo/perspective effects
    pub fn set_camera_position(&self, camera: Option<Point>) {
        self.with_state(|s| s.camera = camera);
    }

    /// Current camera position
    pub fn camera_position(&self) -> Option<Point> {
        self.with_state(|s| s.camera)
    }

    /// Map a rectangle in skin coordinates to display pixels
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        self.with_state(|s| {
            let local = s.current().transform_rect(rect);
            let (sx, sy) = s.scale;
            Rect::new(local.x * sx, local.y * sy, local.width * sx, local.height * sy)
        })
    }

    /// Alpha accumulated from every active transform
    pub fn final_alpha(&self) -> f32 {
        self.with_state(|s| s.current().alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_origins_nest() {
        let ctx = GraphicsContext::new(Resolution::HD_720);
        ctx.set_origin(100.0, 50.0);
        ctx.set_origin(10.0, 5.0);
        assert_eq!(ctx.origin(), Point::new(110.0, 55.0));

        ctx.restore_origin();
        assert_eq!(ctx.origin(), Point::new(100.0, 50.0));
        ctx.restore_origin();
        assert_eq!(ctx.stack_depth(), 0);
    }

    #[test]
    fn test_map_rect_scales_to_display() {
        let ctx = GraphicsContext::new(Resolution::HD_1080);
        ctx.set_rendering_resolution(Resolution::HD_720, true);
        ctx.set_origin(10.0, 10.0);

        let mapped = ctx.map_rect(&Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_relative_eq!(mapped.x, 15.0);
        assert_relative_eq!(mapped.width, 150.0);
        ctx.restore_origin();

        ctx.set_rendering_resolution(Resolution::HD_720, false);
        let unscaled = ctx.map_rect(&Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_relative_eq!(unscaled.width, 100.0);
    }

    #[test]
    fn test_alpha_accumulates() {
        let ctx = GraphicsContext::default();
        ctx.add_transform(TransformMatrix::fade(0.5));
        ctx.add_transform(TransformMatrix::fade(0.5));
        assert_relative_eq!(ctx.final_alpha(), 0.25);
        ctx.remove_transform();
        ctx.remove_transform();
        assert_relative_eq!(ctx.final_alpha(), 1.0);
    }

    #[test]
    fn test_lock_is_reentrant() {
        let ctx = GraphicsContext::default();
        let _outer = ctx.lock();
        ctx.set_origin(1.0, 1.0);
        assert_eq!(ctx.stack_depth(), 1);
        ctx.reset_stack();
        assert_eq!(ctx.stack_depth(), 0);
    }
}
