//! Math utilities and types
//!
//! Provides the 2D math used for skin coordinates: points, rectangles,
//! resolutions and affine transforms with an alpha channel.

use serde::{Deserialize, Serialize};
use std::ops::Mul;

pub use nalgebra::{Matrix3, Vector3};

/// 3x3 matrix type (2D affine transform in homogeneous coordinates)
pub type Mat3 = Matrix3<f32>;

/// 2D point in skin or screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its top-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Centre of the rectangle
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// True if the rectangle covers no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest rectangle containing both rectangles (empty rectangles are ignored)
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }
}

/// A display or skin resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 1280x720, the resolution most skins author against
    pub const HD_720: Self = Self::new(1280, 720);

    /// 1920x1080
    pub const HD_1080: Self = Self::new(1920, 1080);

    /// Scale factors mapping coordinates authored at `self` onto `target`
    pub fn scale_to(&self, target: Self) -> (f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (1.0, 1.0);
        }
        (
            target.width as f32 / self.width as f32,
            target.height as f32 / self.height as f32,
        )
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD_720
    }
}

/// 2D affine transform plus an alpha multiplier.
///
/// Composition multiplies the matrices and the alphas, so nested
/// animations fade and move together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    /// Homogeneous 2D transform
    pub matrix: Mat3,
    /// Alpha multiplier in 0..=1
    pub alpha: f32,
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformMatrix {
    /// Identity transform with full opacity
    pub fn identity() -> Self {
        Self {
            matrix: Mat3::identity(),
            alpha: 1.0,
        }
    }

    /// Pure translation
    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            matrix: Mat3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0),
            alpha: 1.0,
        }
    }

    /// Scale about the origin
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            matrix: Mat3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
            alpha: 1.0,
        }
    }

    /// Scale about an arbitrary centre point
    pub fn scale_about(center: Point, sx: f32, sy: f32) -> Self {
        Self::translation(center.x, center.y)
            * Self::scale(sx, sy)
            * Self::translation(-center.x, -center.y)
    }

    /// Alpha-only transform
    pub fn fade(alpha: f32) -> Self {
        Self {
            matrix: Mat3::identity(),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// True if this transform neither moves nor fades anything
    pub fn is_identity(&self) -> bool {
        self.matrix == Mat3::identity() && (self.alpha - 1.0).abs() < f32::EPSILON
    }

    /// Map a point through the transform
    pub fn transform_point(&self, point: Point) -> Point {
        let v = self.matrix * Vector3::new(point.x, point.y, 1.0);
        Point::new(v.x, v.y)
    }

    /// Map a rectangle, returning the axis-aligned bounds of the result
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.transform_point(Point::new(rect.x, rect.y)),
            self.transform_point(Point::new(rect.right(), rect.y)),
            self.transform_point(Point::new(rect.x, rect.bottom())),
            self.transform_point(Point::new(rect.right(), rect.bottom())),
        ];
        let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

impl Mul for TransformMatrix {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            matrix: self.matrix * rhs.matrix,
            alpha: self.alpha * rhs.alpha,
        }
    }
}
