//! Affine helpers: rotation about a pivot, mirroring and transform composition.
//!
//! Angles are degrees. Positive angles turn clockwise on screen because the
//! y axis points down, the same convention layout editors use for rotated keys.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// Normalize an angle into `(-180, 180]`.
#[must_use]
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let mut a = angle_deg % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    // Avoid handing out -0.0, it leaks into serialized reports.
    if a == 0.0 {
        0.0
    } else {
        a
    }
}

#[must_use]
pub fn rotate_vec(v: Point, angle_deg: f64) -> Point {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Point::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

#[must_use]
pub fn rotate_point(p: Point, angle_deg: f64, pivot: Point) -> Point {
    rotate_vec(p - pivot, angle_deg) + pivot
}

/// Mirror line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Axis {
    /// The vertical line `x = c`.
    Vertical(f64),
    /// The horizontal line `y = c`.
    Horizontal(f64),
}

#[must_use]
pub fn mirror_point(p: Point, axis: Axis) -> Point {
    match axis {
        Axis::Vertical(c) => Point::new(2.0 * c - p.x, p.y),
        Axis::Horizontal(c) => Point::new(p.x, 2.0 * c - p.y),
    }
}

/// `p -> offset + R(angle) * M * p`, where `M` negates x when `mirrored`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Point,
    pub angle: f64,
    pub mirrored: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        offset: Point::ORIGIN,
        angle: 0.0,
        mirrored: false,
    };

    #[must_use]
    pub fn new(offset: Point, angle: f64, mirrored: bool) -> Self {
        Self {
            offset,
            angle: normalize_angle(angle),
            mirrored,
        }
    }

    #[must_use]
    pub fn translation(offset: Point) -> Self {
        Self::new(offset, 0.0, false)
    }

    /// Rotation by `angle_deg` around `pivot`.
    #[must_use]
    pub fn rotation_about(angle_deg: f64, pivot: Point) -> Self {
        Self::new(pivot - rotate_vec(pivot, angle_deg), angle_deg, false)
    }

    /// Reflection across the vertical line `x = axis_x`.
    #[must_use]
    pub fn mirror_x(axis_x: f64) -> Self {
        Self::new(Point::new(2.0 * axis_x, 0.0), 0.0, true)
    }

    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let local = if self.mirrored { Point::new(-p.x, p.y) } else { p };
        rotate_vec(local, self.angle) + self.offset
    }

    /// Apply only the linear part, for offsets that must not be translated.
    #[must_use]
    pub fn apply_vec(&self, v: Point) -> Point {
        let local = if self.mirrored { Point::new(-v.x, v.y) } else { v };
        rotate_vec(local, self.angle)
    }

    /// `self` applied after `inner`.
    #[must_use]
    pub fn then_after(&self, inner: &Transform) -> Transform {
        compose(self, inner)
    }

    #[must_use]
    pub fn inverse(&self) -> Transform {
        let back = rotate_vec(self.offset, -self.angle);
        let back = if self.mirrored { Point::new(-back.x, back.y) } else { back };
        let angle = if self.mirrored { self.angle } else { -self.angle };
        Transform::new(-back, angle, self.mirrored)
    }
}

/// Composition `a ∘ b`: the result maps `p` to `a.apply(b.apply(p))`.
///
/// A mirror flips the handedness of everything applied before it, so `b`'s
/// angle changes sign when `a` is mirrored.
#[must_use]
pub fn compose(a: &Transform, b: &Transform) -> Transform {
    let angle = if a.mirrored {
        a.angle - b.angle
    } else {
        a.angle + b.angle
    };
    Transform::new(a.apply(b.offset), angle, a.mirrored != b.mirrored)
}
