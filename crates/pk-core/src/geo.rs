//! World-space geometry.
//!
//! The host world is a flat plane spanned by `x` and `z`; `y` is height and
//! is carried along but ignored by grid lookups.  Single precision matches the
//! host engine and is plenty for a map a few tens of kilometres across.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A point or direction in world space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Point on the ground plane.
    #[inline]
    pub const fn xz(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    #[inline]
    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn sqr_magnitude(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn magnitude(self) -> f32 {
        self.sqr_magnitude().sqrt()
    }

    #[inline]
    pub fn sqr_distance(self, other: Vec3) -> f32 {
        (self - other).sqr_magnitude()
    }

    #[inline]
    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).magnitude()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalized(self) -> Vec3 {
        let m = self.magnitude();
        if m > f32::EPSILON { self * (1.0 / m) } else { Vec3::ZERO }
    }

    #[inline]
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }

    /// Midpoint of an axis-aligned box given by two corners.
    #[inline]
    pub fn center_of(min: Vec3, max: Vec3) -> Vec3 {
        min.lerp(max, 0.5)
    }

    /// Closest point to `self` on the segment `a..b`, with the normalised
    /// offset `t ∈ [0, 1]` along it.
    pub fn project_on_segment(self, a: Vec3, b: Vec3) -> (Vec3, f32) {
        let ab = b - a;
        let len2 = ab.sqr_magnitude();
        if len2 <= f32::EPSILON {
            return (a, 0.0);
        }
        let t = ((self - a).dot(ab) / len2).clamp(0.0, 1.0);
        (a + ab * t, t)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, o: Vec3) {
        *self = *self + o;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Heading around the vertical axis, in radians.  Zero faces `+z`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotation {
    pub yaw: f32,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { yaw: 0.0 };

    #[inline]
    pub fn from_yaw(yaw: f32) -> Self {
        Self { yaw }
    }

    /// Heading that faces along `dir` (ground plane only).
    pub fn look_along(dir: Vec3) -> Self {
        if dir.x == 0.0 && dir.z == 0.0 {
            return Self::IDENTITY;
        }
        Self { yaw: dir.x.atan2(dir.z) }
    }

    #[inline]
    pub fn forward(self) -> Vec3 {
        Vec3::xz(self.yaw.sin(), self.yaw.cos())
    }

    /// Unit vector pointing to the right-hand side of the heading.
    #[inline]
    pub fn right(self) -> Vec3 {
        Vec3::xz(self.yaw.cos(), -self.yaw.sin())
    }
}
