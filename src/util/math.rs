//! Math type re-exports and the axis-aligned bounds used by every builder.
//!
//! This module re-exports the `glam` types the crate works with and
//! provides [`Bounds`], the box type shared by the bottom-level builder,
//! the top-level builder and the translator.

pub use glam::{Mat4, UVec3, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding box.
///
/// The empty value has `lower = +inf` and `upper = -inf`, so that the union
/// with any real box yields that box unchanged.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Bounds {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl Bounds {
    /// Empty bounds (inverted, will expand on first point or box).
    pub const EMPTY: Self = Self {
        lower: Vec3::splat(f32::INFINITY),
        upper: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create bounds from lower and upper corners.
    #[inline]
    pub const fn new(lower: Vec3, upper: Vec3) -> Self {
        Self { lower, upper }
    }

    /// Create bounds around a single point.
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { lower: p, upper: p }
    }

    /// Create bounds enclosing all given points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.grow_point(p);
        }
        b
    }

    /// Check if these bounds contain nothing (lower > upper on some axis).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x || self.lower.y > self.upper.y || self.lower.z > self.upper.z
    }

    /// True when both corners are finite numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    /// Expand to include a point.
    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.lower = self.lower.min(p);
        self.upper = self.upper.max(p);
    }

    /// Expand to include another box.
    #[inline]
    pub fn grow(&mut self, other: &Bounds) {
        self.lower = self.lower.min(other.lower);
        self.upper = self.upper.max(other.upper);
    }

    /// Union of two boxes.
    #[inline]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Midpoint of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.lower + self.upper) * 0.5
    }

    /// Edge lengths (`upper - lower`).
    #[inline]
    pub fn edges(&self) -> Vec3 {
        self.upper - self.lower
    }

    /// Surface area, zero for empty bounds.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.edges();
        2.0 * (e.x * e.y + e.x * e.z + e.y * e.z)
    }

    /// Longest axis (0=x, 1=y, 2=z).
    ///
    /// Ties go to the earlier axis: x wins over y and z, y wins over z.
    #[inline]
    pub fn longest_axis(&self) -> usize {
        longest_axis(self.edges())
    }

    /// True if `other` lies entirely inside these bounds.
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        self.lower.cmple(other.lower).all() && self.upper.cmpge(other.upper).all()
    }

    /// True if the point lies inside (inclusive).
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.lower.cmple(p).all() && self.upper.cmpge(p).all()
    }
}

/// Index of the largest component, first axis wins ties.
#[inline]
pub fn longest_axis(v: Vec3) -> usize {
    if v.x >= v.y && v.x >= v.z {
        0
    } else if v.y >= v.z {
        1
    } else {
        2
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bounds({:?} - {:?})", self.lower, self.upper)
    }
}
