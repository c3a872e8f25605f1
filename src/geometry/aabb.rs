//! Axis-aligned boxes
//!
//! A box is stored as a center position and a half size. A box with a
//! negative or zero half size on either axis is "empty" and never collides.

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box (center + half size)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub position: Vec2,
    pub half_size: Vec2,
}

impl Aabb {
    /// The empty box (no surface, never intersects anything)
    pub const EMPTY: Self = Self {
        position: Vec2::ZERO,
        half_size: Vec2::new(-1.0, -1.0),
    };

    pub const fn new(position: Vec2, half_size: Vec2) -> Self {
        Self {
            position,
            half_size,
        }
    }

    /// Build a box from its bottom-left and top-right corners
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        let (min, max) = (min.min(max), min.max(max));
        Self {
            position: (min + max) * 0.5,
            half_size: (max - min) * 0.5,
        }
    }

    /// Build a box from a bottom-left corner and a full size
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self::from_corners(min, min + size)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.position - self.half_size
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.position + self.half_size
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.half_size * 2.0
    }

    /// True when the box has no surface
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.half_size.x <= 0.0 || self.half_size.y <= 0.0
    }

    /// Strict overlap test: boxes that only share an edge do not intersect
    pub fn intersects(&self, other: &Aabb) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let delta = (self.position - other.position).abs();
        let reach = self.half_size + other.half_size;
        delta.x < reach.x && delta.y < reach.y
    }

    /// Same box moved by `offset`
    #[inline]
    pub fn translated(&self, offset: Vec2) -> Aabb {
        Aabb::new(self.position + offset, self.half_size)
    }

    /// Same center, half size multiplied by `factor`
    #[inline]
    pub fn scaled(&self, factor: f32) -> Aabb {
        Aabb::new(self.position, self.half_size * factor)
    }

    /// Smallest box containing both boxes. Empty boxes are ignored.
    pub fn union(&self, other: &Aabb) -> Aabb {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Aabb::EMPTY,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => {
                Aabb::from_corners(self.min().min(other.min()), self.max().max(other.max()))
            }
        }
    }

    /// Pack as `(center.x, center.y, half.x, half.y)` for uniforms
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(
            self.position.x,
            self.position.y,
            self.half_size.x,
            self.half_size.y,
        )
    }
}
