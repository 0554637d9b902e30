//! Ray and rectangle primitives shared by the partition and the resolver.
//!
//! A `Ray` here is a finite directed segment: `origin` to `origin + dir`.
//! Parameters along a ray are in [0, 1] for points between its ends.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Below this magnitude a cross product is treated as zero (parallel rays).
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Squared length under which a ray has no usable direction.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-12;

#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec2,
    pub dir: Vec2,
}

impl Ray {
    pub const fn new(origin: Vec2, dir: Vec2) -> Self {
        Self { origin, dir }
    }

    pub fn from_points(start: Vec2, end: Vec2) -> Self {
        Self {
            origin: start,
            dir: end - start,
        }
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        self.origin + self.dir
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec2 {
        self.origin + self.dir * t
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.dir.length_squared() <= DEGENERATE_LENGTH_SQ
    }

    /// Same ray shifted by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            origin: self.origin + offset,
            dir: self.dir,
        }
    }

    /// Line-line intersection parameters `(t_self, t_other)`, uncapped.
    ///
    /// Returns `None` for parallel or degenerate pairs. Callers decide which
    /// parameter ranges count as a hit.
    pub fn intersect(&self, other: &Ray) -> Option<(f32, f32)> {
        let denom = cross(self.dir, other.dir);
        if denom.abs() <= PARALLEL_EPSILON {
            return None;
        }
        let delta = other.origin - self.origin;
        let t = cross(delta, other.dir) / denom;
        let u = cross(delta, self.dir) / denom;
        Some((t, u))
    }

    /// Axis-aligned bounds of the segment.
    pub fn bounds(&self) -> Rect {
        let end = self.end();
        Rect::from_corners(self.origin.min(end), self.origin.max(end))
    }
}

/// Axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expanded(&self, margin: f32) -> Rect {
        Rect {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }
}
