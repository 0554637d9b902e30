//! Static collision segments.
//!
//! A segment is a directed ray from its start to its end. Its collidable side
//! is given by `normal`, the direction rotated a quarter turn: `(d.y, -d.x)`.
//! With +y pointing down this makes polylines wound clockwise on screen face
//! outward, so a floor runs left to right and a ceiling right to left.

use glam::Vec2;
use ledge_core::geometry::Ray;
use ledge_core::CollisionType;
use serde::Serialize;
use std::fmt;

/// Tolerance on `normal.y` below which a segment counts as a vertical wall.
pub const SURFACE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SegmentId(pub u32);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Floor,
    Ceiling,
    /// Normal points to -x.
    LeftWall,
    /// Normal points to +x.
    RightWall,
}

impl SurfaceKind {
    pub fn from_normal(normal: Vec2) -> Self {
        if normal.y < -SURFACE_EPSILON {
            Self::Floor
        } else if normal.y > SURFACE_EPSILON {
            Self::Ceiling
        } else if normal.x < 0.0 {
            Self::LeftWall
        } else {
            Self::RightWall
        }
    }

    pub fn category(self) -> SurfaceCategory {
        match self {
            Self::Floor => SurfaceCategory::Floor,
            Self::Ceiling => SurfaceCategory::Ceiling,
            Self::LeftWall | Self::RightWall => SurfaceCategory::Wall,
        }
    }

    pub fn collision_type(self) -> CollisionType {
        match self {
            Self::Floor => CollisionType::FLOOR,
            Self::Ceiling => CollisionType::CEILING,
            Self::LeftWall => CollisionType::LEFT_WALL,
            Self::RightWall => CollisionType::RIGHT_WALL,
        }
    }

    #[inline]
    pub fn is_wall(self) -> bool {
        matches!(self, Self::LeftWall | Self::RightWall)
    }
}

/// The three groups a detect pass runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceCategory {
    Floor,
    Ceiling,
    Wall,
}

impl SurfaceCategory {
    /// Direction used to project a point onto a surface of this category
    /// when resolving.
    pub fn resolve_direction(self) -> Vec2 {
        match self {
            Self::Floor => Vec2::Y,
            Self::Ceiling => Vec2::NEG_Y,
            Self::Wall => Vec2::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentEnd {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSegment {
    pub id: SegmentId,
    pub ray: Ray,
    pub normal: Vec2,
    pub kind: SurfaceKind,
    pub start_ledge: bool,
    pub end_ledge: bool,
    pub prev: Option<SegmentId>,
    pub next: Option<SegmentId>,
}

impl CollisionSegment {
    /// Unlinked segment from `start` to `end`. Returns `None` for a
    /// zero-length pair or one whose extent is not finite.
    pub fn new(id: SegmentId, start: Vec2, end: Vec2) -> Option<Self> {
        let ray = Ray::from_points(start, end);
        if ray.is_degenerate() || !(start.is_finite() && ray.dir.is_finite()) {
            return None;
        }
        // Scaled down first so huge coordinates do not overflow the length.
        let perp = Vec2::new(ray.dir.y, -ray.dir.x);
        let normal = (perp / perp.abs().max_element()).normalize();
        Some(Self {
            id,
            ray,
            normal,
            kind: SurfaceKind::from_normal(normal),
            start_ledge: false,
            end_ledge: false,
            prev: None,
            next: None,
        })
    }

    #[inline]
    pub fn start(&self) -> Vec2 {
        self.ray.origin
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        self.ray.end()
    }

    #[inline]
    pub fn category(&self) -> SurfaceCategory {
        self.kind.category()
    }

    #[inline]
    pub fn is_wall(&self) -> bool {
        self.kind.is_wall()
    }

    pub fn neighbor(&self, end: SegmentEnd) -> Option<SegmentId> {
        match end {
            SegmentEnd::Start => self.prev,
            SegmentEnd::End => self.next,
        }
    }

    pub fn is_ledge(&self, end: SegmentEnd) -> bool {
        match end {
            SegmentEnd::Start => self.start_ledge,
            SegmentEnd::End => self.end_ledge,
        }
    }

    /// Horizontal ray of length `half_width` continuing the surface past
    /// `end`, wound the same way as the segment so its normal faces the same
    /// side. `None` for walls, which never have ledges.
    pub fn ledge_ray(&self, end: SegmentEnd, half_width: f32) -> Option<Ray> {
        if self.is_wall() {
            return None;
        }
        let dir = Vec2::new(half_width.copysign(self.ray.dir.x), 0.0);
        Some(match end {
            SegmentEnd::Start => Ray::new(self.start() - dir, dir),
            SegmentEnd::End => Ray::new(self.end(), dir),
        })
    }

    /// Normal of the ledge rays: straight up for floors, straight down for
    /// ceilings.
    pub fn ledge_normal(&self) -> Vec2 {
        match self.kind {
            SurfaceKind::Floor => Vec2::NEG_Y,
            SurfaceKind::Ceiling => Vec2::Y,
            _ => Vec2::ZERO,
        }
    }

    pub fn ledge_type(&self, end: SegmentEnd) -> CollisionType {
        match (self.kind, end) {
            (SurfaceKind::Floor, SegmentEnd::Start) => CollisionType::FLOOR_START_LEDGE,
            (SurfaceKind::Floor, SegmentEnd::End) => CollisionType::FLOOR_END_LEDGE,
            (SurfaceKind::Ceiling, SegmentEnd::Start) => CollisionType::CEILING_START_LEDGE,
            (SurfaceKind::Ceiling, SegmentEnd::End) => CollisionType::CEILING_END_LEDGE,
            (kind, _) => kind.collision_type(),
        }
    }

    /// Direction of this segment leaving the vertex it shares with a
    /// neighbour at `shared`.
    pub fn direction_away_from(&self, shared: SegmentEnd) -> Vec2 {
        match shared {
            SegmentEnd::Start => self.ray.dir,
            SegmentEnd::End => -self.ray.dir,
        }
    }
}
