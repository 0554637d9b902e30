//! Per-entity, per-frame collision state.
//!
//! A tracker is created for one entity's movement in one frame and thrown
//! away afterwards. It owns the resolved path, the movement still left to
//! resolve, and the segments that have already been resolved against so a
//! single frame never settles on the same segment twice. All rays in here
//! are in entity-origin space; probe offsets are added only while testing
//! against geometry.

use std::collections::{BTreeMap, HashSet};

use glam::Vec2;
use ledge_core::geometry::Ray;
use ledge_core::{CollisionType, EntityCollisionProfile};

use crate::segment::{CollisionSegment, SegmentEnd, SegmentId, SurfaceCategory, SurfaceKind};
use crate::world::CollisionWorld;

/// One piece of the resolved movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEntry {
    pub ray: Ray,
    pub collision: CollisionType,
    /// Segment the entry was settled against, if any.
    pub segment: Option<SegmentId>,
}

impl PathEntry {
    pub fn free(ray: Ray) -> Self {
        Self {
            ray,
            collision: CollisionType::NONE,
            segment: None,
        }
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        self.ray.end()
    }
}

/// Earliest hit found by the last detect pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'w> {
    pub t: f32,
    pub segment: &'w CollisionSegment,
    /// Set when the hit was on a ledge ray rather than the segment itself.
    pub ledge: Option<SegmentEnd>,
    pub collision: CollisionType,
    /// Probe offset that produced the hit.
    pub offset: Vec2,
}

pub struct WorldCollisionTracker<'w> {
    pub(crate) world: &'w CollisionWorld,
    pub(crate) segments: BTreeMap<SegmentId, &'w CollisionSegment>,
    pub(crate) profile: EntityCollisionProfile,
    pub(crate) wall_probe_inset: f32,
    pub(crate) movement: Ray,
    pub(crate) remaining: Option<Ray>,
    pub(crate) path: Vec<PathEntry>,
    pub(crate) resolved: HashSet<SegmentId>,
    pub(crate) touched: Vec<SegmentId>,
    pub(crate) best: Option<Candidate<'w>>,
}

impl<'w> WorldCollisionTracker<'w> {
    /// `segments` is the broad-phase set for this movement. Neighbour links
    /// are followed through `world`, so chaining may leave that set.
    pub fn new(
        world: &'w CollisionWorld,
        movement: Ray,
        profile: EntityCollisionProfile,
        segments: BTreeMap<SegmentId, &'w CollisionSegment>,
    ) -> Self {
        Self {
            world,
            segments,
            profile,
            wall_probe_inset: world.config().wall_probe_inset,
            movement,
            remaining: (!movement.is_degenerate()).then_some(movement),
            path: Vec::new(),
            resolved: HashSet::new(),
            touched: Vec::new(),
            best: None,
        }
    }

    pub fn movement(&self) -> Ray {
        self.movement
    }

    pub fn remaining(&self) -> Option<Ray> {
        self.remaining
    }

    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// Segments resolved against this frame, in resolution order.
    pub fn touched_segments(&self) -> &[SegmentId] {
        &self.touched
    }

    pub fn is_resolved(&self, id: SegmentId) -> bool {
        self.resolved.contains(&id)
    }

    /// Union of every path entry's collision.
    pub fn collision(&self) -> CollisionType {
        self.path
            .iter()
            .fold(CollisionType::NONE, |acc, entry| acc | entry.collision)
    }

    /// End of the resolved path, or of the unresolved movement if nothing
    /// has been resolved yet.
    pub fn final_position(&self) -> Vec2 {
        match (self.path.last(), self.remaining) {
            (_, Some(remaining)) => remaining.end(),
            (Some(entry), None) => entry.end(),
            (None, None) => self.movement.end(),
        }
    }

    /// Floor segment the entity ends the frame standing on. Ledge contacts
    /// do not count.
    pub fn resting_floor(&self) -> Option<SegmentId> {
        if self.remaining.is_some() {
            return None;
        }
        let entry = self.path.last()?;
        if !entry.collision.has_floor() || entry.collision.has_ledge() {
            return None;
        }
        let segment = self.world.segment(entry.segment?)?;
        (segment.kind == SurfaceKind::Floor).then_some(segment.id)
    }

    /// Appends any movement left after the primary passes to the path
    /// verbatim.
    pub fn finish(&mut self) {
        if let Some(remaining) = self.remaining.take() {
            if !remaining.is_degenerate() {
                self.path.push(PathEntry::free(remaining));
            }
        }
    }

    pub(crate) fn push_entry(
        &mut self,
        ray: Ray,
        collision: CollisionType,
        segment: Option<SegmentId>,
    ) {
        if ray.is_degenerate() && collision.is_empty() {
            return;
        }
        self.path.push(PathEntry {
            ray,
            collision,
            segment,
        });
    }

    pub(crate) fn mark_resolved(&mut self, id: SegmentId) {
        if self.resolved.insert(id) {
            self.touched.push(id);
        }
    }

    /// Probe offsets tested against surfaces of `category` for movement
    /// along `dir`. Walls are only probed on the side being moved toward.
    pub(crate) fn probe_offsets(&self, category: SurfaceCategory, dir: Vec2) -> Vec<Vec2> {
        match category {
            SurfaceCategory::Floor => vec![self.profile.floor_point],
            SurfaceCategory::Ceiling => vec![self.profile.ceiling_point],
            SurfaceCategory::Wall if dir.x == 0.0 => Vec::new(),
            SurfaceCategory::Wall => self
                .profile
                .wall_probe_points(dir.x, self.wall_probe_inset)
                .to_vec(),
        }
    }
}
