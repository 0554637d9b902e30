//! Narrow phase: find the earliest surface a movement hits and slide the
//! entity along it.
//!
//! Floors and ceilings resolve by projecting the movement's end vertically
//! onto the surface. When the projection falls past an end, the entity
//! settles at that end and the leftover movement continues onto the ledge
//! ray, onto a linked surface of the same kind, or back into free movement.
//! Walls resolve by clamping x and keeping the vertical movement.

use glam::Vec2;
use ledge_core::geometry::{Ray, PARALLEL_EPSILON};
use ledge_core::CollisionType;

use crate::segment::{
    CollisionSegment, SegmentEnd, SegmentId, SurfaceCategory, SurfaceKind, SURFACE_EPSILON,
};
use crate::tracker::{Candidate, WorldCollisionTracker};

/// Slack on intersection parameters so contacts exactly at a segment end or
/// at the very start of a movement still register.
pub(crate) const PARAM_EPSILON: f32 = 1e-4;

/// Upper bound on detect/resolve rounds per pass and on slide steps.
pub(crate) const MAX_RESOLVE_STEPS: usize = 32;

fn within_unit(x: f32) -> bool {
    (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&x)
}

/// Parameter along `surface` of the point hit by projecting `point` along
/// the category's resolve direction.
fn project(surface: &Ray, point: Vec2, category: SurfaceCategory) -> Option<f32> {
    Ray::new(point, category.resolve_direction())
        .intersect(surface)
        .map(|(_, u)| u)
}

/// What is left of `movement` once it reaches `edge`, continuing in the
/// same direction.
fn leftover_past(movement: Ray, edge: Vec2) -> Ray {
    let travelled = if movement.dir.x.abs() > PARALLEL_EPSILON {
        ((edge.x - movement.origin.x) / movement.dir.x).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ray::new(edge, movement.dir * (1.0 - travelled))
}

/// Surface an entity is sliding along: a segment or one of its ledge rays.
#[derive(Debug, Clone, Copy)]
struct SlideSurface<'w> {
    segment: &'w CollisionSegment,
    ray: Ray,
    ledge: Option<SegmentEnd>,
    collision: CollisionType,
}

impl<'w> SlideSurface<'w> {
    fn on_segment(segment: &'w CollisionSegment) -> Self {
        Self {
            segment,
            ray: segment.ray,
            ledge: None,
            collision: segment.kind.collision_type(),
        }
    }

    fn on_ledge(segment: &'w CollisionSegment, end: SegmentEnd, half_width: f32) -> Option<Self> {
        segment.ledge_ray(end, half_width).map(|ray| Self {
            segment,
            ray,
            ledge: Some(end),
            collision: segment.ledge_type(end),
        })
    }
}

impl<'w> WorldCollisionTracker<'w> {
    /// Primary pass for one category over the remaining movement. Repeats
    /// detect and resolve until nothing more is hit. Returns whether
    /// anything was.
    pub fn resolve_pass(&mut self, category: SurfaceCategory) -> bool {
        let mut hit = false;
        for _ in 0..MAX_RESOLVE_STEPS {
            let Some(movement) = self.remaining else {
                return hit;
            };
            if movement.is_degenerate() {
                self.remaining = None;
                return hit;
            }
            if !self.detect(category, movement) {
                return hit;
            }
            hit = true;
            if let Some(candidate) = self.best.take() {
                self.remaining = self.resolve_candidate(movement, candidate);
            }
        }
        log::warn!(
            "{:?} pass stopped after {} steps; dropping leftover movement",
            category,
            MAX_RESOLVE_STEPS
        );
        self.remaining = None;
        hit
    }

    /// Keeps a grounded entity on the floor it stood on last frame by
    /// resolving against it directly, as if hit at the start of the
    /// movement. Skipped while moving upward or when the entity is no
    /// longer above the segment.
    pub fn resolve_attached(&mut self, id: SegmentId) -> bool {
        let Some(movement) = self.remaining else {
            return false;
        };
        if movement.dir.y < 0.0 || self.resolved.contains(&id) {
            return false;
        }
        let world = self.world;
        let Some(segment) = world.segment(id) else {
            return false;
        };
        if segment.kind != SurfaceKind::Floor {
            return false;
        }
        let offset = self.profile.floor_point;
        match project(&segment.ray, movement.origin + offset, SurfaceCategory::Floor) {
            Some(u) if within_unit(u) => {}
            _ => return false,
        }
        log::trace!("Resolving attached floor {}", id);
        let candidate = Candidate {
            t: 0.0,
            segment,
            ledge: None,
            collision: CollisionType::FLOOR,
            offset,
        };
        self.remaining = self.resolve_candidate(movement, candidate);
        true
    }

    /// Re-tests every path entry against `category`. The first entry that
    /// hits is replaced by its resolution, dropping everything after it.
    /// Returns whether an entry was amended.
    pub fn cross_check(&mut self, category: SurfaceCategory) -> bool {
        for index in 0..self.path.len() {
            let entry = self.path[index];
            let Some(candidate) = self.earliest_hit(category, entry.ray) else {
                continue;
            };
            let mut inherited = self.path[index..]
                .iter()
                .fold(CollisionType::NONE, |acc, e| acc | e.collision);
            if candidate.segment.is_wall() {
                inherited.unset_ledge();
            }
            self.path.truncate(index);
            let first = self.path.len();
            if let Some(leftover) = self.resolve_candidate(entry.ray, candidate) {
                self.push_entry(leftover, CollisionType::NONE, None);
            }
            for amended in &mut self.path[first..] {
                amended.collision |= inherited;
            }
            return true;
        }
        false
    }

    /// Runs a detect pass and stores the earliest hit.
    pub(crate) fn detect(&mut self, category: SurfaceCategory, ray: Ray) -> bool {
        self.best = self.earliest_hit(category, ray);
        self.best.is_some()
    }

    fn earliest_hit(&self, category: SurfaceCategory, ray: Ray) -> Option<Candidate<'w>> {
        if ray.is_degenerate() {
            return None;
        }
        let mut best: Option<Candidate<'w>> = None;
        for offset in self.probe_offsets(category, ray.dir) {
            let probe = ray.translated(offset);
            for (id, &segment) in &self.segments {
                if segment.category() != category || self.resolved.contains(id) {
                    continue;
                }
                if let Some(hit) = self.segment_hit(segment, &probe, offset) {
                    if best.map_or(true, |b| hit.t < b.t) {
                        best = Some(hit);
                    }
                }
            }
        }
        best
    }

    /// Hit of `probe` on the segment itself, or on one of its ledge rays if
    /// the segment is missed.
    fn segment_hit(
        &self,
        segment: &'w CollisionSegment,
        probe: &Ray,
        offset: Vec2,
    ) -> Option<Candidate<'w>> {
        if probe.dir.dot(segment.normal) <= 0.0 {
            if let Some((t, u)) = probe.intersect(&segment.ray) {
                if within_unit(t) && within_unit(u) {
                    return Some(Candidate {
                        t: t.clamp(0.0, 1.0),
                        segment,
                        ledge: None,
                        collision: segment.kind.collision_type(),
                        offset,
                    });
                }
            }
        }

        if segment.is_wall() || probe.dir.dot(segment.ledge_normal()) > 0.0 {
            return None;
        }
        let mut best: Option<Candidate<'w>> = None;
        for end in [SegmentEnd::Start, SegmentEnd::End] {
            if !segment.is_ledge(end) {
                continue;
            }
            let Some(ledge) = segment.ledge_ray(end, self.profile.half_width) else {
                continue;
            };
            let Some((t, u)) = probe.intersect(&ledge) else {
                continue;
            };
            if within_unit(t) && within_unit(u) && best.map_or(true, |b| t < b.t) {
                best = Some(Candidate {
                    t: t.clamp(0.0, 1.0),
                    segment,
                    ledge: Some(end),
                    collision: segment.ledge_type(end),
                    offset,
                });
            }
        }
        best
    }

    /// Resolves `movement` against a detected hit, appending path entries.
    /// Returns the movement still unresolved, if any.
    fn resolve_candidate(&mut self, movement: Ray, candidate: Candidate<'w>) -> Option<Ray> {
        let hit = movement.at(candidate.t);
        self.push_entry(Ray::from_points(movement.origin, hit), CollisionType::NONE, None);
        let rest = Ray::from_points(hit, movement.end());

        if candidate.segment.is_wall() {
            self.settle_against_wall(rest, &candidate);
            return None;
        }
        let surface = match candidate.ledge {
            None => SlideSurface::on_segment(candidate.segment),
            Some(end) => {
                SlideSurface::on_ledge(candidate.segment, end, self.profile.half_width)?
            }
        };
        self.slide(rest, surface, candidate.offset)
    }

    fn settle_against_wall(&mut self, rest: Ray, candidate: &Candidate<'w>) {
        let segment = candidate.segment;
        let target = rest.end();
        let wall_x = project(&segment.ray, target + candidate.offset, SurfaceCategory::Wall)
            .map(|u| segment.ray.at(u).x)
            .unwrap_or_else(|| segment.start().x);
        let settled = Vec2::new(wall_x - candidate.offset.x, target.y);
        self.mark_resolved(segment.id);
        self.push_entry(
            Ray::from_points(rest.origin, settled),
            candidate.collision,
            Some(segment.id),
        );
    }

    fn slide(&mut self, movement: Ray, surface: SlideSurface<'w>, offset: Vec2) -> Option<Ray> {
        let category = surface.segment.category();
        let mut surface = surface;
        let mut movement = movement;
        let mut from = movement.origin;

        for _ in 0..MAX_RESOLVE_STEPS {
            let id = surface.segment.id;
            self.mark_resolved(id);
            let Some(u) = project(&surface.ray, movement.end() + offset, category) else {
                return Some(movement);
            };
            if within_unit(u) {
                let settled = surface.ray.at(u.clamp(0.0, 1.0)) - offset;
                self.push_entry(Ray::from_points(from, settled), surface.collision, Some(id));
                return None;
            }

            let (end, edge_t) = if u > 1.0 {
                (SegmentEnd::End, 1.0)
            } else {
                (SegmentEnd::Start, 0.0)
            };
            let edge = surface.ray.at(edge_t) - offset;
            self.push_entry(Ray::from_points(from, edge), surface.collision, Some(id));
            let leftover = leftover_past(movement, edge);
            if leftover.is_degenerate() {
                return None;
            }
            match self.next_surface(&surface, end) {
                Some(next) => {
                    surface = next;
                    from = edge;
                    movement = leftover;
                }
                None => return Some(leftover),
            }
        }
        log::warn!(
            "Slide stopped after {} steps on segment {}",
            MAX_RESOLVE_STEPS,
            surface.segment.id
        );
        None
    }

    /// Where a slide continues past `end`: the ledge ray if that end is a
    /// ledge, else a linked surface of the same kind. A neighbour that does
    /// not drop below the ledge ray is followed instead of the ledge. Ledge
    /// rays lead nowhere; their leftover goes back to detect.
    fn next_surface(&self, surface: &SlideSurface<'w>, end: SegmentEnd) -> Option<SlideSurface<'w>> {
        if surface.ledge.is_some() {
            return None;
        }
        let segment = surface.segment;
        let world = self.world;
        let neighbor = segment
            .neighbor(end)
            .and_then(|id| world.segment(id))
            .filter(|next| {
                next.category() == segment.category() && !self.resolved.contains(&next.id)
            });

        let held_by_neighbor = neighbor.is_some_and(|next| supports_past(segment, next, end));
        if segment.is_ledge(end) && !held_by_neighbor {
            return SlideSurface::on_ledge(segment, end, self.profile.half_width);
        }
        neighbor.map(SlideSurface::on_segment)
    }
}

/// Whether `next`, linked to `segment` at `end`, runs level with or above
/// the horizontal ledge ray at that end rather than dropping below it.
fn supports_past(segment: &CollisionSegment, next: &CollisionSegment, end: SegmentEnd) -> bool {
    let shared = match end {
        SegmentEnd::Start => SegmentEnd::End,
        SegmentEnd::End => SegmentEnd::Start,
    };
    let away = next.direction_away_from(shared).normalize_or_zero();
    away.dot(segment.ledge_normal()) >= -SURFACE_EPSILON
}
