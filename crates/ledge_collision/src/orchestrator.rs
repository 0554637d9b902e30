//! Runs the per-frame collision sequence for each moving entity.
//!
//! For one entity: broad-phase query over the swept area, optional
//! attachment to last frame's floor, primary passes (floor, then ceiling if
//! no floor was hit, then walls if neither was), then cross-checks of the
//! resolved path against the categories that were not primary.

use glam::Vec2;
use ledge_core::geometry::{Ray, Rect};
use ledge_core::{CollisionType, EntityCollisionProfile};
use serde::{Deserialize, Serialize};

use crate::segment::{SegmentId, SurfaceCategory};
use crate::tracker::WorldCollisionTracker;
use crate::world::CollisionWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// Positions of one entity across a frame. `position` is the raw result of
/// integration on entry and the resolved position on return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementState {
    pub previous: Vec2,
    pub position: Vec2,
    /// Floor the entity ended last frame standing on.
    pub attached_segment: Option<SegmentId>,
}

impl MovementState {
    pub fn at_rest(position: Vec2) -> Self {
        Self {
            previous: position,
            position,
            attached_segment: None,
        }
    }

    /// Starts a new frame: the resolved position becomes `previous` and the
    /// entity moves by `delta`.
    pub fn advance(&mut self, delta: Vec2) {
        self.previous = self.position;
        self.position += delta;
    }
}

/// Outcome of resolving one entity for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionEvent {
    pub entity: EntityId,
    pub collision: CollisionType,
    /// Segments resolved against, in resolution order.
    pub segments: Vec<SegmentId>,
}

impl CollisionEvent {
    fn empty(entity: EntityId) -> Self {
        Self {
            entity,
            collision: CollisionType::NONE,
            segments: Vec::new(),
        }
    }
}

pub struct EntityCollisionSystem<'w> {
    world: &'w CollisionWorld,
}

impl<'w> EntityCollisionSystem<'w> {
    pub fn new(world: &'w CollisionWorld) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &'w CollisionWorld {
        self.world
    }

    /// Resolves every body in order. Bodies do not collide with each other,
    /// so the order only affects the order of the returned events.
    pub fn resolve_all<'a, I>(&self, bodies: I) -> Vec<CollisionEvent>
    where
        I: IntoIterator<Item = (EntityId, &'a EntityCollisionProfile, &'a mut MovementState)>,
    {
        bodies
            .into_iter()
            .map(|(entity, profile, state)| self.resolve_entity(entity, profile, state))
            .collect()
    }

    pub fn resolve_entity(
        &self,
        entity: EntityId,
        profile: &EntityCollisionProfile,
        state: &mut MovementState,
    ) -> CollisionEvent {
        let movement = Ray::from_points(state.previous, state.position);
        if movement.is_degenerate() {
            log::trace!("Entity {:?} did not move; skipping collision", entity);
            return CollisionEvent::empty(entity);
        }

        let config = self.world.config();
        let area = swept_area(movement, profile, config.broad_phase_margin);
        let segments = self.world.segments_in_area(&area);
        let mut tracker = WorldCollisionTracker::new(self.world, movement, *profile, segments);

        let mut primary = None;
        if config.segment_attachment {
            if let Some(id) = state.attached_segment {
                if tracker.resolve_attached(id) {
                    primary = Some(SurfaceCategory::Floor);
                }
            }
        }
        if tracker.resolve_pass(SurfaceCategory::Floor) {
            primary = Some(SurfaceCategory::Floor);
        }
        if primary.is_none() && tracker.resolve_pass(SurfaceCategory::Ceiling) {
            primary = Some(SurfaceCategory::Ceiling);
        }
        if primary.is_none() && tracker.resolve_pass(SurfaceCategory::Wall) {
            primary = Some(SurfaceCategory::Wall);
        }
        tracker.finish();

        if let Some(primary) = primary {
            for category in cross_check_order(primary) {
                tracker.cross_check(category);
            }
        }

        state.position = tracker.final_position();
        state.attached_segment = if config.segment_attachment {
            tracker.resting_floor()
        } else {
            None
        };

        let event = CollisionEvent {
            entity,
            collision: tracker.collision(),
            segments: tracker.touched_segments().to_vec(),
        };
        log::trace!(
            "Entity {:?} resolved to ({:.3}, {:.3}) with {}",
            entity,
            state.position.x,
            state.position.y,
            event.collision
        );
        event
    }
}

fn cross_check_order(primary: SurfaceCategory) -> [SurfaceCategory; 2] {
    match primary {
        SurfaceCategory::Floor => [SurfaceCategory::Wall, SurfaceCategory::Ceiling],
        SurfaceCategory::Ceiling => [SurfaceCategory::Wall, SurfaceCategory::Floor],
        SurfaceCategory::Wall => [SurfaceCategory::Floor, SurfaceCategory::Ceiling],
    }
}

/// Bounds of the movement swept by the entity's probes, grown by the half
/// width (ledge rays reach that far past a segment) and `margin`.
fn swept_area(movement: Ray, profile: &EntityCollisionProfile, margin: f32) -> Rect {
    let offsets = Rect::from_corners(profile.floor_point, profile.ceiling_point);
    let path = movement.bounds();
    Rect {
        min: path.min + offsets.min,
        max: path.max + offsets.max,
    }
    .expanded(profile.half_width * 2.0 + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Polyline;
    use crate::segment::{CollisionSegment, SurfaceKind};
    use ledge_core::PhysicsConfig;

    const FLOOR_Y: f32 = 200.0;

    fn profile() -> EntityCollisionProfile {
        EntityCollisionProfile {
            floor_point: Vec2::new(0.0, 16.0),
            ceiling_point: Vec2::new(0.0, -16.0),
            half_width: 8.0,
        }
    }

    fn world_with(polylines: &[Polyline], config: PhysicsConfig) -> CollisionWorld {
        CollisionWorld::build(polylines, 1024.0, 512.0, config)
    }

    fn world(polylines: &[Polyline]) -> CollisionWorld {
        world_with(polylines, PhysicsConfig::default())
    }

    fn floor(x0: f32, x1: f32, y: f32) -> Polyline {
        Polyline::open(vec![Vec2::new(x0, y), Vec2::new(x1, y)])
    }

    /// Origin position that puts the feet at `(x, feet_y)`.
    fn standing(x: f32, feet_y: f32) -> Vec2 {
        Vec2::new(x, feet_y - 16.0)
    }

    fn step(
        system: &EntityCollisionSystem<'_>,
        state: &mut MovementState,
        delta: Vec2,
    ) -> CollisionEvent {
        state.advance(delta);
        system.resolve_entity(EntityId(1), &profile(), state)
    }

    #[test]
    fn walking_on_a_flat_floor_stays_on_its_surface() {
        let world = world(&[floor(0.0, 800.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(100.0, FLOOR_Y));

        for frame in 0..20 {
            let event = step(&system, &mut state, Vec2::new(1.0, 0.01));
            assert!(event.collision.has_floor(), "frame {frame}: {}", event.collision);
            assert_eq!(state.position.y + 16.0, FLOOR_Y, "frame {frame}");
        }
        assert!((state.position.x - 120.0).abs() < 1e-3);
        assert_eq!(state.attached_segment, Some(SegmentId(0)));
    }

    #[test]
    fn landing_from_above_snaps_to_the_floor() {
        let world = world(&[floor(0.0, 800.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(300.0, FLOOR_Y - 1.0));

        let event = step(&system, &mut state, Vec2::new(3.0, 2.0));
        assert_eq!(event.collision, CollisionType::FLOOR);
        assert_eq!(event.segments, vec![SegmentId(0)]);
        assert!((state.position - standing(303.0, FLOOR_Y)).length() < 1e-3);
    }

    #[test]
    fn falling_past_an_end_without_a_ledge_misses() {
        let mut segment = CollisionSegment::new(
            SegmentId(0),
            Vec2::new(100.0, FLOOR_Y),
            Vec2::new(300.0, FLOOR_Y),
        )
        .expect("segment");
        segment.end_ledge = false;
        let mut world = world(&[]);
        world.replace_segments(vec![segment]);
        let system = EntityCollisionSystem::new(&world);

        // Feet a little past the end, falling through the floor's height.
        let mut state = MovementState::at_rest(standing(304.0, FLOOR_Y - 10.0));
        let event = step(&system, &mut state, Vec2::new(0.0, 30.0));
        assert!(event.collision.is_empty());
        assert!((state.position - standing(304.0, FLOOR_Y + 20.0)).length() < 1e-3);

        // Feet exactly at the end but already below it.
        let mut state = MovementState::at_rest(standing(300.0, FLOOR_Y + 1.0));
        let event = step(&system, &mut state, Vec2::new(0.0, 10.0));
        assert!(!event.collision.has_floor());
    }

    #[test]
    fn ledge_catches_feet_just_past_the_end() {
        let world = world(&[floor(100.0, 300.0, FLOOR_Y)]);
        assert!(world.segments()[0].end_ledge);
        let system = EntityCollisionSystem::new(&world);

        let mut state = MovementState::at_rest(standing(304.0, FLOOR_Y - 10.0));
        let event = step(&system, &mut state, Vec2::new(0.0, 20.0));
        assert_eq!(event.collision, CollisionType::FLOOR_END_LEDGE);
        assert!(event.collision.has_floor());
        assert!((state.position - standing(304.0, FLOOR_Y)).length() < 1e-3);
        assert_eq!(state.attached_segment, None);
    }

    #[test]
    fn walking_off_a_ledge_falls() {
        let world = world(&[floor(100.0, 300.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(290.0, FLOOR_Y));
        state.attached_segment = Some(SegmentId(0));

        // Past the segment and the ledge ray in one step.
        let event = step(&system, &mut state, Vec2::new(40.0, 4.0));
        assert!(event.collision.has_floor());
        assert!(state.position.x > 300.0);
        assert!(state.position.y + 16.0 > FLOOR_Y);
        assert_eq!(state.attached_segment, None);
    }

    #[test]
    fn sliding_across_linked_floors_is_seamless() {
        let world = world(&[Polyline::open(vec![
            Vec2::new(0.0, FLOOR_Y),
            Vec2::new(50.0, FLOOR_Y),
            Vec2::new(100.0, FLOOR_Y),
        ])]);
        assert_eq!(world.segments()[0].next, Some(SegmentId(1)));
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(40.0, FLOOR_Y));

        let event = step(&system, &mut state, Vec2::new(20.0, 0.5));
        assert_eq!(event.collision, CollisionType::FLOOR);
        assert_eq!(event.segments, vec![SegmentId(0), SegmentId(1)]);
        assert!((state.position - standing(60.0, FLOOR_Y)).length() < 1e-3);
        assert_eq!(state.attached_segment, Some(SegmentId(1)));
    }

    #[test]
    fn walking_over_a_convex_joint_holds_on_the_ledge() {
        // Flat floor that tips into a down-slope at x = 100.
        let world = world(&[Polyline::open(vec![
            Vec2::new(0.0, FLOOR_Y),
            Vec2::new(100.0, FLOOR_Y),
            Vec2::new(200.0, FLOOR_Y + 50.0),
        ])]);
        assert!(world.segments()[0].end_ledge);
        assert_eq!(world.segments()[0].next, Some(SegmentId(1)));
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(95.0, FLOOR_Y));

        let event = step(&system, &mut state, Vec2::new(8.0, 0.5));
        assert_eq!(event.collision, CollisionType::FLOOR_END_LEDGE);
        assert_eq!(event.segments, vec![SegmentId(0)]);
        assert!((state.position - standing(103.0, FLOOR_Y)).length() < 1e-3);
        assert_eq!(state.attached_segment, None);

        // Past the ledge ray the body leaves the upper floor's height but
        // stays above the slope.
        let event = step(&system, &mut state, Vec2::new(8.0, 0.5));
        assert!(event.collision.has_floor_end_ledge());
        let feet = state.position + Vec2::new(0.0, 16.0);
        assert!((feet.x - 111.0).abs() < 1e-3);
        assert!(feet.y > FLOOR_Y);
        assert!(feet.y < FLOOR_Y + (feet.x - 100.0) * 0.5);
    }

    #[test]
    fn walking_up_a_slope_follows_it() {
        let world = world(&[Polyline::open(vec![
            Vec2::new(0.0, FLOOR_Y),
            Vec2::new(100.0, FLOOR_Y),
            Vec2::new(200.0, FLOOR_Y - 50.0),
        ])]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(90.0, FLOOR_Y));

        let event = step(&system, &mut state, Vec2::new(30.0, 0.5));
        assert!(event.collision.has_floor());
        assert!((state.position - standing(120.0, FLOOR_Y - 10.0)).length() < 1e-3);
    }

    #[test]
    fn inside_corner_reports_floor_and_wall() {
        // Floor running into a wall that rises at x = 150.
        let world = world(&[Polyline::open(vec![
            Vec2::new(0.0, FLOOR_Y),
            Vec2::new(150.0, FLOOR_Y),
            Vec2::new(150.0, FLOOR_Y - 150.0),
        ])]);
        assert_eq!(world.segments()[1].kind, SurfaceKind::LeftWall);
        let system = EntityCollisionSystem::new(&world);

        let mut state = MovementState::at_rest(standing(120.0, FLOOR_Y - 4.0));
        let event = step(&system, &mut state, Vec2::new(30.0, 10.0));
        assert!(event.collision.has_floor());
        assert!(event.collision.has_left_wall());
        assert!(!event.collision.has_ledge());
        assert!((state.position - standing(142.0, FLOOR_Y)).length() < 1e-3);
    }

    #[test]
    fn jumping_into_a_ceiling_stops_at_it() {
        // Ceiling is wound right to left.
        let world = world(&[Polyline::open(vec![
            Vec2::new(400.0, 100.0),
            Vec2::new(0.0, 100.0),
        ])]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(Vec2::new(200.0, 130.0));

        let event = step(&system, &mut state, Vec2::new(5.0, -30.0));
        assert_eq!(event.collision, CollisionType::CEILING);
        assert!((state.position - Vec2::new(205.0, 116.0)).length() < 1e-3);
    }

    #[test]
    fn ceiling_ledge_catches_the_head_just_past_the_end() {
        // Ceiling from x = 400 back to x = 200; its end ledge reaches x = 192.
        let world = world(&[Polyline::open(vec![
            Vec2::new(400.0, 100.0),
            Vec2::new(200.0, 100.0),
        ])]);
        assert!(world.segments()[0].end_ledge);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(Vec2::new(196.0, 126.0));

        let event = step(&system, &mut state, Vec2::new(0.0, -20.0));
        assert_eq!(event.collision, CollisionType::CEILING_END_LEDGE);
        assert!(event.collision.has_ceiling());
        assert!((state.position - Vec2::new(196.0, 116.0)).length() < 1e-3);
    }

    #[test]
    fn low_ceiling_cuts_short_a_climb_up_a_slope() {
        // Up-slope from x = 100 under a flat ceiling at y = 163.
        let world = world(&[
            Polyline::open(vec![
                Vec2::new(0.0, FLOOR_Y),
                Vec2::new(100.0, FLOOR_Y),
                Vec2::new(200.0, FLOOR_Y - 50.0),
            ]),
            Polyline::open(vec![Vec2::new(400.0, 163.0), Vec2::new(0.0, 163.0)]),
        ]);
        assert_eq!(world.segments()[2].kind, SurfaceKind::Ceiling);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(90.0, FLOOR_Y));

        let event = step(&system, &mut state, Vec2::new(30.0, 0.5));
        assert!(event.collision.has_floor());
        assert!(event.collision.has_ceiling());
        assert_eq!(
            event.segments,
            vec![SegmentId(0), SegmentId(1), SegmentId(2)]
        );
        // Head pinned under the ceiling at the end of the move.
        assert!((state.position - Vec2::new(120.0, 179.0)).length() < 1e-3);
    }

    #[test]
    fn attachment_keeps_the_entity_on_the_floor_at_tiny_speeds() {
        let config = PhysicsConfig::default();
        assert!(config.segment_attachment);
        let world = world_with(&[floor(0.0, 800.0, FLOOR_Y)], config);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(100.0, FLOOR_Y));
        state.attached_segment = Some(SegmentId(0));

        // Too shallow to register as an intersection with the floor.
        let event = step(&system, &mut state, Vec2::new(1.0, 1.0e-7));
        assert!(event.collision.has_floor());
        assert_eq!(state.position.y + 16.0, FLOOR_Y);
    }

    #[test]
    fn attachment_is_skipped_while_moving_up() {
        let world = world(&[floor(0.0, 800.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(100.0, FLOOR_Y));
        state.attached_segment = Some(SegmentId(0));

        let event = step(&system, &mut state, Vec2::new(2.0, -12.0));
        assert!(event.collision.is_empty());
        assert!((state.position - standing(102.0, FLOOR_Y - 12.0)).length() < 1e-3);
        assert_eq!(state.attached_segment, None);
    }

    #[test]
    fn zero_movement_is_skipped() {
        let world = world(&[floor(0.0, 800.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let mut state = MovementState::at_rest(standing(100.0, FLOOR_Y));
        state.attached_segment = Some(SegmentId(0));

        let event = step(&system, &mut state, Vec2::ZERO);
        assert!(event.collision.is_empty());
        assert!(event.segments.is_empty());
        assert_eq!(state.position, standing(100.0, FLOOR_Y));
        assert_eq!(state.attached_segment, Some(SegmentId(0)));
    }

    #[test]
    fn resolve_all_returns_one_event_per_body() {
        let world = world(&[floor(0.0, 800.0, FLOOR_Y)]);
        let system = EntityCollisionSystem::new(&world);
        let shape = profile();
        let mut a = MovementState::at_rest(standing(100.0, FLOOR_Y - 5.0));
        let mut b = MovementState::at_rest(standing(500.0, FLOOR_Y - 100.0));
        a.advance(Vec2::new(0.0, 10.0));
        b.advance(Vec2::new(0.0, 10.0));

        let events = system.resolve_all([
            (EntityId(1), &shape, &mut a),
            (EntityId(2), &shape, &mut b),
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].entity, EntityId(1));
        assert!(events[0].collision.has_floor());
        assert!(events[1].collision.is_empty());
        assert_eq!(b.position, standing(500.0, FLOOR_Y - 90.0));
    }
}
