//! The static collision context for one loaded level.
//!
//! Owns the segment graph and the partition built over it. Everything that
//! resolves entity movement borrows it immutably; a level reload or a cell
//! size change replaces its contents wholesale.

use std::collections::BTreeMap;

use ledge_core::geometry::Rect;
use ledge_core::PhysicsConfig;

use crate::builder::{build_segment_graph, Polyline};
use crate::level::LevelFile;
use crate::partition::SpatialPartition;
use crate::segment::{CollisionSegment, SegmentId};

#[derive(Debug, Clone)]
pub struct CollisionWorld {
    segments: Vec<CollisionSegment>,
    partition: SpatialPartition,
    config: PhysicsConfig,
    world_width: f32,
    world_height: f32,
}

impl CollisionWorld {
    pub fn build(
        polylines: &[Polyline],
        world_width: f32,
        world_height: f32,
        config: PhysicsConfig,
    ) -> Self {
        let mut world = Self {
            segments: Vec::new(),
            partition: SpatialPartition::default(),
            config,
            world_width,
            world_height,
        };
        world.reload(polylines, world_width, world_height);
        world
    }

    pub fn from_level(level: &LevelFile, config: PhysicsConfig) -> Self {
        Self::build(&level.polylines(), level.width, level.height, config)
    }

    /// Replaces all geometry and rebuilds the partition.
    pub fn reload(&mut self, polylines: &[Polyline], world_width: f32, world_height: f32) {
        self.world_width = world_width;
        self.world_height = world_height;
        self.segments = build_segment_graph(polylines, self.config.connector_offset);
        self.rebuild_partition();
    }

    /// Installs an already linked segment graph. Each segment's id must equal
    /// its index.
    pub fn replace_segments(&mut self, segments: Vec<CollisionSegment>) {
        if let Some((index, segment)) = segments
            .iter()
            .enumerate()
            .find(|(index, segment)| segment.id.index() != *index)
        {
            log::warn!(
                "Segment {} stored at index {}; lookups by id will miss it",
                segment.id,
                index
            );
        }
        self.segments = segments;
        self.rebuild_partition();
    }

    /// Applies a new physics config. Geometry depends on the connector
    /// offset, so a changed offset rebuilds the graph too.
    pub fn set_config(&mut self, config: PhysicsConfig, polylines: &[Polyline]) {
        let offset_changed = config.connector_offset != self.config.connector_offset;
        self.config = config;
        if offset_changed {
            self.reload(polylines, self.world_width, self.world_height);
        } else {
            self.rebuild_partition();
        }
    }

    /// Clears the grid and re-inserts every segment with the current cell
    /// size.
    pub fn rebuild_partition(&mut self) {
        self.partition.clear_partition();
        self.partition.setup_partition(
            self.world_width,
            self.world_height,
            self.config.cell_width,
            self.config.cell_height,
        );
        for segment in &self.segments {
            self.partition.add_static_collision(segment);
        }
    }

    pub fn segments(&self) -> &[CollisionSegment] {
        &self.segments
    }

    pub fn segment(&self, id: SegmentId) -> Option<&CollisionSegment> {
        self.segments.get(id.index())
    }

    pub fn partition(&self) -> &SpatialPartition {
        &self.partition
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn segments_in_area(&self, rect: &Rect) -> BTreeMap<SegmentId, &CollisionSegment> {
        self.partition.collisions_in_world_area(rect, &self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SurfaceKind;
    use glam::Vec2;

    fn platforms() -> Vec<Polyline> {
        vec![
            Polyline::open(vec![Vec2::new(10.0, 100.0), Vec2::new(300.0, 100.0)]),
            Polyline::open(vec![Vec2::new(350.0, 200.0), Vec2::new(500.0, 200.0)]),
        ]
    }

    #[test]
    fn build_partitions_every_segment() {
        let world = CollisionWorld::build(&platforms(), 512.0, 256.0, PhysicsConfig::default());
        assert_eq!(world.segments().len(), 2);
        let all = world.segments_in_area(&world.partition().world_rect());
        assert_eq!(all.len(), 2);

        let left = world.segments_in_area(&Rect::new(0.0, 90.0, 40.0, 20.0));
        assert_eq!(left.keys().copied().collect::<Vec<_>>(), vec![SegmentId(0)]);
    }

    #[test]
    fn cell_size_change_repartitions() {
        let polylines = platforms();
        let mut world = CollisionWorld::build(&polylines, 512.0, 256.0, PhysicsConfig::default());
        assert_eq!(world.partition().cols(), 4);

        let config = PhysicsConfig {
            cell_width: 32.0,
            cell_height: 32.0,
            ..PhysicsConfig::default()
        };
        world.set_config(config, &polylines);
        assert_eq!(world.partition().cols(), 16);
        assert_eq!(world.segments().len(), 2);
        assert_eq!(
            world
                .segments_in_area(&world.partition().world_rect())
                .len(),
            2
        );
    }

    #[test]
    fn reload_replaces_geometry() {
        let mut world = CollisionWorld::build(&platforms(), 512.0, 256.0, PhysicsConfig::default());
        world.reload(
            &[Polyline::open(vec![Vec2::new(0.0, 50.0), Vec2::new(60.0, 50.0)])],
            128.0,
            128.0,
        );
        assert_eq!(world.segments().len(), 1);
        assert!(world.segment(SegmentId(1)).is_none());
    }

    #[test]
    fn huge_coordinates_build_without_faulting() {
        let world = CollisionWorld::build(
            &[Polyline::open(vec![Vec2::new(-1.0e30, 100.0), Vec2::new(1.0e30, 100.0)])],
            512.0,
            512.0,
            PhysicsConfig::default(),
        );
        assert_eq!(world.segments().len(), 1);
        assert_eq!(world.segments()[0].kind, SurfaceKind::Floor);
        let near_right_edge = world.segments_in_area(&Rect::new(500.0, 95.0, 10.0, 10.0));
        assert!(near_right_edge.contains_key(&SegmentId(0)));
    }
}
