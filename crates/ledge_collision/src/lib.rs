//! Segment-based collision for a 2D platformer.
//!
//! Static level geometry is a graph of directed segments with outward
//! normals. A uniform grid partition answers broad-phase queries, and a
//! per-entity tracker sweeps the entity's movement against the candidates,
//! sliding along floors and ceilings, chaining across linked segments and
//! ledges, and clamping against walls.
//!
//! Ownership: [`CollisionWorld`] owns the segments and the partition and is
//! read-only while entities are resolved. Each entity gets its own
//! [`WorldCollisionTracker`] for the duration of one frame.

pub mod builder;
pub mod level;
pub mod orchestrator;
pub mod partition;
mod resolve;
pub mod segment;
pub mod tracker;
pub mod world;

pub use builder::{build_segment_graph, Polyline};
pub use level::{load_level_from_path, LevelFile, LevelPolyline};
pub use orchestrator::{CollisionEvent, EntityCollisionSystem, EntityId, MovementState};
pub use partition::SpatialPartition;
pub use segment::{CollisionSegment, SegmentEnd, SegmentId, SurfaceCategory, SurfaceKind};
pub use tracker::{PathEntry, WorldCollisionTracker};
pub use world::CollisionWorld;
