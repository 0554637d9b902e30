pub mod collision_type;
pub mod config;
pub mod geometry;

pub use collision_type::CollisionType;
pub use config::{EntityCollisionProfile, PhysicsConfig};
pub use geometry::{Ray, Rect};
