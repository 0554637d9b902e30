//! Physics and per-entity collision configuration.
//!
//! Both structs are plain data loaded from JSON. Validation happens once at
//! load time so the collision layer itself can assume sane values (positive
//! cell sizes, finite offsets) without re-checking every frame.

use glam::Vec2;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PhysicsConfig {
    /// Keep entities glued to the floor segment they rested on last frame.
    #[serde(default = "default_true")]
    pub segment_attachment: bool,
    #[serde(default = "default_cell_size")]
    pub cell_width: f32,
    #[serde(default = "default_cell_size")]
    pub cell_height: f32,
    /// Length and downward offset of the wall connectors spliced between
    /// convex floor/ceiling corners.
    #[serde(default = "default_connector_offset")]
    pub connector_offset: f32,
    /// Vertical inset of the wall probe points from the floor and ceiling
    /// points, so wall probes never ride exactly along a floor's height.
    #[serde(default = "default_wall_probe_inset")]
    pub wall_probe_inset: f32,
    /// Extra world units added around an entity's swept bounds before the
    /// broad-phase query.
    #[serde(default = "default_broad_phase_margin")]
    pub broad_phase_margin: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            segment_attachment: true,
            cell_width: default_cell_size(),
            cell_height: default_cell_size(),
            connector_offset: default_connector_offset(),
            wall_probe_inset: default_wall_probe_inset(),
            broad_phase_margin: default_broad_phase_margin(),
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.cell_width <= 0.0
            || self.cell_height <= 0.0
            || !self.cell_width.is_finite()
            || !self.cell_height.is_finite()
        {
            return Err(format!(
                "Physics config validation failed: cell size must be > 0 (got {}x{})",
                self.cell_width, self.cell_height
            ));
        }
        if self.connector_offset <= 0.0 || !self.connector_offset.is_finite() {
            return Err(format!(
                "Physics config validation failed: connector_offset must be > 0 (got {})",
                self.connector_offset
            ));
        }
        if self.wall_probe_inset < 0.0 || !self.wall_probe_inset.is_finite() {
            return Err(format!(
                "Physics config validation failed: wall_probe_inset must be >= 0 (got {})",
                self.wall_probe_inset
            ));
        }
        if self.broad_phase_margin < 0.0 || !self.broad_phase_margin.is_finite() {
            return Err(format!(
                "Physics config validation failed: broad_phase_margin must be >= 0 (got {})",
                self.broad_phase_margin
            ));
        }
        Ok(())
    }
}

/// Static collision shape of one entity type, relative to the entity's
/// position. With +y pointing down, `floor_point` usually has a positive y
/// (the feet) and `ceiling_point` a negative one (the head).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EntityCollisionProfile {
    pub floor_point: Vec2,
    pub ceiling_point: Vec2,
    pub half_width: f32,
}

impl EntityCollisionProfile {
    pub fn validate(&self) -> Result<(), String> {
        if !self.floor_point.is_finite() || !self.ceiling_point.is_finite() {
            return Err(
                "Entity profile validation failed: floor_point and ceiling_point must be finite"
                    .to_string(),
            );
        }
        if self.half_width <= 0.0 || !self.half_width.is_finite() {
            return Err(format!(
                "Entity profile validation failed: half_width must be > 0 (got {})",
                self.half_width
            ));
        }
        if self.ceiling_point.y > self.floor_point.y {
            return Err(format!(
                "Entity profile validation failed: ceiling_point.y ({}) is below floor_point.y ({})",
                self.ceiling_point.y, self.floor_point.y
            ));
        }
        Ok(())
    }

    /// Wall probe offsets on the side the entity is moving toward: one near
    /// the feet and one near the head.
    pub fn wall_probe_points(&self, direction_x: f32, inset: f32) -> [Vec2; 2] {
        let x = self.half_width.copysign(direction_x);
        let height = self.floor_point.y - self.ceiling_point.y;
        let inset = inset.min(height * 0.5);
        [
            Vec2::new(x, self.floor_point.y - inset),
            Vec2::new(x, self.ceiling_point.y + inset),
        ]
    }
}

pub fn load_physics_config_from_path(path: &Path) -> Result<PhysicsConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: PhysicsConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse physics config JSON {}: {e}", path.display()))?;
    config.validate()?;
    log::debug!("Loaded physics config from {}: {:?}", path.display(), config);
    Ok(config)
}

const fn default_true() -> bool {
    true
}

const fn default_cell_size() -> f32 {
    128.0
}

const fn default_connector_offset() -> f32 {
    0.1
}

const fn default_wall_probe_inset() -> f32 {
    1.0
}

const fn default_broad_phase_margin() -> f32 {
    4.0
}
