//! Level geometry file: world size plus the collision polylines.

use glam::Vec2;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::builder::Polyline;

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    pub width: f32,
    pub height: f32,
    pub polylines: Vec<LevelPolyline>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelPolyline {
    pub points: Vec<[f32; 2]>,
    #[serde(default)]
    pub closed: bool,
}

impl LevelFile {
    pub fn polylines(&self) -> Vec<Polyline> {
        self.polylines
            .iter()
            .map(|p| Polyline {
                points: p.points.iter().map(|&[x, y]| Vec2::new(x, y)).collect(),
                closed: p.closed,
            })
            .collect()
    }
}

pub fn load_level_from_path(path: &Path) -> Result<LevelFile, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", path.display()))?;
    validate_level(&level)?;
    Ok(level)
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    if !(level.width.is_finite() && level.height.is_finite())
        || level.width <= 0.0
        || level.height <= 0.0
    {
        return Err("Level validation failed: width and height must be > 0".to_string());
    }
    for (index, polyline) in level.polylines.iter().enumerate() {
        if let Some(point) = polyline
            .points
            .iter()
            .find(|p| !(p[0].is_finite() && p[1].is_finite()))
        {
            return Err(format!(
                "Level validation failed: polyline {} has a non-finite point ({}, {})",
                index, point[0], point[1]
            ));
        }
        if let Some(point) = polyline.points.iter().find(|p| {
            p[0] < 0.0 || p[1] < 0.0 || p[0] > level.width || p[1] > level.height
        }) {
            return Err(format!(
                "Level validation failed: polyline {} point ({}, {}) lies outside the {}x{} world",
                index, point[0], point[1], level.width, level.height
            ));
        }
        if polyline.points.len() < 2 {
            log::warn!(
                "Level '{}' polyline {} has {} point(s) and produces no collision.",
                level.level_id,
                index,
                polyline.points.len()
            );
        }
    }
    if level.polylines.is_empty() {
        log::warn!("Level '{}' has no collision polylines.", level.level_id);
    }
    Ok(())
}
