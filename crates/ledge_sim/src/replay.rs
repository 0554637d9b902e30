use crate::controller::ControllerInput;
use glam::Vec2;
use ledge_core::EntityCollisionProfile;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    #[serde(default = "default_profile")]
    pub profile: EntityCollisionProfile,
    pub spawn: Vec2,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub jump_pressed: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<ControllerInput> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(ControllerInput {
                    move_x: frame.move_x.clamp(-1.0, 1.0),
                    jump_pressed: frame.jump_pressed,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 || !replay.fixed_dt.is_finite() {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    if !replay.spawn.is_finite() {
        return Err("Replay validation failed: spawn must be finite".to_string());
    }
    replay.profile.validate()
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

fn default_profile() -> EntityCollisionProfile {
    EntityCollisionProfile {
        floor_point: Vec2::new(0.0, 14.0),
        ceiling_point: Vec2::new(0.0, -14.0),
        half_width: 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::sample_world;
    use crate::controller::CharacterController;
    use ledge_collision::{EntityCollisionSystem, EntityId};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ledge_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "spawn": [100, 360],
              "frames": [
                { "move_x": 1.0, "repeat": 3 },
                { "jump_pressed": true, "repeat": 1 },
                { "move_x": -4.0 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.spawn, Vec2::new(100.0, 360.0));
        assert_eq!(replay.profile.half_width, 10.0);
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 5);
        assert!(expanded[3].jump_pressed);
        assert_eq!(expanded[4].move_x, -1.0);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_invalid_profile() {
        let path = temp_file_path("bad_profile");
        fs::write(
            &path,
            r#"{
              "spawn": [0, 0],
              "profile": { "floor_point": [0, 10], "ceiling_point": [0, -10], "half_width": 0 },
              "frames": [ { "move_x": 1.0 } ]
            }"#,
        )
        .expect("write replay file");

        let err = load_replay_from_path(&path).expect_err("zero half width should fail");
        assert!(err.contains("half_width"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "spawn": [0, 0], "frames": [] }"#).expect("write replay file");

        let err = load_replay_from_path(&path).expect_err("empty frames should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "spawn": [100, 360],
              "frames": [
                { "move_x": 1.0, "repeat": 60 },
                { "move_x": 1.0, "jump_pressed": true, "repeat": 1 },
                { "move_x": 1.0, "repeat": 120 },
                { "move_x": -1.0, "repeat": 45 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_inputs();
        let world = sample_world();
        let system = EntityCollisionSystem::new(&world);

        let mut run_a = CharacterController::new(EntityId(1), replay.profile, replay.spawn);
        let mut run_b = CharacterController::new(EntityId(1), replay.profile, replay.spawn);
        for input in &inputs {
            run_a.step(*input, replay.fixed_dt, &system);
        }
        for input in &inputs {
            run_b.step(*input, replay.fixed_dt, &system);
        }

        assert_eq!(run_a.position(), run_b.position());
        assert_eq!(run_a.velocity, run_b.velocity);
        assert_eq!(run_a.grounded, run_b.grounded);

        let _ = fs::remove_file(path);
    }
}
