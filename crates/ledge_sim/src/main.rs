//! Headless runner for the segment collision system.
//!
//! Loads a level, an optional physics config and a replay, then steps one
//! character through the replay at the replay's fixed dt:
//!
//!   1. expand replay frames into per-step controller inputs
//!   2. integrate velocity into a previous -> current movement
//!   3. resolve the movement against the level through the orchestrator
//!   4. feed the resulting collision back into the controller
//!
//! Every change of collision state is logged; the final state is printed as
//! JSON on stdout.
//!
//! Usage: `ledge_sim <level.json> <replay.json> [physics.json]`

mod controller;
mod replay;

use std::path::PathBuf;

use ledge_collision::{
    load_level_from_path, CollisionEvent, CollisionWorld, EntityCollisionSystem, EntityId,
};
use ledge_core::config::load_physics_config_from_path;
use ledge_core::{CollisionType, PhysicsConfig};
use serde::Serialize;

use controller::CharacterController;
use replay::load_replay_from_path;

const USAGE: &str = "usage: ledge_sim <level.json> <replay.json> [physics.json]";

struct RunArgs {
    level: PathBuf,
    replay: PathBuf,
    physics: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunArgs, String> {
    let level = args.next().ok_or_else(|| USAGE.to_string())?;
    let replay = args.next().ok_or_else(|| USAGE.to_string())?;
    let physics = args.next();
    if args.next().is_some() {
        return Err(USAGE.to_string());
    }
    Ok(RunArgs {
        level: PathBuf::from(level),
        replay: PathBuf::from(replay),
        physics: physics.map(PathBuf::from),
    })
}

#[derive(Debug, Serialize)]
struct RunSummary {
    level_id: String,
    steps: usize,
    position: [f32; 2],
    velocity: [f32; 2],
    grounded: bool,
    on_ledge: bool,
    blocked_left: bool,
    blocked_right: bool,
    collision: String,
    collision_changes: usize,
    last_event: Option<CollisionEvent>,
}

fn run(args: RunArgs) -> Result<RunSummary, String> {
    let level = load_level_from_path(&args.level)?;
    let physics = match &args.physics {
        Some(path) => load_physics_config_from_path(path)?,
        None => {
            let config = PhysicsConfig::default();
            config.validate()?;
            config
        }
    };
    let replay = load_replay_from_path(&args.replay)?;

    let world = CollisionWorld::from_level(&level, physics);
    log::info!(
        "Level '{}' loaded: {}x{}, {} segments in {}x{} cells",
        level.level_id,
        level.width,
        level.height,
        world.segments().len(),
        world.partition().cols(),
        world.partition().rows()
    );

    let system = EntityCollisionSystem::new(&world);
    let mut character = CharacterController::new(EntityId(0), replay.profile, replay.spawn);
    let inputs = replay.expanded_inputs();
    log::info!(
        "Replaying {} steps at dt {:.4} from ({}, {})",
        inputs.len(),
        replay.fixed_dt,
        replay.spawn.x,
        replay.spawn.y
    );

    let mut last_collision = CollisionType::NONE;
    let mut collision_changes = 0usize;
    let mut last_event = None;
    for (step, input) in inputs.iter().enumerate() {
        let event = character.step(*input, replay.fixed_dt, &system);
        if event.collision != last_collision {
            collision_changes += 1;
            log::info!(
                "step {:>5}: {} -> {} at ({:.2}, {:.2}) segments {:?}",
                step,
                last_collision,
                event.collision,
                character.position().x,
                character.position().y,
                event.segments
            );
            last_collision = event.collision;
        }
        last_event = Some(event);
    }

    let position = character.position();
    Ok(RunSummary {
        level_id: level.level_id,
        steps: inputs.len(),
        position: [position.x, position.y],
        velocity: [character.velocity.x, character.velocity.y],
        grounded: character.is_grounded(),
        on_ledge: character.is_on_ledge(),
        blocked_left: character.is_blocked_left(),
        blocked_right: character.is_blocked_right(),
        collision: character.contacts.to_string(),
        collision_changes,
        last_event,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                log::error!("Failed to serialize run summary: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
