use glam::Vec2;
use ledge_collision::{CollisionEvent, EntityCollisionSystem, EntityId, MovementState};
use ledge_core::{CollisionType, EntityCollisionProfile};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerInput {
    pub move_x: f32,
    pub jump_pressed: bool,
}

/// Tuning for the kinematic controller. World units are pixels with +y
/// pointing down, so gravity is positive and a jump is a negative y speed.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub max_speed: f32,
    pub accel_ground: f32,
    pub accel_air: f32,
    pub friction_ground: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_speed: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_speed: 180.0,
            accel_ground: 1600.0,
            accel_air: 900.0,
            friction_ground: 2000.0,
            gravity: 1800.0,
            max_fall_speed: 900.0,
            jump_speed: 620.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterController {
    pub entity: EntityId,
    pub profile: EntityCollisionProfile,
    pub motion: MovementState,
    pub velocity: Vec2,
    pub grounded: bool,
    pub contacts: CollisionType,
    pub config: ControllerConfig,
}

impl CharacterController {
    pub fn new(entity: EntityId, profile: EntityCollisionProfile, spawn: Vec2) -> Self {
        Self {
            entity,
            profile,
            motion: MovementState::at_rest(spawn),
            velocity: Vec2::ZERO,
            grounded: false,
            contacts: CollisionType::NONE,
            config: ControllerConfig::default(),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.motion.position
    }

    pub fn step(
        &mut self,
        input: ControllerInput,
        dt: f32,
        system: &EntityCollisionSystem<'_>,
    ) -> CollisionEvent {
        let accel = if self.grounded {
            self.config.accel_ground
        } else {
            self.config.accel_air
        };

        if input.move_x != 0.0 {
            let target = input.move_x * self.config.max_speed;
            self.velocity.x = move_towards(self.velocity.x, target, accel * dt);
        } else if self.grounded {
            self.velocity.x = move_towards(self.velocity.x, 0.0, self.config.friction_ground * dt);
        }

        // Jump is edge-triggered and only legal from grounded state.
        if input.jump_pressed && self.grounded {
            self.velocity.y = -self.config.jump_speed;
            self.grounded = false;
            self.motion.attached_segment = None;
        }

        self.velocity.y =
            (self.velocity.y + self.config.gravity * dt).min(self.config.max_fall_speed);

        self.motion.advance(self.velocity * dt);
        let event = system.resolve_entity(self.entity, &self.profile, &mut self.motion);
        self.apply_collision(&event);
        event
    }

    fn apply_collision(&mut self, event: &CollisionEvent) {
        let collision = event.collision;
        self.contacts = collision;

        // A left wall faces -x and stops rightward motion; a right wall the
        // opposite.
        if (collision.has_left_wall() && self.velocity.x > 0.0)
            || (collision.has_right_wall() && self.velocity.x < 0.0)
        {
            self.velocity.x = 0.0;
        }

        if collision.has_ceiling() && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
        // Grounded comes from the resolved contact, never from position.
        if collision.has_floor() && self.velocity.y >= 0.0 {
            self.velocity.y = 0.0;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_on_ledge(&self) -> bool {
        self.contacts.has_ledge()
    }

    pub fn is_blocked_left(&self) -> bool {
        self.contacts.has_right_wall()
    }

    pub fn is_blocked_right(&self) -> bool {
        self.contacts.has_left_wall()
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else if target > current {
        current + max_delta
    } else {
        current - max_delta
    }
}
