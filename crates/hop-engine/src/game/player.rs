//! Character controller.
//!
//! The player is a dynamic, upright box driven by forces: a continuous force
//! towards the target velocity, a torque towards the movement heading and an
//! impulse for jumps. Visually it morphs between idle, walk and run poses.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::api::game::{palette, PlayerConfig, SimContext};
use crate::components::animation::{Animation, LoopMode};
use crate::components::body::BodyTag;
use crate::components::entity::GameObject;
use crate::components::mesh::MeshHierarchy;
use crate::core::physics::{BodyDesc, ColliderShape, PhysicsBody, PhysicsError, PhysicsWorld};
use crate::core::transform::Transform;
use crate::input::queue::Intent;
use crate::renderer::frame::{DrawCommand, DrawList, MorphTarget};
use crate::renderer::traits::Renderer;

/// Pose family the player is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gait {
    #[default]
    Idle,
    Walk,
    Run,
}

impl Gait {
    pub fn index(self) -> usize {
        match self {
            Gait::Idle => 0,
            Gait::Walk => 1,
            Gait::Run => 2,
        }
    }
}

pub struct Player {
    pub object: GameObject,
    /// Idle, walk and run models, indexed by [`Gait::index`].
    frames: Vec<MeshHierarchy>,
    current: Gait,
    next: Gait,
    blend: Animation<f32>,
    sprint: bool,
    was_sprinting: bool,
    moving: bool,
    was_moving: bool,
    stamina: u32,
    grounded: bool,
    config: PlayerConfig,
}

impl Player {
    /// Upward speed in m/s above which a ground contact does not count.
    pub const MAX_GROUNDED_RISE: f32 = 0.5;

    /// Create the player with its feet at `position`.
    pub fn spawn(ctx: &mut SimContext, position: Vec3, frames: Vec<MeshHierarchy>) -> Result<Self, PhysicsError> {
        let config = ctx.config.player.clone();
        let id = ctx.next_id();
        let transform = Transform::from_position(position);
        let desc = BodyDesc::dynamic(ColliderShape::Cuboid {
            half_extents: config.half_extents,
        })
        .with_collider_offset(Vec3::new(0.0, config.half_extents.y, 0.0))
        .with_material(config.material())
        .with_density(config.density)
        .with_angular_damping(config.angular_damping)
        .with_upright(true)
        .with_contact_reports(true);
        let body = ctx.spawn_body(id, &transform, desc, BodyTag::player())?;

        let object = GameObject::new(id)
            .with_tag("player")
            .with_transform(transform)
            .with_color(palette::PLAYER)
            .with_body(body);
        let mut player = Self {
            object,
            frames,
            current: Gait::Idle,
            next: Gait::Idle,
            blend: Animation::new(vec![0.0, 1.0], config.blend_duration, LoopMode::Clamp),
            sprint: false,
            was_sprinting: false,
            moving: false,
            was_moving: false,
            stamina: config.stamina_max,
            grounded: false,
            config,
        };
        player.sync_frames();
        Ok(player)
    }

    fn body(&self) -> Result<PhysicsBody, PhysicsError> {
        self.object
            .body
            .as_ref()
            .map(|b| b.body)
            .ok_or_else(|| PhysicsError::invalid_operation("player has no body"))
    }

    // -- Control --

    /// Apply one step of movement, turning and jumping. `yaw` is the camera
    /// orbit angle. Returns whether a jump impulse was applied.
    pub fn control(
        &mut self,
        physics: &mut PhysicsWorld,
        intent: &Intent,
        yaw: f32,
        dt: f32,
    ) -> Result<bool, PhysicsError> {
        let body = self.body()?;
        physics.clear_forces(&body)?;

        self.update_sprint(intent, dt);
        self.moving = intent.direction != Vec2::ZERO;

        if self.moving {
            let heading = world_direction(intent.direction, yaw);
            let speed = if self.sprint {
                self.config.walk_speed * self.config.sprint_multiplier
            } else {
                self.config.walk_speed
            };
            let mass = physics.mass(&body)?;
            let velocity = physics.linear_velocity(&body)?;
            let target = heading * speed;
            let current = Vec3::new(velocity.x, 0.0, velocity.z);
            let force = mass * (target - current) / self.config.acceleration_time;
            physics.apply_force(&body, force)?;
            self.turn_towards(physics, &body, heading, dt)?;
        } else {
            stop_turning(physics, &body)?;
        }

        if intent.jump && self.grounded {
            let mass = physics.mass(&body)?;
            physics.apply_impulse(&body, Vec3::new(0.0, mass * self.config.jump_speed, 0.0))?;
            self.grounded = false;
            return Ok(true);
        }
        Ok(false)
    }

    /// Sprint toggling and stamina bookkeeping.
    fn update_sprint(&mut self, intent: &Intent, dt: f32) {
        if intent.sprint_pressed && self.stamina > 0 {
            self.sprint = true;
        }
        if !intent.sprint_held {
            self.sprint = false;
        }

        if self.sprint {
            let drain = (dt * self.config.stamina_drain).round() as u32;
            self.stamina = self.stamina.saturating_sub(drain);
            if self.stamina == 0 {
                self.sprint = false;
                log::debug!("player out of stamina");
            }
        } else {
            let regen = (dt * self.config.stamina_regen).round() as u32;
            self.stamina = self.stamina.saturating_add(regen).min(self.config.stamina_max);
        }
    }

    /// Torque towards `heading`, from `ω² - ω₀² = 2·α·θ` with the target
    /// rate capped so a single step never passes the heading.
    fn turn_towards(
        &self,
        physics: &mut PhysicsWorld,
        body: &PhysicsBody,
        heading: Vec3,
        dt: f32,
    ) -> Result<(), PhysicsError> {
        let forward = self.object.transform.forward();
        let theta = signed_yaw(forward, heading);
        if theta.abs() <= self.config.rotation_tolerance {
            return stop_turning(physics, body);
        }

        let max = self.config.max_angular_velocity;
        let omega0 = physics.angular_velocity(body)?.y;
        let omega = theta.signum() * max.min(theta.abs() / dt);
        let alpha = if omega0 * theta >= 0.0 {
            (omega * omega - omega0 * omega0) / (2.0 * theta)
        } else {
            -omega0 / dt
        };
        let alpha = alpha.clamp((-max - omega0) / dt, (max - omega0) / dt);
        let inertia = physics.principal_inertia(body)?.y;
        physics.apply_torque(body, Vec3::new(0.0, inertia * alpha, 0.0))
    }

    // -- Contact state --

    pub fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    /// Take a ground contact reported by the last step. A body still rising
    /// faster than [`MAX_GROUNDED_RISE`](Self::MAX_GROUNDED_RISE) is leaving
    /// the ground and stays airborne.
    pub fn land(&mut self, physics: &PhysicsWorld) -> Result<bool, PhysicsError> {
        let rise = physics.linear_velocity(&self.body()?)?.y;
        self.grounded = rise <= Self::MAX_GROUNDED_RISE;
        Ok(self.grounded)
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    // -- Per-step update --

    /// Pull the simulated pose and lay the pose models out on it.
    pub fn sync(&mut self, physics: &PhysicsWorld) -> Result<(), PhysicsError> {
        self.object.update(physics)?;
        self.sync_frames();
        Ok(())
    }

    fn sync_frames(&mut self) {
        for frame in &mut self.frames {
            frame.apply(&self.object.transform);
        }
    }

    /// Advance the pose state machine. Returns true when the player has
    /// fallen below `death_height`.
    pub fn update(&mut self, now_ms: u64, death_height: f32) -> bool {
        let moving = self.moving;
        let sprint = self.sprint;
        let edge = match (self.was_moving, moving) {
            (false, true) => Some((Gait::Idle, if sprint { Gait::Run } else { Gait::Walk })),
            (true, true) if sprint && !self.was_sprinting => Some((Gait::Walk, Gait::Run)),
            (true, true) if !sprint && self.was_sprinting => Some((Gait::Run, Gait::Walk)),
            (true, false) => Some((self.next, Gait::Idle)),
            _ => None,
        };
        if let Some((current, next)) = edge {
            self.current = current;
            self.next = next;
            self.blend.start(now_ms);
        }
        self.was_moving = moving;
        self.was_sprinting = sprint;

        self.object.transform.position.y < death_height
    }

    /// Morph factor between the current and next pose.
    pub fn blend_factor(&mut self, now_ms: u64) -> f32 {
        self.blend.frame(now_ms).unwrap_or(1.0)
    }

    /// One morph draw per sub-mesh of the current pose model.
    pub fn collect_draws(&mut self, renderer: &mut dyn Renderer, list: &mut DrawList, now_ms: u64) {
        let factor = self.blend_factor(now_ms);
        let (from, to) = (self.current.index(), self.next.index());
        if from >= self.frames.len() || to >= self.frames.len() {
            return;
        }
        let color = self.object.color;
        let targets: Vec<_> = self.frames[to]
            .submeshes_mut()
            .iter_mut()
            .map(|s| s.ensure_uploaded(renderer))
            .collect();
        for (i, sub) in self.frames[from].submeshes_mut().iter_mut().enumerate() {
            let mesh = sub.ensure_uploaded(renderer);
            list.push(DrawCommand {
                mesh,
                index_count: sub.data.index_count(),
                model: sub.world_matrix(),
                color,
                morph: targets.get(i).map(|&target| MorphTarget { mesh: target, factor }),
            });
        }
    }

    // -- Queries --

    pub fn position(&self) -> Vec3 {
        self.object.transform.position
    }

    pub fn gait(&self) -> (Gait, Gait) {
        (self.current, self.next)
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprint
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Moving fast enough on foot to kick up dust.
    pub fn is_running(&self) -> bool {
        self.moving && self.sprint
    }

    pub fn stamina(&self) -> u32 {
        self.stamina
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}

/// Map a camera-space direction (+y forward, +x left) onto the ground plane.
/// The camera sits at `(sin yaw, _, cos yaw)` from its target, so forward
/// points the other way.
pub fn world_direction(direction: Vec2, yaw: f32) -> Vec3 {
    let r = Vec2::from_angle(PI - yaw).rotate(direction.normalize_or_zero());
    Vec3::new(r.x, 0.0, r.y)
}

/// Signed rotation about +Y taking `from` onto `to`, in (-π, π].
fn signed_yaw(from: Vec3, to: Vec3) -> f32 {
    let diff = to.x.atan2(to.z) - from.x.atan2(from.z);
    let wrapped = (diff + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

fn stop_turning(physics: &mut PhysicsWorld, body: &PhysicsBody) -> Result<(), PhysicsError> {
    let w = physics.angular_velocity(body)?;
    physics.set_angular_velocity(body, Vec3::new(w.x, 0.0, w.z))
}
