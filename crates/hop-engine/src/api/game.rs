use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::api::types::EntityId;
use crate::assets::scene::AssetError;
use crate::components::body::{BodyBinding, BodyTag};
use crate::core::physics::{BodyDesc, PhysicsError, PhysicsMaterial, PhysicsWorld};
use crate::core::time::GameClock;
use crate::core::transform::Transform;
use crate::game::contact::BodyRegistry;
use crate::renderer::camera::OrbitCamera;

/// Character controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Walking speed in m/s.
    pub walk_speed: f32,
    /// Running speed = walk_speed × sprint_multiplier.
    pub sprint_multiplier: f32,
    /// Seconds to reach the target velocity.
    pub acceleration_time: f32,
    /// Vertical velocity change applied by a jump.
    pub jump_speed: f32,
    /// Cap on yaw rate while turning, rad/s.
    pub max_angular_velocity: f32,
    /// Heading error below which turning stops, radians.
    pub rotation_tolerance: f32,
    /// Stamina units are milliseconds of sprint.
    pub stamina_max: u32,
    /// Stamina drained per second of sprinting.
    pub stamina_drain: f32,
    /// Stamina regained per second when not sprinting.
    pub stamina_regen: f32,
    /// Seconds to blend between idle/walk/run poses.
    pub blend_duration: f32,
    pub density: f32,
    pub angular_damping: f32,
    pub half_extents: Vec3,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.5,
            sprint_multiplier: 2.0,
            acceleration_time: 0.15,
            jump_speed: 5.0,
            max_angular_velocity: 10.0,
            rotation_tolerance: 0.05,
            stamina_max: 3000,
            stamina_drain: 1000.0,
            stamina_regen: 500.0,
            blend_duration: 0.2,
            density: 10.0,
            angular_damping: 4.0,
            half_extents: Vec3::new(0.2, 0.45, 0.2),
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.0,
        }
    }
}

impl PlayerConfig {
    pub fn material(&self) -> PhysicsMaterial {
        PhysicsMaterial::new(self.static_friction, self.dynamic_friction, self.restitution)
    }
}

/// Orbit camera tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Initial elevation, radians.
    pub inclination: f32,
    pub min_inclination: f32,
    pub max_inclination: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
    /// Distance change per wheel notch.
    pub zoom_step: f32,
    pub aspect: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 3.0,
            min_distance: 1.5,
            max_distance: 8.0,
            inclination: std::f32::consts::FRAC_PI_4,
            min_inclination: 0.1,
            max_inclination: 1.4,
            sensitivity: 0.005,
            zoom_step: 0.5,
            aspect: 16.0 / 9.0,
        }
    }
}

/// Configuration for the game, loadable from JSON. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Fixed timestep in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// Gravity vector, Y up.
    pub gravity: Vec3,
    /// Falling below this height kills the player.
    pub death_height: f32,
    /// Score per collected coin.
    pub coin_award: u32,
    /// Size of the fixed coin board.
    pub max_coins: usize,
    /// Seconds for a piston to extend or retract.
    pub piston_transition: f32,
    /// Seed for visual effects.
    pub seed: u64,
    pub player: PlayerConfig,
    pub camera: CameraConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            death_height: -10.0,
            coin_award: 5,
            max_coins: 16,
            piston_transition: 0.5,
            seed: 42,
            player: PlayerConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Simulation state shared by every gameplay object: the physics world, the
/// body registry the contact router resolves against, the clock, the camera
/// and the level-wide flags.
pub struct SimContext {
    pub config: GameConfig,
    pub physics: PhysicsWorld,
    pub registry: BodyRegistry,
    pub clock: GameClock,
    pub camera: OrbitCamera,
    pub score: u32,
    /// Set when the player died this step; the driver reloads the level.
    pub die: bool,
    next_id: u32,
}

impl SimContext {
    pub fn new(config: GameConfig) -> Self {
        let mut physics = PhysicsWorld::new(config.gravity);
        physics.set_dt(config.fixed_dt);
        let camera = OrbitCamera::new(&config.camera, Vec3::ZERO, 0.0);
        Self {
            config,
            physics,
            registry: BodyRegistry::new(),
            clock: GameClock::new(),
            camera,
            score: 0,
            die: false,
            next_id: 1,
        }
    }

    /// Generate the next unique entity ID.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a body for `owner` and register its tag for contact routing.
    pub fn spawn_body(
        &mut self,
        owner: EntityId,
        transform: &Transform,
        desc: BodyDesc,
        tag: BodyTag,
    ) -> Result<BodyBinding, PhysicsError> {
        let binding = BodyBinding::create(&mut self.physics, owner, transform, desc, tag)?;
        self.registry.register(owner, tag);
        Ok(binding)
    }

    /// Unregister, then remove the body.
    pub fn despawn_body(&mut self, owner: EntityId, binding: BodyBinding) -> Result<(), PhysicsError> {
        self.registry.unregister(owner);
        binding.destroy(&mut self.physics)
    }

    /// Fresh world, registry and flags. The id counter keeps running so ids
    /// are never reused across reloads.
    pub fn reset(&mut self) {
        self.physics = PhysicsWorld::new(self.config.gravity);
        self.physics.set_dt(self.config.fixed_dt);
        self.registry.clear();
        self.score = 0;
        self.die = false;
    }
}

/// Base colours used by the built-in level.
pub mod palette {
    use glam::Vec4;

    pub const GROUND: Vec4 = Vec4::new(0.45, 0.6, 0.35, 1.0);
    pub const PROP: Vec4 = Vec4::new(0.6, 0.45, 0.3, 1.0);
    pub const COIN: Vec4 = Vec4::new(1.0, 0.84, 0.0, 1.0);
    pub const PISTON: Vec4 = Vec4::new(0.55, 0.55, 0.6, 1.0);
    pub const PLAYER: Vec4 = Vec4::new(0.2, 0.4, 0.9, 1.0);
    pub const DUST: Vec4 = Vec4::new(0.8, 0.75, 0.65, 1.0);
}
