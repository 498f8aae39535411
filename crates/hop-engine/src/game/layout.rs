//! Level placement data.
//!
//! Levels are plain data: the built-in one is a literal ([`level01`]), others
//! can be read from JSON with [`LevelLayout::from_json`].

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::piston::PistonLayout;
use crate::assets::library::ModelLibrary;
use crate::assets::primitives;
use crate::assets::scene::{AssetError, ImportedScene};

/// Names of the models a level instantiates.
pub mod models {
    /// Unit cube, scaled per block.
    pub const BLOCK: &str = "block";
    pub const PLAYER_IDLE: &str = "player_idle";
    pub const PLAYER_WALK: &str = "player_walk";
    pub const PLAYER_RUN: &str = "player_run";
    pub const COIN: &str = "coin";
    pub const CRATE: &str = "crate";
    pub const PISTON_FRAME: &str = "piston_frame";
    /// Unit cube, scaled to the head's trigger box.
    pub const PISTON_HEAD: &str = "piston_head";

    /// Pose models in gait order.
    pub const PLAYER_FRAMES: [&str; 3] = [PLAYER_IDLE, PLAYER_WALK, PLAYER_RUN];
}

/// Static ground box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockLayout {
    pub position: Vec3,
    pub half_extents: Vec3,
}

/// Dynamic prop whose collider is the convex hull of its model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropLayout {
    pub model: String,
    pub position: Vec3,
    /// Rotation about Y, radians.
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    pub name: String,
    /// Where the player's feet start.
    pub player_start: Vec3,
    /// Initial camera orbit angle, radians.
    pub camera_angle: f32,
    pub sun_direction: Vec3,
    pub ambient: Vec3,
    pub blocks: Vec<BlockLayout>,
    pub props: Vec<PropLayout>,
    pub coins: Vec<Vec3>,
    pub pistons: Vec<PistonLayout>,
}

impl Default for LevelLayout {
    fn default() -> Self {
        Self {
            name: String::new(),
            player_start: Vec3::ZERO,
            camera_angle: 0.0,
            sun_direction: Vec3::new(-0.4, -1.0, -0.3),
            ambient: Vec3::splat(0.25),
            blocks: Vec::new(),
            props: Vec::new(),
            coins: Vec::new(),
            pistons: Vec::new(),
        }
    }
}

impl LevelLayout {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn block(position: [f32; 3], half_extents: [f32; 3]) -> BlockLayout {
    BlockLayout {
        position: Vec3::from_array(position),
        half_extents: Vec3::from_array(half_extents),
    }
}

fn prop(model: &str, position: [f32; 3], yaw: f32) -> PropLayout {
    PropLayout {
        model: model.to_string(),
        position: Vec3::from_array(position),
        yaw,
    }
}

/// The built-in level: a floor, a staircase of platforms up to a raised
/// deck guarded by pistons, crates to push around and a trail of coins.
pub fn level01() -> LevelLayout {
    LevelLayout {
        name: "level01".to_string(),
        player_start: Vec3::new(0.0, 0.0, 4.0),
        camera_angle: 0.0,
        blocks: vec![
            block([0.0, -0.5, 0.0], [10.0, 0.5, 10.0]),
            block([3.0, 0.25, -1.0], [1.0, 0.25, 1.0]),
            block([3.0, 0.5, -3.5], [1.0, 0.5, 1.0]),
            block([3.0, 0.75, -6.0], [1.0, 0.75, 1.0]),
            block([-1.0, 1.25, -7.5], [3.0, 0.25, 1.5]),
            block([-6.0, 0.4, 2.0], [1.5, 0.4, 3.0]),
        ],
        props: vec![
            prop(models::CRATE, [-2.0, 0.5, 1.0], 0.0),
            prop(models::CRATE, [-2.0, 1.2, 1.0], 0.4),
            prop(models::CRATE, [1.5, 0.5, 2.0], 0.8),
        ],
        coins: vec![
            Vec3::new(0.0, 0.6, 1.5),
            Vec3::new(3.0, 1.1, -1.0),
            Vec3::new(3.0, 1.6, -3.5),
            Vec3::new(3.0, 2.1, -6.0),
            Vec3::new(0.0, 2.1, -7.5),
            Vec3::new(-3.0, 2.1, -7.5),
            Vec3::new(-6.0, 1.4, 0.5),
            Vec3::new(-6.0, 1.4, 3.5),
        ],
        pistons: vec![
            PistonLayout {
                position: Vec3::new(-1.0, 1.0, -5.5),
                extension: Vec3::new(0.0, 2.0, 0.0),
                enabled: true,
                ..PistonLayout::default()
            },
            PistonLayout {
                position: Vec3::new(-6.0, 0.5, -2.5),
                extension: Vec3::new(0.0, 0.0, 2.0),
                enabled: false,
                ..PistonLayout::default()
            },
        ],
        ..LevelLayout::default()
    }
}

/// Box scene with its bottom face on the origin.
fn standing_box(half_extents: Vec3) -> ImportedScene {
    let mut scene = primitives::box_scene(half_extents);
    scene.root.transform = Mat4::from_translation(Vec3::new(0.0, half_extents.y, 0.0));
    scene
}

/// Procedural stand-ins for every model in [`models`]. The three player
/// poses share one topology so they can be morphed.
pub fn placeholder_models() -> Result<ModelLibrary, AssetError> {
    let mut library = ModelLibrary::new();
    let unit = primitives::box_scene(Vec3::splat(0.5));
    library.insert_scene(models::BLOCK, &unit)?;
    library.insert_scene(models::PISTON_HEAD, &unit)?;
    library.insert_scene(models::PISTON_FRAME, &unit)?;
    library.insert_scene(models::CRATE, &primitives::box_scene(Vec3::splat(0.3)))?;
    library.insert_scene(models::COIN, &primitives::box_scene(Vec3::new(0.2, 0.2, 0.05)))?;

    let poses = [
        Vec3::new(0.2, 0.45, 0.2),
        Vec3::new(0.22, 0.43, 0.2),
        Vec3::new(0.24, 0.4, 0.22),
    ];
    for (name, half) in models::PLAYER_FRAMES.into_iter().zip(poses) {
        library.insert_scene(name, &standing_box(half))?;
    }
    Ok(library)
}
