//! Level lifecycle.
//!
//! A [`Level`] owns everything a loaded layout spawned and drives one fixed
//! step at a time in a strict phase order:
//!
//! 1. player control (forces, torque, jump)
//! 2. grounded reset
//! 3. physics step, with the contact router collecting events
//! 4. event outcome applied (grounded, coins, death)
//! 5. pose sweep for every dynamic body
//! 6. gameplay: pistons, lights, coins, player state, dust

use std::fmt;

use glam::{Quat, Vec3};

use super::coin::{Coin, CoinBoard};
use super::contact::ContactRouter;
use super::layout::{models, BlockLayout, LevelLayout, PropLayout};
use super::piston::Piston;
use super::player::Player;
use crate::api::game::{palette, GameConfig, SimContext};
use crate::assets::library::ModelLibrary;
use crate::assets::scene::AssetError;
use crate::components::body::BodyTag;
use crate::components::entity::GameObject;
use crate::components::mesh::MeshHierarchy;
use crate::core::physics::{BodyDesc, ColliderShape, PhysicsError};
use crate::core::transform::Transform;
use crate::input::queue::Intent;
use crate::renderer::frame::{DrawCommand, DrawList, FrameUniforms};
use crate::renderer::lighting::{LightSet, Sun};
use crate::renderer::traits::Renderer;
use crate::systems::dust::DustSystem;

/// Why a level failed to load or step.
#[derive(Debug)]
pub enum LevelError {
    Asset(AssetError),
    Physics(PhysicsError),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Asset(err) => write!(f, "asset error: {err}"),
            LevelError::Physics(err) => write!(f, "physics error: {err}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Asset(err) => Some(err),
            LevelError::Physics(err) => Some(err),
        }
    }
}

impl From<AssetError> for LevelError {
    fn from(err: AssetError) -> Self {
        LevelError::Asset(err)
    }
}

impl From<PhysicsError> for LevelError {
    fn from(err: PhysicsError) -> Self {
        LevelError::Physics(err)
    }
}

pub struct Level {
    pub ctx: SimContext,
    layout: LevelLayout,
    models: ModelLibrary,
    /// Blocks and props.
    objects: Vec<GameObject>,
    player: Option<Player>,
    pistons: Vec<Piston>,
    lights: LightSet,
    coins: CoinBoard,
    dust: DustSystem,
    /// Instanced for every dust particle.
    dust_mesh: Option<MeshHierarchy>,
    sun: Sun,
    loaded: bool,
}

impl Level {
    /// Camera aim point above the player's feet.
    pub const CAMERA_TARGET_HEIGHT: f32 = 0.8;

    pub fn new(config: GameConfig, layout: LevelLayout, models: ModelLibrary) -> Self {
        let seed = config.seed;
        let max_coins = config.max_coins;
        Self {
            ctx: SimContext::new(config),
            layout,
            models,
            objects: Vec::new(),
            player: None,
            pistons: Vec::new(),
            lights: LightSet::new(),
            coins: CoinBoard::new(max_coins),
            dust: DustSystem::new(seed),
            dust_mesh: None,
            sun: Sun::default(),
            loaded: false,
        }
    }

    // -- Lifecycle --

    /// Spawn everything in the layout. A failure tears down whatever was
    /// already spawned, so a level is either fully loaded or empty.
    pub fn load(&mut self) -> Result<(), LevelError> {
        if self.loaded {
            self.unload();
        }
        if let Err(err) = self.populate() {
            log::warn!("level '{}' failed to load: {err}", self.layout.name);
            self.unload();
            return Err(err);
        }
        self.loaded = true;
        log::info!(
            "loaded level '{}': {} objects, {} coins, {} pistons, {} bodies",
            self.layout.name,
            self.objects.len(),
            self.coins.count(),
            self.pistons.len(),
            self.ctx.physics.body_count()
        );
        Ok(())
    }

    fn populate(&mut self) -> Result<(), LevelError> {
        let layout = self.layout.clone();

        self.sun = Sun::new(layout.sun_direction);
        self.lights.set_ambient(layout.ambient);
        self.ctx.camera.set_angle(layout.camera_angle);

        for block in &layout.blocks {
            let object = self.spawn_block(block)?;
            self.objects.push(object);
        }
        for prop in &layout.props {
            let object = self.spawn_prop(prop)?;
            self.objects.push(object);
        }

        for &position in &layout.coins {
            let mesh = self.models.instantiate(models::COIN)?;
            let coin = Coin::spawn(&mut self.ctx, position, Some(mesh))?;
            if let Err(mut rejected) = self.coins.insert(coin) {
                log::warn!("coin board full, dropping coin at {position}");
                if let Some(body) = rejected.object.body.take() {
                    self.ctx.despawn_body(rejected.id(), body)?;
                }
            }
        }

        for piston_layout in &layout.pistons {
            let frame_mesh = self.models.instantiate(models::PISTON_FRAME)?;
            let head_mesh = self.models.instantiate(models::PISTON_HEAD)?;
            let mut piston = Piston::spawn(&mut self.ctx, piston_layout, Some(frame_mesh), Some(head_mesh))?;
            piston.frame.set_scale(piston_layout.frame_half_extents * 2.0);
            piston.attach_light(&mut self.lights);
            self.pistons.push(piston);
        }

        let frames = models::PLAYER_FRAMES
            .iter()
            .map(|name| self.models.instantiate(name))
            .collect::<Result<Vec<_>, _>>()?;
        let player = Player::spawn(&mut self.ctx, layout.player_start, frames)?;
        self.ctx.camera.follow(player.position() + Vec3::Y * Self::CAMERA_TARGET_HEIGHT);
        self.player = Some(player);

        self.dust_mesh = Some(self.models.instantiate(models::BLOCK)?);
        self.dust = DustSystem::new(self.ctx.config.seed);
        Ok(())
    }

    fn spawn_block(&mut self, block: &BlockLayout) -> Result<GameObject, LevelError> {
        let id = self.ctx.next_id();
        let transform = Transform::from_position(block.position);
        let desc = BodyDesc::fixed(ColliderShape::Cuboid {
            half_extents: block.half_extents,
        });
        let body = self.ctx.spawn_body(id, &transform, desc, BodyTag::ground())?;
        let mut object = GameObject::new(id)
            .with_tag("block")
            .with_transform(transform)
            .with_color(palette::GROUND)
            .with_body(body)
            .with_mesh(self.models.instantiate(models::BLOCK)?);
        object.set_scale(block.half_extents * 2.0);
        Ok(object)
    }

    fn spawn_prop(&mut self, prop: &PropLayout) -> Result<GameObject, LevelError> {
        let mesh = self.models.instantiate(&prop.model)?;
        let id = self.ctx.next_id();
        let transform = Transform::from_position(prop.position).with_rotation(Quat::from_rotation_y(prop.yaw));
        let desc = BodyDesc::dynamic(ColliderShape::ConvexHull {
            points: mesh.local_points(),
        });
        let body = self.ctx.spawn_body(id, &transform, desc, BodyTag::prop())?;
        Ok(GameObject::new(id)
            .with_tag(prop.model.clone())
            .with_transform(transform)
            .with_color(palette::PROP)
            .with_body(body)
            .with_mesh(mesh))
    }

    /// Release everything the level spawned. The score and the physics
    /// world start over.
    pub fn unload(&mut self) {
        let objects = self.objects.len();
        let coins = self.coins.drain().len();
        let pistons = self.pistons.len();
        self.objects.clear();
        self.pistons.clear();
        self.player = None;
        self.lights.clear();
        self.dust.clear();
        self.dust_mesh = None;
        self.ctx.reset();
        self.loaded = false;
        log::info!(
            "unloaded level '{}': released {objects} objects, {coins} coins, {pistons} pistons",
            self.layout.name
        );
    }

    pub fn reload(&mut self) -> Result<(), LevelError> {
        self.unload();
        self.load()
    }

    // -- Simulation --

    /// Advance one fixed step.
    pub fn step(&mut self, intent: &Intent) -> Result<(), PhysicsError> {
        if !self.loaded {
            return Ok(());
        }
        if intent.toggle {
            self.toggle_pistons();
        }
        let Some(player) = self.player.as_mut() else {
            return Ok(());
        };
        let dt = self.ctx.config.fixed_dt;

        let jumped = player.control(&mut self.ctx.physics, intent, self.ctx.camera.angle(), dt)?;
        player.set_grounded(false);

        let outcome = {
            let router = ContactRouter::new(&self.ctx.registry, &self.coins);
            self.ctx.physics.step(&router);
            router.into_outcome()
        };
        self.ctx.clock.advance(dt);
        let now = self.ctx.clock.now_ms();

        // The contact a jump pushes off from still reports this step.
        if outcome.grounded && !jumped {
            player.land(&self.ctx.physics)?;
        }
        for slot in outcome.collected {
            if self.coins.collect(slot) {
                self.ctx.score += self.ctx.config.coin_award;
                log::info!("coin collected, score {}", self.ctx.score);
            }
        }
        if outcome.die {
            self.ctx.die = true;
            log::info!("player hit a piston");
        }

        for object in &mut self.objects {
            object.update(&self.ctx.physics)?;
        }
        player.sync(&self.ctx.physics)?;

        for piston in &mut self.pistons {
            piston.update(&mut self.ctx.physics, now)?;
            piston.update_light(&mut self.lights);
        }
        self.coins.update(&mut self.ctx, dt)?;
        if player.update(now, self.ctx.config.death_height) && !self.ctx.die {
            self.ctx.die = true;
            log::info!("player fell out of the level");
        }
        self.dust
            .update(player.position(), player.is_grounded(), player.is_running(), dt);
        self.ctx
            .camera
            .follow(player.position() + Vec3::Y * Self::CAMERA_TARGET_HEIGHT);
        Ok(())
    }

    /// Flip every piston now.
    pub fn toggle_pistons(&mut self) {
        let now = self.ctx.clock.now_ms();
        for piston in &mut self.pistons {
            piston.toggle(now);
        }
    }

    // -- Drawing --

    /// Record every visible mesh of the level.
    pub fn collect_draws(&mut self, renderer: &mut dyn Renderer, list: &mut DrawList) {
        if !self.loaded {
            return;
        }
        for object in &mut self.objects {
            push_object(renderer, list, object);
        }
        for piston in &mut self.pistons {
            push_object(renderer, list, &mut piston.frame);
            push_object(renderer, list, &mut piston.head);
        }
        for coin in self.coins.iter_mut() {
            if !coin.is_collected() {
                push_object(renderer, list, &mut coin.object);
            }
        }
        let now = self.ctx.clock.now_ms();
        if let Some(player) = &mut self.player {
            player.collect_draws(renderer, list, now);
        }
        if let Some(sub) = self.dust_mesh.as_mut().and_then(|m| m.submeshes_mut().first_mut()) {
            let mesh = sub.ensure_uploaded(renderer);
            let index_count = sub.data.index_count();
            for particle in self.dust.particles() {
                list.push(DrawCommand {
                    mesh,
                    index_count,
                    model: particle.matrix(),
                    color: palette::DUST,
                    morph: None,
                });
            }
        }
    }

    pub fn frame_uniforms(&self) -> FrameUniforms {
        let camera = &self.ctx.camera;
        FrameUniforms {
            matrix: camera.combined(),
            eye: camera.eye(),
            sun: self.sun,
            focus: self.player.as_ref().map_or(Vec3::ZERO, Player::position),
        }
    }

    // -- Queries --

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn died(&self) -> bool {
        self.ctx.die
    }

    pub fn score(&self) -> u32 {
        self.ctx.score
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn pistons(&self) -> &[Piston] {
        &self.pistons
    }

    pub fn coins(&self) -> &CoinBoard {
        &self.coins
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    pub fn dust(&self) -> &DustSystem {
        &self.dust
    }
}

fn push_object(renderer: &mut dyn Renderer, list: &mut DrawList, object: &mut GameObject) {
    if !object.active {
        return;
    }
    let color = object.color;
    let Some(mesh) = &mut object.mesh else {
        return;
    };
    for sub in mesh.submeshes_mut() {
        let handle = sub.ensure_uploaded(renderer);
        list.push(DrawCommand {
            mesh: handle,
            index_count: sub.data.index_count(),
            model: sub.world_matrix(),
            color,
            morph: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::layout::{level01, placeholder_models};
    use crate::game::piston::PistonLayout;
    use crate::renderer::traits::recording::RecordingRenderer;
    use glam::Vec2;

    fn floor() -> BlockLayout {
        BlockLayout {
            position: Vec3::new(0.0, -0.5, 0.0),
            half_extents: Vec3::new(10.0, 0.5, 10.0),
        }
    }

    fn level(layout: LevelLayout) -> Level {
        let mut level = Level::new(GameConfig::default(), layout, placeholder_models().unwrap());
        level.load().unwrap();
        level
    }

    fn idle() -> Intent {
        Intent::default()
    }

    fn run(level: &mut Level, steps: usize, intent: &Intent) {
        for _ in 0..steps {
            level.step(intent).unwrap();
        }
    }

    fn player_velocity(level: &Level) -> Vec3 {
        let body = level.player().unwrap().object.body.as_ref().unwrap().body;
        level.ctx.physics.linear_velocity(&body).unwrap()
    }

    #[test]
    fn level01_loads_everything() {
        let level = level(level01());
        let layout = level01();
        assert!(level.is_loaded());
        assert_eq!(level.objects().len(), layout.blocks.len() + layout.props.len());
        assert_eq!(level.coins().count(), layout.coins.len());
        assert_eq!(level.pistons().len(), layout.pistons.len());
        assert_eq!(level.lights().count(), layout.pistons.len());
        let bodies = layout.blocks.len() + layout.props.len() + layout.coins.len() + 2 * layout.pistons.len() + 1;
        assert_eq!(level.ctx.physics.body_count(), bodies);
        assert_eq!(level.ctx.registry.len(), bodies);
    }

    #[test]
    fn unload_releases_everything() {
        let mut level = level(level01());
        level.unload();
        assert!(!level.is_loaded());
        assert!(level.objects().is_empty());
        assert!(level.player().is_none());
        assert_eq!(level.coins().count(), 0);
        assert_eq!(level.lights().count(), 0);
        assert_eq!(level.ctx.physics.body_count(), 0);
        assert!(level.ctx.registry.is_empty());
        // Stepping an unloaded level is a no-op.
        level.step(&idle()).unwrap();
    }

    #[test]
    fn missing_model_leaves_nothing_behind() {
        let layout = LevelLayout {
            blocks: vec![floor()],
            props: vec![PropLayout {
                model: "statue".into(),
                position: Vec3::ONE,
                yaw: 0.0,
            }],
            ..LevelLayout::default()
        };
        let mut level = Level::new(GameConfig::default(), layout, placeholder_models().unwrap());
        let err = level.load().unwrap_err();
        assert!(matches!(err, LevelError::Asset(AssetError::MissingModel(ref name)) if name == "statue"));
        assert!(!level.is_loaded());
        assert_eq!(level.ctx.physics.body_count(), 0);
        assert!(level.objects().is_empty());
    }

    #[test]
    fn coin_awards_once() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            coins: vec![Vec3::new(5.0, 0.5, 5.0)],
            ..LevelLayout::default()
        });
        run(&mut level, 1, &idle());
        assert_eq!(level.score(), 0);
        let bodies = level.ctx.physics.body_count();

        // Drop the coin's trigger onto the player's collider.
        let target = level.player().unwrap().position() + Vec3::new(0.0, 0.45, 0.0);
        let coin = level.coins.iter_mut().next().unwrap();
        coin.object.set_position(&mut level.ctx.physics, target).unwrap();

        run(&mut level, 1, &idle());
        assert_eq!(level.score(), 5);
        assert!(level.coins().is_collected(0));
        assert_eq!(level.ctx.physics.body_count(), bodies - 1);

        run(&mut level, 30, &idle());
        assert_eq!(level.score(), 5);
    }

    #[test]
    fn jump_needs_ground_contact() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            player_start: Vec3::new(0.0, 1.0, 0.0),
            ..LevelLayout::default()
        });
        let jump = Intent {
            jump: true,
            ..Intent::default()
        };

        // Airborne: the request does nothing.
        run(&mut level, 1, &jump);
        assert!(!level.player().unwrap().is_grounded());
        assert!(player_velocity(&level).y < 0.0);

        run(&mut level, 90, &idle());
        assert!(level.player().unwrap().is_grounded());

        run(&mut level, 1, &jump);
        assert!(!level.player().unwrap().is_grounded());
        let jump_speed = level.ctx.config.player.jump_speed;
        assert!(player_velocity(&level).y > jump_speed * 0.8);

        // A second request mid-air is ignored.
        let before = player_velocity(&level).y;
        run(&mut level, 1, &jump);
        assert!(!level.player().unwrap().is_grounded());
        assert!(player_velocity(&level).y < before);
    }

    #[test]
    fn held_jump_applies_one_impulse() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            player_start: Vec3::new(0.0, 1.0, 0.0),
            ..LevelLayout::default()
        });
        run(&mut level, 90, &idle());
        assert!(level.player().unwrap().is_grounded());
        let jump = Intent {
            jump: true,
            ..Intent::default()
        };

        let mut previous = player_velocity(&level).y;
        let mut kicks = 0;
        for _ in 0..8 {
            run(&mut level, 1, &jump);
            let vy = player_velocity(&level).y;
            if vy > previous + 1.0 {
                kicks += 1;
            }
            assert!(!level.player().unwrap().is_grounded());
            previous = vy;
        }
        assert_eq!(kicks, 1);
        assert!(previous < level.ctx.config.player.jump_speed);
    }

    #[test]
    fn walking_moves_the_player_and_the_camera() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            ..LevelLayout::default()
        });
        run(&mut level, 10, &idle());
        let walk = Intent {
            direction: Vec2::Y,
            ..Intent::default()
        };
        run(&mut level, 60, &walk);
        let player = level.player().unwrap();
        assert!(player.position().z < -0.5, "camera at angle 0 looks down -Z");
        let target = player.position() + Vec3::Y * Level::CAMERA_TARGET_HEIGHT;
        let offset = level.ctx.camera.eye() - target;
        let horizontal = Vec2::new(offset.x, offset.z).length();
        assert!((horizontal - level.ctx.camera.distance()).abs() < 1e-3);
    }

    #[test]
    fn toggle_flips_every_piston() {
        let mut level = level(level01());
        let before: Vec<bool> = level.pistons().iter().map(Piston::is_enabled).collect();
        let toggle = Intent {
            toggle: true,
            ..Intent::default()
        };
        run(&mut level, 1, &toggle);
        assert!(level.pistons().iter().all(Piston::is_moving));
        run(&mut level, 40, &idle());

        for (piston, was) in level.pistons().iter().zip(before) {
            assert_eq!(piston.is_enabled(), !was);
            assert!(!piston.is_moving());
            let expected = if was { piston.retracted() } else { piston.extended() };
            let body = piston.head.body.as_ref().unwrap().body;
            let half = level.ctx.physics.cuboid_half_extents(&body).unwrap();
            assert!((half - expected.half_extents).length() < 1e-5);
        }
        let colors: Vec<Vec3> = level.lights().iter().map(|l| l.color).collect();
        let expected: Vec<Vec3> = level.pistons().iter().map(Piston::light_color).collect();
        assert_eq!(colors, expected);
    }

    #[test]
    fn piston_kills_and_reload_restores() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            coins: vec![Vec3::new(0.0, 0.45, 0.0)],
            pistons: vec![PistonLayout {
                position: Vec3::new(0.0, -0.5, 0.0),
                extension: Vec3::new(0.0, 2.0, 0.0),
                enabled: true,
                ..PistonLayout::default()
            }],
            ..LevelLayout::default()
        });
        run(&mut level, 1, &idle());
        assert!(level.died());
        assert_eq!(level.score(), 5);

        let bodies = level.ctx.physics.body_count() + 1;
        level.reload().unwrap();
        assert!(!level.died());
        assert_eq!(level.score(), 0);
        assert!(!level.coins().is_collected(0));
        assert_eq!(level.ctx.physics.body_count(), bodies);
        assert!(level.player().unwrap().position().abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn falling_out_of_the_world_kills() {
        let mut level = level(LevelLayout::default());
        for _ in 0..300 {
            level.step(&idle()).unwrap();
            if level.died() {
                break;
            }
        }
        assert!(level.died());
        assert!(level.player().unwrap().position().y < level.ctx.config.death_height);
    }

    #[test]
    fn draws_every_visible_mesh() {
        let mut level = level(level01());
        let mut renderer = RecordingRenderer::default();
        let mut list = DrawList::new();
        level.collect_draws(&mut renderer, &mut list);

        let layout = level01();
        let plain = layout.blocks.len() + layout.props.len() + 2 * layout.pistons.len() + layout.coins.len();
        assert_eq!(list.commands.iter().filter(|c| c.morph.is_none()).count(), plain);
        assert_eq!(list.commands.iter().filter(|c| c.morph.is_some()).count(), 1);

        // Buffers are uploaded once and reused.
        let uploads = renderer.calls.len();
        list.clear();
        level.collect_draws(&mut renderer, &mut list);
        assert_eq!(renderer.calls.len(), uploads);
    }

    #[test]
    fn landing_kicks_up_dust() {
        let mut level = level(LevelLayout {
            blocks: vec![floor()],
            player_start: Vec3::new(0.0, 0.5, 0.0),
            ..LevelLayout::default()
        });
        let mut seen = false;
        for _ in 0..60 {
            level.step(&idle()).unwrap();
            seen |= !level.dust().is_empty();
        }
        assert!(seen);
    }
}
