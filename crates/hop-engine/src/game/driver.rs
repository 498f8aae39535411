use super::layout::LevelLayout;
use super::level::{Level, LevelError};
use crate::api::game::GameConfig;
use crate::assets::library::ModelLibrary;
use crate::core::time::FixedTimestep;
use crate::input::queue::{Controls, InputEvent, InputQueue};
use crate::renderer::frame::DrawList;
use crate::renderer::shader::ShaderLibrary;
use crate::renderer::traits::Renderer;

/// Wires a level to the host's frame loop.
///
/// The host pushes input events as they arrive, calls [`tick`](Self::tick)
/// once per frame with the elapsed time and [`render`](Self::render) once the
/// frame's steps have run.
pub struct GameDriver {
    level: Level,
    controls: Controls,
    input: InputQueue,
    timestep: FixedTimestep,
    draws: DrawList,
    initialized: bool,
    deaths: u32,
}

impl GameDriver {
    pub fn new(config: GameConfig, layout: LevelLayout, models: ModelLibrary) -> Self {
        let timestep = FixedTimestep::new(config.fixed_dt);
        Self {
            level: Level::new(config, layout, models),
            controls: Controls::new(),
            input: InputQueue::new(),
            timestep,
            draws: DrawList::new(),
            initialized: false,
            deaths: 0,
        }
    }

    /// Load the level. Call once after construction.
    pub fn start(&mut self) -> Result<(), LevelError> {
        self.level.load()?;
        self.timestep.reset();
        self.initialized = true;
        Ok(())
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.level.ctx.camera.set_aspect(width, height);
    }

    /// Run one frame. A fatal physics error ends the process.
    pub fn tick(&mut self, frame_dt: f32) {
        match self.frame(frame_dt) {
            Ok(_) => {}
            Err(LevelError::Physics(err)) => err.terminate(),
            Err(LevelError::Asset(err)) => {
                log::error!("level reload failed: {err}");
                self.initialized = false;
            }
        }
    }

    /// Fold pending input, then run as many fixed steps as `frame_dt` covers.
    /// Returns the number of steps run.
    ///
    /// Key edges and mouse motion only apply to the first step of a frame.
    /// A frame too short for one step keeps them for the next frame.
    pub fn frame(&mut self, frame_dt: f32) -> Result<u32, LevelError> {
        if !self.initialized {
            return Ok(0);
        }
        self.controls.handle_all(&mut self.input);

        let steps = self.timestep.accumulate(frame_dt);
        if steps == 0 {
            return Ok(0);
        }

        let mut intent = self.controls.take_intent();
        self.level.ctx.camera.look(intent.look, intent.zoom);

        for step in 0..steps {
            if step > 0 {
                intent.jump = false;
                intent.toggle = false;
                intent.sprint_pressed = false;
            }
            self.level.step(&intent)?;

            if self.level.died() {
                self.deaths += 1;
                log::info!("player died ({} so far), reloading", self.deaths);
                self.level.reload()?;
                self.controls.reset();
                self.timestep.reset();
                return Ok(step + 1);
            }
        }
        Ok(steps)
    }

    /// Record the level's meshes and submit them.
    pub fn render(&mut self, renderer: &mut dyn Renderer, shaders: &ShaderLibrary) {
        self.draws.clear();
        if !self.level.is_loaded() {
            return;
        }
        self.level.collect_draws(renderer, &mut self.draws);
        let frame = self.level.frame_uniforms();
        self.draws.submit(renderer, shaders, &frame, self.level.lights());
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    pub fn draws(&self) -> &DrawList {
        &self.draws
    }

    pub fn is_running(&self) -> bool {
        self.initialized
    }

    /// Deaths since start.
    pub fn deaths(&self) -> u32 {
        self.deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::layout::{level01, placeholder_models, BlockLayout};
    use crate::game::piston::Piston;
    use crate::input::queue::Key;
    use crate::renderer::traits::recording::RecordingRenderer;
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    fn driver(layout: LevelLayout) -> GameDriver {
        let mut driver = GameDriver::new(GameConfig::default(), layout, placeholder_models().unwrap());
        driver.start().unwrap();
        driver
    }

    fn piston_states(driver: &GameDriver) -> Vec<bool> {
        driver.level().pistons().iter().map(Piston::is_enabled).collect()
    }

    #[test]
    fn nothing_runs_before_start() {
        let mut driver = GameDriver::new(GameConfig::default(), level01(), placeholder_models().unwrap());
        driver.push_input(InputEvent::KeyDown(Key::Jump));
        assert_eq!(driver.frame(DT).unwrap(), 0);
        assert!(!driver.level().is_loaded());
        assert!(!driver.is_running());
    }

    #[test]
    fn steps_follow_elapsed_time() {
        let mut driver = driver(level01());
        assert_eq!(driver.frame(DT).unwrap(), 1);
        assert_eq!(driver.frame(DT * 0.5).unwrap(), 0);
        assert_eq!(driver.frame(DT * 0.5 + 1e-4).unwrap(), 1);
        assert_eq!(driver.frame(DT * 3.0 + 1e-4).unwrap(), 3);
        // Long stalls are capped.
        let steps = driver.frame(5.0).unwrap();
        assert!((9..=10).contains(&steps));
    }

    #[test]
    fn toggle_edge_survives_a_short_frame_and_applies_once() {
        let mut driver = driver(level01());
        let before = piston_states(&driver);

        driver.push_input(InputEvent::KeyDown(Key::Toggle));
        assert_eq!(driver.frame(DT * 0.25).unwrap(), 0);
        assert_eq!(piston_states(&driver), before);

        assert_eq!(driver.frame(DT * 4.0).unwrap(), 4);
        let flipped: Vec<bool> = before.iter().map(|e| !e).collect();
        assert_eq!(piston_states(&driver), flipped);

        // Holding the key does not toggle again.
        driver.push_input(InputEvent::KeyDown(Key::Toggle));
        driver.frame(DT).unwrap();
        assert_eq!(piston_states(&driver), flipped);
    }

    #[test]
    fn mouse_motion_orbits_the_camera() {
        let mut driver = driver(level01());
        let angle = driver.level().ctx.camera.angle();
        driver.push_input(InputEvent::MouseMotion { dx: -100.0, dy: 0.0 });
        driver.frame(DT).unwrap();
        let sensitivity = driver.level().ctx.config.camera.sensitivity;
        assert!((driver.level().ctx.camera.angle() - (angle + 100.0 * sensitivity)).abs() < 1e-4);

        // Consumed: the next frame leaves the camera alone.
        let angle = driver.level().ctx.camera.angle();
        driver.frame(DT).unwrap();
        assert_eq!(driver.level().ctx.camera.angle(), angle);
    }

    #[test]
    fn death_reloads_the_level() {
        let start = Vec3::new(0.0, 2.0, 0.0);
        let mut driver = driver(LevelLayout {
            player_start: start,
            ..LevelLayout::default()
        });
        for _ in 0..200 {
            driver.frame(DT).unwrap();
            if driver.deaths() > 0 {
                break;
            }
        }
        assert_eq!(driver.deaths(), 1);
        let level = driver.level();
        assert!(level.is_loaded());
        assert!(!level.died());
        assert!(level.player().unwrap().position().abs_diff_eq(start, 1e-6));
    }

    #[test]
    fn render_submits_the_level() {
        let mut driver = driver(LevelLayout {
            blocks: vec![BlockLayout {
                position: Vec3::new(0.0, -0.5, 0.0),
                half_extents: Vec3::new(5.0, 0.5, 5.0),
            }],
            coins: vec![Vec3::new(1.0, 0.5, 0.0)],
            ..LevelLayout::default()
        });
        driver.frame(DT).unwrap();

        let mut renderer = RecordingRenderer::default();
        let shaders = ShaderLibrary::builtin(&mut renderer);
        driver.render(&mut renderer, &shaders);

        // Block, coin and the player.
        assert_eq!(driver.draws().len(), 3);
        assert_eq!(renderer.draws(), 3);
        assert_eq!(renderer.uniforms("animFac").len(), 1);
    }
}
