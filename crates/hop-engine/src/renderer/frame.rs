//! Per-frame draw list.
//!
//! Gameplay code records what to draw; [`DrawList::submit`] turns it into
//! program binds, named uniforms and draw calls on a [`Renderer`].

use glam::{Mat4, Vec3, Vec4};

use super::lighting::{LightSet, Sun};
use super::shader::ShaderLibrary;
use super::traits::{GpuMeshHandle, Renderer, Uniform};

pub const LIT_PROGRAM: &str = "lit";
pub const MORPH_PROGRAM: &str = "morph";

/// Second mesh a morph-blended draw interpolates towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphTarget {
    pub mesh: GpuMeshHandle,
    /// `"animFac"`: 0 draws the base mesh, 1 the target.
    pub factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub mesh: GpuMeshHandle,
    pub index_count: u32,
    pub model: Mat4,
    pub color: Vec4,
    pub morph: Option<MorphTarget>,
}

/// Frame-wide values published once per bound program.
#[derive(Debug, Clone, Copy)]
pub struct FrameUniforms {
    /// projection × view
    pub matrix: Mat4,
    pub eye: Vec3,
    pub sun: Sun,
    /// Center of the shadow volume (usually the player).
    pub focus: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Draw everything: plain meshes with the lit program first, then
    /// morph-blended meshes with the morph program.
    pub fn submit(&self, renderer: &mut dyn Renderer, shaders: &ShaderLibrary, frame: &FrameUniforms, lights: &LightSet) {
        let (morphs, plain): (Vec<&DrawCommand>, Vec<&DrawCommand>) =
            self.commands.iter().partition(|c| c.morph.is_some());

        for (program, batch) in [(LIT_PROGRAM, plain), (MORPH_PROGRAM, morphs)] {
            if batch.is_empty() {
                continue;
            }
            shaders.bind(renderer, program);
            renderer.set_uniform("matrix", Uniform::Mat4(frame.matrix));
            renderer.set_uniform("eye", Uniform::Vec3(frame.eye));
            frame.sun.apply(renderer, frame.focus);
            lights.apply(renderer);

            for cmd in batch {
                renderer.set_uniform("model", Uniform::Mat4(cmd.model));
                renderer.set_uniform("baseColor", Uniform::Vec4(cmd.color));
                match cmd.morph {
                    Some(target) => {
                        renderer.set_uniform("animFac", Uniform::Float(target.factor));
                        renderer.draw_morph(cmd.mesh, target.mesh, cmd.index_count);
                    }
                    None => renderer.draw(cmd.mesh, cmd.index_count),
                }
            }
        }
    }
}
