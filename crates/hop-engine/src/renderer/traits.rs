//! Renderer collaborator contract.
//!
//! The engine never touches GPU state itself. It produces vertex data, world
//! matrices and uniform values; a backend implementing [`Renderer`] owns
//! buffers, programs and draw calls.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Interleaved mesh vertex as uploaded to the GPU.
/// 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Backend handle of an uploaded vertex/index buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuMeshHandle(pub u32);

/// Backend handle of a linked shader program. `ProgramId(0)` is "no program".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramId(pub u32);

/// Value for a named uniform (`"model"`, `"baseColor"`, `"animFac"`, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Mat4(Mat4),
    Vec3(Vec3),
    Vec4(Vec4),
    Float(f32),
    Int(i32),
}

/// GPU backend.
pub trait Renderer {
    /// Upload interleaved vertices and a triangle index list.
    fn upload_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> GpuMeshHandle;

    /// Compile and link a program. `Err` carries the compiler log.
    fn compile_program(&mut self, name: &str, vertex_src: &str, fragment_src: &str) -> Result<ProgramId, String>;

    fn bind_program(&mut self, program: ProgramId);

    fn set_uniform(&mut self, name: &str, value: Uniform);

    /// Draw `index_count` indices of an uploaded mesh with the bound program.
    fn draw(&mut self, mesh: GpuMeshHandle, index_count: u32);

    /// Draw `from` with `to` bound as the morph target (`"animFac"` blends
    /// between them). Both meshes must share a topology. Backends without
    /// morph support draw `from`.
    fn draw_morph(&mut self, from: GpuMeshHandle, to: GpuMeshHandle, index_count: u32) {
        let _ = to;
        self.draw(from, index_count);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), Vertex::STRIDE_BYTES);
        let verts = [Vertex {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            uv: [0.5, 0.25],
        }];
        let floats: &[f32] = bytemuck::cast_slice(&verts);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn default_program_is_null() {
        assert_eq!(ProgramId::default(), ProgramId(0));
    }
}
