pub mod camera;
pub mod frame;
pub mod lighting;
pub mod shader;
pub mod traits;

// Re-export key types for convenient access
pub use traits::{GpuMeshHandle, ProgramId, Renderer, Uniform, Vertex};
