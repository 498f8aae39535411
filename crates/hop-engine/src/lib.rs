pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod input;
pub mod assets;
pub mod game;

// Re-export key types at crate root for convenience
pub use api::game::{palette, CameraConfig, GameConfig, PlayerConfig, SimContext};
pub use api::types::EntityId;
pub use assets::library::ModelLibrary;
pub use assets::scene::{AssetError, ImportedMesh, ImportedScene, MemoryImporter, SceneImporter, SceneNode};
pub use components::animation::{Animation, LoopMode, Transport};
pub use components::body::{BodyBinding, BodyTag};
pub use components::entity::GameObject;
pub use components::mesh::{MeshData, MeshHierarchy, SubMesh};
pub use core::physics::{
    BodyDesc, BodyType, ColliderShape, PhysicsBody, PhysicsError, PhysicsErrorKind, PhysicsMaterial, PhysicsWorld,
};
pub use core::time::{FixedTimestep, GameClock};
pub use core::transform::Transform;
pub use game::coin::{Coin, CoinBoard};
pub use game::contact::{BodyRegistry, ContactRouter, StepOutcome};
pub use game::driver::GameDriver;
pub use game::layout::{level01, placeholder_models, BlockLayout, LevelLayout, PropLayout};
pub use game::level::{Level, LevelError};
pub use game::piston::{Piston, PistonLayout, PistonPose};
pub use game::player::{Gait, Player};
pub use input::queue::{Controls, InputEvent, InputQueue, Intent, Key, KeyState};
pub use renderer::camera::OrbitCamera;
pub use renderer::frame::{DrawCommand, DrawList, FrameUniforms, MorphTarget};
pub use renderer::lighting::{LightSet, PointLight, Sun};
pub use renderer::shader::ShaderLibrary;
pub use renderer::traits::{GpuMeshHandle, ProgramId, Renderer, Uniform, Vertex};
pub use systems::dust::{DustParticle, DustSystem};
