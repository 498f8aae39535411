pub mod library;
pub mod primitives;
pub mod scene;
