pub mod animation;
pub mod body;
pub mod entity;
pub mod mesh;
