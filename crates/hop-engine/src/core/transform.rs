// core/transform.rs
//
// Position / rotation / scale shared by everything that is simulated or drawn.
// Composition lives here once; meshes, bodies and particles all go through it.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation and non-uniform scale of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Unit quaternion. Kept normalized by every composing operation.
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// Decompose an affine matrix (e.g. an imported node's accumulated transform).
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    // -- Builder pattern --

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    // -- Mutation --

    /// Add `delta` to the position.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Multiply the scale per axis.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    /// Compose `q` in local space (`rotation = rotation * q`), then renormalize.
    pub fn rotate(&mut self, q: Quat) {
        self.rotation = (self.rotation * q).normalize();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    // -- Queries --

    /// translate ∘ rotate ∘ scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a point from this object's local space into world space.
    pub fn local_to_world_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// Forward axis (+Z) in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Layer `self` (an owner's transform) onto a baked ancestor transform.
    ///
    /// Positions add, rotations multiply (owner first), scales multiply per axis.
    /// The ancestor is never replaced, only offset.
    pub fn compose_onto(&self, ancestor: &Transform) -> Transform {
        Transform {
            position: self.position + ancestor.position,
            rotation: (self.rotation * ancestor.rotation).normalize(),
            scale: self.scale * ancestor.scale,
        }
    }
}

/// Componentwise `a * (1 - t) + b * t`. Exact at both `t = 0` and `t = 1`.
pub fn mix_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}
