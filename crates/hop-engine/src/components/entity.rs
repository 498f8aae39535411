use glam::{Quat, Vec3, Vec4};

use crate::api::types::EntityId;
use crate::components::body::BodyBinding;
use crate::components::mesh::MeshHierarchy;
use crate::core::physics::{PhysicsError, PhysicsWorld};
use crate::core::transform::Transform;

/// Fat game object: one transform plus optional physics and mesh components.
/// The transform is the single source of truth both components sync through.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: EntityId,
    /// String tag for finding objects by name.
    pub tag: String,
    /// Inactive objects are neither updated nor drawn.
    pub active: bool,
    pub transform: Transform,
    pub color: Vec4,
    pub body: Option<BodyBinding>,
    pub mesh: Option<MeshHierarchy>,
}

impl GameObject {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tag: String::new(),
            active: true,
            transform: Transform::IDENTITY,
            color: Vec4::ONE,
            body: None,
            mesh: None,
        }
    }

    // -- Builder pattern --

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_body(mut self, body: BodyBinding) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a mesh and lay it out at the current transform.
    pub fn with_mesh(mut self, mut mesh: MeshHierarchy) -> Self {
        mesh.apply(&self.transform);
        self.mesh = Some(mesh);
        self
    }

    // -- Transform --

    /// Move by `delta`, dragging any body along.
    pub fn translate(&mut self, physics: &mut PhysicsWorld, delta: Vec3) -> Result<(), PhysicsError> {
        self.transform.translate(delta);
        self.after_external_move(physics)
    }

    /// Rotate by `q` in local space, dragging any body along.
    pub fn rotate(&mut self, physics: &mut PhysicsWorld, q: Quat) -> Result<(), PhysicsError> {
        self.transform.rotate(q);
        self.after_external_move(physics)
    }

    pub fn set_position(&mut self, physics: &mut PhysicsWorld, position: Vec3) -> Result<(), PhysicsError> {
        self.transform.set_position(position);
        self.after_external_move(physics)
    }

    pub fn set_rotation(&mut self, physics: &mut PhysicsWorld, rotation: Quat) -> Result<(), PhysicsError> {
        self.transform.set_rotation(rotation);
        self.after_external_move(physics)
    }

    /// Scale is visual only; collider geometry is unaffected.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.set_scale(scale);
        self.sync_mesh();
    }

    fn after_external_move(&mut self, physics: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        if let Some(body) = &self.body {
            body.push_pose(physics, &self.transform)?;
        }
        self.sync_mesh();
        Ok(())
    }

    // -- Per-step sync --

    /// Pull the body pose (dynamic bodies), then re-derive mesh matrices.
    pub fn update(&mut self, physics: &PhysicsWorld) -> Result<(), PhysicsError> {
        if let Some(body) = &self.body {
            body.pull_pose(physics, &mut self.transform)?;
        }
        self.sync_mesh();
        Ok(())
    }

    pub fn sync_mesh(&mut self) {
        if let Some(mesh) = &mut self.mesh {
            mesh.apply(&self.transform);
        }
    }

    /// Remove the body (if any) from the simulation.
    pub fn destroy(mut self, physics: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        match self.body.take() {
            Some(body) => body.destroy(physics),
            None => Ok(()),
        }
    }
}
