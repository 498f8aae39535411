use glam::{Quat, Vec3};

use crate::api::types::EntityId;
use crate::core::physics::{BodyDesc, BodyType, PhysicsBody, PhysicsError, PhysicsMaterial, PhysicsWorld};
use crate::core::transform::Transform;

/// Semantic flags the contact router reads to decide what a collision means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyTag {
    pub player: bool,
    pub ground: bool,
    pub dynamic: bool,
    pub coin: bool,
    pub piston_trigger: bool,
}

impl BodyTag {
    pub fn player() -> Self {
        Self {
            player: true,
            dynamic: true,
            ..Self::default()
        }
    }

    /// Something the player can stand on.
    pub fn ground() -> Self {
        Self {
            ground: true,
            ..Self::default()
        }
    }

    /// Loose dynamic prop. Props are also walkable.
    pub fn prop() -> Self {
        Self {
            ground: true,
            dynamic: true,
            ..Self::default()
        }
    }

    pub fn coin() -> Self {
        Self {
            coin: true,
            ..Self::default()
        }
    }

    pub fn piston_trigger() -> Self {
        Self {
            piston_trigger: true,
            ..Self::default()
        }
    }
}

/// Physics Body Binding: one rigid body kept in step with an owner transform.
///
/// The body sits at `transform.position + collider_offset`; pulling the pose
/// back subtracts the offset again, so the owner transform always refers to
/// the logical origin.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyBinding {
    pub body: PhysicsBody,
    pub material: PhysicsMaterial,
    pub collider_offset: Vec3,
    pub tag: BodyTag,
}

impl BodyBinding {
    /// Create the rigid body at the owner's current pose.
    pub fn create(
        physics: &mut PhysicsWorld,
        owner: EntityId,
        transform: &Transform,
        desc: BodyDesc,
        tag: BodyTag,
    ) -> Result<Self, PhysicsError> {
        let desc = desc
            .with_position(transform.position)
            .with_rotation(transform.rotation);
        let body = physics.create_body(owner, &desc)?;
        Ok(Self {
            body,
            material: desc.material,
            collider_offset: desc.collider_offset,
            tag,
        })
    }

    pub fn is_dynamic(&self) -> bool {
        self.body.body_type == BodyType::Dynamic
    }

    /// Pull the simulated pose into `transform` (dynamic bodies only).
    /// Returns whether the transform changed.
    pub fn pull_pose(&self, physics: &PhysicsWorld, transform: &mut Transform) -> Result<bool, PhysicsError> {
        if !self.is_dynamic() {
            return Ok(false);
        }
        let (position, rotation) = physics.body_pose(&self.body)?;
        transform.position = position - self.collider_offset;
        transform.rotation = rotation;
        Ok(true)
    }

    /// Push `transform` onto the body (kinematic nudge for static bodies and
    /// triggers whose pose is driven by game logic).
    pub fn push_pose(&self, physics: &mut PhysicsWorld, transform: &Transform) -> Result<(), PhysicsError> {
        physics.set_pose(&self.body, transform.position + self.collider_offset, transform.rotation)
    }

    /// Move the owner and the body together.
    pub fn translate(&self, physics: &mut PhysicsWorld, transform: &mut Transform, delta: Vec3) -> Result<(), PhysicsError> {
        transform.translate(delta);
        self.push_pose(physics, transform)
    }

    /// Rotate the owner and the body together.
    pub fn rotate(&self, physics: &mut PhysicsWorld, transform: &mut Transform, q: Quat) -> Result<(), PhysicsError> {
        transform.rotate(q);
        self.push_pose(physics, transform)
    }

    /// World-space center of the collider.
    pub fn collider_center(&self, physics: &PhysicsWorld) -> Result<Vec3, PhysicsError> {
        Ok(physics.body_pose(&self.body)?.0)
    }

    /// Remove the body from the simulation.
    pub fn destroy(self, physics: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        physics.remove_body(&self.body)
    }
}
