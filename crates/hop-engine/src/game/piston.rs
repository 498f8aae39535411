//! Piston hazards.
//!
//! A piston is a solid frame block plus a head whose overlap-only collider
//! kills the player. Toggling it animates the head box between a retracted
//! and an extended pose by resizing the live collider in place.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::api::game::{palette, SimContext};
use crate::components::animation::{Animation, LoopMode};
use crate::components::body::BodyTag;
use crate::components::entity::GameObject;
use crate::components::mesh::MeshHierarchy;
use crate::core::physics::{BodyDesc, ColliderShape, PhysicsError, PhysicsWorld};
use crate::core::transform::{mix_vec3, Transform};
use crate::renderer::lighting::{LightSet, PointLight};

/// Placement of one piston in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PistonLayout {
    /// Center of the frame block.
    pub position: Vec3,
    pub frame_half_extents: Vec3,
    /// Where the head is mounted, in the frame's local space.
    pub attachment: Vec3,
    /// Head travel from retracted to extended.
    pub extension: Vec3,
    pub head_half_extents: Vec3,
    pub enabled: bool,
}

impl Default for PistonLayout {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            frame_half_extents: Vec3::splat(0.5),
            attachment: Vec3::ZERO,
            extension: Vec3::new(0.0, 1.5, 0.0),
            head_half_extents: Vec3::splat(0.35),
            enabled: false,
        }
    }
}

/// Trigger box at one end of the travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PistonPose {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl PistonPose {
    pub fn mix(a: &PistonPose, b: &PistonPose, t: f32) -> PistonPose {
        PistonPose {
            center: mix_vec3(a.center, b.center, t),
            half_extents: mix_vec3(a.half_extents, b.half_extents, t),
        }
    }
}

const RETRACTED: usize = 0;
const EXTENDED: usize = 1;

pub struct Piston {
    pub frame: GameObject,
    /// Visual head and the kill trigger.
    pub head: GameObject,
    poses: [PistonPose; 2],
    enabled: bool,
    current: usize,
    next: usize,
    blend: Animation<f32>,
    light: Option<usize>,
}

impl Piston {
    pub const ENABLED_COLOR: Vec3 = Vec3::new(0.1, 1.0, 0.2);
    pub const DISABLED_COLOR: Vec3 = Vec3::new(1.0, 0.1, 0.1);
    /// Height of the status light above the fully extended head.
    pub const LIGHT_HEIGHT: f32 = 0.5;

    /// Build the frame and the head trigger. The trigger starts at the
    /// extended pose when the piston is enabled, retracted otherwise.
    ///
    /// `head_mesh` is expected to be a unit cube; it is scaled to the box.
    pub fn spawn(
        ctx: &mut SimContext,
        layout: &PistonLayout,
        frame_mesh: Option<MeshHierarchy>,
        head_mesh: Option<MeshHierarchy>,
    ) -> Result<Self, PhysicsError> {
        let frame_id = ctx.next_id();
        let frame_transform = Transform::from_position(layout.position);
        let frame_body = ctx.spawn_body(
            frame_id,
            &frame_transform,
            BodyDesc::fixed(ColliderShape::Cuboid {
                half_extents: layout.frame_half_extents,
            }),
            BodyTag::ground(),
        )?;
        let mut frame = GameObject::new(frame_id)
            .with_tag("piston_frame")
            .with_transform(frame_transform)
            .with_color(palette::PISTON)
            .with_body(frame_body);
        if let Some(mesh) = frame_mesh {
            frame = frame.with_mesh(mesh);
        }

        let anchor = frame.transform.local_to_world_point(layout.attachment);
        let poses = [
            PistonPose {
                center: anchor,
                half_extents: layout.head_half_extents,
            },
            PistonPose {
                center: anchor + layout.extension * 0.5,
                half_extents: layout.head_half_extents + layout.extension.abs() * 0.5,
            },
        ];
        let start = if layout.enabled { EXTENDED } else { RETRACTED };
        let pose = poses[start];

        let head_id = ctx.next_id();
        let head_transform = Transform::from_position(pose.center).with_scale(pose.half_extents * 2.0);
        let trigger = ctx.spawn_body(
            head_id,
            &head_transform,
            BodyDesc::trigger(ColliderShape::Cuboid {
                half_extents: pose.half_extents,
            }),
            BodyTag::piston_trigger(),
        )?;
        let mut head = GameObject::new(head_id)
            .with_tag("piston_head")
            .with_transform(head_transform)
            .with_color(palette::PISTON)
            .with_body(trigger);
        if let Some(mesh) = head_mesh {
            head = head.with_mesh(mesh);
        }

        Ok(Self {
            frame,
            head,
            poses,
            enabled: layout.enabled,
            current: start,
            next: start,
            blend: Animation::new(vec![0.0, 1.0], ctx.config.piston_transition, LoopMode::Stop),
            light: None,
        })
    }

    /// Flip the enabled state and animate towards the matching end.
    pub fn toggle(&mut self, now_ms: u64) {
        self.enabled = !self.enabled;
        (self.current, self.next) = if self.enabled {
            (RETRACTED, EXTENDED)
        } else {
            (EXTENDED, RETRACTED)
        };
        self.blend.start(now_ms);
    }

    /// While a transition runs, resize and move the trigger to the blended pose.
    pub fn update(&mut self, physics: &mut PhysicsWorld, now_ms: u64) -> Result<(), PhysicsError> {
        if !self.blend.is_playing() {
            return Ok(());
        }
        let Some(t) = self.blend.frame(now_ms) else {
            return Ok(());
        };
        let pose = PistonPose::mix(&self.poses[self.current], &self.poses[self.next], t);
        if let Some(body) = &self.head.body {
            physics.set_cuboid(&body.body, pose.half_extents)?;
        }
        self.head.set_position(physics, pose.center)?;
        self.head.set_scale(pose.half_extents * 2.0);
        Ok(())
    }

    // -- Status light --

    /// Register the status light above the extended head.
    pub fn attach_light(&mut self, lights: &mut LightSet) -> usize {
        let top = self.poses[EXTENDED].center + Vec3::Y * (self.poses[EXTENDED].half_extents.y + Self::LIGHT_HEIGHT);
        let index = lights.add(PointLight::new(top, self.light_color(), 1.0, 3.0));
        self.light = Some(index);
        index
    }

    pub fn light_color(&self) -> Vec3 {
        if self.enabled {
            Self::ENABLED_COLOR
        } else {
            Self::DISABLED_COLOR
        }
    }

    pub fn update_light(&self, lights: &mut LightSet) {
        if let Some(light) = self.light.and_then(|i| lights.get_mut(i)) {
            light.color = self.light_color();
        }
    }

    // -- Queries --

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_moving(&self) -> bool {
        self.blend.is_playing()
    }

    pub fn retracted(&self) -> PistonPose {
        self.poses[RETRACTED]
    }

    pub fn extended(&self) -> PistonPose {
        self.poses[EXTENDED]
    }
}
