use std::fmt;

use glam::{Quat, Vec3};
use rapier3d::na;
use rapier3d::prelude::*;

use crate::api::types::EntityId;

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam to nalgebra and back
// ---------------------------------------------------------------------------

fn vec3_to_na(v: Vec3) -> na::Vector3<f32> {
    na::Vector3::new(v.x, v.y, v.z)
}

fn na_to_vec3(v: &na::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn quat_to_na(q: Quat) -> na::UnitQuaternion<f32> {
    na::UnitQuaternion::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn na_to_quat(q: &na::UnitQuaternion<f32>) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

fn isometry(position: Vec3, rotation: Quat) -> na::Isometry3<f32> {
    na::Isometry3::from_parts(na::Translation3::from(vec3_to_na(position)), quat_to_na(rotation))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Category of a physics-layer failure. None of them are recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsErrorKind {
    Abort,
    Internal,
    OutOfMemory,
    InvalidOperation,
    InvalidParameter,
}

/// A physics error. These indicate a programming error in body or shape setup.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsError {
    pub kind: PhysicsErrorKind,
    pub message: String,
}

impl PhysicsError {
    pub fn new(kind: PhysicsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(PhysicsErrorKind::InvalidOperation, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(PhysicsErrorKind::InvalidParameter, message)
    }

    /// Process exit code for this error: -1 for engine failures,
    /// -2 for misuse (invalid operation / parameter).
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            PhysicsErrorKind::Abort
            | PhysicsErrorKind::Internal
            | PhysicsErrorKind::OutOfMemory => -1,
            PhysicsErrorKind::InvalidOperation | PhysicsErrorKind::InvalidParameter => -2,
        }
    }

    /// Log and terminate the process.
    pub fn terminate(self) -> ! {
        log::error!("physics error ({:?}): {}", self.kind, self.message);
        std::process::exit(self.exit_code())
    }
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PhysicsError {}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Simulated: gravity, forces and contacts move it.
    Dynamic,
    /// Never simulated; its pose only changes when pushed explicitly.
    Static,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Static => RigidBodyType::Fixed,
        }
    }
}

/// Shape description for a collider.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
    CapsuleY { half_height: f32, radius: f32 },
    /// Convex hull of supplied geometry (usually a collision mesh's vertices).
    ConvexHull { points: Vec<Vec3> },
    /// Infinite plane through the body origin.
    Plane { normal: Vec3 },
}

impl ColliderShape {
    fn build_collider(&self) -> Result<ColliderBuilder, PhysicsError> {
        match self {
            ColliderShape::Cuboid { half_extents } => {
                check_extents(*half_extents)?;
                Ok(ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z))
            }
            ColliderShape::Ball { radius } => {
                if *radius <= 0.0 {
                    return Err(PhysicsError::invalid_parameter(format!("ball radius {radius}")));
                }
                Ok(ColliderBuilder::ball(*radius))
            }
            ColliderShape::CapsuleY { half_height, radius } => {
                if *half_height < 0.0 || *radius <= 0.0 {
                    return Err(PhysicsError::invalid_parameter(format!(
                        "capsule half height {half_height}, radius {radius}"
                    )));
                }
                Ok(ColliderBuilder::capsule_y(*half_height, *radius))
            }
            ColliderShape::ConvexHull { points } => {
                check_hull(points)?;
                let points: Vec<Point<Real>> =
                    points.iter().map(|p| Point::new(p.x, p.y, p.z)).collect();
                ColliderBuilder::convex_hull(&points).ok_or_else(|| {
                    PhysicsError::invalid_parameter(format!(
                        "convex hull of {} points is degenerate",
                        points.len()
                    ))
                })
            }
            ColliderShape::Plane { normal } => na::Unit::try_new(vec3_to_na(*normal), 1.0e-6)
                .map(ColliderBuilder::halfspace)
                .ok_or_else(|| PhysicsError::invalid_parameter("plane normal is zero")),
        }
    }
}

/// A hull needs four finite points spanning a volume; parry panics on less.
fn check_hull(points: &[Vec3]) -> Result<(), PhysicsError> {
    const EPS: f32 = 1.0e-5;
    let degenerate = || {
        PhysicsError::invalid_parameter(format!("convex hull of {} points spans no volume", points.len()))
    };
    if points.len() < 4 || points.iter().any(|p| !p.is_finite()) {
        return Err(degenerate());
    }
    let origin = points[0];
    let edge = points
        .iter()
        .map(|p| *p - origin)
        .find(|d| d.length() > EPS)
        .ok_or_else(degenerate)?;
    let normal = points
        .iter()
        .map(|p| edge.cross(*p - origin))
        .find(|n| n.length() > EPS)
        .ok_or_else(degenerate)?
        .normalize();
    if points.iter().any(|p| normal.dot(*p - origin).abs() > EPS) {
        Ok(())
    } else {
        Err(degenerate())
    }
}

fn check_extents(half_extents: Vec3) -> Result<(), PhysicsError> {
    if half_extents.min_element() <= 0.0 || !half_extents.is_finite() {
        return Err(PhysicsError::invalid_parameter(format!(
            "box half extents {half_extents} must be positive"
        )));
    }
    Ok(())
}

/// Surface properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsMaterial {
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.1,
        }
    }
}

impl PhysicsMaterial {
    pub fn new(static_friction: f32, dynamic_friction: f32, restitution: f32) -> Self {
        Self {
            static_friction,
            dynamic_friction,
            restitution,
        }
    }
}

/// Builder for describing a rigid body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    /// Logical origin of the owning object.
    pub position: Vec3,
    pub rotation: Quat,
    pub shape: ColliderShape,
    /// Where the collider's center sits relative to the logical origin.
    pub collider_offset: Vec3,
    pub material: PhysicsMaterial,
    /// Overlap-only collider: reports trigger events, never pushes anything.
    pub trigger: bool,
    pub density: f32,
    pub angular_damping: f32,
    /// Allow rotation about Y only. Upright bodies never sleep.
    pub upright: bool,
    /// Emit a contact event every step the collider is touching something.
    pub report_contacts: bool,
}

impl BodyDesc {
    /// Density applied to every dynamic body unless overridden.
    pub const DEFAULT_DENSITY: f32 = 10.0;

    /// Create a dynamic body description with the given collider shape.
    pub fn dynamic(shape: ColliderShape) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            shape,
            collider_offset: Vec3::ZERO,
            material: PhysicsMaterial::default(),
            trigger: false,
            density: Self::DEFAULT_DENSITY,
            angular_damping: 0.5,
            upright: false,
            report_contacts: false,
        }
    }

    /// Create a static body description with the given collider shape.
    pub fn fixed(shape: ColliderShape) -> Self {
        Self {
            body_type: BodyType::Static,
            angular_damping: 0.0,
            ..Self::dynamic(shape)
        }
    }

    /// Create a static, overlap-only body.
    pub fn trigger(shape: ColliderShape) -> Self {
        Self {
            trigger: true,
            ..Self::fixed(shape)
        }
    }

    pub fn with_position(mut self, pos: Vec3) -> Self {
        self.position = pos;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_collider_offset(mut self, offset: Vec3) -> Self {
        self.collider_offset = offset;
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    pub fn with_upright(mut self, upright: bool) -> Self {
        self.upright = upright;
        self
    }

    pub fn with_contact_reports(mut self, enabled: bool) -> Self {
        self.report_contacts = enabled;
        self
    }
}

/// Handle pair referencing Rapier internals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
    pub body_type: BodyType,
}

/// Resolve a collider to the object that owns it, via its user-data slot.
/// Returns `None` for unknown colliders and for bodies already being torn down.
pub fn collider_owner(colliders: &ColliderSet, handle: ColliderHandle) -> Option<EntityId> {
    colliders
        .get(handle)
        .and_then(|collider| EntityId::from_user_data(collider.user_data))
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Wraps all Rapier3D boilerplate into a single struct.
pub struct PhysicsWorld {
    gravity: na::Vector3<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create a new physics world with the given gravity vector (Y up).
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: vec3_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Set the integration timestep.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn gravity(&self) -> Vec3 {
        na_to_vec3(&self.gravity)
    }

    /// Create a rigid body + collider for `owner` and return handles.
    ///
    /// The body is placed at `position + collider_offset`. The owner's id is
    /// written into both user-data slots for contact routing.
    pub fn create_body(&mut self, owner: EntityId, desc: &BodyDesc) -> Result<PhysicsBody, PhysicsError> {
        if owner.is_detached() {
            return Err(PhysicsError::invalid_parameter("reserved entity id"));
        }
        let collider = desc.shape.build_collider()?;

        let mut rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .position(isometry(desc.position + desc.collider_offset, desc.rotation))
            .user_data(owner.to_user_data());
        if desc.body_type == BodyType::Dynamic {
            rb = rb.angular_damping(desc.angular_damping);
            if desc.upright {
                rb = rb.enabled_rotations(false, true, false).can_sleep(false);
            }
        }
        let body_handle = self.bodies.insert(rb.build());

        let mut events = ActiveEvents::COLLISION_EVENTS;
        if desc.report_contacts {
            events |= ActiveEvents::CONTACT_FORCE_EVENTS;
        }
        let collider = collider
            .friction(desc.material.dynamic_friction)
            .restitution(desc.material.restitution)
            .density(desc.density)
            .sensor(desc.trigger)
            .active_events(events)
            .contact_force_event_threshold(0.0)
            .user_data(owner.to_user_data())
            .build();

        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        if desc.body_type == BodyType::Dynamic {
            if let Some(rb) = self.bodies.get_mut(body_handle) {
                rb.recompute_mass_properties_from_colliders(&self.colliders);
            }
        }

        Ok(PhysicsBody {
            body_handle,
            collider_handle,
            body_type: desc.body_type,
        })
    }

    /// Remove a body and its collider from the simulation.
    ///
    /// The user-data back-reference is cleared first so nothing can resolve
    /// the body to its old owner while it is being removed.
    pub fn remove_body(&mut self, body: &PhysicsBody) -> Result<(), PhysicsError> {
        let rb = self
            .bodies
            .get_mut(body.body_handle)
            .ok_or_else(|| PhysicsError::invalid_operation("remove of an unknown body"))?;
        rb.user_data = EntityId::DETACHED.to_user_data();
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.user_data = EntityId::DETACHED.to_user_data();
        }
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        Ok(())
    }

    /// Advance the simulation by one `dt`.
    ///
    /// `events` is invoked synchronously from inside the step. It only gets
    /// shared access to the body and collider sets, so it cannot mutate the
    /// simulation.
    pub fn step<H: EventHandler>(&mut self, events: &H) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            events,
        );
    }

    // -- Pose --

    /// Current world pose of the body (collider center, not logical origin).
    pub fn body_pose(&self, body: &PhysicsBody) -> Result<(Vec3, Quat), PhysicsError> {
        let rb = self.body(body)?;
        let iso = rb.position();
        Ok((na_to_vec3(&iso.translation.vector), na_to_quat(&iso.rotation)))
    }

    /// Teleport a body. Used for static bodies and triggers whose pose is
    /// driven by game logic rather than by the simulation.
    pub fn set_pose(&mut self, body: &PhysicsBody, position: Vec3, rotation: Quat) -> Result<(), PhysicsError> {
        let rb = self.body_mut(body)?;
        rb.set_position(isometry(position, rotation), true);
        Ok(())
    }

    // -- Shape --

    /// Replace a collider's box geometry in place (no body recreation).
    pub fn set_cuboid(&mut self, body: &PhysicsBody, half_extents: Vec3) -> Result<(), PhysicsError> {
        check_extents(half_extents)?;
        let collider = self
            .colliders
            .get_mut(body.collider_handle)
            .ok_or_else(|| PhysicsError::invalid_operation("shape change on an unknown collider"))?;
        collider.set_shape(SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z));
        Ok(())
    }

    /// Half extents of a box collider, `None` for other shapes or unknown colliders.
    pub fn cuboid_half_extents(&self, body: &PhysicsBody) -> Option<Vec3> {
        let collider = self.colliders.get(body.collider_handle)?;
        collider
            .shape()
            .as_cuboid()
            .map(|cuboid| na_to_vec3(&cuboid.half_extents))
    }

    pub fn is_trigger(&self, body: &PhysicsBody) -> bool {
        self.colliders
            .get(body.collider_handle)
            .is_some_and(|c| c.is_sensor())
    }

    // -- Dynamics --

    /// Apply a continuous force. Forces persist until [`clear_forces`](Self::clear_forces).
    pub fn apply_force(&mut self, body: &PhysicsBody, force: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(body)?.add_force(vec3_to_na(force), true);
        Ok(())
    }

    pub fn apply_torque(&mut self, body: &PhysicsBody, torque: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(body)?.add_torque(vec3_to_na(torque), true);
        Ok(())
    }

    /// Apply an instantaneous impulse.
    pub fn apply_impulse(&mut self, body: &PhysicsBody, impulse: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(body)?.apply_impulse(vec3_to_na(impulse), true);
        Ok(())
    }

    /// Drop all user forces and torques accumulated on a body.
    pub fn clear_forces(&mut self, body: &PhysicsBody) -> Result<(), PhysicsError> {
        let rb = self.body_mut(body)?;
        rb.reset_forces(false);
        rb.reset_torques(false);
        Ok(())
    }

    pub fn linear_velocity(&self, body: &PhysicsBody) -> Result<Vec3, PhysicsError> {
        Ok(na_to_vec3(self.body(body)?.linvel()))
    }

    pub fn set_linear_velocity(&mut self, body: &PhysicsBody, vel: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_linvel(vec3_to_na(vel), true);
        Ok(())
    }

    pub fn angular_velocity(&self, body: &PhysicsBody) -> Result<Vec3, PhysicsError> {
        Ok(na_to_vec3(self.body(body)?.angvel()))
    }

    pub fn set_angular_velocity(&mut self, body: &PhysicsBody, vel: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_angvel(vec3_to_na(vel), true);
        Ok(())
    }

    pub fn mass(&self, body: &PhysicsBody) -> Result<f32, PhysicsError> {
        Ok(self.body(body)?.mass())
    }

    /// Principal moments of inertia in the body's local frame.
    pub fn principal_inertia(&self, body: &PhysicsBody) -> Result<Vec3, PhysicsError> {
        let rb = self.body(body)?;
        Ok(na_to_vec3(&rb.mass_properties().local_mprops.principal_inertia()))
    }

    // -- Bookkeeping --

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, body: &PhysicsBody) -> bool {
        self.bodies.contains(body.body_handle)
    }

    /// Owner recorded in a body's user-data.
    pub fn owner_of(&self, body: &PhysicsBody) -> Option<EntityId> {
        collider_owner(&self.colliders, body.collider_handle)
    }

    // -- private helpers --

    fn body(&self, body: &PhysicsBody) -> Result<&RigidBody, PhysicsError> {
        self.bodies
            .get(body.body_handle)
            .ok_or_else(|| PhysicsError::invalid_operation("access to an unknown body"))
    }

    fn body_mut(&mut self, body: &PhysicsBody) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(body.body_handle)
            .ok_or_else(|| PhysicsError::invalid_operation("access to an unknown body"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
