use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::api::game::CameraConfig;

/// Perspective camera orbiting a target.
///
/// `angle` is the yaw around the target (0 looks down -Z from +Z), and
/// `inclination` the elevation; both wrap into [0, 2π).
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    angle: f32,
    inclination: f32,
    distance: f32,
    config: CameraConfig,
    aspect: f32,
    /// Eye offset from the target.
    offset: Vec3,
    target: Vec3,
    view: Mat4,
    forward: Vec3,
}

/// GPU-side uniform data for the camera.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub matrix: [[f32; 4]; 4],
}

impl OrbitCamera {
    pub const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 40.0;

    pub fn new(config: &CameraConfig, target: Vec3, angle: f32) -> Self {
        let mut camera = Self {
            angle: wrap(angle),
            inclination: wrap(config.inclination),
            distance: config.distance,
            config: config.clone(),
            aspect: config.aspect,
            offset: Vec3::ZERO,
            target,
            view: Mat4::IDENTITY,
            forward: Vec3::NEG_Z,
        };
        camera.follow(target);
        camera
    }

    // -- Orbit --

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = wrap(angle);
    }

    pub fn rotate(&mut self, amount: f32) {
        self.angle = wrap(self.angle + amount);
    }

    pub fn set_inclination(&mut self, inclination: f32) {
        self.inclination = wrap(inclination);
    }

    pub fn incline(&mut self, amount: f32) {
        self.inclination = wrap(self.inclination + amount);
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.config.min_distance, self.config.max_distance);
    }

    pub fn zoom(&mut self, amount: f32) {
        self.set_distance(self.distance + amount);
    }

    /// Apply accumulated mouse motion and wheel input.
    /// Elevation is kept inside the configured limits.
    pub fn look(&mut self, mouse: Vec2, wheel: f32) {
        let s = self.config.sensitivity;
        self.rotate(-mouse.x * s);
        let inclination = (self.inclination + mouse.y * s)
            .clamp(self.config.min_inclination, self.config.max_inclination);
        self.set_inclination(inclination);
        self.zoom(-wheel * self.config.zoom_step);
    }

    /// Re-aim at `target` with the current orbit parameters.
    pub fn follow(&mut self, target: Vec3) {
        let d = self.distance;
        self.target = target;
        self.offset = Vec3::new(
            d * self.angle.sin(),
            d * self.inclination.sin(),
            d * self.angle.cos(),
        );
        self.view = Mat4::look_at_rh(target + self.offset, target, Vec3::Y);
        self.forward = self.view.transform_vector3(Vec3::Z);
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    // -- Queries --

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn inclination(&self) -> f32 {
        self.inclination
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.target + self.offset
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(Self::FOV_Y, self.aspect, Self::NEAR, Self::FAR)
    }

    /// projection × view
    pub fn combined(&self) -> Mat4 {
        self.projection() * self.view
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            matrix: self.combined().to_cols_array_2d(),
        }
    }
}

fn wrap(angle: f32) -> f32 {
    angle.rem_euclid(TAU)
}
