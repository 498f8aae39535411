//! Directional sun (with its shadow-map matrix) and point lights.

use glam::{Mat4, Vec3};

use super::traits::{Renderer, Uniform};

/// Directional light casting the scene's shadows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sun {
    /// Direction the light travels (from the sun into the scene).
    pub direction: Vec3,
    pub color: Vec3,
    /// How far from the shadow focus the light-space eye is placed.
    pub distance: f32,
    /// Half width/height of the orthographic shadow volume.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
            color: Vec3::ONE,
            distance: 20.0,
            half_extent: 15.0,
            near: 0.1,
            far: 50.0,
        }
    }
}

impl Sun {
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction: direction.normalize_or(Vec3::NEG_Y),
            ..Self::default()
        }
    }

    /// Light-space eye position for a shadow volume centered on `focus`.
    pub fn position(&self, focus: Vec3) -> Vec3 {
        focus - self.direction * self.distance
    }

    /// Orthographic projection × view from the sun, centered on `focus`.
    pub fn matrix(&self, focus: Vec3) -> Mat4 {
        let up = if self.direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position(focus), focus, up);
        let h = self.half_extent;
        Mat4::orthographic_rh_gl(-h, h, -h, h, self.near, self.far) * view
    }

    /// Publish `"sunMatrix"`, `"sunPos"` and `"sunColor"`.
    pub fn apply(&self, renderer: &mut dyn Renderer, focus: Vec3) {
        renderer.set_uniform("sunMatrix", Uniform::Mat4(self.matrix(focus)));
        renderer.set_uniform("sunPos", Uniform::Vec3(self.position(focus)));
        renderer.set_uniform("sunColor", Uniform::Vec3(self.color));
    }
}

/// Omnidirectional light with linear falloff to `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            radius,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

/// Ambient colour plus the active point lights.
#[derive(Debug, Clone)]
pub struct LightSet {
    ambient: Vec3,
    lights: Vec<PointLight>,
}

impl LightSet {
    /// Uniform arrays hold this many lights; extra lights are not uploaded.
    pub const MAX_LIGHTS: usize = 16;

    pub fn new() -> Self {
        Self {
            ambient: Vec3::splat(0.3),
            lights: Vec::new(),
        }
    }

    /// Add a light and return its index.
    pub fn add(&mut self, light: PointLight) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PointLight> {
        self.lights.get_mut(index)
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter()
    }

    pub fn count(&self) -> usize {
        self.lights.len()
    }

    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    /// Publish `"ambient"`, `"lightCount"` and the `"lights[i].*"` array.
    pub fn apply(&self, renderer: &mut dyn Renderer) {
        let count = self.lights.len().min(Self::MAX_LIGHTS);
        if count < self.lights.len() {
            log::warn!("{} point lights, only {} uploaded", self.lights.len(), Self::MAX_LIGHTS);
        }
        renderer.set_uniform("ambient", Uniform::Vec3(self.ambient));
        renderer.set_uniform("lightCount", Uniform::Int(count as i32));
        for (i, light) in self.lights.iter().take(count).enumerate() {
            renderer.set_uniform(&format!("lights[{i}].position"), Uniform::Vec3(light.position));
            renderer.set_uniform(&format!("lights[{i}].color"), Uniform::Vec3(light.color * light.intensity));
            renderer.set_uniform(&format!("lights[{i}].radius"), Uniform::Float(light.radius));
        }
    }
}

impl Default for LightSet {
    fn default() -> Self {
        Self::new()
    }
}
