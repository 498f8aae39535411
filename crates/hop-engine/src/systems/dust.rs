//! Dust particles kicked up by the player's feet.
//!
//! A burst on landing, a steady trickle while running on the ground.
//! Particles are purely visual and never touch the physics world.

use glam::{Mat4, Vec3};

use super::rng::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Edge length when freshly spawned.
    pub size: f32,
    pub lifetime: f32,
    pub age: f32,
}

impl DustParticle {
    pub const GRAVITY: f32 = 2.0;
    pub const DRAG: f32 = 3.0;

    /// Advance one step. Returns false when expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.age += dt;
        if self.age >= self.lifetime {
            return false;
        }
        self.velocity.y -= Self::GRAVITY * dt;
        self.velocity *= (1.0 - Self::DRAG * dt).max(0.0);
        self.position += self.velocity * dt;
        true
    }

    /// Current edge length; shrinks linearly to zero over the lifetime.
    pub fn current_size(&self) -> f32 {
        self.size * (1.0 - self.age / self.lifetime).max(0.0)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.current_size()),
            glam::Quat::IDENTITY,
            self.position,
        )
    }
}

/// Emitter state for the player's dust.
#[derive(Debug, Clone)]
pub struct DustSystem {
    particles: Vec<DustParticle>,
    rng: Rng,
    trickle_timer: f32,
    was_grounded: bool,
}

impl DustSystem {
    pub const LANDING_BURST: usize = 12;
    /// Seconds between trickle particles while running.
    pub const TRICKLE_INTERVAL: f32 = 0.08;
    pub const MAX_PARTICLES: usize = 256;

    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: Rng::new(seed),
            trickle_timer: 0.0,
            was_grounded: true,
        }
    }

    /// Spawn `count` particles spraying outward and up from `center`.
    pub fn burst(&mut self, center: Vec3, count: usize) {
        for _ in 0..count {
            let out = self.rng.heading() * self.rng.range(0.5, 1.5);
            let up = self.rng.range(0.2, 0.8);
            let size = self.rng.range(0.05, 0.12);
            let lifetime = self.rng.range(0.4, 0.8);
            self.spawn(DustParticle {
                position: center,
                velocity: Vec3::new(out.x, up, out.y),
                size,
                lifetime,
                age: 0.0,
            });
        }
    }

    fn spawn(&mut self, particle: DustParticle) {
        if self.particles.len() < Self::MAX_PARTICLES {
            self.particles.push(particle);
        }
    }

    /// Emit according to the player's state at `feet`, then age everything.
    pub fn update(&mut self, feet: Vec3, grounded: bool, running: bool, dt: f32) {
        if grounded && !self.was_grounded {
            self.burst(feet, Self::LANDING_BURST);
        }
        self.was_grounded = grounded;

        if grounded && running {
            self.trickle_timer += dt;
            while self.trickle_timer >= Self::TRICKLE_INTERVAL {
                self.trickle_timer -= Self::TRICKLE_INTERVAL;
                self.burst(feet, 1);
            }
        } else {
            self.trickle_timer = 0.0;
        }

        self.particles.retain_mut(|p| p.tick(dt));
    }

    pub fn particles(&self) -> &[DustParticle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.trickle_timer = 0.0;
        self.was_grounded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn particle_expires() {
        let mut p = DustParticle {
            position: Vec3::ZERO,
            velocity: Vec3::X,
            size: 0.1,
            lifetime: 0.1,
            age: 0.0,
        };
        assert!(p.tick(0.05));
        assert!(p.position.x > 0.0);
        assert!(p.current_size() < 0.1);
        assert!(!p.tick(0.06));
    }

    #[test]
    fn landing_spawns_a_burst_once() {
        let mut dust = DustSystem::new(1);
        dust.update(Vec3::ZERO, false, false, DT);
        assert!(dust.is_empty());
        dust.update(Vec3::ZERO, true, false, DT);
        assert_eq!(dust.len(), DustSystem::LANDING_BURST);
        dust.update(Vec3::ZERO, true, false, DT);
        assert_eq!(dust.len(), DustSystem::LANDING_BURST);
    }

    #[test]
    fn running_on_ground_trickles() {
        let mut dust = DustSystem::new(1);
        for _ in 0..12 {
            dust.update(Vec3::ZERO, true, true, DT);
        }
        // 0.2 s of running at one particle per 0.08 s
        assert_eq!(dust.len(), 2);

        let mut airborne = DustSystem::new(1);
        airborne.update(Vec3::ZERO, false, true, DT);
        for _ in 0..12 {
            airborne.update(Vec3::ZERO, false, true, DT);
        }
        assert!(airborne.is_empty());
    }

    #[test]
    fn everything_expires_eventually() {
        let mut dust = DustSystem::new(9);
        dust.burst(Vec3::ZERO, 20);
        for _ in 0..60 {
            dust.update(Vec3::ZERO, true, false, DT);
        }
        assert!(dust.is_empty());
    }

    #[test]
    fn burst_sprays_outward_and_up() {
        let mut dust = DustSystem::new(42);
        dust.burst(Vec3::new(1.0, 2.0, 3.0), 50);
        let mut headings = Vec::new();
        for p in dust.particles() {
            assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
            assert!((0.2..=0.8).contains(&p.velocity.y));
            let out = glam::Vec2::new(p.velocity.x, p.velocity.z).length();
            assert!((0.5 - 1e-4..=1.5 + 1e-4).contains(&out));
            assert!((0.05..=0.12).contains(&p.size));
            assert!((0.4..=0.8).contains(&p.lifetime));
            headings.push(p.velocity.x.signum());
        }
        // not all on one side
        assert!(headings.iter().any(|s| *s > 0.0) && headings.iter().any(|s| *s < 0.0));
    }

    #[test]
    fn particle_count_is_capped() {
        let mut dust = DustSystem::new(3);
        dust.burst(Vec3::ZERO, DustSystem::MAX_PARTICLES + 50);
        assert_eq!(dust.len(), DustSystem::MAX_PARTICLES);
    }
}
