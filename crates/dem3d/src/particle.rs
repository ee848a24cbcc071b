//! Per-particle buffers (structure of arrays).
//!
//! Particle `i` belongs to body `i / particles_per_body`. Everything except
//! `initial_relative_position` is rewritten every step.

use glam::Vec3;

#[derive(Clone, Debug, Default)]
pub struct ParticleBuffers {
    pub particles_per_body: usize,
    /// Body-frame offsets, fixed at setup.
    pub initial_relative_position: Vec<Vec3>,
    /// Offsets rotated into world orientation.
    pub relative_position: Vec<Vec3>,
    pub position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Net force from the last collision pass.
    pub force: Vec<Vec3>,
}

impl ParticleBuffers {
    /// Buffers for `body_count` bodies sharing one layout.
    pub fn new(layout: &[Vec3], body_count: usize) -> Self {
        let mut buffers = Self {
            particles_per_body: layout.len(),
            ..Default::default()
        };
        buffers.resize(layout, body_count);
        buffers
    }

    /// Resize to `body_count` bodies, refilling the initial offsets from `layout`.
    pub fn resize(&mut self, layout: &[Vec3], body_count: usize) {
        let count = layout.len() * body_count;
        self.particles_per_body = layout.len();
        self.initial_relative_position.clear();
        self.initial_relative_position.reserve(count);
        for _ in 0..body_count {
            self.initial_relative_position.extend_from_slice(layout);
        }
        self.relative_position.resize(count, Vec3::ZERO);
        self.position.resize(count, Vec3::ZERO);
        self.velocity.resize(count, Vec3::ZERO);
        self.force.resize(count, Vec3::ZERO);
    }

    /// Append one body's worth of particles.
    pub fn push_body(&mut self, layout: &[Vec3]) {
        debug_assert_eq!(layout.len(), self.particles_per_body);
        self.initial_relative_position.extend_from_slice(layout);
        let count = self.initial_relative_position.len();
        self.relative_position.resize(count, Vec3::ZERO);
        self.position.resize(count, Vec3::ZERO);
        self.velocity.resize(count, Vec3::ZERO);
        self.force.resize(count, Vec3::ZERO);
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.initial_relative_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initial_relative_position.is_empty()
    }

    /// Index of the body owning particle `i`.
    #[inline]
    pub fn body_of(&self, i: usize) -> usize {
        i / self.particles_per_body
    }

    /// Particle index range of body `b`.
    #[inline]
    pub fn body_range(&self, b: usize) -> std::ops::Range<usize> {
        let start = b * self.particles_per_body;
        start..start + self.particles_per_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_point_layout() -> Vec<Vec3> {
        vec![Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)]
    }

    #[test]
    fn test_buffers_sized_per_body() {
        let buffers = ParticleBuffers::new(&two_point_layout(), 3);
        assert_eq!(buffers.len(), 6);
        assert_eq!(buffers.position.len(), 6);
        assert_eq!(buffers.force.len(), 6);
        assert_eq!(buffers.initial_relative_position[4], Vec3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn test_body_of_and_range() {
        let buffers = ParticleBuffers::new(&two_point_layout(), 3);
        assert_eq!(buffers.body_of(0), 0);
        assert_eq!(buffers.body_of(3), 1);
        assert_eq!(buffers.body_of(5), 2);
        assert_eq!(buffers.body_range(2), 4..6);
    }

    #[test]
    fn test_push_body_and_shrink() {
        let mut buffers = ParticleBuffers::new(&two_point_layout(), 1);
        buffers.push_body(&two_point_layout());
        assert_eq!(buffers.len(), 4);
        buffers.resize(&two_point_layout(), 0);
        assert!(buffers.is_empty());
        assert!(buffers.velocity.is_empty());
    }
}
