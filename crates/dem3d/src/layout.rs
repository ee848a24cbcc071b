//! Particle layouts: the fixed local-frame sample points of a rigid body.
//!
//! A layout is generated once at setup and becomes the immutable
//! `initial_relative_position` buffer of every body that uses it. Neighbouring
//! particles are spaced at least one particle diameter apart so particles of
//! the same body never overlap at rest.

use crate::error::ConfigError;
use crate::params::positive;
use glam::{Mat3, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutShape {
    /// 2x2x2 cube, eight particles at `±D/2`.
    Cube2,
    /// Hollow cube lattice with `per_edge` particles along each edge.
    CubeShell { per_edge: u32 },
    Tetra,
    Rod { count: u32 },
    Irregular { count: u32, seed: u64 },
}

/// Local particle offsets of one rigid body plus its mass properties.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticleLayout {
    pub shape: LayoutShape,
    pub local_offsets: Vec<Vec3>,
    pub particle_diameter: f32,
    pub particle_mass: f32,
    pub mass: f32,
    pub inertia_local: Mat3,
    pub inertia_inv_local: Mat3,
    pub bounding_radius: f32,
}

impl ParticleLayout {
    /// Build the offsets for `shape`. Fails unless the diameter and mass are
    /// finite and positive.
    pub fn generate(
        shape: LayoutShape,
        particle_diameter: f32,
        particle_mass: f32,
    ) -> Result<Self, ConfigError> {
        positive("particle_diameter", particle_diameter)?;
        positive("particle_mass", particle_mass)?;

        let spacing = particle_diameter;
        let mut local_offsets = match shape {
            LayoutShape::Cube2 => cube_shell_offsets(2, spacing),
            LayoutShape::CubeShell { per_edge } => cube_shell_offsets(per_edge.max(1), spacing),
            LayoutShape::Tetra => {
                // Edge length of the regular tetrahedron equals `spacing`.
                let s = spacing / (2.0 * std::f32::consts::SQRT_2);
                vec![
                    Vec3::new(1.0, 1.0, 1.0) * s,
                    Vec3::new(-1.0, -1.0, 1.0) * s,
                    Vec3::new(-1.0, 1.0, -1.0) * s,
                    Vec3::new(1.0, -1.0, -1.0) * s,
                ]
            }
            LayoutShape::Rod { count } => (0..count.max(1))
                .map(|i| Vec3::new(i as f32 * spacing, 0.0, 0.0))
                .collect(),
            LayoutShape::Irregular { count, seed } => {
                generate_irregular_offsets(count.max(1) as usize, spacing, seed)
            }
        };

        center_on_com(&mut local_offsets);

        let mass = particle_mass * local_offsets.len() as f32;
        let (inertia_local, inertia_inv_local) =
            compute_inertia(&local_offsets, particle_mass, particle_diameter * 0.5);
        let bounding_radius = local_offsets
            .iter()
            .map(|r| r.length())
            .fold(0.0_f32, f32::max)
            + particle_diameter * 0.5;

        Ok(Self {
            shape,
            local_offsets,
            particle_diameter,
            particle_mass,
            mass,
            inertia_local,
            inertia_inv_local,
            bounding_radius,
        })
    }

    /// Number of particles attached to each body using this layout.
    pub fn len(&self) -> usize {
        self.local_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_offsets.is_empty()
    }
}

/// Surface particles of an `n x n x n` lattice, `n^3 - (n-2)^3` of them.
fn cube_shell_offsets(n: u32, spacing: f32) -> Vec<Vec3> {
    let corner = -(n as f32) * spacing * 0.5 + spacing * 0.5;
    let interior = if n > 2 { (n - 2).pow(3) } else { 0 };
    let mut offsets = Vec::with_capacity((n.pow(3) - interior) as usize);
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let on_surface =
                    x == 0 || x == n - 1 || y == 0 || y == n - 1 || z == 0 || z == n - 1;
                if on_surface {
                    offsets.push(
                        Vec3::splat(corner) + Vec3::new(x as f32, y as f32, z as f32) * spacing,
                    );
                }
            }
        }
    }
    offsets
}

fn center_on_com(offsets: &mut [Vec3]) {
    if offsets.is_empty() {
        return;
    }
    let sum = offsets.iter().fold(Vec3::ZERO, |acc, v| acc + *v);
    let com = sum / offsets.len() as f32;
    for offset in offsets {
        *offset -= com;
    }
}

/// Point-mass inertia tensor about the centre of mass and its inverse.
///
/// Each particle also contributes a small isotropic term so collinear layouts
/// (rods) still have an invertible tensor.
fn compute_inertia(offsets: &[Vec3], particle_mass: f32, particle_radius: f32) -> (Mat3, Mat3) {
    let mut inertia = Mat3::ZERO;
    for r in offsets {
        let r2 = r.length_squared();
        let diag = Mat3::from_diagonal(Vec3::splat(r2));
        let outer = Mat3::from_cols(*r * r.x, *r * r.y, *r * r.z);
        inertia += (diag - outer) * particle_mass;
    }

    let sphere = (0.4 * particle_mass * particle_radius * particle_radius).max(1.0e-6);
    inertia += Mat3::from_diagonal(Vec3::splat(sphere * offsets.len().max(1) as f32));

    let inertia_inv = if inertia.determinant().abs() > 1.0e-12 {
        inertia.inverse()
    } else {
        Mat3::from_diagonal(Vec3::splat(1.0 / sphere))
    };

    (inertia, inertia_inv)
}

/// Random cloud with no two particles closer than `spacing`.
fn generate_irregular_offsets(count: usize, spacing: f32, seed: u64) -> Vec<Vec3> {
    const ATTEMPTS: usize = 256;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut spread = spacing * (count as f32).powf(1.0 / 3.0);
    let min_dist_sq = spacing * spacing;
    let mut offsets: Vec<Vec3> = Vec::with_capacity(count);

    while offsets.len() < count {
        let mut placed = false;
        for _ in 0..ATTEMPTS {
            let candidate = random_in_sphere(&mut rng) * spread;
            if offsets
                .iter()
                .all(|o| o.distance_squared(candidate) >= min_dist_sq)
            {
                offsets.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            // Too crowded, give the cloud more room.
            spread *= 1.1;
        }
    }
    offsets
}

fn random_in_sphere(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}
