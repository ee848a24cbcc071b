//! Phase 4: particle contact forces.
//!
//! Contact model (per overlapping pair, seen from particle `i`):
//! - spring: `-spring * (D - d) * n`, `n` the unit vector from `i` towards `j`
//! - damping: `damping * (v_j - v_i)`
//! - tangential: `tangential * (v_rel - (v_rel . n) n)`
//!
//! Forces are not paired: each particle sums what it sees from its own
//! neighbourhood, and its partner does the same independently.

use crate::grid::SpatialGrid;
use crate::params::SimulationParams;
use crate::particle::ParticleBuffers;
use glam::Vec3;
use rayon::prelude::*;

/// Force on a particle at `pos_i` from an overlapping particle at `pos_j`.
///
/// Zero once the centres are a full diameter apart. Coincident centres are
/// not guarded and produce a non-finite force.
#[inline]
pub fn collision_reaction(
    params: &SimulationParams,
    pos_j: Vec3,
    vel_j: Vec3,
    pos_i: Vec3,
    vel_i: Vec3,
) -> Vec3 {
    let relative_position = pos_j - pos_i;
    let distance = relative_position.length();
    if distance >= params.particle_diameter {
        return Vec3::ZERO;
    }
    let n = relative_position / distance;

    let repulsive = -params.spring_coefficient * (params.particle_diameter - distance) * n;

    let relative_velocity = vel_j - vel_i;
    let damping = params.damping_coefficient * relative_velocity;

    let tangential_velocity = relative_velocity - relative_velocity.dot(n) * n;
    let tangential = params.tangential_coefficient * tangential_velocity;

    repulsive + damping + tangential
}

/// Reaction against the ground: a motionless particle directly below
/// `pos_i` with its centre at `y = -D/2`, so the ground surface is `y = 0`.
#[inline]
pub fn ground_reaction(params: &SimulationParams, pos_i: Vec3, vel_i: Vec3) -> Vec3 {
    let ground = Vec3::new(pos_i.x, -params.particle_diameter * 0.5, pos_i.z);
    collision_reaction(params, ground, Vec3::ZERO, pos_i, vel_i)
}

/// Net force on particle `i`: neighbours in the 27-cell stencil, gravity and
/// the ground.
pub fn particle_force(
    params: &SimulationParams,
    grid: &SpatialGrid,
    position: &[Vec3],
    velocity: &[Vec3],
    i: usize,
) -> Vec3 {
    let pos_i = position[i];
    let vel_i = velocity[i];
    let mut force = Vec3::ZERO;

    grid.for_each_neighbor(pos_i, |j| {
        if j != i {
            force += collision_reaction(params, position[j], velocity[j], pos_i, vel_i);
        }
    });

    force.y -= params.gravity_coefficient;
    force += ground_reaction(params, pos_i, vel_i);
    force
}

/// Overwrite every particle's force for this step.
pub fn solve_collisions(params: &SimulationParams, grid: &SpatialGrid, particles: &mut ParticleBuffers) {
    let ParticleBuffers {
        position,
        velocity,
        force,
        ..
    } = particles;
    let position: &[Vec3] = position;
    let velocity: &[Vec3] = velocity;

    force.par_iter_mut().enumerate().for_each(|(i, f)| {
        *f = particle_force(params, grid, position, velocity, i);
    });
}
