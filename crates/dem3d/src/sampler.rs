//! Phase 1: derive world-space particle state from rigid body pose.

use crate::body::RigidBody;
use crate::params::SimulationParams;
use crate::particle::ParticleBuffers;
use rayon::prelude::*;

/// Rotate every body's local offsets and write particle position/velocity.
///
/// One work item per body; each writes only its own particle range.
pub fn sample_particles(
    params: &SimulationParams,
    bodies: &[RigidBody],
    particles: &mut ParticleBuffers,
) {
    let per_body = params.particles_per_body as usize;
    let ParticleBuffers {
        initial_relative_position,
        relative_position,
        position,
        velocity,
        ..
    } = particles;

    bodies
        .par_iter()
        .zip(initial_relative_position.par_chunks(per_body))
        .zip(relative_position.par_chunks_mut(per_body))
        .zip(position.par_chunks_mut(per_body))
        .zip(velocity.par_chunks_mut(per_body))
        .for_each(|((((body, initial), relative), position), velocity)| {
            for k in 0..per_body {
                let r = body.rotate(initial[k]);
                relative[k] = r;
                position[k] = body.position + r;
                velocity[k] = body.point_velocity(r);
            }
        });
}
