//! Phases 5-7: particle forces to body velocities, velocities to pose, and
//! the previous-pose snapshot.

use crate::body::RigidBody;
use crate::params::SimulationParams;
use crate::particle::ParticleBuffers;
use glam::{Quat, Vec3};
use rayon::prelude::*;

/// Sum of particle forces and of their torques about the body centre.
pub fn aggregate_forces(forces: &[Vec3], relative_positions: &[Vec3]) -> (Vec3, Vec3) {
    forces
        .iter()
        .zip(relative_positions)
        .fold((Vec3::ZERO, Vec3::ZERO), |(force, torque), (f, r)| {
            (force + *f, torque + r.cross(*f))
        })
}

/// Zero vectors shorter than `threshold`.
#[inline]
fn snap_to_zero(v: Vec3, threshold: f32) -> Vec3 {
    if v.length() < threshold {
        Vec3::ZERO
    } else {
        v
    }
}

/// Update one body's velocities from its particles' forces.
///
/// Velocity decays first, then the impulse is added. Torque goes straight
/// into angular velocity unless `full_rotational_dynamics` is enabled.
pub fn integrate_body_momentum(
    params: &SimulationParams,
    body: &mut RigidBody,
    forces: &[Vec3],
    relative_positions: &[Vec3],
) {
    let dt = params.dt;
    let (force, torque) = aggregate_forces(forces, relative_positions);

    let linear = body.linear_velocity / (1.0 + dt * params.friction_coefficient)
        + params.linear_force_scalar * dt * force / params.body_mass();

    let torque = if params.full_rotational_dynamics {
        body.world_inertia_inv(params.inverse_inertia_tensor) * torque
    } else {
        torque
    };
    let angular = body.angular_velocity / (1.0 + dt * params.angular_friction_coefficient)
        + params.angular_force_scalar * dt * torque;

    body.linear_velocity = snap_to_zero(linear, params.velocity_threshold);
    body.angular_velocity = snap_to_zero(angular, params.velocity_threshold);
}

pub fn integrate_momentum(
    params: &SimulationParams,
    bodies: &mut [RigidBody],
    particles: &ParticleBuffers,
) {
    let per_body = params.particles_per_body as usize;
    bodies
        .par_iter_mut()
        .zip(particles.force.par_chunks(per_body))
        .zip(particles.relative_position.par_chunks(per_body))
        .for_each(|((body, forces), relative)| {
            integrate_body_momentum(params, body, forces, relative);
        });
}

/// First-order quaternion update `normalize(q + dt/2 * (w, 0) * q)`.
#[inline]
pub fn integrate_rotation(orientation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    let omega = Quat::from_xyzw(angular_velocity.x, angular_velocity.y, angular_velocity.z, 0.0);
    (orientation + omega * orientation * (0.5 * dt)).normalize()
}

pub fn integrate_pose(params: &SimulationParams, bodies: &mut [RigidBody]) {
    let dt = params.dt;
    bodies.par_iter_mut().for_each(|body| {
        body.position += body.linear_velocity * dt;
        body.orientation = integrate_rotation(body.orientation, body.angular_velocity, dt);
    });
}

pub fn record_history(bodies: &mut [RigidBody]) {
    bodies.par_iter_mut().for_each(|body| {
        body.previous_position = body.position;
        body.previous_orientation = body.orientation;
    });
}
