//! Particle-based 3D rigid body simulation
//!
//! Each rigid body is a cluster of particles at fixed offsets from its centre.
//! Every step the particles are sampled from the body poses, binned into a
//! uniform grid with four lock-free slots per cell, pushed apart by penalty
//! contact forces (spring, damping, tangential) and by a ground plane at
//! `y = 0`, and the summed forces and torques are integrated back into the
//! bodies.
//!
//! # Example
//!
//! ```
//! use dem3d::{LayoutShape, ParticleLayout, Quat, RigidBodySimulation, SimulationParams, Vec3};
//!
//! let layout = ParticleLayout::generate(LayoutShape::Cube2, 1.0, 1.0).unwrap();
//! let params = SimulationParams::default().for_layout(&layout);
//! let mut sim = RigidBodySimulation::new(params, layout).unwrap();
//!
//! sim.spawn_body(Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO)
//!     .unwrap();
//!
//! for _ in 0..10 {
//!     sim.step();
//! }
//! assert!(sim.bodies()[0].position.y < 3.0);
//! ```

pub mod body;
pub mod collision;
pub mod constants;
pub mod error;
pub mod grid;
pub mod integrate;
pub mod layout;
pub mod params;
pub mod particle;
pub mod sampler;
pub mod simulation;

pub use body::RigidBody;
pub use error::ConfigError;
pub use glam::{IVec3, Mat3, Quat, Vec3};
pub use grid::{GridCell, GridStats, Insertion, SpatialGrid};
pub use layout::{LayoutShape, ParticleLayout};
pub use params::SimulationParams;
pub use particle::ParticleBuffers;
pub use simulation::{Phase, RigidBodySimulation, SimulationState};
