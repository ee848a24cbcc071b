//! The per-step pipeline and the host-facing setup API.

use crate::body::RigidBody;
use crate::collision::solve_collisions;
use crate::error::ConfigError;
use crate::grid::{GridStats, SpatialGrid};
use crate::integrate::{integrate_momentum, integrate_pose, record_history};
use crate::layout::ParticleLayout;
use crate::params::SimulationParams;
use crate::particle::ParticleBuffers;
use crate::sampler::sample_particles;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One data-parallel pass of a step. Each phase completes before the next
/// starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    SampleParticles,
    ResetGrid,
    BuildGrid,
    SolveCollisions,
    IntegrateMomentum,
    IntegratePose,
    RecordHistory,
}

impl Phase {
    /// Execution order of a full step.
    pub const ALL: [Phase; 7] = [
        Phase::SampleParticles,
        Phase::ResetGrid,
        Phase::BuildGrid,
        Phase::SolveCollisions,
        Phase::IntegrateMomentum,
        Phase::IntegratePose,
        Phase::RecordHistory,
    ];
}

/// Rigid body array, the only state needed to resume a simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub bodies: Vec<RigidBody>,
}

impl SimulationState {
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Particle-based rigid body simulation.
///
/// Every body shares one particle layout. A step samples particles from the
/// body poses, bins them into the grid, accumulates contact forces per
/// particle and folds those back into body momentum and pose.
pub struct RigidBodySimulation {
    params: SimulationParams,
    layout: ParticleLayout,
    bodies: Vec<RigidBody>,
    particles: ParticleBuffers,
    grid: SpatialGrid,
    last_grid_stats: GridStats,
    /// Completed steps
    frame: u64,
}

impl RigidBodySimulation {
    /// Create an empty simulation. Fails if the parameters are invalid or the
    /// layout does not have `particles_per_body` particles.
    pub fn new(params: SimulationParams, layout: ParticleLayout) -> Result<Self, ConfigError> {
        params.validate()?;
        if layout.len() != params.particles_per_body as usize {
            return Err(ConfigError::LayoutMismatch {
                expected: params.particles_per_body as usize,
                actual: layout.len(),
            });
        }

        let grid = SpatialGrid::from_params(&params);
        let particles = ParticleBuffers::new(&layout.local_offsets, 0);
        log::info!(
            "Rigid body simulation: {:?} layout, {} particles/body, grid {:?} ({} cells) spanning {} from {}, dt {}",
            layout.shape,
            params.particles_per_body,
            params.grid_dims,
            grid.cell_count(),
            params.grid_extent(),
            params.grid_origin,
            params.dt
        );

        Ok(Self {
            params,
            layout,
            bodies: Vec::new(),
            particles,
            grid,
            last_grid_stats: GridStats::default(),
            frame: 0,
        })
    }

    /// Add a body and return its index.
    pub fn spawn_body(
        &mut self,
        position: Vec3,
        orientation: Quat,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> Result<usize, ConfigError> {
        let index = self.bodies.len();
        self.params.validate_body_count(index + 1)?;
        let body = RigidBody::new(position, orientation, linear_velocity, angular_velocity)
            .normalized()
            .map_err(|reason| ConfigError::InvalidBody { index, reason })?;
        self.bodies.push(body);
        self.particles.push_body(&self.layout.local_offsets);
        Ok(index)
    }

    /// Advance one time step.
    pub fn step(&mut self) {
        for phase in Phase::ALL {
            self.run_phase(phase);
        }
        self.frame += 1;
    }

    /// Run a single phase. Running [`Phase::ALL`] in order is one step,
    /// except that the frame counter is only advanced by [`Self::step`].
    pub fn run_phase(&mut self, phase: Phase) {
        log::trace!("frame {} phase {:?}", self.frame, phase);
        match phase {
            Phase::SampleParticles => {
                sample_particles(&self.params, &self.bodies, &mut self.particles)
            }
            Phase::ResetGrid => self.grid.reset(),
            Phase::BuildGrid => {
                let stats = self.grid.build(&self.particles.position);
                if !stats.is_complete() {
                    log::debug!(
                        "frame {}: {} particles binned, {} dropped from full cells, {} outside grid",
                        self.frame,
                        stats.inserted,
                        stats.overflowed,
                        stats.out_of_bounds
                    );
                }
                self.last_grid_stats = stats;
            }
            Phase::SolveCollisions => solve_collisions(&self.params, &self.grid, &mut self.particles),
            Phase::IntegrateMomentum => {
                integrate_momentum(&self.params, &mut self.bodies, &self.particles)
            }
            Phase::IntegratePose => integrate_pose(&self.params, &mut self.bodies),
            Phase::RecordHistory => record_history(&mut self.bodies),
        }
    }

    pub fn snapshot(&self) -> SimulationState {
        SimulationState {
            bodies: self.bodies.clone(),
        }
    }

    /// Replace the body array. Orientations are renormalised and non-finite
    /// bodies rejected. Particle buffers are resized to match and the grid is
    /// emptied; both are rebuilt by the next step.
    pub fn restore(&mut self, state: SimulationState) -> Result<(), ConfigError> {
        self.params.validate_body_count(state.bodies.len())?;
        let bodies = state
            .bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                body.normalized()
                    .map_err(|reason| ConfigError::InvalidBody { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.particles.resize(&self.layout.local_offsets, bodies.len());
        self.grid.reset();
        self.last_grid_stats = GridStats::default();
        self.bodies = bodies;
        Ok(())
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Mutable access for hosts that drive bodies directly (e.g. kinematic
    /// pushes between steps).
    pub fn bodies_mut(&mut self) -> &mut [RigidBody] {
        &mut self.bodies
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn particles(&self) -> &ParticleBuffers {
        &self.particles
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Counters from the most recent grid build.
    pub fn last_grid_stats(&self) -> GridStats {
        self.last_grid_stats
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
