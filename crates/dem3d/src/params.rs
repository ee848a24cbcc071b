//! Simulation parameters, read-only for the duration of a step.

use crate::constants::*;
use crate::error::ConfigError;
use crate::layout::ParticleLayout;
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable configuration handed to every phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Time step (s)
    pub dt: f32,
    /// Mass of one particle; a body weighs `particle_mass * particles_per_body`
    pub particle_mass: f32,
    /// Contact distance between particle centres, also the grid cell edge
    pub particle_diameter: f32,
    /// World position of the grid's minimum corner
    pub grid_origin: Vec3,
    /// Cells along X, Y, Z
    pub grid_dims: [u32; 3],
    /// Penalty stiffness; positive values push overlapping particles apart
    pub spring_coefficient: f32,
    pub damping_coefficient: f32,
    pub tangential_coefficient: f32,
    /// Per-particle force subtracted from Y
    pub gravity_coefficient: f32,
    pub friction_coefficient: f32,
    pub angular_friction_coefficient: f32,
    pub linear_force_scalar: f32,
    pub angular_force_scalar: f32,
    pub particles_per_body: u32,
    /// Body-frame inertia tensor. Only read when `full_rotational_dynamics` is set.
    pub inertia_tensor: Mat3,
    pub inverse_inertia_tensor: Mat3,
    /// Velocities shorter than this are zeroed after the momentum update
    pub velocity_threshold: f32,
    /// Scale torque by the world-space inverse inertia tensor. When off, raw
    /// torque is added to angular velocity.
    pub full_rotational_dynamics: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            particle_mass: DEFAULT_PARTICLE_MASS,
            particle_diameter: DEFAULT_PARTICLE_DIAMETER,
            grid_origin: Vec3::new(-32.0, -1.0, -32.0),
            grid_dims: [64, 32, 64],
            spring_coefficient: DEFAULT_SPRING_COEFFICIENT,
            damping_coefficient: DEFAULT_DAMPING_COEFFICIENT,
            tangential_coefficient: DEFAULT_TANGENTIAL_COEFFICIENT,
            gravity_coefficient: DEFAULT_GRAVITY_COEFFICIENT,
            friction_coefficient: DEFAULT_FRICTION_COEFFICIENT,
            angular_friction_coefficient: DEFAULT_ANGULAR_FRICTION_COEFFICIENT,
            linear_force_scalar: 1.0,
            angular_force_scalar: 1.0,
            particles_per_body: 8,
            inertia_tensor: Mat3::IDENTITY,
            inverse_inertia_tensor: Mat3::IDENTITY,
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            full_rotational_dynamics: false,
        }
    }
}

impl SimulationParams {
    /// Copy per-body quantities (particle count, diameter, mass, inertia) from a layout.
    pub fn for_layout(mut self, layout: &ParticleLayout) -> Self {
        self.particles_per_body = layout.len() as u32;
        self.particle_diameter = layout.particle_diameter;
        self.particle_mass = layout.particle_mass;
        self.inertia_tensor = layout.inertia_local;
        self.inverse_inertia_tensor = layout.inertia_inv_local;
        self
    }

    /// Total number of grid cells.
    pub fn cell_count(&self) -> usize {
        self.grid_dims.iter().map(|&d| d as usize).product()
    }

    /// Mass of one rigid body.
    pub fn body_mass(&self) -> f32 {
        self.particle_mass * self.particles_per_body as f32
    }

    /// World-space extent of the grid.
    pub fn grid_extent(&self) -> Vec3 {
        Vec3::new(
            self.grid_dims[0] as f32,
            self.grid_dims[1] as f32,
            self.grid_dims[2] as f32,
        ) * self.particle_diameter
    }

    /// Check every invariant the hot path relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("dt", self.dt)?;
        positive("particle_mass", self.particle_mass)?;
        positive("particle_diameter", self.particle_diameter)?;
        non_negative("friction_coefficient", self.friction_coefficient)?;
        non_negative(
            "angular_friction_coefficient",
            self.angular_friction_coefficient,
        )?;
        non_negative("velocity_threshold", self.velocity_threshold)?;

        for (name, value) in [
            ("spring_coefficient", self.spring_coefficient),
            ("damping_coefficient", self.damping_coefficient),
            ("tangential_coefficient", self.tangential_coefficient),
            ("gravity_coefficient", self.gravity_coefficient),
            ("linear_force_scalar", self.linear_force_scalar),
            ("angular_force_scalar", self.angular_force_scalar),
        ] {
            finite(name, value)?;
        }
        for (name, value) in [
            ("grid_origin.x", self.grid_origin.x),
            ("grid_origin.y", self.grid_origin.y),
            ("grid_origin.z", self.grid_origin.z),
        ] {
            finite(name, value)?;
        }
        for (name, m) in [
            ("inertia_tensor", self.inertia_tensor),
            ("inverse_inertia_tensor", self.inverse_inertia_tensor),
        ] {
            if !m.is_finite() {
                return Err(ConfigError::InvalidParameter {
                    name,
                    value: f32::NAN,
                    reason: "matrix entries must be finite",
                });
            }
        }

        if self.grid_dims.iter().any(|&d| d == 0) {
            return Err(ConfigError::EmptyGrid {
                dims: self.grid_dims,
            });
        }
        let cells: u64 = self.grid_dims.iter().map(|&d| d as u64).product();
        if cells > i32::MAX as u64 {
            return Err(ConfigError::GridTooLarge { cells });
        }

        if self.particles_per_body == 0 {
            return Err(ConfigError::NoParticlesPerBody);
        }
        Ok(())
    }

    /// Validate that `body_count` bodies fit the grid's slot index type.
    pub fn validate_body_count(&self, body_count: usize) -> Result<(), ConfigError> {
        let count = body_count.saturating_mul(self.particles_per_body as usize);
        if count > i32::MAX as usize {
            return Err(ConfigError::TooManyParticles { count });
        }
        Ok(())
    }

    /// Parse and validate parameters from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save parameters to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

pub(crate) fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be positive",
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must not be negative",
        })
    }
}
