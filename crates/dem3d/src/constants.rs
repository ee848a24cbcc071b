//! Constants shared by the solver phases.
//!
//! ## Coefficient Defaults
//!
//! The coefficient defaults assume unit particle diameter and unit particle
//! mass. They are tuned for `dt = 0.01`; stiffer springs need a smaller step.

// =============================================================================
// GRID
// =============================================================================

/// Marker stored in an unclaimed grid slot.
pub const EMPTY_SLOT: i32 = -1;

/// Number of particle slots per grid cell. A fifth insertion into a full cell
/// is dropped.
pub const CELL_CAPACITY: usize = 4;

/// Half-width of the neighborhood visited by the collision pass (1 = 3x3x3).
pub const STENCIL_RADIUS: i32 = 1;

// =============================================================================
// DEFAULT COEFFICIENTS
// =============================================================================

/// Default time step (s)
pub const DEFAULT_DT: f32 = 0.01;

/// Default particle diameter, also the grid cell edge length
pub const DEFAULT_PARTICLE_DIAMETER: f32 = 1.0;

/// Default mass of a single particle
pub const DEFAULT_PARTICLE_MASS: f32 = 1.0;

/// Penalty spring stiffness (positive pushes overlapping particles apart)
pub const DEFAULT_SPRING_COEFFICIENT: f32 = 500.0;

/// Contact damping on relative velocity
pub const DEFAULT_DAMPING_COEFFICIENT: f32 = 10.0;

/// Contact friction on tangential relative velocity
pub const DEFAULT_TANGENTIAL_COEFFICIENT: f32 = 2.0;

/// Per-particle gravity force, subtracted from the Y component
pub const DEFAULT_GRAVITY_COEFFICIENT: f32 = 9.8;

/// Linear velocity decay rate
pub const DEFAULT_FRICTION_COEFFICIENT: f32 = 0.9;

/// Angular velocity decay rate
pub const DEFAULT_ANGULAR_FRICTION_COEFFICIENT: f32 = 0.3;

/// Velocities shorter than this are snapped to zero after integration
pub const DEFAULT_VELOCITY_THRESHOLD: f32 = 1.0e-6;
