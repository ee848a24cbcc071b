//! Configuration errors.
//!
//! The per-step pipeline never fails; everything that can go wrong is caught
//! once when parameters, layouts or snapshots are handed to the simulation.

/// Error returned when a simulation cannot be configured.
#[derive(Debug)]
pub enum ConfigError {
    /// A scalar parameter is NaN/infinite or outside its allowed range.
    InvalidParameter {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
    /// One of the grid dimensions is zero.
    EmptyGrid { dims: [u32; 3] },
    /// The grid has more cells than can be addressed.
    GridTooLarge { cells: u64 },
    /// `particles_per_body` is zero.
    NoParticlesPerBody,
    /// The particle layout does not match `particles_per_body`.
    LayoutMismatch { expected: usize, actual: usize },
    /// Total particle count does not fit an `i32` grid slot.
    TooManyParticles { count: usize },
    /// A body handed to the simulation has non-finite state or a degenerate
    /// orientation.
    InvalidBody { index: usize, reason: &'static str },
    /// Reading or writing a parameter/state file failed.
    Io(std::io::Error),
    /// Parameter/state JSON could not be parsed or produced.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter {
                name,
                value,
                reason,
            } => write!(f, "invalid parameter `{}` = {}: {}", name, value, reason),
            ConfigError::EmptyGrid { dims } => write!(
                f,
                "grid dimensions must be non-zero, got {}x{}x{}",
                dims[0], dims[1], dims[2]
            ),
            ConfigError::GridTooLarge { cells } => {
                write!(f, "grid has {} cells, more than can be indexed", cells)
            }
            ConfigError::NoParticlesPerBody => write!(f, "particles_per_body must be at least 1"),
            ConfigError::LayoutMismatch { expected, actual } => write!(
                f,
                "particle layout has {} particles but particles_per_body is {}",
                actual, expected
            ),
            ConfigError::TooManyParticles { count } => {
                write!(f, "{} particles exceed the grid slot index range", count)
            }
            ConfigError::InvalidBody { index, reason } => {
                write!(f, "invalid body {}: {}", index, reason)
            }
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_names_parameter() {
        let err = ConfigError::InvalidParameter {
            name: "dt",
            value: -1.0,
            reason: "must be positive",
        };
        let msg = err.to_string();
        assert!(msg.contains("dt"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_layout_mismatch_message() {
        let err = ConfigError::LayoutMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "particle layout has 4 particles but particles_per_body is 8"
        );
    }

    #[test]
    fn test_json_source_preserved() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = ConfigError::from(json_err);
        assert!(err.source().is_some());
    }
}
