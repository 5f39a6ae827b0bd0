//! Error types for grid setup and solver configuration.
//!
//! Numerical non-convergence is not an error: solvers report it through
//! [`SolveStats`](crate::diagnostics::SolveStats).

use thiserror::Error;

use crate::array::Size3;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("invalid grid resolution {0:?}: every axis needs at least one cell")]
    InvalidGridSize(Size3),

    #[error("invalid grid spacing ({x}, {y}, {z}): must be finite and positive")]
    InvalidGridSpacing { x: f64, y: f64, z: f64 },

    #[error("invalid time step {0}: must be finite and positive")]
    InvalidTimeStep(f64),

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("{what} has resolution {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Size3,
        actual: Size3,
    },

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;
