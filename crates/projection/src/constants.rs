//! Numerical constants shared by the boundary, assembly and solver stages.

/// Smallest nonzero face weight admitted into the Poisson matrix.
pub const MIN_WEIGHT: f64 = 0.01;

/// Lower clamp on the ghost-fluid interface fraction.
pub const MIN_THETA: f64 = 0.01;

/// Half width, in grid cells, of the smeared Heaviside and delta kernels.
pub const SMEARING_HALF_WIDTH: f64 = 1.5;

/// PCG recomputes the true residual every this many iterations.
pub const PCG_RESIDUAL_REFRESH_INTERVAL: u32 = 50;

/// Coarsest-level relaxation checks the residual this often.
pub const COARSEST_RESIDUAL_CHECK_INTERVAL: u32 = 5;
