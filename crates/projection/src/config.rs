//! Solver configuration.
//!
//! Every field has a default, so a JSON document only needs the keys it
//! overrides:
//!
//! ```
//! use projection::config::PressureSolverConfig;
//!
//! let config = PressureSolverConfig::from_json(r#"{ "tolerance": 1e-6 }"#).unwrap();
//! assert_eq!(config.tolerance, 1e-6);
//! assert_eq!(config.max_number_of_levels, 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::boundary::ClosedDomainBoundary;
use crate::error::{ProjectionError, ProjectionResult};
use crate::multigrid::MgParameters;

/// Boundary discretization used by the pressure solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverVariant {
    /// Variational face weights with ghost-fluid free surface.
    Fractional,
    /// Fluid / air / boundary cell markers.
    Blocked,
}

/// Linear solver applied to the assembled Poisson system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    GaussSeidel,
    /// Jacobi-preconditioned conjugate gradient.
    Pcg,
    /// Conjugate gradient preconditioned by one multigrid V-cycle.
    Mgpcg,
}

impl LinearSolverKind {
    pub fn is_multigrid(self) -> bool {
        matches!(self, Self::Mgpcg)
    }

    /// Solver chosen when the config does not override it.
    pub fn default_for(variant: SolverVariant) -> Self {
        match variant {
            SolverVariant::Fractional => Self::Mgpcg,
            SolverVariant::Blocked => Self::GaussSeidel,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureSolverConfig {
    /// Iteration cap for PCG and MGPCG.
    pub number_of_cg_iterations: u32,
    pub max_number_of_levels: usize,
    pub number_of_restriction_iter: u32,
    pub number_of_correction_iter: u32,
    pub number_of_coarsest_iter: u32,
    pub number_of_final_iter: u32,
    /// Early-exit threshold for coarsest-level relaxation.
    pub max_tolerance: f64,
    /// Residual L2 norm at which a solve counts as converged.
    pub tolerance: f64,
    pub sor_factor: f64,
    pub use_red_black_ordering: bool,
    /// Assemble only fluid rows into a CSR matrix.
    pub use_compressed: bool,
    pub closed_domain_boundary_flag: ClosedDomainBoundary,
    /// Layers of velocity extrapolated into the collider.
    pub extrapolation_depth: u32,
    pub density: f64,
    /// Iteration cap for Gauss-Seidel. Convergence to `tolerance` takes on
    /// the order of `n` sweeps for an `n`-cell-wide pool, so the default
    /// stops short of `1e-9` on grids past about 16 cells and the solve
    /// reports `converged == false`. Raise the cap or the tolerance, or use
    /// MGPCG, when that matters.
    pub number_of_gauss_seidel_iterations: u32,
    pub residual_check_interval: u32,
    /// Overrides the per-variant default linear solver.
    pub linear_solver: Option<LinearSolverKind>,
}

impl Default for PressureSolverConfig {
    fn default() -> Self {
        Self {
            number_of_cg_iterations: 100,
            max_number_of_levels: 5,
            number_of_restriction_iter: 5,
            number_of_correction_iter: 5,
            number_of_coarsest_iter: 20,
            number_of_final_iter: 20,
            max_tolerance: 1e-9,
            tolerance: 1e-9,
            sor_factor: 1.5,
            use_red_black_ordering: true,
            use_compressed: false,
            closed_domain_boundary_flag: ClosedDomainBoundary::ALL,
            extrapolation_depth: 5,
            density: 1.0,
            number_of_gauss_seidel_iterations: 1000,
            residual_check_interval: 10,
            linear_solver: None,
        }
    }
}

impl PressureSolverConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> ProjectionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ProjectionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ProjectionError {
            ProjectionError::InvalidConfig {
                field,
                reason: reason.into(),
            }
        }

        if self.max_number_of_levels == 0 {
            return Err(invalid("max_number_of_levels", "must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid("tolerance", format!("{} is not a finite positive number", self.tolerance)));
        }
        if !(self.max_tolerance.is_finite() && self.max_tolerance > 0.0) {
            return Err(invalid(
                "max_tolerance",
                format!("{} is not a finite positive number", self.max_tolerance),
            ));
        }
        let counts = [
            ("number_of_cg_iterations", self.number_of_cg_iterations),
            ("number_of_restriction_iter", self.number_of_restriction_iter),
            ("number_of_correction_iter", self.number_of_correction_iter),
            ("number_of_coarsest_iter", self.number_of_coarsest_iter),
            ("number_of_final_iter", self.number_of_final_iter),
            ("number_of_gauss_seidel_iterations", self.number_of_gauss_seidel_iterations),
            ("residual_check_interval", self.residual_check_interval),
        ];
        if let Some(&(field, _)) = counts.iter().find(|(_, count)| *count == 0) {
            return Err(invalid(field, "must be at least 1"));
        }
        if !(self.sor_factor > 0.0 && self.sor_factor < 2.0) {
            return Err(invalid("sor_factor", format!("{} is outside (0, 2)", self.sor_factor)));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(invalid("density", format!("{} is not a finite positive number", self.density)));
        }
        Ok(())
    }

    pub fn linear_solver_for(&self, variant: SolverVariant) -> LinearSolverKind {
        self.linear_solver
            .unwrap_or_else(|| LinearSolverKind::default_for(variant))
    }

    pub fn mg_parameters(&self) -> MgParameters {
        MgParameters {
            max_number_of_levels: self.max_number_of_levels,
            number_of_restriction_iter: self.number_of_restriction_iter,
            number_of_correction_iter: self.number_of_correction_iter,
            number_of_coarsest_iter: self.number_of_coarsest_iter,
            number_of_final_iter: self.number_of_final_iter,
            max_tolerance: self.max_tolerance,
        }
    }
}
