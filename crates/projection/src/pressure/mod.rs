//! Single-phase pressure solvers.
//!
//! A solve copies the input velocity, assembles the Poisson system for the
//! chosen boundary treatment, solves it and subtracts the pressure gradient
//! on every face that touches fluid. Faces away from fluid keep the input
//! value.

mod blocked;
mod fractional;

pub use blocked::BlockedPressureSolver3;
pub use fractional::FractionalPressureSolver3;

use std::sync::Arc;

use crate::boundary::{
    GridBlockedBoundaryConditionSolver3, GridBoundaryConditionSolver3, GridFractionalBoundaryConditionSolver3,
};
use crate::config::{PressureSolverConfig, SolverVariant};
use crate::diagnostics::{LogObserver, SolveStats, SolverObserver};
use crate::error::{ProjectionError, ProjectionResult};
use crate::fdm::compressed::FdmCompressedLinearSystem3;
use crate::fdm::mg::FdmMgLinearSystem3;
use crate::fdm::{FdmLinearSystem3, FdmVector3};
use crate::field::{ScalarField3, VectorField3};
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::solver::{FdmLinearSystemSolver3, FdmPcgSolver3};

/// Which storage the current solve assembles into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SystemMode {
    Grid,
    Compressed,
    Multigrid,
}

/// Linear systems, solver and telemetry shared by both variants.
pub(crate) struct PressureSystems {
    solver: FdmLinearSystemSolver3,
    /// Used for compressed systems when the main solver is multigrid.
    compressed_fallback: FdmPcgSolver3,
    system: FdmLinearSystem3,
    compressed: FdmCompressedLinearSystem3,
    mg_system: FdmMgLinearSystem3,
    mode: SystemMode,
    observer: Arc<dyn SolverObserver>,
    last_stats: SolveStats,
}

impl PressureSystems {
    fn new(variant: SolverVariant, config: &PressureSolverConfig) -> Self {
        let kind = config.linear_solver_for(variant);
        Self {
            solver: FdmLinearSystemSolver3::from_config(kind, config),
            compressed_fallback: FdmPcgSolver3::from_config(config),
            system: FdmLinearSystem3::default(),
            compressed: FdmCompressedLinearSystem3::default(),
            mg_system: FdmMgLinearSystem3::default(),
            mode: SystemMode::Grid,
            observer: Arc::new(LogObserver),
            last_stats: SolveStats::default(),
        }
    }

    /// Picks the storage for this solve and returns the shape of every
    /// level to assemble, finest first.
    fn prepare(&mut self, shape: &GridShape, use_compressed: bool) -> Vec<GridShape> {
        self.mode = if use_compressed {
            SystemMode::Compressed
        } else if self.solver.kind().is_multigrid() {
            SystemMode::Multigrid
        } else {
            SystemMode::Grid
        };

        let mut shapes = vec![*shape];
        if self.mode == SystemMode::Multigrid {
            let max_levels = self.solver.max_number_of_levels();
            while shapes.len() < max_levels {
                match shapes[shapes.len() - 1].coarsened() {
                    Some(next) => shapes.push(next),
                    None => break,
                }
            }
            if self.mg_system.resize_with_coarser(shape.resolution, max_levels) {
                log::info!(
                    "multigrid hierarchy rebuilt: {:?}",
                    self.mg_system.resolutions()
                );
            }
        } else if !self.mg_system.a.levels.is_empty() {
            self.mg_system.clear();
        }
        shapes
    }

    fn solve(&mut self) -> SolveStats {
        let observer = self.observer.as_ref();
        let stats = match self.mode {
            SystemMode::Grid => {
                let FdmLinearSystem3 { a, x, b } = &mut self.system;
                self.solver.solve_grid(a, b, x, observer).unwrap_or_default()
            }
            SystemMode::Compressed => {
                let stats = match self.solver.solve_compressed(&mut self.compressed, observer) {
                    Some(stats) => stats,
                    None => self.compressed_fallback.solve_compressed(&mut self.compressed, observer),
                };
                self.compressed.decompress(&mut self.system.x);
                stats
            }
            SystemMode::Multigrid => self.solver.solve_mg(&mut self.mg_system, observer),
        };

        if stats.converged {
            log::debug!(
                "{:?} pressure solve: {} iterations, residual {:.3e}",
                self.solver.kind(),
                stats.iterations,
                stats.residual
            );
        } else {
            log::warn!(
                "{:?} pressure solve stopped at iteration cap {} with residual {:.3e}",
                self.solver.kind(),
                stats.iterations,
                stats.residual
            );
        }
        self.last_stats = stats;
        stats
    }

    fn pressure(&self) -> &FdmVector3 {
        match self.mode {
            SystemMode::Multigrid => &self.mg_system.x.levels[0],
            _ => &self.system.x,
        }
    }
}

fn validate_inputs(input: &FaceCenteredGrid3, dt: f64) -> ProjectionResult<()> {
    input.shape().validate()?;
    if !(dt.is_finite() && dt > 0.0) {
        return Err(ProjectionError::InvalidTimeStep(dt));
    }
    Ok(())
}

/// Pressure solver for either boundary treatment.
pub enum GridPressureSolver3 {
    Fractional(FractionalPressureSolver3),
    Blocked(BlockedPressureSolver3),
}

impl GridPressureSolver3 {
    pub fn new(variant: SolverVariant, config: &PressureSolverConfig) -> Self {
        match variant {
            SolverVariant::Fractional => Self::Fractional(FractionalPressureSolver3::new(config)),
            SolverVariant::Blocked => Self::Blocked(BlockedPressureSolver3::new(config)),
        }
    }

    pub fn variant(&self) -> SolverVariant {
        match self {
            Self::Fractional(_) => SolverVariant::Fractional,
            Self::Blocked(_) => SolverVariant::Blocked,
        }
    }

    /// Projects `input` into `output`.
    ///
    /// `boundary_sdf` and `boundary_velocity` describe the collider, normally
    /// the caches of the paired boundary condition solver; `fluid_sdf` is
    /// negative inside the liquid.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        input: &FaceCenteredGrid3,
        dt: f64,
        output: &mut FaceCenteredGrid3,
        boundary_sdf: &dyn ScalarField3,
        boundary_velocity: &dyn VectorField3,
        fluid_sdf: &dyn ScalarField3,
        use_compressed: bool,
    ) -> ProjectionResult<SolveStats> {
        match self {
            Self::Fractional(s) => s.solve(
                input,
                dt,
                output,
                boundary_sdf,
                boundary_velocity,
                fluid_sdf,
                use_compressed,
            ),
            Self::Blocked(s) => s.solve(input, dt, output, boundary_sdf, fluid_sdf, use_compressed),
        }
    }

    /// Boundary condition solver matching this discretization.
    pub fn suggested_boundary_condition_solver(&self) -> GridBoundaryConditionSolver3 {
        match self {
            Self::Fractional(_) => {
                GridBoundaryConditionSolver3::Fractional(GridFractionalBoundaryConditionSolver3::new())
            }
            Self::Blocked(_) => GridBoundaryConditionSolver3::Blocked(GridBlockedBoundaryConditionSolver3::new()),
        }
    }

    fn systems(&self) -> &PressureSystems {
        match self {
            Self::Fractional(s) => &s.systems,
            Self::Blocked(s) => &s.systems,
        }
    }

    fn systems_mut(&mut self) -> &mut PressureSystems {
        match self {
            Self::Fractional(s) => &mut s.systems,
            Self::Blocked(s) => &mut s.systems,
        }
    }

    /// Pressure of the last solve, one value per cell.
    pub fn pressure(&self) -> &FdmVector3 {
        self.systems().pressure()
    }

    pub fn last_stats(&self) -> SolveStats {
        self.systems().last_stats
    }

    pub fn linear_system_solver(&self) -> &FdmLinearSystemSolver3 {
        &self.systems().solver
    }

    /// Replaces the per-iteration observer (a [`LogObserver`] by default).
    pub fn set_observer(&mut self, observer: Arc<dyn SolverObserver>) {
        self.systems_mut().observer = observer;
    }
}
