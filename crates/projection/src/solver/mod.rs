//! Linear solvers for the assembled pressure systems.

mod gauss_seidel;
mod jacobi_pcg;
mod mgpcg;

pub use gauss_seidel::FdmGaussSeidelSolver3;
pub use jacobi_pcg::FdmPcgSolver3;
pub use mgpcg::FdmMgpcgSolver3;

use crate::config::{LinearSolverKind, PressureSolverConfig};
use crate::diagnostics::{SolveStats, SolverObserver};
use crate::fdm::compressed::FdmCompressedLinearSystem3;
use crate::fdm::mg::FdmMgLinearSystem3;
use crate::fdm::{FdmMatrix3, FdmVector3};

/// The solver chosen for a pressure solve.
pub enum FdmLinearSystemSolver3 {
    GaussSeidel(FdmGaussSeidelSolver3),
    Pcg(FdmPcgSolver3),
    Mgpcg(FdmMgpcgSolver3),
}

impl FdmLinearSystemSolver3 {
    pub fn from_config(kind: LinearSolverKind, config: &PressureSolverConfig) -> Self {
        match kind {
            LinearSolverKind::GaussSeidel => Self::GaussSeidel(FdmGaussSeidelSolver3::from_config(config)),
            LinearSolverKind::Pcg => Self::Pcg(FdmPcgSolver3::from_config(config)),
            LinearSolverKind::Mgpcg => Self::Mgpcg(FdmMgpcgSolver3::from_config(config)),
        }
    }

    pub fn kind(&self) -> LinearSolverKind {
        match self {
            Self::GaussSeidel(_) => LinearSolverKind::GaussSeidel,
            Self::Pcg(_) => LinearSolverKind::Pcg,
            Self::Mgpcg(_) => LinearSolverKind::Mgpcg,
        }
    }

    /// Levels the solver wants assembled; 1 for single-grid solvers.
    pub fn max_number_of_levels(&self) -> usize {
        match self {
            Self::Mgpcg(s) => s.params().max_number_of_levels,
            _ => 1,
        }
    }

    /// Solves a single-grid system. Multigrid solvers must go through
    /// [`solve_mg`](Self::solve_mg); here they return `None`.
    pub fn solve_grid(
        &mut self,
        a: &FdmMatrix3,
        b: &FdmVector3,
        x: &mut FdmVector3,
        observer: &dyn SolverObserver,
    ) -> Option<SolveStats> {
        match self {
            Self::GaussSeidel(s) => Some(s.solve_grid(a, b, x, observer)),
            Self::Pcg(s) => Some(s.solve_grid(a, b, x, observer)),
            Self::Mgpcg(_) => None,
        }
    }

    /// Solves a compressed system; `None` for multigrid solvers.
    pub fn solve_compressed(
        &mut self,
        system: &mut FdmCompressedLinearSystem3,
        observer: &dyn SolverObserver,
    ) -> Option<SolveStats> {
        match self {
            Self::GaussSeidel(s) => Some(s.solve_compressed(system, observer)),
            Self::Pcg(s) => Some(s.solve_compressed(system, observer)),
            Self::Mgpcg(_) => None,
        }
    }

    /// Solves a multigrid system. Single-grid solvers use the finest level.
    pub fn solve_mg(&mut self, system: &mut FdmMgLinearSystem3, observer: &dyn SolverObserver) -> SolveStats {
        match self {
            Self::Mgpcg(s) => s.solve(system, observer),
            other => {
                let FdmMgLinearSystem3 { a, x, b } = system;
                match (a.levels.first(), b.levels.first(), x.levels.first_mut()) {
                    (Some(a), Some(b), Some(x)) => other.solve_grid(a, b, x, observer).unwrap_or_default(),
                    _ => SolveStats::default(),
                }
            }
        }
    }

    pub fn last_number_of_iterations(&self) -> u32 {
        match self {
            Self::GaussSeidel(s) => s.last_number_of_iterations(),
            Self::Pcg(s) => s.last_number_of_iterations(),
            Self::Mgpcg(s) => s.last_number_of_iterations(),
        }
    }

    pub fn last_residual(&self) -> f64 {
        match self {
            Self::GaussSeidel(s) => s.last_residual(),
            Self::Pcg(s) => s.last_residual(),
            Self::Mgpcg(s) => s.last_residual(),
        }
    }
}
