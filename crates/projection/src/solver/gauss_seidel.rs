use crate::blas::Blas;
use crate::config::{LinearSolverKind, PressureSolverConfig};
use crate::diagnostics::{SolveStats, SolverObserver};
use crate::fdm::compressed::{FdmCompressedBlas3, FdmCompressedLinearSystem3};
use crate::fdm::relax::{relax_compressed, relax_gauss_seidel, relax_red_black};
use crate::fdm::{FdmBlas3, FdmMatrix3, FdmVector3};

/// SOR / Gauss-Seidel iteration with a periodic residual check.
#[derive(Clone, Debug)]
pub struct FdmGaussSeidelSolver3 {
    max_number_of_iterations: u32,
    residual_check_interval: u32,
    tolerance: f64,
    sor_factor: f64,
    use_red_black_ordering: bool,
    residual: FdmVector3,
    scratch: FdmVector3,
    residual_compressed: Vec<f64>,
    last_number_of_iterations: u32,
    last_residual: f64,
}

impl FdmGaussSeidelSolver3 {
    pub fn new(
        max_number_of_iterations: u32,
        residual_check_interval: u32,
        tolerance: f64,
        sor_factor: f64,
        use_red_black_ordering: bool,
    ) -> Self {
        Self {
            max_number_of_iterations,
            residual_check_interval: residual_check_interval.max(1),
            tolerance,
            sor_factor,
            use_red_black_ordering,
            residual: FdmVector3::default(),
            scratch: FdmVector3::default(),
            residual_compressed: Vec::new(),
            last_number_of_iterations: 0,
            last_residual: f64::MAX,
        }
    }

    pub fn from_config(config: &PressureSolverConfig) -> Self {
        Self::new(
            config.number_of_gauss_seidel_iterations,
            config.residual_check_interval,
            config.tolerance,
            config.sor_factor,
            config.use_red_black_ordering,
        )
    }

    pub fn solve_grid(
        &mut self,
        a: &FdmMatrix3,
        b: &FdmVector3,
        x: &mut FdmVector3,
        observer: &dyn SolverObserver,
    ) -> SolveStats {
        x.resize(a.size());
        FdmBlas3::residual(a, x, b, &mut self.residual);
        let mut residual = FdmBlas3::l2_norm(&self.residual);
        let mut iterations = 0;

        while residual > self.tolerance && iterations < self.max_number_of_iterations {
            if self.use_red_black_ordering {
                relax_red_black(a, b, self.sor_factor, false, x, &mut self.scratch);
            } else {
                relax_gauss_seidel(a, b, self.sor_factor, false, x);
            }
            iterations += 1;

            if iterations % self.residual_check_interval == 0 || iterations == self.max_number_of_iterations {
                FdmBlas3::residual(a, x, b, &mut self.residual);
                residual = FdmBlas3::l2_norm(&self.residual);
                observer.on_iteration(LinearSolverKind::GaussSeidel, iterations, residual);
            }
        }

        self.finish(iterations, residual, observer)
    }

    pub fn solve_compressed(
        &mut self,
        system: &mut FdmCompressedLinearSystem3,
        observer: &dyn SolverObserver,
    ) -> SolveStats {
        let FdmCompressedLinearSystem3 { a, x, b, .. } = system;
        x.resize(a.rows(), 0.0);
        FdmCompressedBlas3::residual(a, x, b, &mut self.residual_compressed);
        let mut residual = FdmCompressedBlas3::l2_norm(&self.residual_compressed);
        let mut iterations = 0;

        while residual > self.tolerance && iterations < self.max_number_of_iterations {
            relax_compressed(a, b, self.sor_factor, false, x);
            iterations += 1;

            if iterations % self.residual_check_interval == 0 || iterations == self.max_number_of_iterations {
                FdmCompressedBlas3::residual(a, x, b, &mut self.residual_compressed);
                residual = FdmCompressedBlas3::l2_norm(&self.residual_compressed);
                observer.on_iteration(LinearSolverKind::GaussSeidel, iterations, residual);
            }
        }

        self.finish(iterations, residual, observer)
    }

    fn finish(&mut self, iterations: u32, residual: f64, observer: &dyn SolverObserver) -> SolveStats {
        self.last_number_of_iterations = iterations;
        self.last_residual = residual;
        let stats = SolveStats {
            iterations,
            residual,
            converged: residual <= self.tolerance,
        };
        observer.on_solve_finished(LinearSolverKind::GaussSeidel, &stats);
        stats
    }

    pub fn last_number_of_iterations(&self) -> u32 {
        self.last_number_of_iterations
    }

    pub fn last_residual(&self) -> f64 {
        self.last_residual
    }
}
