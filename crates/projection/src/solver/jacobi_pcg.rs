use rayon::prelude::*;

use crate::config::{LinearSolverKind, PressureSolverConfig};
use crate::diagnostics::{SolveStats, SolverObserver};
use crate::fdm::compressed::{FdmCompressedBlas3, FdmCompressedLinearSystem3, MatrixCsr};
use crate::fdm::{FdmBlas3, FdmMatrix3, FdmVector3};
use crate::pcg::{pcg, PcgBuffers, Preconditioner};

/// `x = b / diag(a)`.
#[derive(Clone, Debug, Default)]
struct DiagonalPreconditioner3 {
    inv_diagonal: FdmVector3,
}

impl DiagonalPreconditioner3 {
    fn build(&mut self, a: &FdmMatrix3) {
        self.inv_diagonal.resize(a.size());
        self.inv_diagonal
            .data_mut()
            .par_iter_mut()
            .zip(a.data().par_iter())
            .for_each(|(inv, row)| *inv = if row.center != 0.0 { 1.0 / row.center } else { 0.0 });
    }
}

impl Preconditioner<FdmBlas3> for DiagonalPreconditioner3 {
    fn solve(&mut self, b: &FdmVector3, x: &mut FdmVector3) {
        x.resize(b.size());
        x.data_mut()
            .par_iter_mut()
            .zip(b.data().par_iter().zip(self.inv_diagonal.data().par_iter()))
            .for_each(|(x, (b, inv))| *x = b * inv);
    }
}

#[derive(Clone, Debug, Default)]
struct CompressedDiagonalPreconditioner {
    inv_diagonal: Vec<f64>,
}

impl CompressedDiagonalPreconditioner {
    fn build(&mut self, a: &MatrixCsr) {
        self.inv_diagonal = (0..a.rows())
            .into_par_iter()
            .map(|row| {
                let d = a.diagonal(row);
                if d != 0.0 {
                    1.0 / d
                } else {
                    0.0
                }
            })
            .collect();
    }
}

impl Preconditioner<FdmCompressedBlas3> for CompressedDiagonalPreconditioner {
    fn solve(&mut self, b: &Vec<f64>, x: &mut Vec<f64>) {
        x.resize(b.len(), 0.0);
        x.par_iter_mut()
            .zip(b.par_iter().zip(self.inv_diagonal.par_iter()))
            .for_each(|(x, (b, inv))| *x = b * inv);
    }
}

/// Conjugate gradient with a Jacobi (diagonal) preconditioner, for both the
/// grid and the compressed form.
#[derive(Clone, Debug)]
pub struct FdmPcgSolver3 {
    max_number_of_iterations: u32,
    tolerance: f64,
    r: FdmVector3,
    d: FdmVector3,
    q: FdmVector3,
    s: FdmVector3,
    precond: DiagonalPreconditioner3,
    r_comp: Vec<f64>,
    d_comp: Vec<f64>,
    q_comp: Vec<f64>,
    s_comp: Vec<f64>,
    precond_comp: CompressedDiagonalPreconditioner,
    last_number_of_iterations: u32,
    last_residual: f64,
}

impl FdmPcgSolver3 {
    pub fn new(max_number_of_iterations: u32, tolerance: f64) -> Self {
        Self {
            max_number_of_iterations,
            tolerance,
            r: FdmVector3::default(),
            d: FdmVector3::default(),
            q: FdmVector3::default(),
            s: FdmVector3::default(),
            precond: DiagonalPreconditioner3::default(),
            r_comp: Vec::new(),
            d_comp: Vec::new(),
            q_comp: Vec::new(),
            s_comp: Vec::new(),
            precond_comp: CompressedDiagonalPreconditioner::default(),
            last_number_of_iterations: 0,
            last_residual: f64::MAX,
        }
    }

    pub fn from_config(config: &PressureSolverConfig) -> Self {
        Self::new(config.number_of_cg_iterations, config.tolerance)
    }

    pub fn solve_grid(
        &mut self,
        a: &FdmMatrix3,
        b: &FdmVector3,
        x: &mut FdmVector3,
        observer: &dyn SolverObserver,
    ) -> SolveStats {
        let size = a.size();
        x.resize(size);
        for v in [&mut self.r, &mut self.d, &mut self.q, &mut self.s] {
            v.resize(size);
        }
        self.precond.build(a);

        let stats = pcg::<FdmBlas3, _>(
            a,
            b,
            self.max_number_of_iterations,
            self.tolerance,
            &mut self.precond,
            x,
            PcgBuffers {
                r: &mut self.r,
                d: &mut self.d,
                q: &mut self.q,
                s: &mut self.s,
            },
            observer,
            LinearSolverKind::Pcg,
        );
        self.record(stats)
    }

    pub fn solve_compressed(
        &mut self,
        system: &mut FdmCompressedLinearSystem3,
        observer: &dyn SolverObserver,
    ) -> SolveStats {
        let FdmCompressedLinearSystem3 { a, x, b, .. } = system;
        let n = a.rows();
        x.resize(n, 0.0);
        for v in [&mut self.r_comp, &mut self.d_comp, &mut self.q_comp, &mut self.s_comp] {
            v.resize(n, 0.0);
        }
        self.precond_comp.build(a);

        let stats = pcg::<FdmCompressedBlas3, _>(
            a,
            b,
            self.max_number_of_iterations,
            self.tolerance,
            &mut self.precond_comp,
            x,
            PcgBuffers {
                r: &mut self.r_comp,
                d: &mut self.d_comp,
                q: &mut self.q_comp,
                s: &mut self.s_comp,
            },
            observer,
            LinearSolverKind::Pcg,
        );
        self.record(stats)
    }

    fn record(&mut self, stats: SolveStats) -> SolveStats {
        self.last_number_of_iterations = stats.iterations;
        self.last_residual = stats.residual;
        stats
    }

    pub fn last_number_of_iterations(&self) -> u32 {
        self.last_number_of_iterations
    }

    pub fn last_residual(&self) -> f64 {
        self.last_residual
    }
}
