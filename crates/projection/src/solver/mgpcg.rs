use crate::blas::Blas;
use crate::config::{LinearSolverKind, PressureSolverConfig};
use crate::diagnostics::{SolveStats, SolverObserver};
use crate::fdm::mg::{resize_mg_vector, FdmMgLinearSystem3, FdmMgOperators3};
use crate::fdm::{FdmBlas3, FdmVector3};
use crate::multigrid::{mg_v_cycle, MgMatrix, MgParameters, MgVector};
use crate::pcg::{pcg, PcgBuffers, Preconditioner};

/// One V-cycle from a zero initial guess.
struct VCyclePreconditioner<'a> {
    a: &'a MgMatrix<FdmBlas3>,
    operators: &'a FdmMgOperators3,
    params: &'a MgParameters,
    x: &'a mut MgVector<FdmBlas3>,
    b: &'a mut MgVector<FdmBlas3>,
    buffer: &'a mut MgVector<FdmBlas3>,
}

impl Preconditioner<FdmBlas3> for VCyclePreconditioner<'_> {
    fn solve(&mut self, b: &FdmVector3, x: &mut FdmVector3) {
        self.b.levels[0].set(b);
        FdmBlas3::set(0.0, &mut self.x.levels[0]);
        mg_v_cycle(self.a, self.operators, self.params, self.x, self.b, self.buffer);
        x.set(&self.x.levels[0]);
    }
}

/// Conjugate gradient preconditioned by a multigrid V-cycle.
pub struct FdmMgpcgSolver3 {
    max_number_of_iterations: u32,
    tolerance: f64,
    params: MgParameters,
    operators: FdmMgOperators3,
    r: FdmVector3,
    d: FdmVector3,
    q: FdmVector3,
    s: FdmVector3,
    mg_x: MgVector<FdmBlas3>,
    mg_b: MgVector<FdmBlas3>,
    mg_buffer: MgVector<FdmBlas3>,
    last_number_of_iterations: u32,
    last_residual: f64,
}

impl FdmMgpcgSolver3 {
    pub fn new(
        max_number_of_iterations: u32,
        tolerance: f64,
        params: MgParameters,
        sor_factor: f64,
        use_red_black_ordering: bool,
    ) -> Self {
        Self {
            max_number_of_iterations,
            tolerance,
            params,
            operators: FdmMgOperators3 {
                sor_factor,
                use_red_black_ordering,
            },
            r: FdmVector3::default(),
            d: FdmVector3::default(),
            q: FdmVector3::default(),
            s: FdmVector3::default(),
            mg_x: MgVector::default(),
            mg_b: MgVector::default(),
            mg_buffer: MgVector::default(),
            last_number_of_iterations: 0,
            last_residual: f64::MAX,
        }
    }

    pub fn from_config(config: &PressureSolverConfig) -> Self {
        Self::new(
            config.number_of_cg_iterations,
            config.tolerance,
            config.mg_parameters(),
            config.sor_factor,
            config.use_red_black_ordering,
        )
    }

    pub fn params(&self) -> &MgParameters {
        &self.params
    }

    /// Solves the finest level of `system`; coarser levels only feed the
    /// preconditioner.
    pub fn solve(&mut self, system: &mut FdmMgLinearSystem3, observer: &dyn SolverObserver) -> SolveStats {
        let sizes = system.resolutions();
        let Some(&finest) = sizes.first() else {
            return SolveStats::default();
        };

        for v in [&mut self.r, &mut self.d, &mut self.q, &mut self.s] {
            v.resize(finest);
        }
        for v in [&mut self.mg_x, &mut self.mg_b, &mut self.mg_buffer] {
            resize_mg_vector(v, &sizes);
        }

        let FdmMgLinearSystem3 { a, x, b } = system;
        let mut preconditioner = VCyclePreconditioner {
            a,
            operators: &self.operators,
            params: &self.params,
            x: &mut self.mg_x,
            b: &mut self.mg_b,
            buffer: &mut self.mg_buffer,
        };

        let stats = pcg::<FdmBlas3, _>(
            &a.levels[0],
            &b.levels[0],
            self.max_number_of_iterations,
            self.tolerance,
            &mut preconditioner,
            &mut x.levels[0],
            PcgBuffers {
                r: &mut self.r,
                d: &mut self.d,
                q: &mut self.q,
                s: &mut self.s,
            },
            observer,
            LinearSolverKind::Mgpcg,
        );

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
