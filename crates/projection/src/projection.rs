//! One-call pressure projection: boundary constraints, pressure solve and
//! velocity correction with a matched pair of solvers.

use std::sync::Arc;

use crate::boundary::GridBoundaryConditionSolver3;
use crate::config::{PressureSolverConfig, SolverVariant};
use crate::diagnostics::{SolveStats, SolverObserver};
use crate::error::ProjectionResult;
use crate::field::{Collider3, ScalarField3};
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::pressure::GridPressureSolver3;

/// Owns the configuration and the boundary and pressure solvers for one
/// discretization.
pub struct PressureProjection3 {
    config: PressureSolverConfig,
    boundary_solver: GridBoundaryConditionSolver3,
    pressure_solver: GridPressureSolver3,
    /// Constrained copy of the input velocity.
    constrained: FaceCenteredGrid3,
}

impl PressureProjection3 {
    pub fn new(config: PressureSolverConfig, variant: SolverVariant) -> ProjectionResult<Self> {
        config.validate()?;
        let pressure_solver = GridPressureSolver3::new(variant, &config);
        let mut boundary_solver = pressure_solver.suggested_boundary_condition_solver();
        boundary_solver.set_closed_domain_boundary_flag(config.closed_domain_boundary_flag);
        log::debug!(
            "{variant:?} projection using {:?}",
            pressure_solver.linear_system_solver().kind()
        );
        Ok(Self {
            config,
            boundary_solver,
            pressure_solver,
            constrained: FaceCenteredGrid3::default(),
        })
    }

    /// Binds `collider` (or clears it) and samples it on `shape`.
    pub fn update_collider(&mut self, collider: Option<Arc<dyn Collider3>>, shape: &GridShape) -> ProjectionResult<()> {
        self.boundary_solver.update_collider(collider, shape)
    }

    /// Makes `input` divergence-free inside the fluid and writes the result
    /// to `output`.
    ///
    /// The input is constrained to the collider and domain walls before the
    /// solve and the result again afterwards. A solve that hits its iteration
    /// cap still produces a velocity; check [`SolveStats::converged`].
    pub fn project(
        &mut self,
        input: &FaceCenteredGrid3,
        dt: f64,
        output: &mut FaceCenteredGrid3,
        fluid_sdf: &dyn ScalarField3,
    ) -> ProjectionResult<SolveStats> {
        let shape = *input.shape();
        if self.boundary_solver.shape() != Some(&shape) {
            let collider = self.boundary_solver.collider().cloned();
            self.boundary_solver.update_collider(collider, &shape)?;
        }

        let depth = self.config.extrapolation_depth;
        self.constrained.set(input);
        self.boundary_solver.constrain_velocity(&mut self.constrained, depth)?;

        let stats = self.pressure_solver.solve(
            &self.constrained,
            dt,
            output,
            self.boundary_solver.collider_sdf(),
            self.boundary_solver.collider_velocity_field(),
            fluid_sdf,
            self.config.use_compressed,
        )?;

        self.boundary_solver.constrain_velocity(output, depth)?;
        Ok(stats)
    }

    pub fn config(&self) -> &PressureSolverConfig {
        &self.config
    }

    pub fn variant(&self) -> SolverVariant {
        self.pressure_solver.variant()
    }

    pub fn boundary_solver(&self) -> &GridBoundaryConditionSolver3 {
        &self.boundary_solver
    }

    pub fn boundary_solver_mut(&mut self) -> &mut GridBoundaryConditionSolver3 {
        &mut self.boundary_solver
    }

    pub fn pressure_solver(&self) -> &GridPressureSolver3 {
        &self.pressure_solver
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SolverObserver>) {
        self.pressure_solver.set_observer(observer);
    }
}
