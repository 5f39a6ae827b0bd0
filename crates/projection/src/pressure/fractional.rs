use glam::DVec3;
use rayon::prelude::*;

use super::{validate_inputs, PressureSystems, SystemMode};
use crate::array::Array3;
use crate::config::{PressureSolverConfig, SolverVariant};
use crate::constants::{MIN_THETA, MIN_WEIGHT};
use crate::diagnostics::SolveStats;
use crate::error::ProjectionResult;
use crate::fdm::assembly::{
    build_compressed_system, build_matrix, build_system, fractional_stencil, FractionalStencilInput,
};
use crate::fdm::mg::restrict_array;
use crate::field::{ScalarField3, VectorField3};
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::level_set::{fraction_inside_sdf, is_inside_sdf, open_fraction, sanitize_fraction};

/// Variational pressure solver with fractional face weights and a
/// ghost-fluid free surface.
pub struct FractionalPressureSolver3 {
    pub(super) systems: PressureSystems,
    density: f64,
    /// Fluid level set at cell centers, per level.
    fluid_sdf: Vec<Array3<f64>>,
    /// Open face fractions per axis, per level.
    weights: [Vec<Array3<f64>>; 3],
}

impl FractionalPressureSolver3 {
    pub fn new(config: &PressureSolverConfig) -> Self {
        Self {
            systems: PressureSystems::new(SolverVariant::Fractional, config),
            density: config.density,
            fluid_sdf: Vec::new(),
            weights: Default::default(),
        }
    }

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
        validate_inputs(input, dt)?;
        output.set(input);

        let shapes = self.systems.prepare(input.shape(), use_compressed);
        self.build_weights(&shapes, boundary_sdf, fluid_sdf);
        self.build_systems(&shapes, input, boundary_velocity, dt);
        let stats = self.systems.solve();
        self.apply_pressure_gradient(input, dt, output);
        Ok(stats)
    }

    /// Samples the fluid level set and face weights on the finest level and
    /// restricts them to the coarser ones.
    fn build_weights(&mut self, shapes: &[GridShape], boundary_sdf: &dyn ScalarField3, fluid_sdf: &dyn ScalarField3) {
        let levels = shapes.len();
        self.fluid_sdf.resize_with(levels, Array3::default);
        for weights in &mut self.weights {
            weights.resize_with(levels, Array3::default);
        }

        let shape = shapes[0];
        let h = shape.spacing;
        self.fluid_sdf[0].resize(shape.resolution);
        self.fluid_sdf[0].par_fill_with(|i, j, k| fluid_sdf.sample(shape.cell_center(i, j, k)));

        for (axis, weights) in self.weights.iter_mut().enumerate() {
            let mut half = DVec3::ZERO;
            half[axis] = 0.5 * h[axis];
            weights[0].resize(shape.resolution.staggered(axis));
            weights[0].par_fill_with(|i, j, k| {
                let p = shape.face_position(axis, i, j, k);
                let w = open_fraction(boundary_sdf.sample(p - half), boundary_sdf.sample(p + half));
                if w > 0.0 && w < MIN_WEIGHT {
                    MIN_WEIGHT
                } else {
                    w
                }
            });
        }

        for level in 1..levels {
            let resolution = shapes[level].resolution;
            let (finer, coarser) = self.fluid_sdf.split_at_mut(level);
            coarser[0].resize(resolution);
            restrict_array(&finer[level - 1], &mut coarser[0]);

            for (axis, weights) in self.weights.iter_mut().enumerate() {
                let (finer, coarser) = weights.split_at_mut(level);
                coarser[0].resize(resolution.staggered(axis));
                restrict_array(&finer[level - 1], &mut coarser[0]);
            }
        }
    }

    fn build_systems(
        &mut self,
        shapes: &[GridShape],
        input: &FaceCenteredGrid3,
        boundary_velocity: &dyn VectorField3,
        dt: f64,
    ) {
        let shape = shapes[0];
        let size = shape.resolution;
        let rhs_scale = self.density / dt;
        let fluid_sdf = &self.fluid_sdf;
        let weights = &self.weights;
        let finest = stencil_input(fluid_sdf, weights, shape, 0, Some(input), Some(boundary_velocity), rhs_scale);
        let stencil = |i, j, k| fractional_stencil(&finest, i, j, k);
        let systems = &mut self.systems;

        match systems.mode {
            SystemMode::Grid => {
                let system = &mut systems.system;
                build_system(&mut system.a, &mut system.b, size, stencil);
                system.x.resize(size);
                system.x.fill(0.0);
            }
            SystemMode::Compressed => {
                let fluid = &fluid_sdf[0];
                build_compressed_system(
                    &mut systems.compressed,
                    size,
                    |i, j, k| is_inside_sdf(fluid[(i, j, k)]),
                    stencil,
                );
            }
            SystemMode::Multigrid => {
                let mg = &mut systems.mg_system;
                build_system(&mut mg.a.levels[0], &mut mg.b.levels[0], size, stencil);
                mg.x.levels[0].fill(0.0);
                for (level, coarse) in shapes.iter().enumerate().skip(1) {
                    let input = stencil_input(fluid_sdf, weights, *coarse, level, None, None, rhs_scale);
                    build_matrix(&mut mg.a.levels[level], coarse.resolution, |i, j, k| {
                        fractional_stencil(&input, i, j, k)
                    });
                }
            }
        }
    }

    fn apply_pressure_gradient(&self, input: &FaceCenteredGrid3, dt: f64, output: &mut FaceCenteredGrid3) {
        let shape = input.shape();
        let resolution = shape.resolution;
        let inv_h = shape.inv_spacing();
        let scale = dt / self.density;
        let pressure = self.systems.pressure();
        let fluid_sdf = &self.fluid_sdf[0];

        for axis in 0..3 {
            let weights = &self.weights[axis][0];
            let source = input.component(axis);
            let component = output.component_mut(axis);
            let size = component.size();
            component.data_mut().par_iter_mut().enumerate().for_each(|(idx, out)| {
                let (i, j, k) = size.coords(idx);
                let mut low = [i, j, k];
                if low[axis] == 0 || low[axis] >= resolution.axis(axis) {
                    return;
                }
                if weights[idx] <= 0.0 {
                    return;
                }
                low[axis] -= 1;
                let low = (low[0], low[1], low[2]);
                let high = (i, j, k);
                let (phi_low, phi_high) = (fluid_sdf[low], fluid_sdf[high]);
                if !(is_inside_sdf(phi_low) || is_inside_sdf(phi_high)) {
                    return;
                }
                let theta = sanitize_fraction(fraction_inside_sdf(phi_low, phi_high)).max(MIN_THETA);
                *out = source[idx] - scale * inv_h[axis] / theta * (pressure[high] - pressure[low]);
            });
        }
    }
}

fn stencil_input<'a>(
    fluid_sdf: &'a [Array3<f64>],
    weights: &'a [Vec<Array3<f64>>; 3],
    shape: GridShape,
    level: usize,
    velocity: Option<&'a FaceCenteredGrid3>,
    boundary_velocity: Option<&'a dyn VectorField3>,
    rhs_scale: f64,
) -> FractionalStencilInput<'a> {
    FractionalStencilInput {
        shape,
        fluid_sdf: &fluid_sdf[level],
        weights: [&weights[0][level], &weights[1][level], &weights[2][level]],
        velocity,
        boundary_velocity,
        rhs_scale,
    }
}
