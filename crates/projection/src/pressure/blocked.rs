use rayon::prelude::*;

use super::{validate_inputs, PressureSystems, SystemMode};
use crate::array::Array3;
use crate::config::{PressureSolverConfig, SolverVariant};
use crate::diagnostics::SolveStats;
use crate::error::ProjectionResult;
use crate::fdm::assembly::{blocked_stencil, build_compressed_system, build_matrix, build_system, CellMarker};
use crate::fdm::mg::footprint;
use crate::field::ScalarField3;
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::level_set::is_inside_sdf;

/// Pressure solver that treats every cell as wholly fluid, air or solid.
pub struct BlockedPressureSolver3 {
    pub(super) systems: PressureSystems,
    density: f64,
    /// Cell classification per level, finest first.
    markers: Vec<Array3<CellMarker>>,
}

impl BlockedPressureSolver3 {
    pub fn new(config: &PressureSolverConfig) -> Self {
        Self {
            systems: PressureSystems::new(SolverVariant::Blocked, config),
            density: config.density,
            markers: Vec::new(),
        }
    }

    pub fn markers(&self) -> &[Array3<CellMarker>] {
        &self.markers
    }

    pub fn solve(
        &mut self,
        input: &FaceCenteredGrid3,
        dt: f64,
        output: &mut FaceCenteredGrid3,
        boundary_sdf: &dyn ScalarField3,
        fluid_sdf: &dyn ScalarField3,
        use_compressed: bool,
    ) -> ProjectionResult<SolveStats> {
        validate_inputs(input, dt)?;
        output.set(input);

        let shapes = self.systems.prepare(input.shape(), use_compressed);
        self.build_markers(&shapes, boundary_sdf, fluid_sdf);
        self.build_systems(&shapes, input, dt);
        let stats = self.systems.solve();
        self.apply_pressure_gradient(input, dt, output);
        Ok(stats)
    }

    fn build_markers(&mut self, shapes: &[GridShape], boundary_sdf: &dyn ScalarField3, fluid_sdf: &dyn ScalarField3) {
        self.markers.resize_with(shapes.len(), Array3::default);

        let shape = shapes[0];
        self.markers[0].resize(shape.resolution);
        self.markers[0].par_fill_with(|i, j, k| {
            let p = shape.cell_center(i, j, k);
            if is_inside_sdf(boundary_sdf.sample(p)) {
                CellMarker::Boundary
            } else if is_inside_sdf(fluid_sdf.sample(p)) {
                CellMarker::Fluid
            } else {
                CellMarker::Air
            }
        });

        for level in 1..shapes.len() {
            let (finer, coarser) = self.markers.split_at_mut(level);
            coarser[0].resize(shapes[level].resolution);
            restrict_markers(&finer[level - 1], &mut coarser[0]);
        }
    }

    fn build_systems(&mut self, shapes: &[GridShape], input: &FaceCenteredGrid3, dt: f64) {
        let size = shapes[0].resolution;
        let rhs_scale = self.density / dt;
        let markers = &self.markers;
        let finest = &markers[0];
        let inv_h = shapes[0].inv_spacing();
        let stencil = |i, j, k| blocked_stencil(finest, inv_h, Some(input), rhs_scale, i, j, k);
        let systems = &mut self.systems;

        match systems.mode {
            SystemMode::Grid => {
                let system = &mut systems.system;
                build_system(&mut system.a, &mut system.b, size, stencil);
                system.x.resize(size);
                system.x.fill(0.0);
            }
            SystemMode::Compressed => {
                build_compressed_system(
                    &mut systems.compressed,
                    size,
                    |i, j, k| finest[(i, j, k)] == CellMarker::Fluid,
                    stencil,
                );
            }
            SystemMode::Multigrid => {
                let mg = &mut systems.mg_system;
                build_system(&mut mg.a.levels[0], &mut mg.b.levels[0], size, stencil);
                mg.x.levels[0].fill(0.0);
                for (level, coarse) in shapes.iter().enumerate().skip(1) {
                    let coarse_markers = &markers[level];
                    let coarse_inv_h = coarse.inv_spacing();
                    build_matrix(&mut mg.a.levels[level], coarse.resolution, |i, j, k| {
                        blocked_stencil(coarse_markers, coarse_inv_h, None, rhs_scale, i, j, k)
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
        let markers = &self.markers[0];

        for axis in 0..3 {
            let source = input.component(axis);
            let component = output.component_mut(axis);
            let size = component.size();
            component.data_mut().par_iter_mut().enumerate().for_each(|(idx, out)| {
                let high = size.coords(idx);
                let mut low = [high.0, high.1, high.2];
                if low[axis] == 0 || low[axis] >= resolution.axis(axis) {
                    return;
                }
                low[axis] -= 1;
                let low = (low[0], low[1], low[2]);
                let (m_low, m_high) = (markers[low], markers[high]);
                let touches_fluid = m_low == CellMarker::Fluid || m_high == CellMarker::Fluid;
                let touches_boundary = m_low == CellMarker::Boundary || m_high == CellMarker::Boundary;
                if touches_fluid && !touches_boundary {
                    *out = source[idx] - scale * inv_h[axis] * (pressure[high] - pressure[low]);
                }
            });
        }
    }
}

/// Majority vote over each coarse cell's restriction footprint. Ties go to
/// fluid, then air.
fn restrict_markers(finer: &Array3<CellMarker>, coarser: &mut Array3<CellMarker>) {
    let fs = finer.size();
    let cs = coarser.size();
    coarser.par_fill_with(|i, j, k| {
        let mut counts = [0usize; 3];
        for kk in footprint(fs.z, cs.z, k) {
            for jj in footprint(fs.y, cs.y, j) {
                for ii in footprint(fs.x, cs.x, i) {
                    let slot = match finer[(ii, jj, kk)] {
                        CellMarker::Fluid => 0,
                        CellMarker::Air => 1,
                        CellMarker::Boundary => 2,
                    };
                    counts[slot] += 1;
                }
            }
        }
        let [fluid, air, boundary] = counts;
        if fluid >= air && fluid >= boundary {
            CellMarker::Fluid
        } else if air >= boundary {
            CellMarker::Air
        } else {
            CellMarker::Boundary
        }
    });
}
