//! Multigrid hierarchy, grid transfer and smoothing for the grid form.

use rayon::prelude::*;

use super::relax::{relax_gauss_seidel, relax_red_black};
use super::{FdmBlas3, FdmMatrix3, FdmVector3};
use crate::array::{Array3, Size3};
use crate::blas::Blas;
use crate::constants::COARSEST_RESIDUAL_CHECK_INTERVAL;
use crate::multigrid::{MgMatrix, MgOperators, MgRelaxPhase, MgVector};

/// Resolutions from `finest` down, at most `max_number_of_levels` long.
pub fn level_resolutions(finest: Size3, max_number_of_levels: usize) -> Vec<Size3> {
    let mut sizes = vec![finest];
    while sizes.len() < max_number_of_levels {
        match sizes[sizes.len() - 1].coarsened() {
            Some(next) => sizes.push(next),
            None => break,
        }
    }
    sizes
}

/// Fine sample indices and weights feeding coarse index `c` on one axis.
#[derive(Clone, Copy, Debug)]
struct Taps {
    indices: [usize; 4],
    weights: [f64; 4],
    len: usize,
}

impl Taps {
    fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices[..self.len]
            .iter()
            .copied()
            .zip(self.weights[..self.len].iter().copied())
    }
}

/// Per-axis restriction stencil.
///
/// - same size: identity
/// - `fine == 2 * coarse` (cell samples): `[1, 3, 3, 1] / 8` over
///   `2c - 1 ..= 2c + 2`, clamped at the ends
/// - otherwise (face samples, `fine == 2 * (coarse - 1) + 1`): injection
fn restrict_taps(fine: usize, coarse: usize, c: usize) -> Taps {
    if fine == coarse {
        Taps {
            indices: [c, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
            len: 1,
        }
    } else if fine == 2 * coarse {
        let last = fine - 1;
        Taps {
            indices: [
                (2 * c).saturating_sub(1),
                2 * c,
                (2 * c + 1).min(last),
                (2 * c + 2).min(last),
            ],
            weights: [0.125, 0.375, 0.375, 0.125],
            len: 4,
        }
    } else {
        Taps {
            indices: [(2 * c).min(fine - 1), 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
            len: 1,
        }
    }
}

/// Per-axis prolongation stencil for fine index `f`: 3/4 from the nearest
/// coarse sample, 1/4 from the next one over.
fn correct_taps(fine: usize, coarse: usize, f: usize) -> Taps {
    if fine == coarse {
        return Taps {
            indices: [f, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
            len: 1,
        };
    }
    let c = (f / 2).min(coarse - 1);
    let other = if f % 2 == 0 {
        c.saturating_sub(1)
    } else {
        (c + 1).min(coarse - 1)
    };
    Taps {
        indices: [c, other, 0, 0],
        weights: [0.75, 0.25, 0.0, 0.0],
        len: 2,
    }
}

/// Fine indices in the restriction footprint of coarse index `c`.
pub(crate) fn footprint(fine: usize, coarse: usize, c: usize) -> impl Iterator<Item = usize> {
    let taps = restrict_taps(fine, coarse, c);
    taps.indices.into_iter().take(taps.len)
}

/// Downsamples `finer` into `coarser`, whose size must already be set.
/// Works for cell arrays and face arrays alike.
pub fn restrict_array(finer: &Array3<f64>, coarser: &mut Array3<f64>) {
    let fs = finer.size();
    let cs = coarser.size();
    coarser.par_fill_with(|i, j, k| {
        let tx = restrict_taps(fs.x, cs.x, i);
        let ty = restrict_taps(fs.y, cs.y, j);
        let tz = restrict_taps(fs.z, cs.z, k);
        let mut sum = 0.0;
        for (kk, wz) in tz.iter() {
            for (jj, wy) in ty.iter() {
                for (ii, wx) in tx.iter() {
                    sum += wx * wy * wz * finer[(ii, jj, kk)];
                }
            }
        }
        sum
    });
}

/// Adds the prolongated `coarser` onto `finer`.
pub fn correct_array(coarser: &Array3<f64>, finer: &mut Array3<f64>) {
    let fs = finer.size();
    let cs = coarser.size();
    finer.data_mut().par_iter_mut().enumerate().for_each(|(idx, value)| {
        let (i, j, k) = fs.coords(idx);
        let tx = correct_taps(fs.x, cs.x, i);
        let ty = correct_taps(fs.y, cs.y, j);
        let tz = correct_taps(fs.z, cs.z, k);
        let mut sum = 0.0;
        for (kk, wz) in tz.iter() {
            for (jj, wy) in ty.iter() {
                for (ii, wx) in tx.iter() {
                    sum += wx * wy * wz * coarser[(ii, jj, kk)];
                }
            }
        }
        *value += sum;
    });
}

/// Per-level systems for the multigrid solvers.
#[derive(Default)]
pub struct FdmMgLinearSystem3 {
    pub a: MgMatrix<FdmBlas3>,
    pub x: MgVector<FdmBlas3>,
    pub b: MgVector<FdmBlas3>,
}

impl FdmMgLinearSystem3 {
    /// Allocates the hierarchy for `finest`. Returns `true` when the level
    /// layout changed and storage was rebuilt.
    pub fn resize_with_coarser(&mut self, finest: Size3, max_number_of_levels: usize) -> bool {
        let sizes = level_resolutions(finest, max_number_of_levels);
        if self.resolutions() == sizes {
            return false;
        }
        self.a.levels = sizes.iter().map(|&s| FdmMatrix3::new(s)).collect();
        resize_mg_vector(&mut self.x, &sizes);
        resize_mg_vector(&mut self.b, &sizes);
        true
    }

    pub fn number_of_levels(&self) -> usize {
        self.a.levels.len()
    }

    pub fn resolutions(&self) -> Vec<Size3> {
        self.a.levels.iter().map(|a| a.size()).collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub(crate) fn resize_mg_vector(v: &mut MgVector<FdmBlas3>, sizes: &[Size3]) {
    v.levels.resize_with(sizes.len(), FdmVector3::default);
    for (level, &size) in v.levels.iter_mut().zip(sizes) {
        level.resize(size);
    }
}

/// SOR smoothing plus the cell-centered transfer operators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FdmMgOperators3 {
    pub sor_factor: f64,
    pub use_red_black_ordering: bool,
}

impl Default for FdmMgOperators3 {
    fn default() -> Self {
        Self {
            sor_factor: 1.5,
            use_red_black_ordering: true,
        }
    }
}

impl MgOperators<FdmBlas3> for FdmMgOperators3 {
    fn relax(
        &self,
        a: &FdmMatrix3,
        b: &FdmVector3,
        iterations: u32,
        max_tolerance: f64,
        phase: MgRelaxPhase,
        x: &mut FdmVector3,
        buffer: &mut FdmVector3,
    ) {
        for iter in 0..iterations {
            let reverse = match phase {
                MgRelaxPhase::Coarsest => iter % 2 == 1,
                phase => phase.is_upward(),
            };
            if self.use_red_black_ordering {
                relax_red_black(a, b, self.sor_factor, reverse, x, buffer);
            } else {
                relax_gauss_seidel(a, b, self.sor_factor, reverse, x);
            }

            if phase == MgRelaxPhase::Coarsest && (iter + 1) % COARSEST_RESIDUAL_CHECK_INTERVAL == 0 {
                FdmBlas3::residual(a, x, b, buffer);
                if FdmBlas3::l2_norm(buffer) < max_tolerance {
                    break;
                }
            }
        }
    }

    fn restrict(&self, finer: &FdmVector3, coarser: &mut FdmVector3) {
        restrict_array(finer, coarser);
    }

    fn correct(&self, coarser: &FdmVector3, finer: &mut FdmVector3) {
        correct_array(coarser, finer);
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::config::PressureSolverConfig;
    use crate::fdm::assembly::{blocked_stencil, build_matrix, CellMarker};
    use crate::multigrid::mg_v_cycle;

    /// Pool filling the lower 60% of a unit square, air above.
    fn pool_marker(size: Size3, j: usize) -> CellMarker {
        if (j as f64 + 0.5) < 0.6 * size.y as f64 {
            CellMarker::Fluid
        } else {
            CellMarker::Air
        }
    }

    fn pool_hierarchy(n: usize) -> (FdmMgLinearSystem3, MgVector<FdmBlas3>) {
        let config = PressureSolverConfig::default();
        let mut system = FdmMgLinearSystem3::default();
        system.resize_with_coarser(Size3::new(n, n, 1), config.max_number_of_levels);
        let sizes = system.resolutions();

        for (level, &size) in sizes.iter().enumerate() {
            let mut markers = Array3::new(size);
            markers.par_fill_with(|_, j, _| pool_marker(size, j));
            let inv_spacing = DVec3::splat(size.x as f64);
            build_matrix(&mut system.a.levels[level], size, |i, j, k| {
                blocked_stencil(&markers, inv_spacing, None, 1.0, i, j, k)
            });
        }

        let finest = sizes[0];
        system.b.levels[0].par_fill_with(|i, j, _| {
            if pool_marker(finest, j) != CellMarker::Fluid {
                return 0.0;
            }
            let x = (i as f64 + 0.5) / finest.x as f64;
            let y = (j as f64 + 0.5) / finest.y as f64;
            (std::f64::consts::PI * x).sin() * (3.0 * y).cos() + 0.25
        });

        let mut buffer = MgVector::default();
        resize_mg_vector(&mut buffer, &sizes);
        (system, buffer)
    }

    fn assert_v_cycles_never_increase_residual(use_red_black_ordering: bool) {
        let config = PressureSolverConfig::default();
        let params = config.mg_parameters();
        let operators = FdmMgOperators3 {
            sor_factor: config.sor_factor,
            use_red_black_ordering,
        };
        let (mut system, mut buffer) = pool_hierarchy(64);
        assert_eq!(system.number_of_levels(), 5);

        let mut r = FdmVector3::new(system.b.levels[0].size());
        FdmBlas3::residual(&system.a.levels[0], &system.x.levels[0], &system.b.levels[0], &mut r);
        let initial = FdmBlas3::l2_norm(&r);
        let mut previous = initial;

        for cycle in 0..10 {
            let FdmMgLinearSystem3 { a, x, b } = &mut system;
            let result = mg_v_cycle(a, &operators, &params, x, b, &mut buffer);
            assert!(
                result.last_residual_norm <= previous * (1.0 + 1e-9),
                "red-black {use_red_black_ordering}, cycle {cycle}: {previous:e} -> {:e}",
                result.last_residual_norm
            );
            previous = result.last_residual_norm;
        }
        assert!(previous < 1e-6 * initial, "residual only fell to {previous:e} from {initial:e}");
    }

    #[test]
    fn v_cycle_residual_non_increasing_red_black() {
        assert_v_cycles_never_increase_residual(true);
    }

    #[test]
    fn v_cycle_residual_non_increasing_lexicographic() {
        assert_v_cycles_never_increase_residual(false);
    }

    #[test]
    fn level_sizes_for_planar_grid() {
        let sizes = level_resolutions(Size3::new(128, 128, 1), 6);
        assert_eq!(sizes.len(), 6);
        assert_eq!(sizes[5], Size3::new(4, 4, 1));
        assert!(sizes.iter().all(|s| s.z == 1));
    }

    #[test]
    fn level_sizes_stop_early() {
        let sizes = level_resolutions(Size3::new(12, 8, 1), 10);
        assert_eq!(sizes, vec![Size3::new(12, 8, 1), Size3::new(6, 4, 1), Size3::new(3, 2, 1)]);
    }

    #[test]
    fn restriction_preserves_constants() {
        let finer = Array3::filled(Size3::new(8, 8, 1), 2.5);
        let mut coarser = Array3::new(Size3::new(4, 4, 1));
        restrict_array(&finer, &mut coarser);
        assert!(coarser.iter().all(|&v| (v - 2.5).abs() < 1e-12));

        // Face layout: (n + 1) -> (n / 2 + 1) uses injection.
        let finer = Array3::filled(Size3::new(9, 8, 1), 1.0);
        let mut coarser = Array3::new(Size3::new(5, 4, 1));
        restrict_array(&finer, &mut coarser);
        assert!(coarser.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn correction_of_constant_adds_constant() {
        let coarser = Array3::filled(Size3::new(4, 2, 1), 1.0);
        let mut finer = Array3::filled(Size3::new(8, 4, 1), 0.5);
        correct_array(&coarser, &mut finer);
        assert!(finer.iter().all(|&v| (v - 1.5).abs() < 1e-12));
    }

    #[test]
    fn correction_interpolates_linearly_inside() {
        let mut coarser = Array3::new(Size3::new(4, 1, 1));
        coarser.par_fill_with(|i, _, _| i as f64);
        let mut finer = Array3::new(Size3::new(8, 1, 1));
        correct_array(&coarser, &mut finer);
        // Fine cell 3 sits a quarter cell right of coarse cell 1.
        assert!((finer[3] - 1.25).abs() < 1e-12);
        assert!((finer[4] - 1.75).abs() < 1e-12);
    }

    #[test]
    fn hierarchy_is_reused_for_same_size() {
        let mut system = FdmMgLinearSystem3::default();
        assert!(system.resize_with_coarser(Size3::new(32, 32, 1), 4));
        assert!(!system.resize_with_coarser(Size3::new(32, 32, 1), 4));
        assert_eq!(system.number_of_levels(), 4);
        assert!(system.resize_with_coarser(Size3::new(16, 16, 1), 4));
    }
}
