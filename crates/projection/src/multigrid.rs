//! Backend-agnostic multigrid V-cycle.
//!
//! Level 0 is the finest grid. A backend supplies the BLAS kernels
//! ([`Blas`]) and the grid transfer and smoothing operators
//! ([`MgOperators`]); [`mg_v_cycle`] only sequences them.

use crate::blas::Blas;

/// One matrix per level.
pub struct MgMatrix<B: Blas> {
    pub levels: Vec<B::Matrix>,
}

impl<B: Blas> Default for MgMatrix<B> {
    fn default() -> Self {
        Self { levels: Vec::new() }
    }
}

/// One vector per level.
pub struct MgVector<B: Blas> {
    pub levels: Vec<B::Vector>,
}

impl<B: Blas> Default for MgVector<B> {
    fn default() -> Self {
        Self { levels: Vec::new() }
    }
}

impl<B: Blas> Clone for MgVector<B>
where
    B::Vector: Clone,
{
    fn clone(&self) -> Self {
        Self {
            levels: self.levels.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MgParameters {
    pub max_number_of_levels: usize,
    pub number_of_restriction_iter: u32,
    pub number_of_correction_iter: u32,
    pub number_of_coarsest_iter: u32,
    pub number_of_final_iter: u32,
    pub max_tolerance: f64,
}

impl Default for MgParameters {
    fn default() -> Self {
        Self {
            max_number_of_levels: 1,
            number_of_restriction_iter: 5,
            number_of_correction_iter: 5,
            number_of_coarsest_iter: 20,
            number_of_final_iter: 20,
            max_tolerance: 1e-9,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MgResult {
    /// Residual L2 norm on the finest level after the cycle.
    pub last_residual_norm: f64,
}

/// Where in the cycle a relaxation happens.
///
/// Smoothers that want a symmetric cycle sweep in reverse order on the way
/// back up (`Correction`, `Final`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MgRelaxPhase {
    Restriction,
    Coarsest,
    Correction,
    Final,
}

impl MgRelaxPhase {
    pub fn is_upward(self) -> bool {
        matches!(self, Self::Correction | Self::Final)
    }
}

/// Smoothing and grid transfer for one backend.
pub trait MgOperators<B: Blas> {
    /// Runs `iterations` smoothing sweeps on `a x = b`. `buffer` is scratch
    /// of the same size as `x`.
    #[allow(clippy::too_many_arguments)]
    fn relax(
        &self,
        a: &B::Matrix,
        b: &B::Vector,
        iterations: u32,
        max_tolerance: f64,
        phase: MgRelaxPhase,
        x: &mut B::Vector,
        buffer: &mut B::Vector,
    );

    /// Fine residual to coarse right-hand side.
    fn restrict(&self, finer: &B::Vector, coarser: &mut B::Vector);

    /// Adds the interpolated coarse correction to `finer`.
    fn correct(&self, coarser: &B::Vector, finer: &mut B::Vector);
}

/// Runs one V-cycle on the hierarchy, starting from the current `x`.
///
/// `b` levels below the finest and every `buffer` level are overwritten.
/// The number of levels used is the smaller of the hierarchy depth and
/// `params.max_number_of_levels`.
pub fn mg_v_cycle<B, O>(
    a: &MgMatrix<B>,
    operators: &O,
    params: &MgParameters,
    x: &mut MgVector<B>,
    b: &mut MgVector<B>,
    buffer: &mut MgVector<B>,
) -> MgResult
where
    B: Blas,
    O: MgOperators<B>,
{
    let number_of_levels = a
        .levels
        .len()
        .min(params.max_number_of_levels.max(1))
        .min(x.levels.len())
        .min(b.levels.len())
        .min(buffer.levels.len());
    if number_of_levels == 0 {
        return MgResult::default();
    }

    v_cycle_level::<B, O>(
        &a.levels[..number_of_levels],
        operators,
        params,
        0,
        params.max_tolerance,
        &mut x.levels[..number_of_levels],
        &mut b.levels[..number_of_levels],
        &mut buffer.levels[..number_of_levels],
    )
}

/// Slices start at `level`; index 0 of each slice is the current level.
#[allow(clippy::too_many_arguments)]
fn v_cycle_level<B, O>(
    a: &[B::Matrix],
    operators: &O,
    params: &MgParameters,
    level: usize,
    max_tolerance: f64,
    x: &mut [B::Vector],
    b: &mut [B::Vector],
    buffer: &mut [B::Vector],
) -> MgResult
where
    B: Blas,
    O: MgOperators<B>,
{
    operators.relax(
        &a[0],
        &b[0],
        params.number_of_restriction_iter,
        max_tolerance,
        MgRelaxPhase::Restriction,
        &mut x[0],
        &mut buffer[0],
    );

    if a.len() > 1 {
        B::residual(&a[0], &x[0], &b[0], &mut buffer[0]);

        let (b_fine, b_coarse) = b.split_at_mut(1);
        let (x_fine, x_coarse) = x.split_at_mut(1);
        let (buffer_fine, buffer_coarse) = buffer.split_at_mut(1);
        operators.restrict(&buffer_fine[0], &mut b_coarse[0]);
        B::set(0.0, &mut x_coarse[0]);

        v_cycle_level::<B, O>(
            &a[1..],
            operators,
            params,
            level + 1,
            0.5 * max_tolerance,
            x_coarse,
            b_coarse,
            buffer_coarse,
        );

        operators.correct(&x_coarse[0], &mut x_fine[0]);

        let (iterations, phase) = if level == 0 {
            (params.number_of_final_iter, MgRelaxPhase::Final)
        } else {
            (params.number_of_correction_iter, MgRelaxPhase::Correction)
        };
        operators.relax(
            &a[0],
            &b_fine[0],
            iterations,
            max_tolerance,
            phase,
            &mut x_fine[0],
            &mut buffer_fine[0],
        );
    } else {
        operators.relax(
            &a[0],
            &b[0],
            params.number_of_coarsest_iter,
            max_tolerance,
            MgRelaxPhase::Coarsest,
            &mut x[0],
            &mut buffer[0],
        );
    }

    B::residual(&a[0], &x[0], &b[0], &mut buffer[0]);
    MgResult {
        last_residual_norm: B::l2_norm(&buffer[0]),
    }
}
