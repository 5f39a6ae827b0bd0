//! Preconditioned conjugate gradient over any [`Blas`] backend.

use crate::blas::Blas;
use crate::config::LinearSolverKind;
use crate::constants::PCG_RESIDUAL_REFRESH_INTERVAL;
use crate::diagnostics::{SolveStats, SolverObserver};

/// Approximates `x = M^-1 b`.
pub trait Preconditioner<B: Blas> {
    fn solve(&mut self, b: &B::Vector, x: &mut B::Vector);
}

/// Identity preconditioner; turns [`pcg`] into plain CG.
pub struct NullPreconditioner;

impl<B: Blas> Preconditioner<B> for NullPreconditioner {
    fn solve(&mut self, b: &B::Vector, x: &mut B::Vector) {
        B::set(0.0, x);
        B::axpy(1.0, b, x);
    }
}

/// Scratch vectors, sized like `x`.
pub struct PcgBuffers<'a, B: Blas> {
    pub r: &'a mut B::Vector,
    pub d: &'a mut B::Vector,
    pub q: &'a mut B::Vector,
    pub s: &'a mut B::Vector,
}

/// Solves `a x = b` starting from the current `x`.
///
/// Stops when the residual L2 norm drops to `tolerance` or after
/// `max_number_of_iterations`. The residual is recomputed from scratch every
/// few iterations, and whenever `r . M^-1 r` grows, to limit drift.
#[allow(clippy::too_many_arguments)]
pub fn pcg<B, P>(
    a: &B::Matrix,
    b: &B::Vector,
    max_number_of_iterations: u32,
    tolerance: f64,
    preconditioner: &mut P,
    x: &mut B::Vector,
    buffers: PcgBuffers<'_, B>,
    observer: &dyn SolverObserver,
    kind: LinearSolverKind,
) -> SolveStats
where
    B: Blas,
    P: Preconditioner<B>,
{
    let PcgBuffers { r, d, q, s } = buffers;

    B::set(0.0, d);
    B::set(0.0, q);
    B::set(0.0, s);

    B::residual(a, x, b, r);
    let mut residual = B::l2_norm(r);
    let mut iteration = 0;

    if residual > tolerance {
        preconditioner.solve(r, d);
        let mut sigma_new = B::dot(r, d);
        let mut trigger = false;

        while residual > tolerance && iteration < max_number_of_iterations {
            B::mvm(a, d, q);
            let dq = B::dot(d, q);
            if dq == 0.0 || !dq.is_finite() {
                log::warn!("{kind:?}: search direction collapsed at iteration {iteration}");
                break;
            }
            let alpha = sigma_new / dq;
            B::axpy(alpha, d, x);

            if trigger || (iteration > 0 && iteration % PCG_RESIDUAL_REFRESH_INTERVAL == 0) {
                B::residual(a, x, b, r);
                trigger = false;
            } else {
                B::axpy(-alpha, q, r);
            }

            preconditioner.solve(r, s);
            let sigma_old = sigma_new;
            sigma_new = B::dot(r, s);
            if sigma_new > sigma_old {
                trigger = true;
            }

            iteration += 1;
            residual = B::l2_norm(r);
            observer.on_iteration(kind, iteration, residual);

            if sigma_old == 0.0 {
                break;
            }
            let beta = sigma_new / sigma_old;
            B::xpay(s, beta, d);
        }
    }

    let stats = SolveStats {
        iterations: iteration,
        residual,
        converged: residual <= tolerance,
    };
    observer.on_solve_finished(kind, &stats);
    stats
}
