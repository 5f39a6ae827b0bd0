//! Solve statistics and per-iteration telemetry hooks.

use parking_lot::Mutex;

use crate::config::LinearSolverKind;

/// Outcome of one linear solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolveStats {
    pub iterations: u32,
    /// L2 norm of the final residual.
    pub residual: f64,
    pub converged: bool,
}

/// Receives residual updates from the iterative solvers.
pub trait SolverObserver: Send + Sync {
    fn on_iteration(&self, _solver: LinearSolverKind, _iteration: u32, _residual: f64) {}

    fn on_solve_finished(&self, _solver: LinearSolverKind, _stats: &SolveStats) {}
}

/// Ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl SolverObserver for NoopObserver {}

/// Forwards residuals to the `log` facade at trace level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl SolverObserver for LogObserver {
    fn on_iteration(&self, solver: LinearSolverKind, iteration: u32, residual: f64) {
        log::trace!("{solver:?} iteration {iteration}: residual {residual:.3e}");
    }

    fn on_solve_finished(&self, solver: LinearSolverKind, stats: &SolveStats) {
        log::trace!(
            "{solver:?} finished after {} iterations, residual {:.3e}",
            stats.iterations,
            stats.residual
        );
    }
}

/// Keeps the residual history, mostly for tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    history: Mutex<Vec<(LinearSolverKind, u32, f64)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<(LinearSolverKind, u32, f64)> {
        self.history.lock().clone()
    }

    pub fn residuals(&self) -> Vec<f64> {
        self.history.lock().iter().map(|&(_, _, r)| r).collect()
    }

    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

impl SolverObserver for RecordingObserver {
    fn on_iteration(&self, solver: LinearSolverKind, iteration: u32, residual: f64) {
        self.history.lock().push((solver, iteration, residual));
    }
}
