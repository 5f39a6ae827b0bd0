//! Pressure projection for incompressible flow on staggered (MAC) grids.
//!
//! The crate takes a face-centered velocity field, a fluid level set and an
//! optional solid collider and returns a divergence-free velocity. Two
//! discretizations are provided:
//!
//! - **Fractional**: variational face weights and a ghost-fluid free surface,
//!   solved with multigrid-preconditioned conjugate gradient.
//! - **Blocked**: cell markers (fluid, air, boundary) with a plain 7-point
//!   stencil, solved with Gauss-Seidel relaxation.
//!
//! All grids are 3-D; a planar simulation uses depth 1.
//!
//! ```no_run
//! use glam::DVec3;
//! use projection::prelude::*;
//!
//! let shape = GridShape::new(Size3::new(64, 64, 1), DVec3::splat(1.0 / 64.0), DVec3::ZERO)?;
//! let mut projection = PressureProjection3::new(PressureSolverConfig::default(), SolverVariant::Fractional)?;
//! projection.update_collider(None, &shape)?;
//!
//! let input = FaceCenteredGrid3::new(shape);
//! let mut output = FaceCenteredGrid3::new(shape);
//! let fluid = |p: DVec3| p.y - 0.5;
//! let stats = projection.project(&input, 1.0 / 60.0, &mut output, &fluid)?;
//! assert!(stats.converged);
//! # Ok::<(), projection::ProjectionError>(())
//! ```

pub mod array;
pub mod blas;
pub mod boundary;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod fdm;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod level_set;
pub mod multigrid;
pub mod pcg;
pub mod pressure;
pub mod projection;
pub mod solver;

pub use array::{Array3, Size3};
pub use boundary::{ClosedDomainBoundary, GridBoundaryConditionSolver3};
pub use config::{LinearSolverKind, PressureSolverConfig, SolverVariant};
pub use diagnostics::{LogObserver, NoopObserver, RecordingObserver, SolveStats, SolverObserver};
pub use error::{ProjectionError, ProjectionResult};
pub use grid::{CellCenteredScalarGrid3, CellCenteredVectorGrid3, FaceCenteredGrid3, GridShape};
pub use pressure::GridPressureSolver3;
pub use projection::PressureProjection3;

/// Everything needed to set up and run a projection.
pub mod prelude {
    pub use crate::array::{Array3, Size3};
    pub use crate::boundary::ClosedDomainBoundary;
    pub use crate::config::{LinearSolverKind, PressureSolverConfig, SolverVariant};
    pub use crate::diagnostics::{SolveStats, SolverObserver};
    pub use crate::error::{ProjectionError, ProjectionResult};
    pub use crate::field::{Collider3, ScalarField3, Surface3, VectorField3};
    pub use crate::geometry::{Box3, ImplicitSurface3, Plane3, RigidBodyCollider3, Sphere3};
    pub use crate::grid::{FaceCenteredGrid3, GridShape};
    pub use crate::projection::PressureProjection3;
}
