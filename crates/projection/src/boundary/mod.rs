//! Collider caches and velocity constraints.
//!
//! A boundary condition solver samples the collider onto the simulation grid
//! ([`update_collider`](GridBoundaryConditionSolver3::update_collider)) and
//! then enforces no-flux, friction and closed domain walls on a velocity
//! field ([`constrain_velocity`](GridBoundaryConditionSolver3::constrain_velocity)).

mod blocked;
mod fractional;

pub use blocked::{ColliderMarker, GridBlockedBoundaryConditionSolver3};
pub use fractional::GridFractionalBoundaryConditionSolver3;

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::array::Array3;
use crate::error::ProjectionResult;
use crate::field::Collider3;
use crate::grid::{CellCenteredScalarGrid3, CellCenteredVectorGrid3, FaceCenteredGrid3, GridShape};

/// Set of closed domain walls. Closed walls get zero normal velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct ClosedDomainBoundary(u8);

impl ClosedDomainBoundary {
    pub const NONE: Self = Self(0);
    /// `-x`
    pub const LEFT: Self = Self(1);
    /// `+x`
    pub const RIGHT: Self = Self(1 << 1);
    /// `-y`
    pub const DOWN: Self = Self(1 << 2);
    /// `+y`
    pub const UP: Self = Self(1 << 3);
    /// `-z`
    pub const BACK: Self = Self(1 << 4);
    /// `+z`
    pub const FRONT: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b11_1111);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Wall on `axis`, negative or positive side.
    pub const fn wall(axis: usize, plus: bool) -> Self {
        Self(1 << (2 * axis + plus as usize))
    }
}

impl From<u8> for ClosedDomainBoundary {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<ClosedDomainBoundary> for u8 {
    fn from(flag: ClosedDomainBoundary) -> u8 {
        flag.bits()
    }
}

impl BitOr for ClosedDomainBoundary {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClosedDomainBoundary {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Lifecycle of a boundary condition solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryState {
    #[default]
    Uninitialized,
    ColliderBound,
    VelocityConstrained,
}

/// Zeroes the normal velocity on every closed domain wall.
pub(crate) fn apply_closed_domain_boundary(velocity: &mut FaceCenteredGrid3, flag: ClosedDomainBoundary) {
    let resolution = velocity.shape().resolution;
    for axis in 0..3 {
        let n = resolution.axis(axis);
        let close_low = flag.contains(ClosedDomainBoundary::wall(axis, false));
        let close_high = flag.contains(ClosedDomainBoundary::wall(axis, true));
        if !(close_low || close_high) {
            continue;
        }
        let component = velocity.component_mut(axis);
        let size = component.size();
        component
            .data_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, v)| {
                let (i, j, k) = size.coords(idx);
                let f = [i, j, k][axis];
                if (close_low && f == 0) || (close_high && f == n) {
                    *v = 0.0;
                }
            });
    }
}

/// Boundary handling paired with a pressure solver variant.
pub enum GridBoundaryConditionSolver3 {
    Fractional(GridFractionalBoundaryConditionSolver3),
    Blocked(GridBlockedBoundaryConditionSolver3),
}

impl GridBoundaryConditionSolver3 {
    /// Resamples the collider on `shape`. `None` means no collider.
    pub fn update_collider(
        &mut self,
        collider: Option<Arc<dyn Collider3>>,
        shape: &GridShape,
    ) -> ProjectionResult<()> {
        match self {
            Self::Fractional(s) => s.update_collider(collider, shape),
            Self::Blocked(s) => s.update_collider(collider, shape),
        }
    }

    /// Enforces collider and domain-wall constraints on `velocity` in place.
    pub fn constrain_velocity(
        &mut self,
        velocity: &mut FaceCenteredGrid3,
        extrapolation_depth: u32,
    ) -> ProjectionResult<()> {
        match self {
            Self::Fractional(s) => s.constrain_velocity(velocity, extrapolation_depth),
            Self::Blocked(s) => s.constrain_velocity(velocity, extrapolation_depth),
        }
    }

    fn fractional(&self) -> &GridFractionalBoundaryConditionSolver3 {
        match self {
            Self::Fractional(s) => s,
            Self::Blocked(s) => s.fractional(),
        }
    }

    pub fn collider(&self) -> Option<&Arc<dyn Collider3>> {
        self.fractional().collider()
    }

    /// Collider signed distance at cell centers.
    pub fn collider_sdf(&self) -> &CellCenteredScalarGrid3 {
        self.fractional().collider_sdf()
    }

    /// Collider velocity at cell centers.
    pub fn collider_velocity_field(&self) -> &CellCenteredVectorGrid3 {
        self.fractional().collider_velocity_field()
    }

    /// Open (non-collider) fraction of every face, one array per axis.
    pub fn open_fractions(&self) -> &[Array3<f64>; 3] {
        self.fractional().open_fractions()
    }

    /// Grid the caches were built for.
    pub fn shape(&self) -> Option<&GridShape> {
        self.fractional().shape()
    }

    pub fn state(&self) -> BoundaryState {
        self.fractional().state()
    }

    pub fn closed_domain_boundary_flag(&self) -> ClosedDomainBoundary {
        self.fractional().closed_domain_boundary_flag()
    }

    pub fn set_closed_domain_boundary_flag(&mut self, flag: ClosedDomainBoundary) {
        match self {
            Self::Fractional(s) => s.set_closed_domain_boundary_flag(flag),
            Self::Blocked(s) => s.set_closed_domain_boundary_flag(flag),
        }
    }
}
