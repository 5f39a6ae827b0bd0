use std::sync::Arc;

use rayon::prelude::*;

use super::fractional::GridFractionalBoundaryConditionSolver3;
use super::ClosedDomainBoundary;
use crate::array::Array3;
use crate::error::ProjectionResult;
use crate::field::Collider3;
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::level_set::is_inside_sdf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColliderMarker {
    #[default]
    Fluid,
    Collider,
}

/// Whole-cell boundary conditions for the blocked pressure solver.
///
/// Runs the fractional constraints first, then forces every face between a
/// collider cell and a fluid cell to the collider velocity.
#[derive(Default)]
pub struct GridBlockedBoundaryConditionSolver3 {
    fractional: GridFractionalBoundaryConditionSolver3,
    marker: Array3<ColliderMarker>,
}

impl GridBlockedBoundaryConditionSolver3 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_collider(&mut self, collider: Option<Arc<dyn Collider3>>, shape: &GridShape) -> ProjectionResult<()> {
        self.fractional.update_collider(collider, shape)?;
        let sdf = self.fractional.collider_sdf().data();
        self.marker.resize(shape.resolution);
        self.marker.par_fill_with(|i, j, k| {
            if is_inside_sdf(sdf[(i, j, k)]) {
                ColliderMarker::Collider
            } else {
                ColliderMarker::Fluid
            }
        });
        Ok(())
    }

    pub fn constrain_velocity(&mut self, velocity: &mut FaceCenteredGrid3, extrapolation_depth: u32) -> ProjectionResult<()> {
        let shape = *velocity.shape();
        if self.fractional.shape() != Some(&shape) {
            let collider = self.fractional.collider().cloned();
            self.update_collider(collider, &shape)?;
        }
        self.fractional.constrain_velocity(velocity, extrapolation_depth)?;

        let collider = self.fractional.collider().map(|c| c.as_ref());
        let marker = &self.marker;
        let resolution = shape.resolution;
        for axis in 0..3 {
            let component = velocity.component_mut(axis);
            let size = component.size();
            component.data_mut().par_iter_mut().enumerate().for_each(|(idx, v)| {
                let face = size.coords(idx);
                // Face f on `axis` separates cells f - 1 and f.
                let mut low = [face.0, face.1, face.2];
                if low[axis] == 0 || low[axis] >= resolution.axis(axis) {
                    return;
                }
                low[axis] -= 1;
                if marker[(low[0], low[1], low[2])] != marker[face] {
                    let p = shape.face_position(axis, face.0, face.1, face.2);
                    *v = collider.map_or(0.0, |c| c.velocity_at(p)[axis]);
                }
            });
        }
        Ok(())
    }

    pub(super) fn fractional(&self) -> &GridFractionalBoundaryConditionSolver3 {
        &self.fractional
    }

    pub fn marker(&self) -> &Array3<ColliderMarker> {
        &self.marker
    }

    pub fn set_closed_domain_boundary_flag(&mut self, flag: ClosedDomainBoundary) {
        self.fractional.set_closed_domain_boundary_flag(flag);
    }
}
