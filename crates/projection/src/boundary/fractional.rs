use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

use super::{apply_closed_domain_boundary, BoundaryState, ClosedDomainBoundary};
use crate::array::Array3;
use crate::error::ProjectionResult;
use crate::field::Collider3;
use crate::grid::{
    extrapolate_to_region, CellCenteredScalarGrid3, CellCenteredVectorGrid3, FaceCenteredGrid3, GridShape,
};
use crate::level_set::{is_inside_sdf, open_fraction, project_and_apply_friction};

/// Boundary conditions with sub-cell collider resolution.
///
/// Each face stores the fraction of it left open by the collider. Faces with
/// no opening take the collider velocity, the result is extrapolated into the
/// solid, and faces inside the solid lose their relative normal velocity.
pub struct GridFractionalBoundaryConditionSolver3 {
    collider: Option<Arc<dyn Collider3>>,
    closed_domain_boundary_flag: ClosedDomainBoundary,
    shape: Option<GridShape>,
    collider_sdf: CellCenteredScalarGrid3,
    collider_velocity: CellCenteredVectorGrid3,
    open_fractions: [Array3<f64>; 3],
    face_valid: [Array3<bool>; 3],
    scratch: FaceCenteredGrid3,
    state: BoundaryState,
}

impl Default for GridFractionalBoundaryConditionSolver3 {
    fn default() -> Self {
        Self {
            collider: None,
            closed_domain_boundary_flag: ClosedDomainBoundary::ALL,
            shape: None,
            collider_sdf: CellCenteredScalarGrid3::default(),
            collider_velocity: CellCenteredVectorGrid3::default(),
            open_fractions: Default::default(),
            face_valid: Default::default(),
            scratch: FaceCenteredGrid3::default(),
            state: BoundaryState::Uninitialized,
        }
    }
}

impl GridFractionalBoundaryConditionSolver3 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_collider(&mut self, collider: Option<Arc<dyn Collider3>>, shape: &GridShape) -> ProjectionResult<()> {
        shape.validate()?;
        let shape = *shape;
        self.collider = collider;
        self.shape = Some(shape);
        self.collider_sdf.resize(shape);
        self.collider_velocity.resize(shape);

        match self.collider.as_deref() {
            Some(collider) => {
                let surface = collider.surface();
                self.collider_sdf
                    .data_mut()
                    .par_fill_with(|i, j, k| surface.signed_distance(shape.cell_center(i, j, k)));
                self.collider_velocity
                    .data_mut()
                    .par_fill_with(|i, j, k| collider.velocity_at(shape.cell_center(i, j, k)));
            }
            None => {
                self.collider_sdf.data_mut().fill(f64::MAX);
                self.collider_velocity.data_mut().fill(DVec3::ZERO);
            }
        }

        let sdf = &self.collider_sdf;
        let h = shape.spacing;
        for (axis, fractions) in self.open_fractions.iter_mut().enumerate() {
            let mut half = DVec3::ZERO;
            half[axis] = 0.5 * h[axis];
            fractions.resize(shape.resolution.staggered(axis));
            fractions.par_fill_with(|i, j, k| {
                let p = shape.face_position(axis, i, j, k);
                open_fraction(sdf.sample(p - half), sdf.sample(p + half))
            });
        }

        self.state = BoundaryState::ColliderBound;
        log::debug!(
            "collider {} sampled on {:?}",
            if self.collider.is_some() { "bound" } else { "cleared" },
            shape.resolution
        );
        Ok(())
    }

    pub fn constrain_velocity(&mut self, velocity: &mut FaceCenteredGrid3, extrapolation_depth: u32) -> ProjectionResult<()> {
        let shape = *velocity.shape();
        if self.shape != Some(shape) {
            let collider = self.collider.clone();
            self.update_collider(collider, &shape)?;
        }

        let collider = self.collider.as_deref();

        // Closed faces take the collider velocity; open faces seed the
        // extrapolation into the solid.
        for axis in 0..3 {
            let open = &self.open_fractions[axis];
            let valid = &mut self.face_valid[axis];
            valid.resize(open.size());
            let size = open.size();
            velocity
                .component_mut(axis)
                .data_mut()
                .par_iter_mut()
                .zip(valid.data_mut().par_iter_mut())
                .enumerate()
                .for_each(|(idx, (v, is_valid))| {
                    *is_valid = open[idx] > 0.0;
                    if !*is_valid {
                        let (i, j, k) = size.coords(idx);
                        *v = collider.map_or(0.0, |c| c.velocity_at(shape.face_position(axis, i, j, k))[axis]);
                    }
                });
            extrapolate_to_region(velocity.component_mut(axis), valid, extrapolation_depth);
        }

        if let Some(collider) = collider {
            let friction = collider.friction_coefficient();
            let sdf = &self.collider_sdf;
            self.scratch.set(velocity);
            let snapshot = &self.scratch;
            for axis in 0..3 {
                let component = velocity.component_mut(axis);
                let size = component.size();
                component.data_mut().par_iter_mut().enumerate().for_each(|(idx, v)| {
                    let (i, j, k) = size.coords(idx);
                    let p = shape.face_position(axis, i, j, k);
                    if !is_inside_sdf(sdf.sample(p)) {
                        return;
                    }
                    let collider_velocity = collider.velocity_at(p);
                    let gradient = sdf.gradient(p);
                    *v = if gradient.length_squared() > 0.0 {
                        let normal = gradient.normalize();
                        let relative = snapshot.sample(p) - collider_velocity;
                        (project_and_apply_friction(relative, normal, friction) + collider_velocity)[axis]
                    } else {
                        collider_velocity[axis]
                    };
                });
            }
        }

        apply_closed_domain_boundary(velocity, self.closed_domain_boundary_flag);
        self.state = BoundaryState::VelocityConstrained;
        Ok(())
    }

    pub fn collider(&self) -> Option<&Arc<dyn Collider3>> {
        self.collider.as_ref()
    }

    pub fn collider_sdf(&self) -> &CellCenteredScalarGrid3 {
        &self.collider_sdf
    }

    pub fn collider_velocity_field(&self) -> &CellCenteredVectorGrid3 {
        &self.collider_velocity
    }

    /// Open fraction of each face, per axis.
    pub fn open_fractions(&self) -> &[Array3<f64>; 3] {
        &self.open_fractions
    }

    pub fn shape(&self) -> Option<&GridShape> {
        self.shape.as_ref()
    }

    pub fn state(&self) -> BoundaryState {
        self.state
    }

    pub fn closed_domain_boundary_flag(&self) -> ClosedDomainBoundary {
        self.closed_domain_boundary_flag
    }

    pub fn set_closed_domain_boundary_flag(&mut self, flag: ClosedDomainBoundary) {
        self.closed_domain_boundary_flag = flag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Size3;
    use crate::geometry::{Plane3, RigidBodyCollider3};

    fn shape() -> GridShape {
        GridShape::new(Size3::new(8, 8, 1), DVec3::splat(0.125), DVec3::ZERO).unwrap()
    }

    #[test]
    fn no_collider_leaves_interior_and_zeroes_walls() {
        let mut solver = GridFractionalBoundaryConditionSolver3::new();
        solver.update_collider(None, &shape()).unwrap();
        assert!(solver.collider_sdf().data().iter().all(|&phi| phi == f64::MAX));

        let mut velocity = FaceCenteredGrid3::new(shape());
        velocity.fill(DVec3::new(1.0, 2.0, 0.0));
        solver.constrain_velocity(&mut velocity, 5).unwrap();

        assert_eq!(velocity.u()[(0, 3, 0)], 0.0);
        assert_eq!(velocity.u()[(8, 3, 0)], 0.0);
        assert_eq!(velocity.u()[(4, 3, 0)], 1.0);
        assert_eq!(velocity.v()[(4, 0, 0)], 0.0);
        assert_eq!(velocity.v()[(4, 4, 0)], 2.0);
        assert_eq!(solver.state(), BoundaryState::VelocityConstrained);
    }

    #[test]
    fn open_walls_keep_velocity() {
        let mut solver = GridFractionalBoundaryConditionSolver3::new();
        solver.set_closed_domain_boundary_flag(ClosedDomainBoundary::ALL.without(ClosedDomainBoundary::LEFT));
        let mut velocity = FaceCenteredGrid3::new(shape());
        velocity.fill(DVec3::X);
        // Not bound yet: constrain binds a domain-only boundary.
        solver.constrain_velocity(&mut velocity, 1).unwrap();
        assert_eq!(velocity.u()[(0, 3, 0)], 1.0);
        assert_eq!(velocity.u()[(8, 3, 0)], 0.0);
    }

    #[test]
    fn floor_collider_removes_inflow_into_solid() {
        // Solid below y = 0.3.
        let floor = RigidBodyCollider3::new(Plane3::new(DVec3::Y, DVec3::new(0.0, 0.3, 0.0)));
        let mut solver = GridFractionalBoundaryConditionSolver3::new();
        solver.set_closed_domain_boundary_flag(ClosedDomainBoundary::NONE);
        solver.update_collider(Some(Arc::new(floor)), &shape()).unwrap();

        let mut velocity = FaceCenteredGrid3::new(shape());
        velocity.fill(DVec3::new(0.5, -1.0, 0.0));
        solver.constrain_velocity(&mut velocity, 5).unwrap();

        // v face at y = 0.125 is inside the floor: no normal flow left.
        assert!(velocity.v()[(3, 1, 0)].abs() < 1e-12);
        // Tangential motion survives without friction.
        assert!((velocity.u()[(3, 1, 0)] - 0.5).abs() < 1e-12);
        // Fluid above is untouched.
        assert_eq!(velocity.v()[(3, 5, 0)], -1.0);
    }

    #[test]
    fn rebinding_same_collider_is_idempotent() {
        let floor: Arc<dyn Collider3> = Arc::new(RigidBodyCollider3::new(Plane3::new(DVec3::Y, DVec3::splat(0.3))));
        let mut solver = GridFractionalBoundaryConditionSolver3::new();
        solver.update_collider(Some(floor.clone()), &shape()).unwrap();
        let sdf = solver.collider_sdf().clone();
        let fractions = solver.open_fractions().clone();
        solver.update_collider(Some(floor), &shape()).unwrap();
        assert_eq!(solver.collider_sdf(), &sdf);
        assert_eq!(solver.open_fractions(), &fractions);
    }
}
