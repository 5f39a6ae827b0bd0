//! Poisson system assembly.
//!
//! Both boundary treatments produce a [`CellStencil`] per cell. The same
//! stencil feeds the grid form, the per-level multigrid matrices and the
//! compressed form, so the three always agree.
//!
//! Sign convention: the matrix is positive (center > 0, couplings < 0) and
//! `b = -(density / dt) * divergence`, so the solution is the pressure.

use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::compressed::FdmCompressedLinearSystem3;
use super::{FdmMatrix3, FdmMatrixRow3, FdmVector3};
use crate::array::{Array3, Size3};
use crate::constants::MIN_THETA;
use crate::field::VectorField3;
use crate::grid::{FaceCenteredGrid3, GridShape};
use crate::level_set::{fraction_inside_sdf, is_inside_sdf, sanitize_fraction};

/// `(axis, positive side)` for the six faces of a cell, in stencil slot
/// order: left, right, down, up, back, front.
pub const FACES: [(usize, bool); 6] = [
    (0, false),
    (0, true),
    (1, false),
    (1, true),
    (2, false),
    (2, true),
];

/// Cell classification for the blocked discretization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellMarker {
    Fluid,
    #[default]
    Air,
    Boundary,
}

/// One matrix row with its couplings to all six neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellStencil {
    pub center: f64,
    /// Indexed like [`FACES`]; zero means no coupling.
    pub neighbors: [f64; 6],
    pub rhs: f64,
}

impl CellStencil {
    pub const IDENTITY: Self = Self {
        center: 1.0,
        neighbors: [0.0; 6],
        rhs: 0.0,
    };

    pub fn row(&self) -> FdmMatrixRow3 {
        FdmMatrixRow3 {
            center: self.center,
            right: self.neighbors[1],
            up: self.neighbors[3],
            front: self.neighbors[5],
        }
    }
}

#[inline]
pub(crate) fn neighbor_cell(
    size: Size3,
    (i, j, k): (usize, usize, usize),
    axis: usize,
    plus: bool,
) -> Option<(usize, usize, usize)> {
    let mut c = [i, j, k];
    if plus {
        if c[axis] + 1 >= size.axis(axis) {
            return None;
        }
        c[axis] += 1;
    } else {
        c[axis] = c[axis].checked_sub(1)?;
    }
    Some((c[0], c[1], c[2]))
}

/// Face array index of a cell's face on `axis`.
#[inline]
pub(crate) fn face_of_cell((i, j, k): (usize, usize, usize), axis: usize, plus: bool) -> (usize, usize, usize) {
    let mut f = [i, j, k];
    if plus {
        f[axis] += 1;
    }
    (f[0], f[1], f[2])
}

/// Inputs for the fractional (variational) stencil on one level.
///
/// Without `velocity` and `boundary_velocity` only the matrix is meaningful
/// and `rhs` is zero; coarse multigrid levels are built that way.
pub struct FractionalStencilInput<'a> {
    pub shape: GridShape,
    pub fluid_sdf: &'a Array3<f64>,
    /// Open fraction per face, one array per axis.
    pub weights: [&'a Array3<f64>; 3],
    pub velocity: Option<&'a FaceCenteredGrid3>,
    pub boundary_velocity: Option<&'a dyn VectorField3>,
    /// `density / dt`.
    pub rhs_scale: f64,
}

/// Stencil of one cell for the fractional discretization.
///
/// Fluid neighbors couple with the face weight; air neighbors add a
/// ghost-fluid term scaled by the interface fraction. Domain-edge faces only
/// contribute their prescribed velocity to the right-hand side, and every
/// face adds the collider flux through its closed fraction.
pub fn fractional_stencil(input: &FractionalStencilInput<'_>, i: usize, j: usize, k: usize) -> CellStencil {
    let size = input.shape.resolution;
    let cell = (i, j, k);
    let phi = input.fluid_sdf[cell];
    if !is_inside_sdf(phi) {
        return CellStencil::IDENTITY;
    }

    let inv_h = input.shape.inv_spacing();
    let mut stencil = CellStencil::default();
    let mut divergence = 0.0;

    for (slot, &(axis, plus)) in FACES.iter().enumerate() {
        let face = face_of_cell(cell, axis, plus);
        let weight = input.weights[axis][face];
        let sign = if plus { 1.0 } else { -1.0 };
        let inv_h_axis = inv_h[axis];
        let face_velocity = input
            .velocity
            .map_or(0.0, |velocity| velocity.component(axis)[face]);

        match neighbor_cell(size, cell, axis, plus) {
            Some(n) => {
                let term = weight * inv_h_axis * inv_h_axis;
                let phi_n = input.fluid_sdf[n];
                if is_inside_sdf(phi_n) {
                    stencil.center += term;
                    stencil.neighbors[slot] = -term;
                } else {
                    let theta = sanitize_fraction(fraction_inside_sdf(phi, phi_n)).max(MIN_THETA);
                    stencil.center += term / theta;
                }
                divergence += sign * weight * face_velocity * inv_h_axis;
            }
            None => divergence += sign * face_velocity * inv_h_axis,
        }

        if weight < 1.0 {
            if let Some(boundary_velocity) = input.boundary_velocity {
                let p = input.shape.face_position(axis, face.0, face.1, face.2);
                divergence += sign * (1.0 - weight) * boundary_velocity.sample(p)[axis] * inv_h_axis;
            }
        }
    }

    if stencil.center < f64::EPSILON {
        return CellStencil::IDENTITY;
    }
    stencil.rhs = -input.rhs_scale * divergence;
    stencil
}

/// Stencil of one cell for the blocked discretization: `1/dx^2` per
/// non-boundary neighbor, couplings to fluid neighbors only.
pub fn blocked_stencil(
    markers: &Array3<CellMarker>,
    inv_spacing: DVec3,
    velocity: Option<&FaceCenteredGrid3>,
    rhs_scale: f64,
    i: usize,
    j: usize,
    k: usize,
) -> CellStencil {
    let size = markers.size();
    let cell = (i, j, k);
    if markers[cell] != CellMarker::Fluid {
        return CellStencil::IDENTITY;
    }

    let mut stencil = CellStencil::default();
    for (slot, &(axis, plus)) in FACES.iter().enumerate() {
        let Some(n) = neighbor_cell(size, cell, axis, plus) else {
            continue;
        };
        let term = inv_spacing[axis] * inv_spacing[axis];
        match markers[n] {
            CellMarker::Boundary => {}
            CellMarker::Air => stencil.center += term,
            CellMarker::Fluid => {
                stencil.center += term;
                stencil.neighbors[slot] = -term;
            }
        }
    }

    if stencil.center < f64::EPSILON {
        return CellStencil::IDENTITY;
    }
    stencil.rhs = velocity.map_or(0.0, |v| -rhs_scale * v.divergence_at_cell_center(i, j, k));
    stencil
}

/// Fills a grid-form matrix and right-hand side from `stencil`.
pub fn build_system<F>(a: &mut FdmMatrix3, b: &mut FdmVector3, size: Size3, stencil: F)
where
    F: Fn(usize, usize, usize) -> CellStencil + Sync,
{
    a.resize(size);
    b.resize(size);
    a.data_mut()
        .par_iter_mut()
        .zip(b.data_mut().par_iter_mut())
        .enumerate()
        .for_each(|(idx, (row, rhs))| {
            let (i, j, k) = size.coords(idx);
            let s = stencil(i, j, k);
            *row = s.row();
            *rhs = s.rhs;
        });
}

/// Fills only the matrix; used for coarse multigrid levels.
pub fn build_matrix<F>(a: &mut FdmMatrix3, size: Size3, stencil: F)
where
    F: Fn(usize, usize, usize) -> CellStencil + Sync,
{
    a.resize(size);
    a.par_fill_with(|i, j, k| stencil(i, j, k).row());
}

/// Fills the compressed system with one row per cell where `is_active`
/// holds. Couplings to inactive cells are dropped.
pub fn build_compressed_system<A, F>(system: &mut FdmCompressedLinearSystem3, size: Size3, is_active: A, stencil: F)
where
    A: Fn(usize, usize, usize) -> bool + Sync,
    F: Fn(usize, usize, usize) -> CellStencil + Sync,
{
    system.reset(size);

    let active: Vec<usize> = (0..size.len())
        .into_par_iter()
        .filter(|&idx| {
            let (i, j, k) = size.coords(idx);
            is_active(i, j, k)
        })
        .collect();
    for (row, &idx) in active.iter().enumerate() {
        system.cell_to_row_mut()[idx] = Some(row);
    }

    let stencils: Vec<CellStencil> = active
        .par_iter()
        .map(|&idx| {
            let (i, j, k) = size.coords(idx);
            stencil(i, j, k)
        })
        .collect();

    let mut entries = Vec::with_capacity(7);
    for (row, (&idx, s)) in active.iter().zip(&stencils).enumerate() {
        entries.clear();
        entries.push((row, s.center));
        let cell = size.coords(idx);
        for (slot, &(axis, plus)) in FACES.iter().enumerate() {
            if s.neighbors[slot] == 0.0 {
                continue;
            }
            let column = neighbor_cell(size, cell, axis, plus)
                .and_then(|(ni, nj, nk)| system.cell_to_row()[(ni, nj, nk)]);
            if let Some(column) = column {
                entries.push((column, s.neighbors[slot]));
            }
        }
        system.a.add_row(&entries);
        system.b.push(s.rhs);
    }
    system.x.resize(active.len(), 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::FdmLinearSystem3;
    use crate::field::ConstantVectorField;

    fn shape(n: usize) -> GridShape {
        GridShape::new(Size3::new(n, n, 1), DVec3::ONE, DVec3::ZERO).unwrap()
    }

    fn open_weights(shape: &GridShape) -> [Array3<f64>; 3] {
        let r = shape.resolution;
        [0, 1, 2].map(|axis| Array3::filled(r.staggered(axis), 1.0))
    }

    #[test]
    fn all_fluid_interior_row_is_five_point_laplacian() {
        let shape = shape(4);
        let sdf = Array3::filled(shape.resolution, -1.0);
        let w = open_weights(&shape);
        let input = FractionalStencilInput {
            shape,
            fluid_sdf: &sdf,
            weights: [&w[0], &w[1], &w[2]],
            velocity: None,
            boundary_velocity: None,
            rhs_scale: 1.0,
        };
        let s = fractional_stencil(&input, 1, 1, 0);
        assert_eq!(s.center, 4.0);
        assert_eq!(s.neighbors, [-1.0, -1.0, -1.0, -1.0, 0.0, 0.0]);

        // Corner cell only couples inward; domain faces are Neumann.
        let s = fractional_stencil(&input, 0, 0, 0);
        assert_eq!(s.center, 2.0);
    }

    #[test]
    fn air_cells_are_identity_and_ghost_fluid_strengthens_center() {
        let shape = shape(4);
        let mut sdf = Array3::new(shape.resolution);
        sdf.par_fill_with(|_, j, _| j as f64 - 1.5);
        let w = open_weights(&shape);
        let input = FractionalStencilInput {
            shape,
            fluid_sdf: &sdf,
            weights: [&w[0], &w[1], &w[2]],
            velocity: None,
            boundary_velocity: None,
            rhs_scale: 1.0,
        };
        assert_eq!(fractional_stencil(&input, 1, 3, 0), CellStencil::IDENTITY);
        // Row j = 1: phi = -0.5, air above at +0.5 so theta = 0.5.
        let s = fractional_stencil(&input, 1, 1, 0);
        assert!((s.center - (3.0 + 2.0)).abs() < 1e-12);
        assert_eq!(s.neighbors[3], 0.0);
    }

    #[test]
    fn closed_faces_take_collider_flux() {
        let shape = shape(3);
        let sdf = Array3::filled(shape.resolution, -1.0);
        let mut w = open_weights(&shape);
        // Close the left face of cell (1, 1).
        w[0][(1, 1, 0)] = 0.0;
        let moving = ConstantVectorField(DVec3::new(2.0, 0.0, 0.0));
        let input = FractionalStencilInput {
            shape,
            fluid_sdf: &sdf,
            weights: [&w[0], &w[1], &w[2]],
            velocity: None,
            boundary_velocity: Some(&moving),
            rhs_scale: 1.0,
        };
        let s = fractional_stencil(&input, 1, 1, 0);
        assert_eq!(s.center, 3.0);
        assert_eq!(s.neighbors[0], 0.0);
        // Inflow of 2 through the left face: divergence -2, rhs +2.
        assert!((s.rhs - 2.0).abs() < 1e-12);
    }

    #[test]
    fn blocked_stencil_skips_boundary_neighbors() {
        let size = Size3::new(3, 3, 1);
        let mut markers = Array3::filled(size, CellMarker::Fluid);
        markers[(0, 1, 0)] = CellMarker::Boundary;
        markers[(1, 2, 0)] = CellMarker::Air;
        let s = blocked_stencil(&markers, DVec3::ONE, None, 1.0, 1, 1, 0);
        assert_eq!(s.center, 3.0);
        assert_eq!(s.neighbors, [0.0, -1.0, -1.0, 0.0, 0.0, 0.0]);
        assert_eq!(blocked_stencil(&markers, DVec3::ONE, None, 1.0, 0, 1, 0), CellStencil::IDENTITY);
    }

    #[test]
    fn compressed_matches_grid_form() {
        let shape = shape(4);
        let mut sdf = Array3::new(shape.resolution);
        sdf.par_fill_with(|i, j, _| (i + j) as f64 - 3.5);
        let w = open_weights(&shape);
        let velocity = FaceCenteredGrid3::from_field(shape, &|p: DVec3| DVec3::new(p.y, -p.x, 0.0));
        let input = FractionalStencilInput {
            shape,
            fluid_sdf: &sdf,
            weights: [&w[0], &w[1], &w[2]],
            velocity: Some(&velocity),
            boundary_velocity: None,
            rhs_scale: 2.0,
        };
        let stencil = |i, j, k| fractional_stencil(&input, i, j, k);

        let mut grid = FdmLinearSystem3::default();
        build_system(&mut grid.a, &mut grid.b, shape.resolution, stencil);
        let mut comp = FdmCompressedLinearSystem3::default();
        build_compressed_system(&mut comp, shape.resolution, |i, j, k| sdf[(i, j, k)] < 0.0, stencil);

        let fluid_cells = sdf.iter().filter(|&&phi| phi < 0.0).count();
        assert_eq!(comp.a.rows(), fluid_cells);
        for (idx, row) in comp.cell_to_row().iter().enumerate() {
            if let Some(row) = *row {
                assert_eq!(comp.a.diagonal(row), grid.a[idx].center);
                assert_eq!(comp.b[row], grid.b[idx]);
            }
        }
    }
}
