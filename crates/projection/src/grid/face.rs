use glam::DVec3;
use rayon::prelude::*;

use super::{sample_linear, GridShape};
use crate::array::Array3;
use crate::field::VectorField3;

/// Staggered (MAC) velocity grid.
///
/// - `u` lives on x-normal faces, size `(nx + 1, ny, nz)`
/// - `v` lives on y-normal faces, size `(nx, ny + 1, nz)`
/// - `w` lives on z-normal faces, size `(nx, ny, nz + 1)`
///
/// Face `(i, j, k)` of `u` sits between cells `(i - 1, j, k)` and `(i, j, k)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceCenteredGrid3 {
    shape: GridShape,
    components: [Array3<f64>; 3],
}

impl FaceCenteredGrid3 {
    pub fn new(shape: GridShape) -> Self {
        let r = shape.resolution;
        Self {
            shape,
            components: [
                Array3::new(r.staggered(0)),
                Array3::new(r.staggered(1)),
                Array3::new(r.staggered(2)),
            ],
        }
    }

    /// Grid with every face sampled from `field`.
    pub fn from_field(shape: GridShape, field: &dyn VectorField3) -> Self {
        let mut grid = Self::new(shape);
        grid.fill_from(field);
        grid
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn u(&self) -> &Array3<f64> {
        &self.components[0]
    }

    #[inline]
    pub fn v(&self) -> &Array3<f64> {
        &self.components[1]
    }

    #[inline]
    pub fn w(&self) -> &Array3<f64> {
        &self.components[2]
    }

    #[inline]
    pub fn u_mut(&mut self) -> &mut Array3<f64> {
        &mut self.components[0]
    }

    #[inline]
    pub fn v_mut(&mut self) -> &mut Array3<f64> {
        &mut self.components[1]
    }

    #[inline]
    pub fn w_mut(&mut self) -> &mut Array3<f64> {
        &mut self.components[2]
    }

    /// Face array for `axis` (0 = u, 1 = v, 2 = w).
    #[inline]
    pub fn component(&self, axis: usize) -> &Array3<f64> {
        &self.components[axis]
    }

    #[inline]
    pub fn component_mut(&mut self, axis: usize) -> &mut Array3<f64> {
        &mut self.components[axis]
    }

    /// Changes the geometry; values reset when the resolution changes.
    pub fn resize(&mut self, shape: GridShape) {
        self.shape = shape;
        for (axis, c) in self.components.iter_mut().enumerate() {
            c.resize(shape.resolution.staggered(axis));
        }
    }

    /// Copies geometry and values from `other`.
    pub fn set(&mut self, other: &FaceCenteredGrid3) {
        self.shape = other.shape;
        for (dst, src) in self.components.iter_mut().zip(&other.components) {
            dst.set(src);
        }
    }

    pub fn fill(&mut self, value: DVec3) {
        for (axis, c) in self.components.iter_mut().enumerate() {
            c.fill(value[axis]);
        }
    }

    /// Samples each component of `field` at its own face centers.
    pub fn fill_from(&mut self, field: &dyn VectorField3) {
        let shape = self.shape;
        for (axis, c) in self.components.iter_mut().enumerate() {
            c.par_fill_with(|i, j, k| field.sample(shape.face_position(axis, i, j, k))[axis]);
        }
    }

    /// Trilinear sample of all three components at `p`.
    pub fn sample(&self, p: DVec3) -> DVec3 {
        let h = self.shape.spacing;
        let mut out = DVec3::ZERO;
        for axis in 0..3 {
            let origin = self.shape.face_position(axis, 0, 0, 0);
            out[axis] = sample_linear(&self.components[axis], origin, h, p);
        }
        out
    }

    /// Velocity at a cell center, averaged from the two faces on each axis.
    pub fn value_at_cell_center(&self, i: usize, j: usize, k: usize) -> DVec3 {
        DVec3::new(
            0.5 * (self.u()[(i, j, k)] + self.u()[(i + 1, j, k)]),
            0.5 * (self.v()[(i, j, k)] + self.v()[(i, j + 1, k)]),
            0.5 * (self.w()[(i, j, k)] + self.w()[(i, j, k + 1)]),
        )
    }

    /// Net outflow of cell `(i, j, k)` per unit volume.
    pub fn divergence_at_cell_center(&self, i: usize, j: usize, k: usize) -> f64 {
        let inv_h = self.shape.inv_spacing();
        (self.u()[(i + 1, j, k)] - self.u()[(i, j, k)]) * inv_h.x
            + (self.v()[(i, j + 1, k)] - self.v()[(i, j, k)]) * inv_h.y
            + (self.w()[(i, j, k + 1)] - self.w()[(i, j, k)]) * inv_h.z
    }

    /// Largest absolute cell divergence over cells where `include` holds.
    pub fn max_abs_divergence<F>(&self, include: F) -> f64
    where
        F: Fn(usize, usize, usize) -> bool + Sync,
    {
        let size = self.shape.resolution;
        (0..size.len())
            .into_par_iter()
            .map(|idx| {
                let (i, j, k) = size.coords(idx);
                if include(i, j, k) {
                    self.divergence_at_cell_center(i, j, k).abs()
                } else {
                    0.0
                }
            })
            .reduce(|| 0.0, f64::max)
    }
}
