use glam::DVec3;

use super::{sample_linear, GridShape};
use crate::array::Array3;
use crate::field::ScalarField3;

/// Scalar values stored at cell centers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellCenteredScalarGrid3 {
    shape: GridShape,
    data: Array3<f64>,
}

impl CellCenteredScalarGrid3 {
    pub fn new(shape: GridShape) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn filled(shape: GridShape, value: f64) -> Self {
        Self {
            shape,
            data: Array3::filled(shape.resolution, value),
        }
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    /// Changes the geometry; values reset when the resolution changes.
    pub fn resize(&mut self, shape: GridShape) {
        self.shape = shape;
        self.data.resize(shape.resolution);
    }

    /// Samples `field` at every cell center.
    pub fn fill_from(&mut self, field: &dyn ScalarField3) {
        let shape = self.shape;
        self.data
            .par_fill_with(|i, j, k| field.sample(shape.cell_center(i, j, k)));
    }

    pub fn sample(&self, p: DVec3) -> f64 {
        let origin = self.shape.origin + 0.5 * self.shape.spacing;
        sample_linear(&self.data, origin, self.shape.spacing, p)
    }

    /// Central-difference gradient one cell wide.
    pub fn gradient(&self, p: DVec3) -> DVec3 {
        let h = self.shape.spacing;
        let mut g = DVec3::ZERO;
        for axis in 0..3 {
            let mut e = DVec3::ZERO;
            e[axis] = h[axis];
            g[axis] = (self.sample(p + e) - self.sample(p - e)) / (2.0 * h[axis]);
        }
        g
    }
}

impl ScalarField3 for CellCenteredScalarGrid3 {
    fn sample(&self, p: DVec3) -> f64 {
        CellCenteredScalarGrid3::sample(self, p)
    }
}
