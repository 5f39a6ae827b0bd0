use glam::DVec3;

use super::{sample_linear, GridShape};
use crate::array::Array3;
use crate::field::VectorField3;

/// Vector values stored at cell centers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellCenteredVectorGrid3 {
    shape: GridShape,
    data: Array3<DVec3>,
}

impl CellCenteredVectorGrid3 {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            data: Array3::new(shape.resolution),
        }
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn data(&self) -> &Array3<DVec3> {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut Array3<DVec3> {
        &mut self.data
    }

    pub fn resize(&mut self, shape: GridShape) {
        self.shape = shape;
        self.data.resize(shape.resolution);
    }

    pub fn fill_from(&mut self, field: &dyn VectorField3) {
        let shape = self.shape;
        self.data
            .par_fill_with(|i, j, k| field.sample(shape.cell_center(i, j, k)));
    }

    pub fn sample(&self, p: DVec3) -> DVec3 {
        let origin = self.shape.origin + 0.5 * self.shape.spacing;
        sample_linear(&self.data, origin, self.shape.spacing, p)
    }
}

impl VectorField3 for CellCenteredVectorGrid3 {
    fn sample(&self, p: DVec3) -> DVec3 {
        CellCenteredVectorGrid3::sample(self, p)
    }
}
