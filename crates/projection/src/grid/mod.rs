//! Grid geometry and the three grid containers used by the projection:
//! cell-centered scalars, cell-centered vectors and face-centered (MAC)
//! velocities.

mod extrapolation;
mod face;
mod scalar;
mod vector;

pub use extrapolation::extrapolate_to_region;
pub use face::FaceCenteredGrid3;
pub use scalar::CellCenteredScalarGrid3;
pub use vector::CellCenteredVectorGrid3;

use std::ops::{Add, Mul};

use glam::DVec3;

use crate::array::{Array3, Size3};
use crate::error::{ProjectionError, ProjectionResult};

/// Resolution, cell size and world-space origin of a grid.
///
/// Cell `(i, j, k)` spans `origin + (i, j, k) * spacing` to
/// `origin + (i + 1, j + 1, k + 1) * spacing`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridShape {
    pub resolution: Size3,
    pub spacing: DVec3,
    pub origin: DVec3,
}

impl Default for GridShape {
    fn default() -> Self {
        Self {
            resolution: Size3::default(),
            spacing: DVec3::ONE,
            origin: DVec3::ZERO,
        }
    }
}

impl GridShape {
    pub fn new(resolution: Size3, spacing: DVec3, origin: DVec3) -> ProjectionResult<Self> {
        let shape = Self {
            resolution,
            spacing,
            origin,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        if self.resolution.is_empty() {
            return Err(ProjectionError::InvalidGridSize(self.resolution));
        }
        let s = self.spacing;
        if !(s.is_finite() && s.min_element() > 0.0) {
            return Err(ProjectionError::InvalidGridSpacing {
                x: s.x,
                y: s.y,
                z: s.z,
            });
        }
        Ok(())
    }

    /// `(lower, upper)` corners. Upper is `origin + resolution * spacing`.
    pub fn bounding_box(&self) -> (DVec3, DVec3) {
        let r = self.resolution;
        let extent = DVec3::new(r.x as f64, r.y as f64, r.z as f64) * self.spacing;
        (self.origin, self.origin + extent)
    }

    #[inline]
    pub fn inv_spacing(&self) -> DVec3 {
        self.spacing.recip()
    }

    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.origin + (DVec3::new(i as f64, j as f64, k as f64) + 0.5) * self.spacing
    }

    /// Center of the `axis`-normal face with index `(i, j, k)`.
    #[inline]
    pub fn face_position(&self, axis: usize, i: usize, j: usize, k: usize) -> DVec3 {
        let mut offset = DVec3::splat(0.5);
        offset[axis] = 0.0;
        self.origin + (DVec3::new(i as f64, j as f64, k as f64) + offset) * self.spacing
    }

    #[inline]
    pub fn u_position(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.face_position(0, i, j, k)
    }

    #[inline]
    pub fn v_position(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.face_position(1, i, j, k)
    }

    #[inline]
    pub fn w_position(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.face_position(2, i, j, k)
    }

    /// Shape of the next multigrid level. Spacing doubles on halved axes.
    pub fn coarsened(&self) -> Option<Self> {
        let coarse = self.resolution.coarsened()?;
        let mut spacing = self.spacing;
        for axis in 0..3 {
            if coarse.axis(axis) != self.resolution.axis(axis) {
                spacing[axis] *= 2.0;
            }
        }
        Some(Self {
            resolution: coarse,
            spacing,
            origin: self.origin,
        })
    }
}

/// Trilinear interpolation of `data`, whose sample `(0, 0, 0)` sits at
/// `data_origin`. Positions outside the lattice clamp to the nearest edge.
pub(crate) fn sample_linear<T>(data: &Array3<T>, data_origin: DVec3, spacing: DVec3, p: DVec3) -> T
where
    T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
{
    let size = data.size();
    let f = (p - data_origin) / spacing;

    let (i0, i1, tx) = lerp_coord(f.x, size.x);
    let (j0, j1, ty) = lerp_coord(f.y, size.y);
    let (k0, k1, tz) = lerp_coord(f.z, size.z);

    let mut result = T::default();
    for (k, wz) in [(k0, 1.0 - tz), (k1, tz)] {
        for (j, wy) in [(j0, 1.0 - ty), (j1, ty)] {
            for (i, wx) in [(i0, 1.0 - tx), (i1, tx)] {
                let w = wx * wy * wz;
                if w != 0.0 {
                    result = result + data[(i, j, k)] * w;
                }
            }
        }
    }
    result
}

#[inline]
fn lerp_coord(f: f64, n: usize) -> (usize, usize, f64) {
    if n <= 1 || !f.is_finite() {
        return (0, 0, 0.0);
    }
    let i0 = (f.floor().max(0.0) as usize).min(n - 2);
    let t = (f - i0 as f64).clamp(0.0, 1.0);
    (i0, i0 + 1, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_shapes() {
        assert!(GridShape::new(Size3::new(0, 4, 1), DVec3::ONE, DVec3::ZERO).is_err());
        assert!(GridShape::new(Size3::new(4, 4, 1), DVec3::new(1.0, 0.0, 1.0), DVec3::ZERO).is_err());
        assert!(GridShape::new(Size3::new(4, 4, 1), DVec3::splat(f64::NAN), DVec3::ZERO).is_err());
    }

    #[test]
    fn bounding_box_spans_resolution() {
        let shape = GridShape::new(Size3::new(8, 4, 1), DVec3::splat(0.5), DVec3::new(1.0, 2.0, 3.0)).unwrap();
        let (lower, upper) = shape.bounding_box();
        assert_eq!(lower, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(upper, DVec3::new(5.0, 4.0, 3.5));
    }

    #[test]
    fn face_positions_are_staggered() {
        let shape = GridShape::new(Size3::new(4, 4, 4), DVec3::ONE, DVec3::ZERO).unwrap();
        assert_eq!(shape.u_position(0, 0, 0), DVec3::new(0.0, 0.5, 0.5));
        assert_eq!(shape.v_position(1, 2, 3), DVec3::new(1.5, 2.0, 3.5));
        assert_eq!(shape.w_position(1, 2, 3), DVec3::new(1.5, 2.5, 3.0));
    }

    #[test]
    fn coarsened_doubles_spacing_on_halved_axes() {
        let shape = GridShape::new(Size3::new(8, 4, 1), DVec3::splat(0.25), DVec3::ZERO).unwrap();
        let coarse = shape.coarsened().unwrap();
        assert_eq!(coarse.resolution, Size3::new(4, 2, 1));
        assert_eq!(coarse.spacing, DVec3::new(0.5, 0.5, 0.25));
        assert_eq!(coarse.bounding_box(), shape.bounding_box());
    }

    #[test]
    fn linear_sampling_reproduces_linear_data() {
        let mut data = Array3::<f64>::new(Size3::new(4, 3, 1));
        data.par_fill_with(|i, j, _| 2.0 * i as f64 + j as f64);
        let v = sample_linear(&data, DVec3::ZERO, DVec3::ONE, DVec3::new(1.25, 0.5, 7.0));
        assert!((v - 3.0).abs() < 1e-12);
        // Clamped outside.
        let v = sample_linear(&data, DVec3::ZERO, DVec3::ONE, DVec3::new(-3.0, 0.0, 0.0));
        assert!(v.abs() < 1e-12);
    }
}
