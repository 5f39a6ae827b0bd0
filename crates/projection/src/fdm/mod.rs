//! Finite-difference Poisson systems on the cell grid.
//!
//! The grid form stores one [`FdmMatrixRow3`] per cell with the center
//! coefficient and the couplings to the `+x`, `+y` and `+z` neighbors; the
//! `-x` coupling of cell `(i, j, k)` is the `right` entry of `(i - 1, j, k)`.
//! [`compressed`] holds the CSR form with rows for fluid cells only.

pub mod assembly;
pub mod compressed;
pub mod mg;
pub mod relax;

use rayon::prelude::*;

use crate::array::{Array3, Size3};
use crate::blas::Blas;

/// Stencil row: center plus couplings to the positive neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FdmMatrixRow3 {
    pub center: f64,
    pub right: f64,
    pub up: f64,
    pub front: f64,
}

impl FdmMatrixRow3 {
    /// Row that pins its cell to zero.
    pub const IDENTITY: Self = Self {
        center: 1.0,
        right: 0.0,
        up: 0.0,
        front: 0.0,
    };
}

pub type FdmMatrix3 = Array3<FdmMatrixRow3>;
pub type FdmVector3 = Array3<f64>;

/// `a x = b` on the full cell grid.
#[derive(Clone, Debug, Default)]
pub struct FdmLinearSystem3 {
    pub a: FdmMatrix3,
    pub x: FdmVector3,
    pub b: FdmVector3,
}

impl FdmLinearSystem3 {
    /// Sizes all three arrays. `x` keeps its values if the size is unchanged.
    pub fn resize(&mut self, size: Size3) {
        self.a.resize(size);
        self.x.resize(size);
        self.b.resize(size);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// `(a x)` at one cell.
#[inline]
pub(crate) fn apply_row(a: &FdmMatrix3, x: &FdmVector3, idx: usize) -> f64 {
    let size = a.size();
    let (i, j, k) = size.coords(idx);
    let sx = 1;
    let sy = size.x;
    let sz = size.x * size.y;
    let row = a[idx];

    let mut sum = row.center * x[idx];
    if i > 0 {
        sum += a[idx - sx].right * x[idx - sx];
    }
    if i + 1 < size.x {
        sum += row.right * x[idx + sx];
    }
    if j > 0 {
        sum += a[idx - sy].up * x[idx - sy];
    }
    if j + 1 < size.y {
        sum += row.up * x[idx + sy];
    }
    if k > 0 {
        sum += a[idx - sz].front * x[idx - sz];
    }
    if k + 1 < size.z {
        sum += row.front * x[idx + sz];
    }
    sum
}

/// Kernels for the grid form.
pub struct FdmBlas3;

impl Blas for FdmBlas3 {
    type Vector = FdmVector3;
    type Matrix = FdmMatrix3;

    fn set(value: f64, result: &mut FdmVector3) {
        result.fill(value);
    }

    fn dot(a: &FdmVector3, b: &FdmVector3) -> f64 {
        a.data()
            .par_iter()
            .zip(b.data().par_iter())
            .map(|(x, y)| x * y)
            .sum()
    }

    fn axpy(a: f64, x: &FdmVector3, y: &mut FdmVector3) {
        y.data_mut()
            .par_iter_mut()
            .zip(x.data().par_iter())
            .for_each(|(y, x)| *y += a * x);
    }

    fn xpay(x: &FdmVector3, a: f64, y: &mut FdmVector3) {
        y.data_mut()
            .par_iter_mut()
            .zip(x.data().par_iter())
            .for_each(|(y, x)| *y = x + a * *y);
    }

    fn mvm(m: &FdmMatrix3, v: &FdmVector3, result: &mut FdmVector3) {
        result.resize(m.size());
        result
            .data_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, r)| *r = apply_row(m, v, idx));
    }

    fn residual(a: &FdmMatrix3, x: &FdmVector3, b: &FdmVector3, result: &mut FdmVector3) {
        result.resize(a.size());
        result
            .data_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, r)| *r = b[idx] - apply_row(a, x, idx));
    }

    fn l_inf_norm(v: &FdmVector3) -> f64 {
        v.data().par_iter().map(|x| x.abs()).reduce(|| 0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1-D Laplacian along x with Dirichlet ends.
    fn laplacian_1d(n: usize) -> FdmMatrix3 {
        let mut a = FdmMatrix3::new(Size3::new(n, 1, 1));
        for i in 0..n {
            a[i] = FdmMatrixRow3 {
                center: 2.0,
                right: if i + 1 < n { -1.0 } else { 0.0 },
                ..Default::default()
            };
        }
        a
    }

    #[test]
    fn mvm_uses_left_neighbor_from_previous_row() {
        let a = laplacian_1d(4);
        let x = FdmVector3::filled(Size3::new(4, 1, 1), 1.0);
        let mut y = FdmVector3::default();
        FdmBlas3::mvm(&a, &x, &mut y);
        assert_eq!(y.data(), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn residual_of_exact_solution_is_zero() {
        let a = laplacian_1d(3);
        let mut x = FdmVector3::new(Size3::new(3, 1, 1));
        x.data_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        let mut b = FdmVector3::default();
        FdmBlas3::mvm(&a, &x, &mut b);
        let mut r = FdmVector3::default();
        FdmBlas3::residual(&a, &x, &b, &mut r);
        assert_eq!(FdmBlas3::l_inf_norm(&r), 0.0);
    }

    #[test]
    fn axpy_and_xpay() {
        let size = Size3::new(2, 1, 1);
        let x = FdmVector3::filled(size, 2.0);
        let mut y = FdmVector3::filled(size, 1.0);
        FdmBlas3::axpy(3.0, &x, &mut y);
        assert_eq!(y.data(), &[7.0, 7.0]);
        FdmBlas3::xpay(&x, 0.5, &mut y);
        assert_eq!(y.data(), &[5.5, 5.5]);
        assert!((FdmBlas3::l2_norm(&x) - 8f64.sqrt()).abs() < 1e-15);
    }
}
