//! Gauss-Seidel / SOR sweeps.

use rayon::prelude::*;

use super::compressed::MatrixCsr;
use super::{FdmMatrix3, FdmVector3};

/// Off-diagonal part of `(a x)` at one cell.
#[inline]
fn neighbor_sum(a: &FdmMatrix3, x: &[f64], idx: usize) -> f64 {
    let size = a.size();
    let (i, j, k) = size.coords(idx);
    let sy = size.x;
    let sz = size.x * size.y;
    let row = a[idx];

    let mut sum = 0.0;
    if i > 0 {
        sum += a[idx - 1].right * x[idx - 1];
    }
    if i + 1 < size.x {
        sum += row.right * x[idx + 1];
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

#[inline]
fn sor_update(a: &FdmMatrix3, b: &FdmVector3, x: &[f64], idx: usize, sor_factor: f64) -> f64 {
    let center = a[idx].center;
    let gs = (b[idx] - neighbor_sum(a, x, idx)) / center;
    (1.0 - sor_factor) * x[idx] + sor_factor * gs
}

/// One lexicographic sweep, in index order or `reverse`.
pub fn relax_gauss_seidel(a: &FdmMatrix3, b: &FdmVector3, sor_factor: f64, reverse: bool, x: &mut FdmVector3) {
    let n = a.len();
    let data = x.data_mut();
    let mut update = |idx: usize| {
        let value = sor_update(a, b, data, idx, sor_factor);
        data[idx] = value;
    };
    if reverse {
        (0..n).rev().for_each(&mut update);
    } else {
        (0..n).for_each(&mut update);
    }
}

/// One red-black sweep. Each color is computed in parallel into `scratch`
/// from the other color's values, then copied back.
pub fn relax_red_black(
    a: &FdmMatrix3,
    b: &FdmVector3,
    sor_factor: f64,
    reverse: bool,
    x: &mut FdmVector3,
    scratch: &mut FdmVector3,
) {
    let size = a.size();
    scratch.resize(size);
    let colors = if reverse { [1, 0] } else { [0, 1] };

    for color in colors {
        let is_color = |idx: usize| {
            let (i, j, k) = size.coords(idx);
            (i + j + k) % 2 == color
        };
        {
            let xs = x.data();
            scratch
                .data_mut()
                .par_iter_mut()
                .enumerate()
                .filter(|(idx, _)| is_color(*idx))
                .for_each(|(idx, out)| *out = sor_update(a, b, xs, idx, sor_factor));
        }
        x.data_mut()
            .par_iter_mut()
            .zip(scratch.data().par_iter())
            .enumerate()
            .filter(|(idx, _)| is_color(*idx))
            .for_each(|(_, (x, &updated))| *x = updated);
    }
}

/// One lexicographic sweep over a CSR system.
pub fn relax_compressed(a: &MatrixCsr, b: &[f64], sor_factor: f64, reverse: bool, x: &mut [f64]) {
    let mut update = |row: usize| {
        let mut sum = 0.0;
        let mut diagonal = 0.0;
        for (column, value) in a.row(row) {
            if column == row {
                diagonal = value;
            } else {
                sum += value * x[column];
            }
        }
        if diagonal != 0.0 {
            let gs = (b[row] - sum) / diagonal;
            x[row] = (1.0 - sor_factor) * x[row] + sor_factor * gs;
        }
    };
    if reverse {
        (0..a.rows()).rev().for_each(&mut update);
    } else {
        (0..a.rows()).for_each(&mut update);
    }
}
