//! Compressed (CSR) Poisson systems holding rows for fluid cells only.

use rayon::prelude::*;

use super::FdmVector3;
use crate::array::{Array3, Size3};
use crate::blas::Blas;

/// Square sparse matrix in compressed sparse row layout.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixCsr {
    row_pointers: Vec<usize>,
    column_indices: Vec<usize>,
    non_zeros: Vec<f64>,
}

impl Default for MatrixCsr {
    fn default() -> Self {
        Self {
            row_pointers: vec![0],
            column_indices: Vec::new(),
            non_zeros: Vec::new(),
        }
    }
}

impl MatrixCsr {
    pub fn clear(&mut self) {
        self.row_pointers.clear();
        self.row_pointers.push(0);
        self.column_indices.clear();
        self.non_zeros.clear();
    }

    pub fn rows(&self) -> usize {
        self.row_pointers.len() - 1
    }

    pub fn number_of_non_zeros(&self) -> usize {
        self.non_zeros.len()
    }

    /// Appends a row of `(column, value)` entries.
    pub fn add_row(&mut self, entries: &[(usize, f64)]) {
        for &(column, value) in entries {
            self.column_indices.push(column);
            self.non_zeros.push(value);
        }
        self.row_pointers.push(self.non_zeros.len());
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_pointers[row]..self.row_pointers[row + 1];
        self.column_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.non_zeros[range].iter().copied())
    }

    pub fn diagonal(&self, row: usize) -> f64 {
        self.row(row)
            .find(|&(column, _)| column == row)
            .map_or(0.0, |(_, value)| value)
    }

    /// Row `row` of `self * x`.
    #[inline]
    pub fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        self.row(row).map(|(column, value)| value * x[column]).sum()
    }
}

/// `a x = b` over fluid cells, plus the cell to row map used to scatter
/// the solution back onto the grid.
#[derive(Clone, Debug, Default)]
pub struct FdmCompressedLinearSystem3 {
    pub a: MatrixCsr,
    pub x: Vec<f64>,
    pub b: Vec<f64>,
    cell_to_row: Array3<Option<usize>>,
}

impl FdmCompressedLinearSystem3 {
    /// Empties the system and resets the map for a grid of `size`.
    pub fn reset(&mut self, size: Size3) {
        self.a.clear();
        self.x.clear();
        self.b.clear();
        self.cell_to_row.resize(size);
        self.cell_to_row.fill(None);
    }

    pub fn cell_to_row(&self) -> &Array3<Option<usize>> {
        &self.cell_to_row
    }

    pub(crate) fn cell_to_row_mut(&mut self) -> &mut Array3<Option<usize>> {
        &mut self.cell_to_row
    }

    /// Writes `x` onto the grid; cells without a row get zero.
    pub fn decompress(&self, out: &mut FdmVector3) {
        out.resize(self.cell_to_row.size());
        let x = &self.x;
        out.data_mut()
            .par_iter_mut()
            .zip(self.cell_to_row.data().par_iter())
            .for_each(|(value, row)| *value = row.map_or(0.0, |r| x[r]));
    }
}

/// Kernels for the compressed form.
pub struct FdmCompressedBlas3;

impl Blas for FdmCompressedBlas3 {
    type Vector = Vec<f64>;
    type Matrix = MatrixCsr;

    fn set(value: f64, result: &mut Vec<f64>) {
        result.par_iter_mut().for_each(|v| *v = value);
    }

    fn dot(a: &Vec<f64>, b: &Vec<f64>) -> f64 {
        a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).sum()
    }

    fn axpy(a: f64, x: &Vec<f64>, y: &mut Vec<f64>) {
        y.par_iter_mut().zip(x.par_iter()).for_each(|(y, x)| *y += a * x);
    }

    fn xpay(x: &Vec<f64>, a: f64, y: &mut Vec<f64>) {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(y, x)| *y = x + a * *y);
    }

    fn mvm(m: &MatrixCsr, v: &Vec<f64>, result: &mut Vec<f64>) {
        result.resize(m.rows(), 0.0);
        result
            .par_iter_mut()
            .enumerate()
            .for_each(|(row, r)| *r = m.row_dot(row, v));
    }

    fn residual(a: &MatrixCsr, x: &Vec<f64>, b: &Vec<f64>, result: &mut Vec<f64>) {
        result.resize(a.rows(), 0.0);
        result
            .par_iter_mut()
            .enumerate()
            .for_each(|(row, r)| *r = b[row] - a.row_dot(row, x));
    }

    fn l_inf_norm(v: &Vec<f64>) -> f64 {
        v.par_iter().map(|x| x.abs()).reduce(|| 0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_rows_and_diagonal() {
        let mut m = MatrixCsr::default();
        m.add_row(&[(0, 2.0), (1, -1.0)]);
        m.add_row(&[(0, -1.0), (1, 2.0)]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.number_of_non_zeros(), 4);
        assert_eq!(m.diagonal(1), 2.0);

        let mut y = Vec::new();
        FdmCompressedBlas3::mvm(&m, &vec![1.0, 3.0], &mut y);
        assert_eq!(y, vec![-1.0, 5.0]);
    }

    #[test]
    fn decompress_zeroes_missing_rows() {
        let mut system = FdmCompressedLinearSystem3::default();
        system.reset(Size3::new(3, 1, 1));
        system.cell_to_row_mut()[2] = Some(0);
        system.x = vec![4.0];

        let mut out = FdmVector3::filled(Size3::new(3, 1, 1), 9.0);
        system.decompress(&mut out);
        assert_eq!(out.data(), &[0.0, 0.0, 4.0]);
    }
}
