//! Vector and matrix kernels the iterative solvers are written against.

/// Linear algebra backend for one matrix / vector representation.
///
/// `axpy` and `xpay` follow the usual naming: `y = a * x + y` and
/// `y = x + a * y`.
pub trait Blas {
    type Vector;
    type Matrix;

    fn set(value: f64, result: &mut Self::Vector);

    fn dot(a: &Self::Vector, b: &Self::Vector) -> f64;

    fn axpy(a: f64, x: &Self::Vector, y: &mut Self::Vector);

    fn xpay(x: &Self::Vector, a: f64, y: &mut Self::Vector);

    /// `result = m * v`.
    fn mvm(m: &Self::Matrix, v: &Self::Vector, result: &mut Self::Vector);

    /// `result = b - a * x`.
    fn residual(a: &Self::Matrix, x: &Self::Vector, b: &Self::Vector, result: &mut Self::Vector);

    fn l2_norm(v: &Self::Vector) -> f64 {
        Self::dot(v, v).sqrt()
    }

    fn l_inf_norm(v: &Self::Vector) -> f64;
}
