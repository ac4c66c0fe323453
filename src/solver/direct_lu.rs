//! Dense LU backend using Faer's full-pivoting LU.
//!
//! The sparse matrix is densified and factorized once. Factorization and solves always run in
//! double precision (`f64` or `Complex<f64>`); right-hand sides are widened on the way in and
//! solutions narrowed back to the matrix dtype on the way out, so a narrow matrix keeps its
//! dtype contract. Suitable for small and medium systems, or as a cross-check of the sparse
//! backend.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use std::time::Instant;

use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat};
use num_complex::Complex64;
use tracing::debug;

use crate::core::dtype::DType;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;
use crate::solver::{Factorization, FactorizationBackend};

enum Factor {
    Real(FullPivLu<f64>),
    Complex(FullPivLu<Complex64>),
}

/// LU factors of a densified matrix, with the dtype results are returned in.
pub struct DenseLu {
    n: usize,
    dtype: DType,
    factor: Factor,
}

impl DenseLu {
    pub fn new(a: &DenseArray) -> Result<Self, OpError> {
        if a.nrows() != a.ncols() {
            return Err(OpError::dimension("LU factorization", a.shape(), (a.ncols(), a.nrows())));
        }
        let n = a.nrows();
        let factor = if a.is_complex() {
            Factor::Complex(FullPivLu::new(Mat::as_ref(&a.to_mat::<Complex64>())))
        } else {
            Factor::Real(FullPivLu::new(Mat::as_ref(&a.to_mat::<f64>())))
        };
        let lu = DenseLu { n, dtype: a.dtype(), factor };
        // Faer does not report rank deficiency; a zero pivot shows up as a non-finite solve.
        let ones = DenseArray::from_fn(n, 1, |_, _| 1.0f64).cast(a.dtype());
        lu.solve_with(&ones, false).map_err(|_| {
            OpError::Factorization("matrix is singular to working precision".to_string())
        })?;
        Ok(lu)
    }

    fn solve_with(&self, rhs: &DenseArray, transposed: bool) -> Result<DenseArray, OpError> {
        if rhs.nrows() != self.n {
            return Err(OpError::dimension("LU solve", (self.n, self.n), rhs.shape()));
        }
        let x = match &self.factor {
            Factor::Real(lu) => DenseArray::from(solve_in_place(lu, rhs.to_mat::<f64>().into_owned(), transposed)),
            Factor::Complex(lu) => {
                DenseArray::from(solve_in_place(lu, rhs.to_mat::<Complex64>().into_owned(), transposed))
            }
        };
        if !x.all_finite() {
            return Err(OpError::Factorization("solve produced non-finite values".to_string()));
        }
        Ok(x.cast(self.dtype))
    }
}

fn solve_in_place<T>(lu: &FullPivLu<T>, mut x: Mat<T>, transposed: bool) -> Mat<T>
where
    T: faer::traits::ComplexField,
{
    if transposed {
        lu.solve_transpose_in_place_with_conj(Conj::No, x.as_mut());
    } else {
        lu.solve_in_place_with_conj(Conj::No, x.as_mut());
    }
    x
}

impl Factorization for DenseLu {
    fn dtype(&self) -> DType {
        self.dtype
    }

    fn order(&self) -> usize {
        self.n
    }

    fn solve(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        self.solve_with(rhs, false)
    }

    fn solve_transpose(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        self.solve_with(rhs, true)
    }
}

/// Backend that factorizes with [`DenseLu`].
#[derive(Clone, Debug, Default)]
pub struct DenseLuBackend;

impl FactorizationBackend for DenseLuBackend {
    fn name(&self) -> &'static str {
        "dense-lu"
    }

    fn factorize(&self, matrix: &SparseArray) -> Result<Box<dyn Factorization>, OpError> {
        let start = Instant::now();
        let lu = DenseLu::new(&matrix.to_dense())?;
        debug!(n = lu.n, elapsed_us = start.elapsed().as_micros() as u64, "dense LU factorization");
        Ok(Box::new(lu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn system() -> SparseArray {
        // [[2,1,1],[1,3,2],[1,0,0]]
        SparseArray::from_triplets(
            3,
            3,
            &[(0, 0, 2.0), (1, 0, 1.0), (2, 0, 1.0), (0, 1, 1.0), (1, 1, 3.0), (0, 2, 1.0), (1, 2, 2.0)],
        )
        .unwrap()
    }

    #[test]
    fn lu_solves_dense_system() {
        // true solution: [6, 15, -23]
        let f = DenseLuBackend.factorize(&system()).unwrap();
        let x = f.solve(&DenseArray::from_column(&[4.0, 5.0, 6.0])).unwrap();
        let expected = [6.0, 15.0, -23.0];
        for (xi, ei) in x.to_vec::<f64>().iter().zip(expected) {
            assert_abs_diff_eq!(*xi, ei, epsilon = 1e-10);
        }
    }

    #[test]
    fn transpose_solve_matches_transposed_matrix() {
        let a = system();
        let f = DenseLuBackend.factorize(&a).unwrap();
        let b = DenseArray::from_column(&[1.0, -2.0, 0.5]);
        let x = f.solve_transpose(&b).unwrap();
        let r = a.transpose().mul_dense(&x).unwrap().sub(&b).unwrap();
        assert_abs_diff_eq!(r.max_abs(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn narrow_matrix_keeps_its_dtype() {
        let a = SparseArray::from_triplets(2, 2, &[(0, 0, 2.0f32), (1, 1, 4.0f32)]).unwrap();
        let f = DenseLuBackend.factorize(&a).unwrap();
        assert_eq!(f.dtype(), DType::Float32);
        let x = f.solve(&DenseArray::from_column(&[1.0f32, 1.0])).unwrap();
        assert_eq!(x.dtype(), DType::Float32);
        assert_abs_diff_eq!(x.to_vec::<f32>()[1], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn badly_scaled_diagonal_is_accepted() {
        let a = SparseArray::from_triplets(2, 2, &[(0, 0, 1e-15), (1, 1, 1.0)]).unwrap();
        let f = DenseLuBackend.factorize(&a).unwrap();
        let x = f.solve(&DenseArray::from_column(&[1e-15, 3.0])).unwrap().to_vec::<f64>();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = SparseArray::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 2.0), (0, 1, 2.0), (1, 1, 4.0)]).unwrap();
        assert!(matches!(DenseLuBackend.factorize(&a), Err(OpError::Factorization(_))));
    }
}
