//! Sparse LU backend on Faer's supernodal/simplicial LU with partial (row) pivoting.
//!
//! The matrix is factorized in its own dtype. A pivot is rejected only when it is exactly zero
//! or the factors are not finite; there is no relative threshold, so badly scaled but
//! nonsingular matrices factorize.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Davis, Direct Methods for Sparse Linear Systems, SIAM (2006), §6

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use faer::linalg::solvers::SolveCore;
use faer::sparse::linalg::LuError;
use faer::sparse::linalg::solvers::Lu;
use faer::{Conj, Mat};
use tracing::debug;

use crate::core::dtype::{DType, with_dtype};
use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::{CscMatrix, SparseArray};
use crate::solver::{Factorization, FactorizationBackend};

/// `P A Q = L U` factors of a square sparse matrix.
#[derive(Clone, Debug)]
pub struct SparseLu<T> {
    n: usize,
    lu: Lu<usize, T>,
}

fn singular() -> OpError {
    OpError::Factorization("matrix is singular to working precision".to_string())
}

impl<T: Scalar> SparseLu<T> {
    /// Factorize a square matrix.
    ///
    /// Fails with [`OpError::Factorization`] when a column has no usable pivot, either
    /// structurally or because elimination left an exact zero.
    pub fn factorize(a: &CscMatrix<T>) -> Result<Self, OpError> {
        if a.nrows() != a.ncols() {
            return Err(OpError::dimension("LU factorization", a.shape(), (a.ncols(), a.nrows())));
        }
        let n = a.nrows();
        let inner = a.as_faer();
        // Faer's simplicial path panics on an exact zero pivot instead of returning an error.
        let lu = match panic::catch_unwind(AssertUnwindSafe(|| inner.sp_lu())) {
            Ok(Ok(lu)) => lu,
            Ok(Err(LuError::SymbolicSingular { index })) => {
                return Err(OpError::Factorization(format!("structurally singular at column {index}")));
            }
            Ok(Err(LuError::Generic(err))) => return Err(err.into()),
            Err(_) => return Err(singular()),
        };
        let lu = SparseLu { n, lu };
        // The supernodal path does not report zero pivots; they surface as non-finite solves.
        let ones = lu.solve_mat(&Mat::from_fn(n, 1, |_, _| T::one()));
        if !ones.as_ref().is_all_finite() {
            return Err(singular());
        }
        Ok(lu)
    }

    pub fn order(&self) -> usize {
        self.n
    }

    /// Solve `A X = B` for every column of `B`.
    pub fn solve_mat(&self, b: &Mat<T>) -> Mat<T> {
        let mut x = b.clone();
        self.lu.solve_in_place_with_conj(Conj::No, x.as_mut());
        x
    }

    /// Solve `Aᵀ X = B` for every column of `B`.
    pub fn solve_transpose_mat(&self, b: &Mat<T>) -> Mat<T> {
        let mut x = b.clone();
        self.lu.solve_transpose_in_place_with_conj(Conj::No, x.as_mut());
        x
    }
}

impl<T: Scalar> Factorization for SparseLu<T> {
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn order(&self) -> usize {
        self.n
    }

    fn solve(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        if rhs.nrows() != self.n {
            return Err(OpError::dimension("LU solve", (self.n, self.n), rhs.shape()));
        }
        Ok(DenseArray::from(self.solve_mat(&rhs.to_mat::<T>())))
    }

    fn solve_transpose(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        if rhs.nrows() != self.n {
            return Err(OpError::dimension("LU transpose solve", (self.n, self.n), rhs.shape()));
        }
        Ok(DenseArray::from(self.solve_transpose_mat(&rhs.to_mat::<T>())))
    }
}

/// The default backend: [`SparseLu`] in the matrix's own dtype.
#[derive(Clone, Copy, Debug, Default)]
pub struct SparseLuBackend;

impl FactorizationBackend for SparseLuBackend {
    fn name(&self) -> &'static str {
        "sparse-lu"
    }

    fn factorize(&self, matrix: &SparseArray) -> Result<Box<dyn Factorization>, OpError> {
        let start = Instant::now();
        let factor: Box<dyn Factorization> = with_dtype!(matrix.dtype(), T => {
            let lu = SparseLu::<T>::factorize(&matrix.to_csc::<T>())?;
            debug!(
                n = lu.order(),
                nnz_a = matrix.nnz(),
                elapsed_us = start.elapsed().as_micros() as u64,
                "sparse LU factorization"
            );
            Box::new(lu) as Box<dyn Factorization>
        });
        Ok(factor)
    }
}
