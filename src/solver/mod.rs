//! Factorization backends and the sparse (pseudo-)inverse.
//!
//! A [`FactorizationBackend`] turns a square sparse matrix into a reusable [`Factorization`].
//! [`inverse::SparseSolver`] picks what to factorize from the shape of its input (the matrix
//! itself, or a Gram matrix for rectangular systems) and hands it to whichever backend it was
//! given; [`crate::config::SolverOptions::backend`] builds one from configuration.

use std::fmt;

use crate::core::dtype::DType;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;

pub mod direct_lu;
pub mod inverse;
pub mod sparse_lu;

pub use direct_lu::{DenseLu, DenseLuBackend};
pub use inverse::{InverseOperator, SolverInput, SparseSolver, Strategy};
pub use sparse_lu::{SparseLu, SparseLuBackend};

/// Factors of a square matrix, computed once and reused for every solve.
///
/// Solves take right-hand sides whose rows match [`order`](Factorization::order) and that are
/// already in [`dtype`](Factorization::dtype); each column is solved independently.
pub trait Factorization: Send + Sync {
    fn dtype(&self) -> DType;

    fn order(&self) -> usize;

    /// `A⁻¹ b`
    fn solve(&self, rhs: &DenseArray) -> Result<DenseArray, OpError>;

    /// `A⁻ᵀ b`
    fn solve_transpose(&self, rhs: &DenseArray) -> Result<DenseArray, OpError>;
}

/// Produces factorizations; every backend must honour the same numerical contract.
pub trait FactorizationBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn factorize(&self, matrix: &SparseArray) -> Result<Box<dyn Factorization>, OpError>;
}
