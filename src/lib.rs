//! discrete-ops: lazy discrete linear operators and sparse pseudo-inverses over Faer
//!
//! This crate provides an algebra of finite-dimensional linear operators backed by dense,
//! sparse, diagonal, rank-one, zero or user-supplied representations. Operators are combined
//! lazily (sum, product, scaling, transpose, adjoint) under a runtime dtype promotion policy,
//! and sparse operators can be inverted, or pseudo-inverted through the normal equations when
//! rectangular, with a pluggable factorization backend.

pub mod config;
pub mod core;
pub mod error;
pub mod matrix;
pub mod operator;
pub mod solver;

// Re-exports for convenience
pub use crate::config::{BackendKind, SolverOptions};
pub use crate::core::{DType, Scalar, ScalarValue};
pub use crate::error::OpError;
pub use crate::matrix::{CscMatrix, DenseArray, SparseArray};
pub use crate::operator::{
    DiscreteOperator, Evaluator, FnEvaluator, Materialized, OperatorKind, Orientation, as_matrix,
};
pub use crate::solver::{
    DenseLuBackend, Factorization, FactorizationBackend, InverseOperator, SolverInput, SparseLuBackend, SparseSolver,
    Strategy,
};
