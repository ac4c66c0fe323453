//! Explicit matrix representations of operators.
//!
//! Leaves with a native representation return it; evaluator-backed and inverse operators are
//! applied to the columns of the identity, which costs one `apply` per column.

use crate::core::scalar::ScalarValue;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;
use crate::operator::DiscreteOperator;

/// Dense or sparse matrix produced by [`DiscreteOperator::to_dense`].
#[derive(Clone, Debug)]
pub enum Materialized {
    Dense(DenseArray),
    Sparse(SparseArray),
}

impl Materialized {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Materialized::Dense(a) => a.shape(),
            Materialized::Sparse(s) => s.shape(),
        }
    }

    pub fn dtype(&self) -> crate::core::dtype::DType {
        match self {
            Materialized::Dense(a) => a.dtype(),
            Materialized::Sparse(s) => s.dtype(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Materialized::Sparse(_))
    }

    pub fn into_dense(self) -> DenseArray {
        match self {
            Materialized::Dense(a) => a,
            Materialized::Sparse(s) => s.to_dense(),
        }
    }

    pub fn scale(self, alpha: ScalarValue) -> Materialized {
        match self {
            Materialized::Dense(a) => Materialized::Dense(a.scale(alpha)),
            Materialized::Sparse(s) => Materialized::Sparse(s.scale(alpha)),
        }
    }
}

/// Convert an operator into an explicit matrix.
///
/// Cheap for dense, sparse, diagonal, zero and rank-one operators; composites combine their
/// children's matrices; evaluator-backed and inverse operators need one `apply` per column.
pub fn as_matrix(op: &DiscreteOperator) -> Result<Materialized, OpError> {
    op.to_dense()
}

/// If exactly one side is sparse, densify it; two sparse sides stay sparse.
pub(crate) fn resolve_pair(a: Materialized, b: Materialized) -> (Materialized, Materialized) {
    match (a, b) {
        (Materialized::Sparse(a), Materialized::Sparse(b)) => (Materialized::Sparse(a), Materialized::Sparse(b)),
        (a, b) => (Materialized::Dense(a.into_dense()), Materialized::Dense(b.into_dense())),
    }
}

/// Apply `op` to every column of the identity in its own dtype.
pub(crate) fn apply_to_identity(op: &DiscreteOperator) -> Result<Materialized, OpError> {
    let eye = DenseArray::identity(op.ncols(), op.dtype());
    op.apply(&eye).map(Materialized::Dense)
}
