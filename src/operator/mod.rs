//! Discrete linear operators and their lazy algebra.
//!
//! A [`DiscreteOperator`] is a cheap-to-clone shared handle to an immutable node. Leaves wrap a
//! concrete representation (dense, sparse, diagonal, zero, rank-one, evaluator-backed, sparse
//! inverse); composites (scaled, sum, product) are created by the combinators and hold handles
//! to their operands, so operator graphs share children instead of copying them.
//!
//! # Overview
//!
//! - `apply` walks the graph on every call; nothing is cached between calls.
//! - `add` and `compose` check shapes when the node is built, never later.
//! - dtypes follow the policy in [`crate::core::dtype`].
//! - `to_dense` produces an explicit matrix, keeping sparse results sparse where possible.
//!
//! # Example
//! ```rust
//! use discrete_ops::{DenseArray, DiscreteOperator};
//!
//! let a = DiscreteOperator::dense(DenseArray::from_row_major(2, 2, &[1.0f64, 2.0, 3.0, 4.0]).unwrap());
//! let b = DiscreteOperator::diagonal(&DenseArray::from_column(&[1.0f64, -1.0])).unwrap();
//! let c = a.add(&b).unwrap().compose(&a).unwrap().scale(0.5f64);
//! let y = c.apply(&DenseArray::from_column(&[1.0f64, 0.0])).unwrap();
//! assert_eq!(y.shape(), (2, 1));
//! ```

pub mod composite;
pub mod leaf;
pub mod materialize;

pub use composite::{ProductOperator, ScaledOperator, SumOperator};
pub use leaf::{DiagonalOperator, Evaluator, FnEvaluator, GenericOperator, Orientation, RankOneOperator};
pub use materialize::{Materialized, as_matrix};

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::core::dtype::DType;
use crate::core::scalar::ScalarValue;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;
use crate::solver::inverse::InverseOperator;
use leaf::split_complex;

/// The operator variants.
#[derive(Clone, Debug)]
pub enum OperatorKind {
    Dense(DenseArray),
    Sparse(SparseArray),
    Diagonal(DiagonalOperator),
    /// Always `Float64`, whatever it is applied to.
    Zero { rows: usize, cols: usize },
    RankOne(RankOneOperator),
    Generic(GenericOperator),
    Inverse(InverseOperator),
    Scaled(ScaledOperator),
    Sum(SumOperator),
    Product(ProductOperator),
}

impl OperatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::Dense(_) => "dense",
            OperatorKind::Sparse(_) => "sparse",
            OperatorKind::Diagonal(_) => "diagonal",
            OperatorKind::Zero { .. } => "zero",
            OperatorKind::RankOne(_) => "rank-one",
            OperatorKind::Generic(_) => "generic",
            OperatorKind::Inverse(_) => "inverse",
            OperatorKind::Scaled(_) => "scaled",
            OperatorKind::Sum(_) => "sum",
            OperatorKind::Product(_) => "product",
        }
    }
}

/// Shared handle to an immutable operator node.
#[derive(Clone)]
pub struct DiscreteOperator {
    node: Arc<OperatorKind>,
}

impl DiscreteOperator {
    /// Wrap a node. The other constructors are shorthands for this.
    pub fn from_kind(kind: OperatorKind) -> Self {
        trace!(kind = kind.name(), "new discrete operator");
        DiscreteOperator { node: Arc::new(kind) }
    }

    /// Operator applying an explicit dense matrix.
    pub fn dense(a: DenseArray) -> Self {
        Self::from_kind(OperatorKind::Dense(a))
    }

    /// Operator applying a sparse matrix; it stays sparse under `to_sparse`.
    pub fn sparse(s: SparseArray) -> Self {
        Self::from_kind(OperatorKind::Sparse(s))
    }

    /// Square diagonal operator.
    pub fn diagonal(values: &DenseArray) -> Result<Self, OpError> {
        DiagonalOperator::new(values, None).map(|d| Self::from_kind(OperatorKind::Diagonal(d)))
    }

    /// Diagonal operator of an explicit, possibly rectangular, shape.
    pub fn diagonal_with_shape(values: &DenseArray, shape: (usize, usize)) -> Result<Self, OpError> {
        DiagonalOperator::new(values, Some(shape)).map(|d| Self::from_kind(OperatorKind::Diagonal(d)))
    }

    /// The `rows x cols` zero operator, of dtype `Float64`.
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self::from_kind(OperatorKind::Zero { rows, cols })
    }

    /// Rank-one operator `column · rowᵀ`.
    ///
    /// # Arguments
    /// * `column` - the range vector, `rows` entries
    /// * `row` - the vector dotted with the input, `cols` entries; it is not conjugated
    pub fn rank_one(column: &DenseArray, row: &DenseArray) -> Result<Self, OpError> {
        RankOneOperator::new(column, row).map(|r| Self::from_kind(OperatorKind::RankOne(r)))
    }

    /// Matrix-free operator whose action is computed by `evaluator`.
    pub fn generic(evaluator: Arc<dyn Evaluator>) -> Self {
        Self::from_kind(OperatorKind::Generic(GenericOperator::new(evaluator)))
    }

    /// The node this handle points at.
    pub fn kind(&self) -> &OperatorKind {
        &self.node
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &DiscreteOperator) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self.kind() {
            OperatorKind::Dense(a) => a.shape(),
            OperatorKind::Sparse(s) => s.shape(),
            OperatorKind::Diagonal(d) => d.shape(),
            OperatorKind::Zero { rows, cols } => (*rows, *cols),
            OperatorKind::RankOne(r) => r.shape(),
            OperatorKind::Generic(g) => g.shape(),
            OperatorKind::Inverse(inv) => inv.shape(),
            OperatorKind::Scaled(s) => s.shape(),
            OperatorKind::Sum(s) => s.shape(),
            OperatorKind::Product(p) => p.shape(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    /// Element type of the results of [`apply`](Self::apply) on an input of the same or a
    /// narrower type.
    pub fn dtype(&self) -> DType {
        match self.kind() {
            OperatorKind::Dense(a) => a.dtype(),
            OperatorKind::Sparse(s) => s.dtype(),
            OperatorKind::Diagonal(d) => d.dtype(),
            OperatorKind::Zero { .. } => DType::Float64,
            OperatorKind::RankOne(r) => r.dtype(),
            OperatorKind::Generic(g) => g.dtype(),
            OperatorKind::Inverse(inv) => inv.dtype(),
            OperatorKind::Scaled(s) => s.dtype(),
            OperatorKind::Sum(s) => s.dtype(),
            OperatorKind::Product(p) => p.dtype(),
        }
    }

    /// Apply the operator to a vector (`ncols x 1`) or a stack of vectors (`ncols x k`).
    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        if x.nrows() != self.ncols() {
            return Err(OpError::dimension("apply", self.shape(), x.shape()));
        }
        match self.kind() {
            OperatorKind::Dense(a) => split_complex(a.dtype(), x, |v| a.matmul(v)),
            OperatorKind::Sparse(s) => split_complex(s.dtype(), x, |v| s.mul_dense(v)),
            OperatorKind::Diagonal(d) => d.apply(x),
            OperatorKind::Zero { rows, .. } => Ok(DenseArray::zeros(*rows, x.ncols(), DType::Float64)),
            OperatorKind::RankOne(r) => r.apply(x),
            OperatorKind::Generic(g) => g.apply(x),
            OperatorKind::Inverse(inv) => inv.apply(x),
            OperatorKind::Scaled(s) => s.apply(x),
            OperatorKind::Sum(s) => s.apply(x),
            OperatorKind::Product(p) => p.apply(x),
        }
    }

    pub fn transpose(&self) -> DiscreteOperator {
        let kind = match self.kind() {
            OperatorKind::Dense(a) => OperatorKind::Dense(a.transpose()),
            OperatorKind::Sparse(s) => OperatorKind::Sparse(s.transpose()),
            OperatorKind::Diagonal(d) => OperatorKind::Diagonal(d.transpose()),
            OperatorKind::Zero { rows, cols } => OperatorKind::Zero { rows: *cols, cols: *rows },
            OperatorKind::RankOne(r) => OperatorKind::RankOne(r.transpose()),
            OperatorKind::Generic(g) => OperatorKind::Generic(g.transpose()),
            OperatorKind::Inverse(inv) => OperatorKind::Inverse(inv.transpose()),
            OperatorKind::Scaled(s) => OperatorKind::Scaled(s.transpose()),
            OperatorKind::Sum(s) => OperatorKind::Sum(s.transpose()),
            OperatorKind::Product(p) => OperatorKind::Product(p.transpose()),
        };
        Self::from_kind(kind)
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> DiscreteOperator {
        let kind = match self.kind() {
            OperatorKind::Dense(a) => OperatorKind::Dense(a.adjoint()),
            OperatorKind::Sparse(s) => OperatorKind::Sparse(s.adjoint()),
            OperatorKind::Diagonal(d) => OperatorKind::Diagonal(d.adjoint()),
            OperatorKind::Zero { rows, cols } => OperatorKind::Zero { rows: *cols, cols: *rows },
            OperatorKind::RankOne(r) => OperatorKind::RankOne(r.adjoint()),
            OperatorKind::Generic(g) => OperatorKind::Generic(g.adjoint()),
            OperatorKind::Inverse(inv) => OperatorKind::Inverse(inv.adjoint()),
            OperatorKind::Scaled(s) => OperatorKind::Scaled(s.adjoint()),
            OperatorKind::Sum(s) => OperatorKind::Sum(s.adjoint()),
            OperatorKind::Product(p) => OperatorKind::Product(p.adjoint()),
        };
        Self::from_kind(kind)
    }

    /// `alpha · self`. Narrow operators stay narrow: see [`DType::scaled`].
    pub fn scale(&self, alpha: impl Into<ScalarValue>) -> DiscreteOperator {
        Self::from_kind(OperatorKind::Scaled(ScaledOperator::new(self.clone(), alpha.into())))
    }

    pub fn neg(&self) -> DiscreteOperator {
        self.scale(-1.0f64)
    }

    /// `self + other`; fails if the shapes differ.
    pub fn add(&self, other: &DiscreteOperator) -> Result<DiscreteOperator, OpError> {
        SumOperator::new(self.clone(), other.clone()).map(|s| Self::from_kind(OperatorKind::Sum(s)))
    }

    /// `self - other`, built as `self + (-1)·other`.
    pub fn sub(&self, other: &DiscreteOperator) -> Result<DiscreteOperator, OpError> {
        self.add(&other.neg())
    }

    /// Operator product `self · other`; fails unless `self.ncols() == other.nrows()`.
    pub fn compose(&self, other: &DiscreteOperator) -> Result<DiscreteOperator, OpError> {
        ProductOperator::new(self.clone(), other.clone()).map(|p| Self::from_kind(OperatorKind::Product(p)))
    }

    /// Explicit matrix representation.
    pub fn to_dense(&self) -> Result<Materialized, OpError> {
        match self.kind() {
            OperatorKind::Dense(a) => Ok(Materialized::Dense(a.clone())),
            OperatorKind::Sparse(s) => Ok(Materialized::Sparse(s.clone())),
            OperatorKind::Diagonal(d) => Ok(Materialized::Sparse(d.to_sparse())),
            OperatorKind::Zero { rows, cols } => Ok(Materialized::Sparse(SparseArray::zeros(*rows, *cols, DType::Float64))),
            OperatorKind::RankOne(r) => Ok(Materialized::Dense(r.to_dense())),
            OperatorKind::Generic(_) | OperatorKind::Inverse(_) => materialize::apply_to_identity(self),
            OperatorKind::Scaled(s) => s.to_dense(),
            OperatorKind::Sum(s) => s.to_dense(),
            OperatorKind::Product(p) => p.to_dense(),
        }
    }
}

impl std::ops::Neg for &DiscreteOperator {
    type Output = DiscreteOperator;

    fn neg(self) -> DiscreteOperator {
        DiscreteOperator::neg(self)
    }
}

impl fmt::Debug for DiscreteOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteOperator")
            .field("kind", &self.kind().name())
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .finish()
    }
}
