//! Composite operators: scaled, sum and product nodes.
//!
//! A composite holds shared handles to its children and defines `apply` through the children's
//! `apply`; it never forms an explicit matrix except in `to_dense`.

use crate::core::dtype::DType;
use crate::core::scalar::ScalarValue;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::operator::DiscreteOperator;
use crate::operator::materialize::{Materialized, resolve_pair};

/// `alpha · A`.
#[derive(Clone, Debug)]
pub struct ScaledOperator {
    op: DiscreteOperator,
    alpha: ScalarValue,
    dtype: DType,
}

impl ScaledOperator {
    /// Scale `op` by `alpha`; a real `alpha` keeps single precision.
    pub fn new(op: DiscreteOperator, alpha: ScalarValue) -> Self {
        let dtype = op.dtype().scaled(alpha);
        ScaledOperator { op, alpha, dtype }
    }

    /// The scaled operand.
    pub fn operator(&self) -> &DiscreteOperator {
        &self.op
    }

    pub fn alpha(&self) -> ScalarValue {
        self.alpha
    }

    pub fn shape(&self) -> (usize, usize) {
        self.op.shape()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        Ok(self.op.apply(x)?.scale(self.alpha))
    }

    pub fn transpose(&self) -> Self {
        ScaledOperator::new(self.op.transpose(), self.alpha)
    }

    pub fn adjoint(&self) -> Self {
        ScaledOperator::new(self.op.adjoint(), self.alpha.conj())
    }

    pub fn to_dense(&self) -> Result<Materialized, OpError> {
        Ok(self.op.to_dense()?.scale(self.alpha))
    }
}

/// `A + B`; both operands have the same shape.
#[derive(Clone, Debug)]
pub struct SumOperator {
    op1: DiscreteOperator,
    op2: DiscreteOperator,
    dtype: DType,
}

impl SumOperator {
    /// Fails with [`OpError::Dimension`] unless both operands have the same shape.
    pub fn new(op1: DiscreteOperator, op2: DiscreteOperator) -> Result<Self, OpError> {
        if op1.shape() != op2.shape() {
            return Err(OpError::dimension("sum", op1.shape(), op2.shape()));
        }
        let dtype = op1.dtype().promote(op2.dtype());
        Ok(SumOperator { op1, op2, dtype })
    }

    /// The two operands, left first.
    pub fn operands(&self) -> (&DiscreteOperator, &DiscreteOperator) {
        (&self.op1, &self.op2)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.op1.shape()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        self.op1.apply(x)?.add(&self.op2.apply(x)?)
    }

    pub fn transpose(&self) -> Self {
        SumOperator { op1: self.op1.transpose(), op2: self.op2.transpose(), dtype: self.dtype }
    }

    pub fn adjoint(&self) -> Self {
        SumOperator { op1: self.op1.adjoint(), op2: self.op2.adjoint(), dtype: self.dtype }
    }

    /// Sparse + sparse stays sparse; any dense side makes the result dense.
    pub fn to_dense(&self) -> Result<Materialized, OpError> {
        match resolve_pair(self.op1.to_dense()?, self.op2.to_dense()?) {
            (Materialized::Sparse(a), Materialized::Sparse(b)) => Ok(Materialized::Sparse(a.add(&b)?)),
            (a, b) => Ok(Materialized::Dense(a.into_dense().add(&b.into_dense())?)),
        }
    }
}

/// `A · B`, evaluated right to left.
#[derive(Clone, Debug)]
pub struct ProductOperator {
    op1: DiscreteOperator,
    op2: DiscreteOperator,
    dtype: DType,
}

impl ProductOperator {
    /// `op1 · op2`.
    ///
    /// # Arguments
    /// * `op1` - left factor, applied last
    /// * `op2` - right factor; its row count must equal the column count of `op1`
    pub fn new(op1: DiscreteOperator, op2: DiscreteOperator) -> Result<Self, OpError> {
        if op1.ncols() != op2.nrows() {
            return Err(OpError::dimension("product", op1.shape(), op2.shape()));
        }
        let dtype = op1.dtype().promote(op2.dtype());
        Ok(ProductOperator { op1, op2, dtype })
    }

    /// The two operands, left first.
    pub fn operands(&self) -> (&DiscreteOperator, &DiscreteOperator) {
        (&self.op1, &self.op2)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.op1.nrows(), self.op2.ncols())
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        self.op1.apply(&self.op2.apply(x)?)
    }

    // (AB)ᵀ = BᵀAᵀ
    pub fn transpose(&self) -> Self {
        ProductOperator { op1: self.op2.transpose(), op2: self.op1.transpose(), dtype: self.dtype }
    }

    pub fn adjoint(&self) -> Self {
        ProductOperator { op1: self.op2.adjoint(), op2: self.op1.adjoint(), dtype: self.dtype }
    }

    pub fn to_dense(&self) -> Result<Materialized, OpError> {
        match resolve_pair(self.op1.to_dense()?, self.op2.to_dense()?) {
            (Materialized::Sparse(a), Materialized::Sparse(b)) => Ok(Materialized::Sparse(a.matmul(&b)?)),
            (a, b) => Ok(Materialized::Dense(a.into_dense().matmul(&b.into_dense())?)),
        }
    }
}
