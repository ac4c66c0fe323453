//! Sparse inverse and pseudo-inverse.
//!
//! For `M` of shape `(m, n)`:
//!
//! | shape  | factorized      | `solve(b)`       |
//! |--------|-----------------|------------------|
//! | m == n | `M`             | `M⁻¹ b`          |
//! | m > n  | `G = Mᴴ M`      | `G⁻¹ (Mᴴ b)`     |
//! | m < n  | `H = M Mᴴ`      | `Mᴴ (H⁻¹ b)`     |
//!
//! The tall case is the least-squares solution, the wide case the minimum-norm one. The
//! factorization is computed once in [`SparseSolver::new`] and shared read-only by every solve,
//! so an [`InverseOperator`] can be applied from several threads at once.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::options::SolverOptions;
use crate::core::dtype::DType;
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;
use crate::operator::leaf::{Orientation, split_complex};
use crate::operator::{DiscreteOperator, OperatorKind};
use crate::solver::{Factorization, FactorizationBackend};

/// What gets factorized, chosen from the matrix shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// LU of the matrix itself.
    Square,
    /// Normal equations `Mᴴ M x = Mᴴ b`.
    LeastSquares,
    /// Dual normal equations `x = Mᴴ y`, `M Mᴴ y = b`.
    MinimumNorm,
}

impl Strategy {
    pub fn for_shape((rows, cols): (usize, usize)) -> Self {
        match rows.cmp(&cols) {
            std::cmp::Ordering::Equal => Strategy::Square,
            std::cmp::Ordering::Greater => Strategy::LeastSquares,
            std::cmp::Ordering::Less => Strategy::MinimumNorm,
        }
    }
}

/// Anything an inverse can be built from: a sparse operator or a raw sparse matrix.
#[derive(Clone, Copy, Debug)]
pub enum SolverInput<'a> {
    Operator(&'a DiscreteOperator),
    Matrix(&'a SparseArray),
}

impl<'a> SolverInput<'a> {
    fn sparse(self) -> Result<&'a SparseArray, OpError> {
        match self {
            SolverInput::Matrix(s) => Ok(s),
            SolverInput::Operator(op) => match op.kind() {
                OperatorKind::Sparse(s) => Ok(s),
                other => Err(OpError::UnsupportedType(format!(
                    "sparse inverse needs a sparse operator or matrix, got a {} operator",
                    other.name()
                ))),
            },
        }
    }
}

impl<'a> From<&'a DiscreteOperator> for SolverInput<'a> {
    fn from(op: &'a DiscreteOperator) -> Self {
        SolverInput::Operator(op)
    }
}

impl<'a> From<&'a SparseArray> for SolverInput<'a> {
    fn from(s: &'a SparseArray) -> Self {
        SolverInput::Matrix(s)
    }
}

/// A factorized sparse system and its (pseudo-)inverse action.
pub struct SparseSolver {
    shape: (usize, usize),
    dtype: DType,
    strategy: Strategy,
    backend: &'static str,
    factorization: Box<dyn Factorization>,
    // Mᴴ and conj(M); only stored for rectangular systems
    hermitian: Option<SparseArray>,
    conjugate: Option<SparseArray>,
}

impl SparseSolver {
    pub fn new<'a>(input: impl Into<SolverInput<'a>>, backend: &dyn FactorizationBackend) -> Result<Self, OpError> {
        let matrix = input.into().sparse()?;
        let shape = matrix.shape();
        let strategy = Strategy::for_shape(shape);
        let start = Instant::now();

        let (factorization, hermitian, conjugate) = match strategy {
            Strategy::Square => (backend.factorize(matrix)?, None, None),
            Strategy::LeastSquares => {
                let mh = matrix.adjoint();
                let gram = mh.matmul(matrix)?;
                (backend.factorize(&gram)?, Some(mh), Some(matrix.conj()))
            }
            Strategy::MinimumNorm => {
                let mh = matrix.adjoint();
                let gram = matrix.matmul(&mh)?;
                (backend.factorize(&gram)?, Some(mh), Some(matrix.conj()))
            }
        };
        debug!(
            rows = shape.0,
            cols = shape.1,
            ?strategy,
            backend = backend.name(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "sparse solver ready"
        );

        Ok(SparseSolver {
            shape,
            dtype: factorization.dtype(),
            strategy,
            backend: backend.name(),
            factorization,
            hermitian,
            conjugate,
        })
    }

    pub fn with_options<'a>(input: impl Into<SolverInput<'a>>, options: &SolverOptions) -> Result<Self, OpError> {
        Self::new(input, &*options.backend())
    }

    /// Shape of the factorized matrix `M`; the inverse has the transposed shape.
    pub fn matrix_shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    /// Apply the (pseudo-)inverse to every column of `rhs`, which has `M`'s row count.
    pub fn solve(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        self.run("solve", (self.shape.1, self.shape.0), rhs, |b| match (self.strategy, &self.hermitian) {
            (Strategy::LeastSquares, Some(mh)) => self.factorization.solve(&mh.mul_dense(b)?),
            (Strategy::MinimumNorm, Some(mh)) => mh.mul_dense(&self.factorization.solve(b)?),
            _ => self.factorization.solve(b),
        })
    }

    /// Apply the transpose of the (pseudo-)inverse; `rhs` has `M`'s column count.
    pub fn solve_transpose(&self, rhs: &DenseArray) -> Result<DenseArray, OpError> {
        self.run("transposed solve", self.shape, rhs, |b| match (self.strategy, &self.conjugate) {
            // (G⁻¹Mᴴ)ᵀ = conj(M) G⁻ᵀ
            (Strategy::LeastSquares, Some(mc)) => mc.mul_dense(&self.factorization.solve_transpose(b)?),
            // (MᴴH⁻¹)ᵀ = H⁻ᵀ conj(M)
            (Strategy::MinimumNorm, Some(mc)) => self.factorization.solve_transpose(&mc.mul_dense(b)?),
            _ => self.factorization.solve_transpose(b),
        })
    }

    fn run(
        &self,
        what: &'static str,
        shape: (usize, usize),
        rhs: &DenseArray,
        f: impl Fn(&DenseArray) -> Result<DenseArray, OpError>,
    ) -> Result<DenseArray, OpError> {
        if rhs.nrows() != shape.1 {
            return Err(OpError::dimension(what, shape, rhs.shape()));
        }
        let start = Instant::now();
        let x = split_complex(self.dtype, rhs, |b| f(&b.cast(self.dtype)))?;
        debug!(
            what,
            nrhs = rhs.ncols(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "sparse solve"
        );
        Ok(x)
    }
}

impl fmt::Debug for SparseSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseSolver")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("strategy", &self.strategy)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// The (pseudo-)inverse of a sparse matrix as an operator. Transposes and adjoints reuse the
/// same factorization.
#[derive(Clone, Debug)]
pub struct InverseOperator {
    solver: Arc<SparseSolver>,
    orientation: Orientation,
}

impl InverseOperator {
    pub fn new(solver: Arc<SparseSolver>) -> Self {
        InverseOperator { solver, orientation: Orientation::default() }
    }

    pub fn solver(&self) -> &Arc<SparseSolver> {
        &self.solver
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols) = self.solver.matrix_shape();
        self.orientation.shape((cols, rows))
    }

    pub fn dtype(&self) -> DType {
        self.solver.dtype()
    }

    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        self.orientation.run(x, |b| self.solver.solve(b), |b| self.solver.solve_transpose(b))
    }

    pub fn transpose(&self) -> Self {
        InverseOperator { solver: Arc::clone(&self.solver), orientation: self.orientation.transpose() }
    }

    pub fn adjoint(&self) -> Self {
        InverseOperator { solver: Arc::clone(&self.solver), orientation: self.orientation.adjoint() }
    }
}

impl DiscreteOperator {
    /// Sparse (pseudo-)inverse of a sparse operator or matrix, factorized with the backend
    /// named in `options`.
    pub fn inverse_sparse<'a>(input: impl Into<SolverInput<'a>>, options: &SolverOptions) -> Result<Self, OpError> {
        SparseSolver::with_options(input, options).map(|s| Self::from_solver(Arc::new(s)))
    }

    /// Like [`inverse_sparse`](Self::inverse_sparse) with an explicit backend.
    pub fn inverse_sparse_with<'a>(
        input: impl Into<SolverInput<'a>>,
        backend: &dyn FactorizationBackend,
    ) -> Result<Self, OpError> {
        SparseSolver::new(input, backend).map(|s| Self::from_solver(Arc::new(s)))
    }

    pub fn from_solver(solver: Arc<SparseSolver>) -> Self {
        Self::from_kind(OperatorKind::Inverse(InverseOperator::new(solver)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::sparse_lu::SparseLuBackend;
    use approx::assert_abs_diff_eq;

    fn tall() -> SparseArray {
        // [[1,0],[0,1],[1,1]]
        SparseArray::from_triplets(3, 2, &[(0, 0, 1.0), (2, 0, 1.0), (1, 1, 1.0), (2, 1, 1.0)]).unwrap()
    }

    #[test]
    fn strategy_follows_shape() {
        assert_eq!(Strategy::for_shape((3, 3)), Strategy::Square);
        assert_eq!(Strategy::for_shape((3, 2)), Strategy::LeastSquares);
        assert_eq!(Strategy::for_shape((2, 3)), Strategy::MinimumNorm);
    }

    #[test]
    fn least_squares_on_tall_system() {
        let solver = SparseSolver::new(&tall(), &SparseLuBackend::default()).unwrap();
        assert_eq!(solver.strategy(), Strategy::LeastSquares);
        // G = [[2,1],[1,2]], Mᵀb = [1+3, 2+3] = [4, 5] -> x = [1, 2]; b is consistent
        let x = solver.solve(&DenseArray::from_column(&[1.0, 2.0, 3.0])).unwrap();
        let x = x.to_vec::<f64>();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn transposed_pseudo_inverse_matches_explicit_transpose() {
        let solver = SparseSolver::new(&tall(), &SparseLuBackend::default()).unwrap();
        let pinv = solver.solve(&DenseArray::identity(3, DType::Float64)).unwrap();
        let pinv_t = solver.solve_transpose(&DenseArray::identity(2, DType::Float64)).unwrap();
        let diff = pinv.transpose().sub(&pinv_t).unwrap();
        assert_abs_diff_eq!(diff.max_abs(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_wrong_rhs_length() {
        let solver = SparseSolver::new(&tall(), &SparseLuBackend::default()).unwrap();
        let err = solver.solve(&DenseArray::from_column(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, OpError::Dimension { .. }));
    }

    #[test]
    fn dense_operator_is_not_accepted() {
        let op = DiscreteOperator::dense(DenseArray::identity(2, DType::Float64));
        let err = SparseSolver::new(&op, &SparseLuBackend::default()).unwrap_err();
        assert!(matches!(err, OpError::UnsupportedType(_)));
    }
}
