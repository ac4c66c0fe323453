//! Compressed sparse column storage on Faer's `SparseColMat`, and its runtime-typed wrapper.

use std::any::Any;
use std::borrow::Cow;

use faer::sparse::linalg::matmul::sparse_sparse_matmul;
use faer::sparse::{CreationError, FaerError, SparseColMat, SymbolicSparseColMat, Triplet, ops};
use faer::{Mat, Scale};

use crate::core::dtype::{DType, with_dtype};
use crate::core::scalar::{Scalar, ScalarValue};
use crate::error::OpError;
use crate::matrix::dense::DenseArray;

/// A compressed sparse column matrix, stored as a `faer::sparse::SparseColMat<usize, T>`.
///
/// Row indices are sorted within each column and duplicates have been summed. Explicitly
/// stored zeros are allowed.
#[derive(Clone, Debug)]
pub struct CscMatrix<T> {
    inner: SparseColMat<usize, T>,
}

// Faer's sparse conversions only fail when an allocation fails; that is fatal here, as it is
// for the standard collections.
fn allocated<M>(result: Result<M, FaerError>) -> M {
    match result {
        Ok(m) => m,
        Err(err) => panic!("sparse matrix allocation failed: {err:?}"),
    }
}

impl<T: Scalar> CscMatrix<T> {
    /// Build a CSC from raw col-ptr, row-idx, and values.
    ///
    /// # Arguments
    /// * `col_ptr` - `ncols + 1` offsets into `row_idx`, increasing from 0 to `nnz`
    /// * `row_idx` - row of each stored entry; any order inside a column, duplicates are summed
    /// * `values` - one value per row index
    pub fn new(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, OpError> {
        if col_ptr.len() != ncols + 1 {
            return Err(OpError::InvalidMatrix(format!(
                "column pointer array has length {}, expected {}",
                col_ptr.len(),
                ncols + 1
            )));
        }
        if row_idx.len() != values.len() {
            return Err(OpError::InvalidMatrix(format!(
                "{} row indices but {} values",
                row_idx.len(),
                values.len()
            )));
        }
        if col_ptr[0] != 0 || col_ptr[ncols] != values.len() || col_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(OpError::InvalidMatrix("column pointers must increase from 0 to nnz".into()));
        }
        let mut triplets = Vec::with_capacity(values.len());
        for j in 0..ncols {
            for p in col_ptr[j]..col_ptr[j + 1] {
                triplets.push((row_idx[p], j, values[p]));
            }
        }
        Self::from_triplets(nrows, ncols, &triplets)
    }

    /// Assemble from `(row, col, value)` triplets, summing duplicates.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self, OpError> {
        let entries: Vec<Triplet<usize, usize, T>> =
            triplets.iter().map(|&(i, j, v)| Triplet::new(i, j, v)).collect();
        match SparseColMat::try_new_from_triplets(nrows, ncols, &entries) {
            Ok(inner) => Ok(CscMatrix { inner }),
            Err(CreationError::OutOfBounds { row, col }) => Err(OpError::InvalidMatrix(format!(
                "entry ({row}, {col}) outside a {nrows}x{ncols} matrix"
            ))),
            Err(CreationError::Generic(err)) => Err(err.into()),
        }
    }

    // Columns must already be sorted and free of duplicates.
    fn from_sorted_parts(nrows: usize, ncols: usize, col_ptr: Vec<usize>, row_idx: Vec<usize>, values: Vec<T>) -> Self {
        let symbolic = SymbolicSparseColMat::new_checked(nrows, ncols, col_ptr, None, row_idx);
        CscMatrix { inner: SparseColMat::new(symbolic, values) }
    }

    /// Matrix with no stored entries.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_sorted_parts(nrows, ncols, vec![0; ncols + 1], Vec::new(), Vec::new())
    }

    /// The `n x n` identity, `n` stored entries.
    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(n, n, &vec![T::one(); n])
    }

    /// Matrix with `diag` on its main diagonal; entries beyond `min(nrows, ncols)` are ignored.
    pub fn from_diagonal(nrows: usize, ncols: usize, diag: &[T]) -> Self {
        let k = diag.len().min(nrows).min(ncols);
        let col_ptr = (0..=ncols).map(|j| j.min(k)).collect();
        Self::from_sorted_parts(nrows, ncols, col_ptr, (0..k).collect(), diag[..k].to_vec())
    }

    /// Keep the nonzero entries of a dense matrix.
    pub fn from_dense(m: &Mat<T>) -> Self {
        let mut col_ptr = Vec::with_capacity(m.ncols() + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        col_ptr.push(0);
        for j in 0..m.ncols() {
            for i in 0..m.nrows() {
                if m[(i, j)] != T::zero() {
                    row_idx.push(i);
                    values.push(m[(i, j)]);
                }
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_sorted_parts(m.nrows(), m.ncols(), col_ptr, row_idx, values)
    }

    /// The underlying Faer matrix.
    pub fn as_faer(&self) -> &SparseColMat<usize, T> {
        &self.inner
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Number of stored entries, explicit zeros included.
    pub fn nnz(&self) -> usize {
        self.inner.compute_nnz()
    }

    /// Column `j` occupies `col_ptr()[j]..col_ptr()[j + 1]` of the index and value arrays.
    pub fn col_ptr(&self) -> &[usize] {
        self.inner.col_ptr()
    }

    pub fn row_idx(&self) -> &[usize] {
        self.inner.row_idx()
    }

    /// Stored values, column by column.
    pub fn values(&self) -> &[T] {
        self.inner.val()
    }

    /// Row indices and values of column `j`.
    pub fn col(&self, j: usize) -> (&[usize], &[T]) {
        (self.inner.row_idx_of_col_raw(j), self.inner.val_of_col(j))
    }

    pub fn to_dense(&self) -> Mat<T> {
        self.inner.to_dense()
    }

    /// Compute `A · x` for a dense block `x`.
    pub fn mul_dense(&self, x: &Mat<T>) -> Result<Mat<T>, OpError> {
        if x.nrows() != self.ncols() {
            return Err(OpError::dimension("sparse-dense product", self.shape(), (x.nrows(), x.ncols())));
        }
        Ok(&self.inner * x)
    }

    /// Transpose, re-compressed by column.
    pub fn transpose(&self) -> Self {
        CscMatrix { inner: allocated(self.inner.transpose().to_col_major()) }
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        CscMatrix { inner: allocated(self.inner.adjoint().to_col_major()) }
    }

    /// Entrywise conjugate with the same pattern.
    pub fn conj(&self) -> Self {
        let mut out = self.clone();
        for v in out.inner.val_mut() {
            *v = Scalar::conj(*v);
        }
        out
    }

    /// Same sparsity pattern, values mapped through `f`.
    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> CscMatrix<U> {
        let (symbolic, values) = self.inner.clone().into_parts();
        CscMatrix { inner: SparseColMat::new(symbolic, values.into_iter().map(f).collect()) }
    }

    /// Multiply every stored value by `s`.
    pub fn scale(&self, s: T) -> Self {
        CscMatrix { inner: &self.inner * Scale(s) }
    }

    /// Entrywise sum; shapes must match.
    pub fn add(&self, other: &Self) -> Result<Self, OpError> {
        if self.shape() != other.shape() {
            return Err(OpError::dimension("sparse addition", self.shape(), other.shape()));
        }
        let inner = ops::add(self.inner.as_ref(), other.inner.as_ref())?;
        Ok(CscMatrix { inner })
    }

    /// Sparse product `self · other`.
    pub fn matmul(&self, other: &Self) -> Result<Self, OpError> {
        if self.ncols() != other.nrows() {
            return Err(OpError::dimension("sparse product", self.shape(), other.shape()));
        }
        let inner = sparse_sparse_matmul(
            self.inner.as_ref(),
            other.inner.as_ref(),
            T::one(),
            faer::get_global_parallelism(),
        )?;
        Ok(CscMatrix { inner })
    }
}

impl<T: Scalar> From<SparseColMat<usize, T>> for CscMatrix<T> {
    fn from(inner: SparseColMat<usize, T>) -> Self {
        CscMatrix { inner }
    }
}

/// Runtime-typed CSC matrix.
#[derive(Clone, Debug)]
pub enum SparseArray {
    Float32(CscMatrix<f32>),
    Float64(CscMatrix<f64>),
    Complex64(CscMatrix<num_complex::Complex32>),
    Complex128(CscMatrix<num_complex::Complex64>),
}

macro_rules! sparse_dispatch {
    ($value:expr, $m:ident => $body:expr) => {
        match $value {
            SparseArray::Float32($m) => $body,
            SparseArray::Float64($m) => $body,
            SparseArray::Complex64($m) => $body,
            SparseArray::Complex128($m) => $body,
        }
    };
}

impl SparseArray {
    /// Assemble from triplets; the element type of the triplets fixes the dtype.
    pub fn from_triplets<T: Scalar>(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, OpError> {
        CscMatrix::from_triplets(nrows, ncols, triplets).map(SparseArray::from)
    }

    /// An `nrows x ncols` matrix with no stored entries.
    pub fn zeros(nrows: usize, ncols: usize, dtype: DType) -> Self {
        with_dtype!(dtype, T => SparseArray::from(CscMatrix::<T>::zeros(nrows, ncols)))
    }

    /// The `n x n` identity in `dtype`.
    pub fn identity(n: usize, dtype: DType) -> Self {
        with_dtype!(dtype, T => SparseArray::from(CscMatrix::<T>::identity(n)))
    }

    /// Sparse matrix holding the entries of an `k x 1` diagonal array.
    pub fn from_diagonal(nrows: usize, ncols: usize, diag: &DenseArray) -> Self {
        with_dtype!(diag.dtype(), T => {
            let d = diag.to_vec::<T>();
            SparseArray::from(CscMatrix::from_diagonal(nrows, ncols, &d))
        })
    }

    /// Sparse copy of a dense array, dropping exact zeros.
    pub fn from_dense(a: &DenseArray) -> Self {
        with_dtype!(a.dtype(), T => SparseArray::from(CscMatrix::from_dense(&a.to_mat::<T>())))
    }

    /// Element type of the stored values.
    pub fn dtype(&self) -> DType {
        match self {
            SparseArray::Float32(_) => DType::Float32,
            SparseArray::Float64(_) => DType::Float64,
            SparseArray::Complex64(_) => DType::Complex64,
            SparseArray::Complex128(_) => DType::Complex128,
        }
    }

    pub fn nrows(&self) -> usize {
        sparse_dispatch!(self, m => m.nrows())
    }

    pub fn ncols(&self) -> usize {
        sparse_dispatch!(self, m => m.ncols())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        sparse_dispatch!(self, m => m.nnz())
    }

    /// Borrow the typed matrix when its element type is `T`.
    pub fn as_csc<T: Scalar>(&self) -> Option<&CscMatrix<T>> {
        sparse_dispatch!(self, m => (m as &dyn Any).downcast_ref::<CscMatrix<T>>())
    }

    /// The matrix in element type `T`, converting only when the type differs.
    pub fn to_csc<T: Scalar>(&self) -> Cow<'_, CscMatrix<T>> {
        match self.as_csc::<T>() {
            Some(m) => Cow::Borrowed(m),
            None => Cow::Owned(sparse_dispatch!(self, m => m.map(|v| v.cast::<T>()))),
        }
    }

    /// Convert the values to `dtype`.
    pub fn cast(&self, dtype: DType) -> SparseArray {
        if dtype == self.dtype() {
            return self.clone();
        }
        with_dtype!(dtype, T => SparseArray::from(self.to_csc::<T>().into_owned()))
    }

    pub fn to_dense(&self) -> DenseArray {
        sparse_dispatch!(self, m => DenseArray::from(m.to_dense()))
    }

    /// `A · x` for a dense block, in the common type.
    pub fn mul_dense(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        if x.nrows() != self.ncols() {
            return Err(OpError::dimension("sparse-dense product", self.shape(), x.shape()));
        }
        let dtype = self.dtype().promote(x.dtype());
        with_dtype!(dtype, T => self.to_csc::<T>().mul_dense(&x.to_mat::<T>()).map(DenseArray::from))
    }

    /// Entrywise sum in the promoted type.
    pub fn add(&self, other: &SparseArray) -> Result<SparseArray, OpError> {
        let dtype = self.dtype().promote(other.dtype());
        with_dtype!(dtype, T => self.to_csc::<T>().add(&other.to_csc::<T>()).map(SparseArray::from))
    }

    /// Sparse product in the promoted type.
    pub fn matmul(&self, other: &SparseArray) -> Result<SparseArray, OpError> {
        let dtype = self.dtype().promote(other.dtype());
        with_dtype!(dtype, T => self.to_csc::<T>().matmul(&other.to_csc::<T>()).map(SparseArray::from))
    }

    /// Multiply by `alpha` without widening narrow types.
    pub fn scale(&self, alpha: ScalarValue) -> SparseArray {
        let dtype = self.dtype().scaled(alpha);
        with_dtype!(dtype, T => SparseArray::from(self.to_csc::<T>().scale(alpha.to_scalar::<T>())))
    }

    pub fn transpose(&self) -> SparseArray {
        sparse_dispatch!(self, m => SparseArray::from(m.transpose()))
    }

    /// Entrywise complex conjugate; a copy for real types.
    pub fn conj(&self) -> SparseArray {
        sparse_dispatch!(self, m => SparseArray::from(m.conj()))
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> SparseArray {
        sparse_dispatch!(self, m => SparseArray::from(m.adjoint()))
    }
}

impl<T: Scalar> From<CscMatrix<T>> for SparseArray {
    fn from(m: CscMatrix<T>) -> Self {
        T::into_sparse(m)
    }
}
