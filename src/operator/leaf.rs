//! Leaf operators: each wraps one concrete representation.
//!
//! Dense and sparse leaves are stored directly in [`OperatorKind`](super::OperatorKind); this
//! module holds the leaves that carry extra state (diagonal, rank-one, evaluator-backed) and the
//! [`Evaluator`] capability through which callers plug in their own matrix-free action.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use faer::Mat;
use num_traits::Zero;

use crate::core::dtype::{DType, with_dtype};
use crate::error::OpError;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::SparseArray;

/// Matrix-free action supplied by the caller (e.g. a boundary integral assembler).
///
/// `apply` receives an `ncols x 1` array and must return an `nrows x 1` array.
pub trait Evaluator: Send + Sync {
    fn shape(&self) -> (usize, usize);
    fn dtype(&self) -> DType;
    fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError>;

    /// Action of the transpose, `x ↦ Aᵀx`. Evaluators without one cannot be transposed.
    fn apply_transpose(&self, _x: &DenseArray) -> Result<DenseArray, OpError> {
        Err(OpError::Unsupported("evaluator does not provide a transposed action"))
    }
}

/// Evaluator built from closures.
pub struct FnEvaluator<F, G = fn(&DenseArray) -> Result<DenseArray, OpError>> {
    shape: (usize, usize),
    dtype: DType,
    forward: F,
    transpose: Option<G>,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&DenseArray) -> Result<DenseArray, OpError> + Send + Sync,
{
    /// Evaluator with a forward action only.
    ///
    /// # Arguments
    /// * `shape` - `(rows, cols)` of the represented matrix
    /// * `dtype` - element type the action computes in
    /// * `forward` - `x ↦ A x` for an `cols x 1` input
    pub fn new(shape: (usize, usize), dtype: DType, forward: F) -> Self {
        FnEvaluator { shape, dtype, forward, transpose: None }
    }
}

impl<F, G> FnEvaluator<F, G>
where
    F: Fn(&DenseArray) -> Result<DenseArray, OpError> + Send + Sync,
    G: Fn(&DenseArray) -> Result<DenseArray, OpError> + Send + Sync,
{
    /// Evaluator with both `x ↦ A x` and `x ↦ Aᵀ x`.
    pub fn with_transpose(shape: (usize, usize), dtype: DType, forward: F, transpose: G) -> Self {
        FnEvaluator { shape, dtype, forward, transpose: Some(transpose) }
    }
}

impl<F, G> Evaluator for FnEvaluator<F, G>
where
    F: Fn(&DenseArray) -> Result<DenseArray, OpError> + Send + Sync,
    G: Fn(&DenseArray) -> Result<DenseArray, OpError> + Send + Sync,
{
    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        (self.forward)(x)
    }

    fn apply_transpose(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        match &self.transpose {
            Some(g) => g(x),
            None => Err(OpError::Unsupported("evaluator does not provide a transposed action")),
        }
    }
}

/// Whether an implicitly defined operator acts as `A`, `Aᵀ`, `conj(A)` or `Aᴴ`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Orientation {
    pub transposed: bool,
    pub conjugated: bool,
}

impl Orientation {
    pub fn transpose(self) -> Self {
        Orientation { transposed: !self.transposed, ..self }
    }

    pub fn adjoint(self) -> Self {
        Orientation { transposed: !self.transposed, conjugated: !self.conjugated }
    }

    pub fn shape(self, (rows, cols): (usize, usize)) -> (usize, usize) {
        if self.transposed { (cols, rows) } else { (rows, cols) }
    }

    /// Run the forward or transposed action, conjugating around it when needed:
    /// `conj(A) x = conj(A conj(x))`.
    pub(crate) fn run(
        self,
        x: &DenseArray,
        forward: impl FnOnce(&DenseArray) -> Result<DenseArray, OpError>,
        transposed: impl FnOnce(&DenseArray) -> Result<DenseArray, OpError>,
    ) -> Result<DenseArray, OpError> {
        let input = if self.conjugated { Cow::Owned(x.conj()) } else { Cow::Borrowed(x) };
        let y = if self.transposed { transposed(&input)? } else { forward(&input)? };
        Ok(if self.conjugated { y.conj() } else { y })
    }
}

/// Diagonal operator; rectangular shapes pad with zero rows or columns.
#[derive(Clone, Debug)]
pub struct DiagonalOperator {
    values: DenseArray,
    shape: (usize, usize),
}

impl DiagonalOperator {
    /// `values` must be a row or column vector with `min(rows, cols)` entries.
    pub fn new(values: &DenseArray, shape: Option<(usize, usize)>) -> Result<Self, OpError> {
        let values = as_column(values)?;
        let k = values.nrows();
        let shape = shape.unwrap_or((k, k));
        if shape.0.min(shape.1) != k {
            return Err(OpError::dimension("diagonal operator", (k, 1), shape));
        }
        Ok(DiagonalOperator { values, shape })
    }

    /// Diagonal entries as an `k x 1` array.
    pub fn values(&self) -> &DenseArray {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        let dtype = self.dtype().promote(x.dtype());
        let k = self.values.nrows();
        with_dtype!(dtype, T => {
            let d = self.values.to_mat::<T>();
            let v = x.to_mat::<T>();
            Ok(DenseArray::from(Mat::from_fn(self.shape.0, v.ncols(), |i, j| {
                if i < k { d[(i, 0)] * v[(i, j)] } else { T::zero() }
            })))
        })
    }

    pub fn transpose(&self) -> Self {
        DiagonalOperator { values: self.values.clone(), shape: (self.shape.1, self.shape.0) }
    }

    pub fn adjoint(&self) -> Self {
        DiagonalOperator { values: self.values.conj(), shape: (self.shape.1, self.shape.0) }
    }

    /// Sparse matrix with the same entries.
    pub fn to_sparse(&self) -> SparseArray {
        SparseArray::from_diagonal(self.shape.0, self.shape.1, &self.values)
    }
}

/// Rank-one operator `column · rowᵀ` (no conjugation of `row`).
///
/// The dtype is `Complex128` when either vector is complex and `Float64` otherwise; single
/// precision inputs are widened.
#[derive(Clone, Debug)]
pub struct RankOneOperator {
    column: DenseArray,
    row: DenseArray,
}

impl RankOneOperator {
    /// `column` and `row` may each be given as a row or column vector.
    pub fn new(column: &DenseArray, row: &DenseArray) -> Result<Self, OpError> {
        let dtype = if column.is_complex() || row.is_complex() { DType::Complex128 } else { DType::Float64 };
        Ok(RankOneOperator { column: as_column(column)?.cast(dtype), row: as_column(row)?.cast(dtype) })
    }

    pub fn column(&self) -> &DenseArray {
        &self.column
    }

    pub fn row(&self) -> &DenseArray {
        &self.row
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.column.nrows(), self.row.nrows())
    }

    pub fn dtype(&self) -> DType {
        self.column.dtype()
    }

    /// `column · (rowᵀ x)`; for a stack of vectors this is the outer product of `column` with
    /// the row of dot products.
    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        let dots = self.row.transpose().matmul(x)?;
        self.column.matmul(&dots)
    }

    pub fn transpose(&self) -> Self {
        RankOneOperator { column: self.row.clone(), row: self.column.clone() }
    }

    pub fn adjoint(&self) -> Self {
        RankOneOperator { column: self.row.conj(), row: self.column.conj() }
    }

    pub fn to_dense(&self) -> DenseArray {
        outer(&self.column, &self.row)
    }
}

fn outer(column: &DenseArray, row: &DenseArray) -> DenseArray {
    let dtype = column.dtype().promote(row.dtype());
    with_dtype!(dtype, T => {
        let c = column.to_mat::<T>();
        let r = row.to_mat::<T>();
        DenseArray::from(Mat::from_fn(c.nrows(), r.nrows(), |i, j| c[(i, 0)] * r[(j, 0)]))
    })
}

/// Operator whose action is supplied by an [`Evaluator`].
#[derive(Clone)]
pub struct GenericOperator {
    evaluator: Arc<dyn Evaluator>,
    orientation: Orientation,
}

impl GenericOperator {
    /// Wrap an evaluator in its forward orientation.
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        GenericOperator { evaluator, orientation: Orientation::default() }
    }

    pub fn evaluator(&self) -> &Arc<dyn Evaluator> {
        &self.evaluator
    }

    /// Which of `A`, `Aᵀ`, `conj(A)` or `Aᴴ` this operator applies.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn shape(&self) -> (usize, usize) {
        self.orientation.shape(self.evaluator.shape())
    }

    pub fn dtype(&self) -> DType {
        self.evaluator.dtype()
    }

    /// Apply column by column. A real evaluator given complex input sees the real and
    /// imaginary parts separately.
    ///
    /// The result has dtype `promote(self.dtype(), x.dtype())` whatever the evaluator returns.
    /// Columns are evaluated in parallel with the `rayon` feature.
    pub fn apply(&self, x: &DenseArray) -> Result<DenseArray, OpError> {
        let rows = self.shape().0;
        let dtype = self.dtype().promote(x.dtype());
        let column = |j: usize| -> Result<DenseArray, OpError> {
            let y = split_complex(self.dtype(), &x.column(j), |v| {
                self.orientation.run(
                    v,
                    |u| self.evaluator.apply(u),
                    |u| self.evaluator.apply_transpose(u),
                )
            })?;
            if y.shape() != (rows, 1) {
                return Err(OpError::Evaluator(format!(
                    "evaluator returned a {}x{} array, expected {}x1",
                    y.nrows(),
                    y.ncols(),
                    rows
                )));
            }
            Ok(y)
        };
        #[cfg(feature = "rayon")]
        let columns: Vec<DenseArray> = {
            use rayon::prelude::*;
            (0..x.ncols()).into_par_iter().map(column).collect::<Result<_, _>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let columns: Vec<DenseArray> = (0..x.ncols()).map(column).collect::<Result<_, _>>()?;
        if columns.is_empty() {
            return Ok(DenseArray::zeros(rows, 0, dtype));
        }
        Ok(DenseArray::hstack(&columns)?.cast(dtype))
    }

    pub fn transpose(&self) -> Self {
        GenericOperator { evaluator: Arc::clone(&self.evaluator), orientation: self.orientation.transpose() }
    }

    pub fn adjoint(&self) -> Self {
        GenericOperator { evaluator: Arc::clone(&self.evaluator), orientation: self.orientation.adjoint() }
    }
}

impl fmt::Debug for GenericOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericOperator")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .field("orientation", &self.orientation)
            .finish()
    }
}

/// Real/imaginary splitting: a strictly real operator applied to a complex input is applied to
/// `re(x)` and `im(x)` separately and recombined as `re + i·im`.
pub(crate) fn split_complex(
    dtype: DType,
    x: &DenseArray,
    f: impl Fn(&DenseArray) -> Result<DenseArray, OpError>,
) -> Result<DenseArray, OpError> {
    if dtype.is_real() && x.is_complex() {
        let re = f(&x.real_part())?;
        let im = f(&x.imag_part())?;
        DenseArray::from_parts(&re, &im)
    } else {
        f(x)
    }
}

// Ravel a row or column vector into an `n x 1` array.
fn as_column(v: &DenseArray) -> Result<DenseArray, OpError> {
    match v.shape() {
        (_, 1) => Ok(v.clone()),
        (1, _) => Ok(v.transpose()),
        shape => Err(OpError::InvalidMatrix(format!("expected a vector, got a {}x{} array", shape.0, shape.1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn rank_one_acts_on_unit_vectors() {
        let op = RankOneOperator::new(
            &DenseArray::from_column(&[1.0f64, 2.0]),
            &DenseArray::from_column(&[3.0f64, 4.0]),
        )
        .unwrap();
        let e0 = DenseArray::from_column(&[1.0f64, 0.0]);
        let e1 = DenseArray::from_column(&[0.0f64, 1.0]);
        assert_eq!(op.apply(&e0).unwrap().to_vec::<f64>(), vec![3.0, 6.0]);
        assert_eq!(op.apply(&e1).unwrap().to_vec::<f64>(), vec![4.0, 8.0]);
    }

    #[test]
    fn rank_one_widens_single_precision() {
        let col = DenseArray::from_column(&[1.0f32, 2.0]);
        let row = DenseArray::from_column(&[num_complex::Complex32::new(0.0, 1.0)]);
        assert_eq!(RankOneOperator::new(&col, &col).unwrap().dtype(), DType::Float64);
        assert_eq!(RankOneOperator::new(&col, &row).unwrap().dtype(), DType::Complex128);
    }

    #[test]
    fn rectangular_diagonal_pads_with_zeros() {
        let d = DiagonalOperator::new(&DenseArray::from_column(&[2.0f64, 3.0]), Some((3, 2))).unwrap();
        let y = d.apply(&DenseArray::from_column(&[1.0f64, 1.0])).unwrap();
        assert_eq!(y.to_vec::<f64>(), vec![2.0, 3.0, 0.0]);
        assert!(DiagonalOperator::new(&DenseArray::from_column(&[1.0f64]), Some((3, 2))).is_err());
    }

    #[test]
    fn orientation_is_an_involution() {
        let o = Orientation::default();
        assert_eq!(o.transpose().transpose(), o);
        assert_eq!(o.adjoint().adjoint(), o);
        assert_eq!(o.adjoint().transpose(), Orientation { transposed: false, conjugated: true });
    }

    #[test]
    fn generic_result_has_promoted_dtype() {
        // evaluator declares Float64 but hands back single precision
        let eval = FnEvaluator::new((2, 2), DType::Float64, |x: &DenseArray| Ok(x.cast(DType::Float32)));
        let op = GenericOperator::new(Arc::new(eval));
        let y = op.apply(&DenseArray::from_fn(2, 3, |i, j| (i + j) as f64)).unwrap();
        assert_eq!(y.dtype(), DType::Float64);
        assert_eq!(y.shape(), (2, 3));
        let z = op.apply(&DenseArray::from_column(&[1.0f32, 2.0])).unwrap();
        assert_eq!(z.dtype(), DType::Float64);
        let w = op.apply(&DenseArray::from_column(&[Complex64::new(1.0, 1.0), Complex64::new(0.0, 2.0)])).unwrap();
        assert_eq!(w.dtype(), DType::Complex128);
        assert_eq!(w.get(1, 0), Complex64::new(0.0, 2.0));
    }

    #[test]
    fn split_complex_recombines() {
        let x = DenseArray::from_column(&[Complex64::new(1.0, -1.0)]);
        let y = split_complex(DType::Float64, &x, |v| {
            assert!(!v.is_complex());
            Ok(v.scale(crate::core::scalar::ScalarValue::Real(2.0)))
        })
        .unwrap();
        assert_eq!(y.get(0, 0), Complex64::new(2.0, -2.0));
    }
}
