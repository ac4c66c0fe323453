//! Runtime-typed dense arrays on top of Faer.
//!
//! `DenseArray` holds a column-major `faer::Mat<T>` for one of the four supported element
//! types. Operators take and return `DenseArray`s: a single vector is an `n x 1` array and a
//! stack of vectors is an `n x k` array with one vector per column.
//!
//! Binary operations promote both operands to their common type (see [`DType::promote`]);
//! scalar scaling follows the narrow-precision rule of [`DType::scaled`].

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use faer::{Mat, Scale};
use num_complex::Complex64;

use crate::core::dtype::{DType, with_dtype};
use crate::core::scalar::{Scalar, ScalarValue};
use crate::error::OpError;

/// Dense column-major array with a runtime element type.
#[derive(Clone)]
pub enum DenseArray {
    Float32(Mat<f32>),
    Float64(Mat<f64>),
    Complex64(Mat<num_complex::Complex32>),
    Complex128(Mat<Complex64>),
}

macro_rules! dense_dispatch {
    ($value:expr, $m:ident => $body:expr) => {
        match $value {
            DenseArray::Float32($m) => $body,
            DenseArray::Float64($m) => $body,
            DenseArray::Complex64($m) => $body,
            DenseArray::Complex128($m) => $body,
        }
    };
}

impl DenseArray {
    /// Build an array of element type `T` from a generator.
    pub fn from_fn<T: Scalar>(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        T::into_dense(Mat::from_fn(nrows, ncols, f))
    }

    /// Single column vector.
    pub fn from_column<T: Scalar>(values: &[T]) -> Self {
        Self::from_fn(values.len(), 1, |i, _| values[i])
    }

    /// Construct from row-major storage, as matrices are usually written down.
    pub fn from_row_major<T: Scalar>(nrows: usize, ncols: usize, data: &[T]) -> Result<Self, OpError> {
        if data.len() != nrows * ncols {
            return Err(OpError::InvalidMatrix(format!(
                "expected {} values for a {}x{} array, got {}",
                nrows * ncols,
                nrows,
                ncols,
                data.len()
            )));
        }
        Ok(Self::from_fn(nrows, ncols, |i, j| data[i * ncols + j]))
    }

    pub fn zeros(nrows: usize, ncols: usize, dtype: DType) -> Self {
        with_dtype!(dtype, T => DenseArray::from(Mat::<T>::zeros(nrows, ncols)))
    }

    pub fn identity(n: usize, dtype: DType) -> Self {
        with_dtype!(dtype, T => DenseArray::from(Mat::<T>::identity(n, n)))
    }

    pub fn dtype(&self) -> DType {
        match self {
            DenseArray::Float32(_) => DType::Float32,
            DenseArray::Float64(_) => DType::Float64,
            DenseArray::Complex64(_) => DType::Complex64,
            DenseArray::Complex128(_) => DType::Complex128,
        }
    }

    pub fn nrows(&self) -> usize {
        dense_dispatch!(self, m => m.nrows())
    }

    pub fn ncols(&self) -> usize {
        dense_dispatch!(self, m => m.ncols())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_complex(&self) -> bool {
        self.dtype().is_complex()
    }

    /// Borrow the underlying matrix if it already has element type `T`.
    pub fn as_mat<T: Scalar>(&self) -> Option<&Mat<T>> {
        dense_dispatch!(self, m => (m as &dyn Any).downcast_ref::<Mat<T>>())
    }

    /// The array in element type `T`, converting only when the type differs.
    pub fn to_mat<T: Scalar>(&self) -> Cow<'_, Mat<T>> {
        match self.as_mat::<T>() {
            Some(m) => Cow::Borrowed(m),
            None => Cow::Owned(dense_dispatch!(self, m => {
                Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)].cast::<T>())
            })),
        }
    }

    /// Entries in column-major order, converted to `T`.
    pub fn to_vec<T: Scalar>(&self) -> Vec<T> {
        let m = self.to_mat::<T>();
        let mut out = Vec::with_capacity(m.nrows() * m.ncols());
        for j in 0..m.ncols() {
            for i in 0..m.nrows() {
                out.push(m[(i, j)]);
            }
        }
        out
    }

    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        dense_dispatch!(self, m => m[(i, j)].to_c64())
    }

    pub fn cast(&self, dtype: DType) -> DenseArray {
        if dtype == self.dtype() {
            return self.clone();
        }
        with_dtype!(dtype, T => DenseArray::from(self.to_mat::<T>().into_owned()))
    }

    /// Column `j` as an `n x 1` array.
    pub fn column(&self, j: usize) -> DenseArray {
        dense_dispatch!(self, m => DenseArray::from(m.subcols(j, 1).to_owned()))
    }

    /// Concatenate column blocks with equal row counts, promoting to their common type.
    pub fn hstack(blocks: &[DenseArray]) -> Result<DenseArray, OpError> {
        let Some(first) = blocks.first() else {
            return Err(OpError::InvalidMatrix("cannot stack an empty list of arrays".into()));
        };
        let nrows = first.nrows();
        for block in blocks {
            if block.nrows() != nrows {
                return Err(OpError::dimension("hstack", first.shape(), block.shape()));
            }
        }
        let dtype = DType::promote_all(blocks.iter().map(DenseArray::dtype)).unwrap_or(DType::Float64);
        let ncols = blocks.iter().map(DenseArray::ncols).sum();
        with_dtype!(dtype, T => {
            let mut out = Mat::<T>::zeros(nrows, ncols);
            let mut offset = 0;
            for block in blocks {
                let part = block.to_mat::<T>();
                out.subcols_mut(offset, part.ncols()).copy_from(Mat::as_ref(&part));
                offset += part.ncols();
            }
            Ok(DenseArray::from(out))
        })
    }

    /// Real part, in the real type of the same precision.
    pub fn real_part(&self) -> DenseArray {
        match self {
            DenseArray::Complex64(m) => DenseArray::from(Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)].re)),
            DenseArray::Complex128(m) => DenseArray::from(Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)].re)),
            real => real.clone(),
        }
    }

    /// Imaginary part, in the real type of the same precision.
    pub fn imag_part(&self) -> DenseArray {
        match self {
            DenseArray::Complex64(m) => DenseArray::from(Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)].im)),
            DenseArray::Complex128(m) => DenseArray::from(Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)].im)),
            real => DenseArray::zeros(real.nrows(), real.ncols(), real.dtype()),
        }
    }

    /// Recombine `re + i·im` into the complex type of their common precision.
    pub fn from_parts(re: &DenseArray, im: &DenseArray) -> Result<DenseArray, OpError> {
        if re.shape() != im.shape() {
            return Err(OpError::dimension("complex recombination", re.shape(), im.shape()));
        }
        let dtype = re.dtype().promote(im.dtype()).complex();
        with_dtype!(dtype, T => {
            let r = re.to_mat::<T>();
            let s = im.to_mat::<T>();
            let unit = T::from_c64(Complex64::i());
            Ok(DenseArray::from(&*r + &*s * Scale(unit)))
        })
    }

    pub fn conj(&self) -> DenseArray {
        if !self.is_complex() {
            return self.clone();
        }
        dense_dispatch!(self, m => DenseArray::from(m.conjugate().to_owned()))
    }

    pub fn transpose(&self) -> DenseArray {
        dense_dispatch!(self, m => DenseArray::from(m.transpose().to_owned()))
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> DenseArray {
        dense_dispatch!(self, m => DenseArray::from(m.adjoint().to_owned()))
    }

    /// Entrywise sum in the common type.
    pub fn add(&self, other: &DenseArray) -> Result<DenseArray, OpError> {
        if self.shape() != other.shape() {
            return Err(OpError::dimension("addition", self.shape(), other.shape()));
        }
        let dtype = self.dtype().promote(other.dtype());
        with_dtype!(dtype, T => Ok(DenseArray::from(&*self.to_mat::<T>() + &*other.to_mat::<T>())))
    }

    /// Entrywise difference in the common type.
    pub fn sub(&self, other: &DenseArray) -> Result<DenseArray, OpError> {
        if self.shape() != other.shape() {
            return Err(OpError::dimension("subtraction", self.shape(), other.shape()));
        }
        let dtype = self.dtype().promote(other.dtype());
        with_dtype!(dtype, T => Ok(DenseArray::from(&*self.to_mat::<T>() - &*other.to_mat::<T>())))
    }

    /// Multiply every entry by `alpha` without widening narrow types.
    pub fn scale(&self, alpha: ScalarValue) -> DenseArray {
        let dtype = self.dtype().scaled(alpha);
        with_dtype!(dtype, T => {
            DenseArray::from(&*self.to_mat::<T>() * Scale(alpha.to_scalar::<T>()))
        })
    }

    /// Matrix product `self · other` in the common type.
    pub fn matmul(&self, other: &DenseArray) -> Result<DenseArray, OpError> {
        if self.ncols() != other.nrows() {
            return Err(OpError::dimension("matrix product", self.shape(), other.shape()));
        }
        let dtype = self.dtype().promote(other.dtype());
        with_dtype!(dtype, T => Ok(DenseArray::from(&*self.to_mat::<T>() * &*other.to_mat::<T>())))
    }

    /// Largest entry modulus; zero for empty arrays.
    pub fn max_abs(&self) -> f64 {
        dense_dispatch!(self, m => {
            let mut best = 0.0f64;
            for j in 0..m.ncols() {
                for i in 0..m.nrows() {
                    best = best.max(m[(i, j)].modulus());
                }
            }
            best
        })
    }

    pub fn all_finite(&self) -> bool {
        dense_dispatch!(self, m => m.as_ref().is_all_finite())
    }
}

impl<T: Scalar> From<Mat<T>> for DenseArray {
    fn from(m: Mat<T>) -> Self {
        T::into_dense(m)
    }
}

impl fmt::Debug for DenseArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, c) = self.shape();
        write!(f, "DenseArray<{}>[{}x{}](", self.dtype(), r, c)?;
        for i in 0..r.min(8) {
            if i > 0 {
                f.write_str("; ")?;
            }
            for j in 0..c.min(8) {
                if j > 0 {
                    f.write_str(", ")?;
                }
                let z = self.get(i, j);
                if self.is_complex() {
                    write!(f, "{}{:+}i", z.re, z.im)?;
                } else {
                    write!(f, "{}", z.re)?;
                }
            }
        }
        f.write_str(")")
    }
}
