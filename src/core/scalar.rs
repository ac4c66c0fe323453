//! Scalar element types and caller-level scalars.

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use faer::Mat;
use faer::traits::ComplexField;
use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};

use crate::core::dtype::DType;
use crate::matrix::dense::DenseArray;
use crate::matrix::sparse::{CscMatrix, SparseArray};

/// Element type of dense and sparse storage.
///
/// Implemented for `f32`, `f64`, `Complex32` and `Complex64`, which are also Faer's `c32` and
/// `c64`, so every kernel can go through Faer. Conversions go through `Complex64`; converting
/// a complex value into a real type keeps the real part.
pub trait Scalar:
    ComplexField
    + Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    const DTYPE: DType;

    fn from_c64(z: Complex64) -> Self;
    fn to_c64(self) -> Complex64;
    fn conj(self) -> Self;
    /// Absolute value (complex modulus) in double precision.
    fn modulus(self) -> f64;
    fn is_finite(self) -> bool;

    fn into_dense(m: Mat<Self>) -> DenseArray;
    fn into_sparse(m: CscMatrix<Self>) -> SparseArray;

    fn from_f64(v: f64) -> Self {
        Self::from_c64(Complex64::new(v, 0.0))
    }

    fn cast<U: Scalar>(self) -> U {
        U::from_c64(self.to_c64())
    }
}

impl Scalar for f32 {
    const DTYPE: DType = DType::Float32;

    fn from_c64(z: Complex64) -> Self {
        z.re as f32
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f64 {
        (self as f64).abs()
    }
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
    fn into_dense(m: Mat<Self>) -> DenseArray {
        DenseArray::Float32(m)
    }
    fn into_sparse(m: CscMatrix<Self>) -> SparseArray {
        SparseArray::Float32(m)
    }
}

impl Scalar for f64 {
    const DTYPE: DType = DType::Float64;

    fn from_c64(z: Complex64) -> Self {
        z.re
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f64 {
        self.abs()
    }
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
    fn into_dense(m: Mat<Self>) -> DenseArray {
        DenseArray::Float64(m)
    }
    fn into_sparse(m: CscMatrix<Self>) -> SparseArray {
        SparseArray::Float64(m)
    }
}

impl Scalar for Complex32 {
    const DTYPE: DType = DType::Complex64;

    fn from_c64(z: Complex64) -> Self {
        Complex32::new(z.re as f32, z.im as f32)
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
    fn conj(self) -> Self {
        Complex32::conj(&self)
    }
    fn modulus(self) -> f64 {
        self.to_c64().norm()
    }
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
    fn into_dense(m: Mat<Self>) -> DenseArray {
        DenseArray::Complex64(m)
    }
    fn into_sparse(m: CscMatrix<Self>) -> SparseArray {
        SparseArray::Complex64(m)
    }
}

impl Scalar for Complex64 {
    const DTYPE: DType = DType::Complex128;

    fn from_c64(z: Complex64) -> Self {
        z
    }
    fn to_c64(self) -> Complex64 {
        self
    }
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }
    fn modulus(self) -> f64 {
        self.norm()
    }
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
    fn into_dense(m: Mat<Self>) -> DenseArray {
        DenseArray::Complex128(m)
    }
    fn into_sparse(m: CscMatrix<Self>) -> SparseArray {
        SparseArray::Complex128(m)
    }
}

/// A scalar supplied by the caller, always held in double precision.
///
/// Its own dtype is `Float64` or `Complex128`; when it multiplies a narrow operator it is
/// first cast to the narrow type (see [`DType::scaled`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    Real(f64),
    Complex(Complex64),
}

impl ScalarValue {
    pub fn is_complex(self) -> bool {
        matches!(self, ScalarValue::Complex(_))
    }

    pub fn dtype(self) -> DType {
        match self {
            ScalarValue::Real(_) => DType::Float64,
            ScalarValue::Complex(_) => DType::Complex128,
        }
    }

    pub fn conj(self) -> Self {
        match self {
            ScalarValue::Real(v) => ScalarValue::Real(v),
            ScalarValue::Complex(z) => ScalarValue::Complex(z.conj()),
        }
    }

    pub fn to_c64(self) -> Complex64 {
        match self {
            ScalarValue::Real(v) => Complex64::new(v, 0.0),
            ScalarValue::Complex(z) => z,
        }
    }

    /// Value in the element type `T`.
    pub fn to_scalar<T: Scalar>(self) -> T {
        T::from_c64(self.to_c64())
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Real(v)
    }
}

impl From<f32> for ScalarValue {
    fn from(v: f32) -> Self {
        ScalarValue::Real(v as f64)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Real(v as f64)
    }
}

impl From<Complex64> for ScalarValue {
    fn from(z: Complex64) -> Self {
        ScalarValue::Complex(z)
    }
}

impl From<Complex32> for ScalarValue {
    fn from(z: Complex32) -> Self {
        ScalarValue::Complex(z.to_c64())
    }
}
