//! Element types and the precision/promotion policy shared by every combinator.
//!
//! Names follow the numpy convention: `Complex64` is a pair of `f32`, `Complex128` a pair of `f64`.
//!
//! # Rules
//! - Binary combinations (sum, product, operator applied to an array) use the common type:
//!   the wider precision wins and any complex operand makes the result complex.
//! - Scaling by a caller-level scalar never widens a narrow (`Float32`/`Complex64`) type:
//!   the scalar is cast to the matching narrow type first. Double-precision types use the
//!   ordinary common type.

use std::fmt;

use crate::core::scalar::ScalarValue;

/// Element type of an operator or array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl DType {
    /// True for `Complex64` and `Complex128`.
    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// True for the strictly real types.
    pub fn is_real(self) -> bool {
        !self.is_complex()
    }

    /// True for single-precision types, which scalar scaling must not widen.
    pub fn is_narrow(self) -> bool {
        matches!(self, DType::Float32 | DType::Complex64)
    }

    /// Real type of the same precision.
    pub fn real(self) -> DType {
        match self {
            DType::Float32 | DType::Complex64 => DType::Float32,
            DType::Float64 | DType::Complex128 => DType::Float64,
        }
    }

    /// Complex type of the same precision.
    pub fn complex(self) -> DType {
        match self {
            DType::Float32 | DType::Complex64 => DType::Complex64,
            DType::Float64 | DType::Complex128 => DType::Complex128,
        }
    }

    /// Common type of two operands.
    pub fn promote(self, other: DType) -> DType {
        let wide = !self.is_narrow() || !other.is_narrow();
        let real = if wide { DType::Float64 } else { DType::Float32 };
        if self.is_complex() || other.is_complex() {
            real.complex()
        } else {
            real
        }
    }

    /// Common type of a non-empty list of operands.
    pub fn promote_all(dtypes: impl IntoIterator<Item = DType>) -> Option<DType> {
        dtypes.into_iter().reduce(DType::promote)
    }

    /// Result type of multiplying something of this type by `alpha`.
    pub fn scaled(self, alpha: ScalarValue) -> DType {
        if self.is_narrow() {
            if alpha.is_complex() {
                DType::Complex64
            } else {
                self
            }
        } else {
            self.promote(alpha.dtype())
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `$body` with `$ty` bound to the Rust scalar type of `$dtype`.
macro_rules! with_dtype {
    ($dtype:expr, $ty:ident => $body:expr) => {
        match $dtype {
            $crate::core::dtype::DType::Float32 => {
                type $ty = f32;
                $body
            }
            $crate::core::dtype::DType::Float64 => {
                type $ty = f64;
                $body
            }
            $crate::core::dtype::DType::Complex64 => {
                type $ty = ::num_complex::Complex<f32>;
                $body
            }
            $crate::core::dtype::DType::Complex128 => {
                type $ty = ::num_complex::Complex<f64>;
                $body
            }
        }
    };
}
pub(crate) use with_dtype;

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn promotion_table() {
        use DType::*;
        assert_eq!(Float32.promote(Float32), Float32);
        assert_eq!(Float32.promote(Float64), Float64);
        assert_eq!(Float32.promote(Complex64), Complex64);
        assert_eq!(Float64.promote(Complex64), Complex128);
        assert_eq!(Complex64.promote(Complex128), Complex128);
        assert_eq!(Float64.promote(Float64), Float64);
    }

    #[test]
    fn narrow_types_survive_scaling() {
        assert_eq!(DType::Float32.scaled(ScalarValue::Real(2.5)), DType::Float32);
        assert_eq!(
            DType::Float32.scaled(ScalarValue::Complex(Complex64::new(0.0, 1.0))),
            DType::Complex64
        );
        assert_eq!(DType::Complex64.scaled(ScalarValue::Real(3.0)), DType::Complex64);
    }

    #[test]
    fn wide_types_use_common_type_when_scaled() {
        assert_eq!(DType::Float64.scaled(ScalarValue::Real(2.0)), DType::Float64);
        assert_eq!(
            DType::Float64.scaled(ScalarValue::Complex(Complex64::new(1.0, 1.0))),
            DType::Complex128
        );
    }

    #[test]
    fn promote_all_of_empty_is_none() {
        assert_eq!(DType::promote_all([]), None);
        assert_eq!(
            DType::promote_all([DType::Float32, DType::Complex64, DType::Float64]),
            Some(DType::Complex128)
        );
    }
}
