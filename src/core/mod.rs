//! Core element types and the dtype promotion policy.

pub mod dtype;
pub mod scalar;

pub use dtype::DType;
pub use scalar::{Scalar, ScalarValue};
