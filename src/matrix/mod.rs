//! Matrix module: runtime-typed dense arrays and compressed sparse column matrices.

pub mod dense;
pub use dense::DenseArray;
pub mod sparse;
pub use sparse::{CscMatrix, SparseArray};
