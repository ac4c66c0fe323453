pub mod options;

pub use options::{BackendKind, SolverOptions};
