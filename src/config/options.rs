//! API options for the sparse inverse.
//!
//! `SolverOptions` names the factorization backend. The backend is
//! chosen once, when the options are turned into a [`FactorizationBackend`], and is then
//! injected into [`crate::solver::SparseSolver`]; nothing is selected at solve time.
//! A backend can also be named in a string, e.g. read from a config file:
//!
//! ```rust
//! use discrete_ops::{BackendKind, SolverOptions};
//!
//! let opts = SolverOptions::default().with_backend("dense-lu".parse::<BackendKind>().unwrap());
//! assert_eq!(opts.backend().name(), "dense-lu");
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::error::OpError;
use crate::solver::FactorizationBackend;
use crate::solver::direct_lu::DenseLuBackend;
use crate::solver::sparse_lu::SparseLuBackend;

/// Available factorization backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Sparse LU with partial pivoting (splu)
    #[default]
    SparseLu,
    /// Faer full-pivoting LU on the densified matrix
    DenseLu,
}

impl FromStr for BackendKind {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "splu" | "sparse-lu" | "sparse_lu" => Ok(BackendKind::SparseLu),
            "dense-lu" | "dense_lu" | "faer" => Ok(BackendKind::DenseLu),
            other => Err(OpError::UnsupportedType(format!("unknown factorization backend '{other}'"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::SparseLu => "sparse-lu",
            BackendKind::DenseLu => "dense-lu",
        })
    }
}

/// Factorization backend selection.
///
/// Both backends reject a matrix only on an exactly zero pivot or a non-finite solve, so the
/// choice changes cost, not which matrices are accepted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverOptions {
    /// Which backend factorizes (sparse-lu, dense-lu)
    pub backend: BackendKind,
}

impl SolverOptions {
    /// Replace the backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Build the configured backend.
    pub fn backend(&self) -> Box<dyn FactorizationBackend> {
        info!(backend = %self.backend, "factorization backend selected");
        match self.backend {
            BackendKind::SparseLu => Box::new(SparseLuBackend),
            BackendKind::DenseLu => Box::new(DenseLuBackend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("splu".parse::<BackendKind>().unwrap(), BackendKind::SparseLu);
        assert_eq!(" Sparse-LU ".parse::<BackendKind>().unwrap(), BackendKind::SparseLu);
        assert_eq!("faer".parse::<BackendKind>().unwrap(), BackendKind::DenseLu);
        assert!("umfpack".parse::<BackendKind>().is_err());
    }

    #[test]
    fn defaults() {
        let opts = SolverOptions::default();
        assert_eq!(opts.backend, BackendKind::SparseLu);
        assert_eq!(opts.backend().name(), "sparse-lu");
        assert_eq!(opts.with_backend(BackendKind::DenseLu).backend().name(), "dense-lu");
    }
}
