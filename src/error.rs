use thiserror::Error;

// Unified error type for discrete-ops

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("incompatible dimensions for {op}: {left:?} and {right:?}")]
    Dimension {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("unsupported operand type: {0}")]
    UnsupportedType(String),
    #[error("factorization error: {0}")]
    Factorization(String),
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),
    #[error("evaluator error: {0}")]
    Evaluator(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("sparse storage error: {0}")]
    Storage(String),
}

impl OpError {
    pub(crate) fn dimension(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        OpError::Dimension { op, left, right }
    }
}

impl From<faer::sparse::FaerError> for OpError {
    fn from(err: faer::sparse::FaerError) -> Self {
        OpError::Storage(format!("{err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_message_names_both_shapes() {
        let err = OpError::dimension("sum", (3, 2), (2, 3));
        let msg = err.to_string();
        assert!(msg.contains("(3, 2)"), "{msg}");
        assert!(msg.contains("(2, 3)"), "{msg}");
        assert!(msg.contains("sum"), "{msg}");
    }
}
