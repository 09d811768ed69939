//! This module defines the custom error types for the library.
//!
//! All failure conditions that can arise while computing eigenpairs of an
//! implicit operator are centralized in a single enum behind the public
//! [`EigenError`] newtype.
//!
//! Using the [`thiserror`] crate allows us to create idiomatic error types with
//! minimal boilerplate. Note that [`faer::linalg::evd::EvdError`] does not
//! implement the standard [`std::error::Error`] trait, so we wrap it manually
//! to provide a compatible error type.

use crate::operator::OperatorShape;
use thiserror::Error;

/// Represents all possible errors that can occur while computing eigenpairs.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct EigenError(#[from] EigenErrorKind);

/// Private enum containing the distinct kinds of errors.
/// This separation allows for a clean `Display` implementation via [`thiserror`]
/// while keeping the set of variants free to evolve without breaking callers.
#[derive(Error, Debug)]
pub(crate) enum EigenErrorKind {
    /// The operator declared a dimensionality that cannot be used as a square
    /// size. Detected before any matrix-vector product is requested.
    #[error("Invalid operator shape {shape:?}: the leading dimension must be a positive integer.")]
    InvalidOperatorShape { shape: OperatorShape },

    /// An invalid solver parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InvalidParameter(String),

    /// The operator's `apply` failed. The underlying error is preserved as the
    /// source and is never retried: a failing evaluation indicates a
    /// caller-side defect that a retry cannot fix.
    #[error("Operator application failed: {0}")]
    OperatorApplication(#[source] anyhow::Error),

    /// The operator returned a vector whose length does not match its declared
    /// size.
    #[error(
        "Dimension mismatch: operator of size {expected} returned a vector of length {actual}."
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// The restarted solver exhausted its iteration budget before the requested
    /// number of eigenpairs converged.
    #[error(
        "Lanczos failed to converge: {converged} of {requested} eigenpairs \
         converged within {restarts} restart cycles."
    )]
    NonConvergence {
        requested: usize,
        converged: usize,
        restarts: usize,
    },

    /// Wraps an error originating from [`faer`]'s eigendecomposition module,
    /// raised while diagonalizing the projected matrix T_m.
    #[error("A numerical error occurred during the eigendecomposition of T_m: {0:?}")]
    Evd(faer::linalg::evd::EvdError),
}

impl EigenError {
    /// True if the operator's declared shape was unusable.
    pub fn is_invalid_operator_shape(&self) -> bool {
        matches!(self.0, EigenErrorKind::InvalidOperatorShape { .. })
    }

    /// True if a solver parameter violated its constraints.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self.0, EigenErrorKind::InvalidParameter(_))
    }

    /// True if the operator's `apply` raised the failure.
    pub fn is_operator_application(&self) -> bool {
        matches!(self.0, EigenErrorKind::OperatorApplication(_))
    }

    /// True if the solver ran out of restart cycles before convergence.
    pub fn is_non_convergence(&self) -> bool {
        matches!(self.0, EigenErrorKind::NonConvergence { .. })
    }
}

// Unit tests to ensure error messages are formatted correctly.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shape_display() {
        let err = EigenError::from(EigenErrorKind::InvalidOperatorShape {
            shape: OperatorShape::Dim(0),
        });
        assert!(err.is_invalid_operator_shape());
        assert!(err.to_string().contains("Invalid operator shape"));
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn test_non_convergence_display() {
        let err = EigenError::from(EigenErrorKind::NonConvergence {
            requested: 10,
            converged: 7,
            restarts: 20,
        });
        assert!(err.is_non_convergence());
        let expected = "Lanczos failed to converge: 7 of 10 eigenpairs \
                        converged within 20 restart cycles.";
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_operator_application_preserves_source() {
        let inner = anyhow::anyhow!("device unavailable");
        let err = EigenError::from(EigenErrorKind::OperatorApplication(inner));
        assert!(err.is_operator_application());
        assert!(err.to_string().contains("device unavailable"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EigenError::from(EigenErrorKind::DimensionMismatch {
            expected: 100,
            actual: 99,
        });
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: operator of size 100 returned a vector of length 99."
        );
    }
}
