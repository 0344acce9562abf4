//! Solver and risk-query error types.

use curvature_core::types::{AdError, CurveError, PricingError};
use thiserror::Error;

/// Errors raised by solver construction and risk queries.
///
/// Failures of the calibration *process* (a singular Newton system mid-run,
/// an exhausted iteration cap) are not errors: they surface as a
/// [`Failed`](crate::solver::SolverStatus::Failed) status on the returned
/// outcome so diagnostic state survives. This type covers contract
/// violations and failures of queries that cannot produce partial results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Vector or matrix sizes disagree with the instrument/node counts.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// The size required by the solver's configuration.
        expected: usize,
        /// The size actually supplied.
        got: usize,
    },

    /// The calibration Jacobian could not be inverted for a risk query.
    #[error("calibration jacobian is singular")]
    SingularSystem,

    /// A risk query was made before the solver reached `Converged`.
    #[error("solver has not converged; risk queries require a converged state")]
    NotConverged,

    /// An exogenous variable name shadows a curve node variable.
    #[error("exogenous variable `{name}` collides with a curve node variable")]
    VariableCollision {
        /// The colliding variable name.
        name: String,
    },

    /// An instrument failed to price.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// A curve operation failed.
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// An AD algebra error surfaced during solving.
    #[error(transparent)]
    Ad(#[from] AdError),
}

impl SolverError {
    /// Check if this is a singular-system error.
    pub fn is_singular(&self) -> bool {
        matches!(self, SolverError::SingularSystem)
    }

    /// Check if this is a not-converged error.
    pub fn is_not_converged(&self) -> bool {
        matches!(self, SolverError::NotConverged)
    }
}
