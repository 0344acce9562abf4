//! Error types for structured error handling.
//!
//! This module provides:
//! - `AdError`: contract violations in the AD algebra
//! - `CurveError`: curve construction and query failures
//! - `PricingError`: instrument pricing failures

use thiserror::Error;

/// Errors raised by the AD algebra.
///
/// These are programming-contract violations and fail fast at the call
/// site; they are recoverable by the caller (e.g. by an explicit upcast).
///
/// # Examples
/// ```
/// use curvature_core::types::{AdOrder, Dual, Dual2, Number};
///
/// let a = Number::Dual(Dual::new(1.0, vec!["x".to_string()]));
/// let b = Number::Dual2(Dual2::new(2.0, vec!["y".to_string()]));
///
/// // first-order and second-order values never combine implicitly
/// assert!(a.try_add(&b).is_err());
///
/// // explicit upcast makes the combination legal
/// assert!(a.to_order(AdOrder::Two).try_add(&b).is_ok());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdError {
    /// A first-order value was combined with a second-order value without an
    /// explicit upcast.
    #[error(
        "cannot combine first-order and second-order values; upcast the \
         first-order operand explicitly"
    )]
    OrderMismatch,

    /// A hessian entry references a variable that the gradient does not carry.
    #[error("hessian entry references variable `{name}` absent from the gradient")]
    InconsistentHessian {
        /// The offending variable name.
        name: String,
    },
}

/// Errors raised by curve construction and queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Fewer nodes than the minimum required.
    #[error("insufficient nodes: got {got}, need at least {need}")]
    InsufficientNodes {
        /// Number of nodes provided.
        got: usize,
        /// Minimum number of nodes required.
        need: usize,
    },

    /// Node dates are not strictly increasing.
    #[error("node dates must be strictly increasing (violation at index {index})")]
    UnsortedNodes {
        /// Index of the first out-of-order node.
        index: usize,
    },

    /// A node vector of the wrong length was supplied.
    #[error("node vector length mismatch: expected {expected}, got {got}")]
    NodeCountMismatch {
        /// Number of free nodes on the curve.
        expected: usize,
        /// Length of the supplied vector.
        got: usize,
    },

    /// A curve id was not found in a curve set.
    #[error("unknown curve: `{id}`")]
    UnknownCurve {
        /// The missing curve id.
        id: String,
    },

    /// Log-space interpolation encountered a non-positive value.
    #[error("log-space interpolation requires positive values, got {value}")]
    NonPositiveValue {
        /// The offending nominal value.
        value: f64,
    },

    /// A zero-rate query at or before the curve anchor date.
    #[error("zero rate requires a date after the curve anchor (tenor {tenor})")]
    NonPositiveTenor {
        /// Year fraction computed from the anchor date.
        tenor: f64,
    },

    /// An AD algebra error surfaced during a curve computation.
    #[error(transparent)]
    Ad(#[from] AdError),
}

impl CurveError {
    /// Check if this is an unknown-curve error.
    pub fn is_unknown_curve(&self) -> bool {
        matches!(self, CurveError::UnknownCurve { .. })
    }
}

/// Errors raised by instrument pricing functions.
///
/// `MissingMarketData` is always a hard failure: a pricing function must
/// never substitute a placeholder for an absent historical fixing, since a
/// silent default corrupts downstream calibration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// A required historical fixing or rate input is unavailable.
    #[error("missing market data for `{label}`: {detail}")]
    MissingMarketData {
        /// Label of the instrument that could not be priced.
        label: String,
        /// Description of the missing input.
        detail: String,
    },

    /// The instrument definition itself is invalid.
    #[error("invalid instrument: {0}")]
    InvalidInstrument(String),

    /// A curve query failed while pricing.
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// An AD algebra error surfaced while pricing.
    #[error(transparent)]
    Ad(#[from] AdError),
}

impl PricingError {
    /// Check if this is a missing-market-data error.
    pub fn is_missing_market_data(&self) -> bool {
        matches!(self, PricingError::MissingMarketData { .. })
    }
}
