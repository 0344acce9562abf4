//! Core value and error types.
//!
//! This module provides:
//! - [`Dual`]: first-order AD value (value + sparse gradient)
//! - [`Dual2`]: second-order AD value (value + gradient + hessian)
//! - [`Variable`]: exogenous value with a caller-supplied sensitivity vector
//! - [`Number`]: closed tagged variant over all AD orders
//! - [`AdError`], [`CurveError`], [`PricingError`]: structured errors
//! - [`Date`], [`DayCount`]: date arithmetic

mod dual;
mod dual2;
mod error;
mod number;
mod time;
mod variable;
pub(crate) mod vars;

pub use dual::Dual;
pub use dual2::Dual2;
pub use error::{AdError, CurveError, PricingError};
pub use number::{AdOrder, Number};
pub use time::{Date, DayCount};
pub use variable::Variable;
