//! Scalar root-finders with sensitivity-preserving results.
//!
//! Both solvers return a [`RootResult`] whose root is a [`Number`](crate::types::Number):
//! when the target function captures AD operands, the root carries the
//! implicit sensitivities of the solution with respect to those operands.

mod config;
mod newton;
mod quadratic;

pub use config::RootConfig;
pub use newton::{newton_1dim, RootResult, RootState};
pub use quadratic::quadratic_eqn;
