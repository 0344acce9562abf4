//! # curvature_solver
//!
//! Curve calibration and risk coordination for the curvature workspace.
//!
//! This crate drives the AD machinery in `curvature_core` to solve the
//! inverse problem of curve construction: given quoted instruments and
//! their market values, find the curve node values that reprice them. A
//! converged [`Solver`] then answers risk queries (delta, gamma, exogenous
//! delta, cross-solver jacobians) through the inverse of its calibration
//! Jacobian, without finite differences and without re-running iteration.
//!
//! ## Modules
//!
//! - `instrument`: the [`CalibrationInstrument`] trait and standard quotes
//! - `solver`: the Newton / Levenberg-Marquardt calibration engine
//! - `risk`: sensitivity queries on a converged solver
//!
//! ## Example
//!
//! ```rust,ignore
//! use curvature_solver::prelude::*;
//!
//! let mut solver = Solver::new(
//!     "usd_solver", curves, instruments, targets,
//!     Algorithm::Newton, SolverConfig::default(),
//! )?;
//! let outcome = solver.solve()?;
//! assert!(outcome.status.is_converged());
//! let delta = solver.delta(&portfolio)?;
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod instrument;
pub mod risk;
pub mod solver;

mod error;

pub use error::SolverError;
pub use instrument::CalibrationInstrument;
pub use solver::{Algorithm, Solver, SolverConfig, SolverOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::instrument::*;
    pub use crate::risk::*;
    pub use crate::solver::*;
    pub use crate::SolverError;
}
