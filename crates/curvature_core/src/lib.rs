//! # curvature_core: AD number types, curves, and value caching
//!
//! Foundation layer of the curvature workspace, providing:
//! - Sparse dual-number AD values with named variables
//!   (`types::{Dual, Dual2, Variable, Number}`)
//! - Structured error types (`types::error`)
//! - Date and day-count helpers (`types::time`)
//! - Dense linear algebra and scalar root-finders (`math`)
//! - Discount curves with a version-stamped value cache (`curves`)
//!
//! ## Design
//!
//! AD values carry a sparse mapping from variable *names* to derivative
//! coefficients. Combining two values with different variable sets is always
//! legal: the result is formed over the union set with absent entries treated
//! as exactly zero, and the combination is order-independent down to the bit
//! level. First- and second-order values are distinct types; mixing them
//! without an explicit upcast is an [`types::AdError::OrderMismatch`].
//!
//! ## Example
//!
//! ```
//! use curvature_core::types::{Dual, Number};
//!
//! let x = Dual::new(2.0, vec!["x".to_string()]);
//! let y = Dual::new(3.0, vec!["y".to_string()]);
//!
//! let z = &x * &y + &x;
//! assert_eq!(z.real(), 8.0);
//! assert_eq!(z.gradient("x"), 4.0); // y + 1
//! assert_eq!(z.gradient("y"), 2.0); // x
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod curves;
pub mod math;
pub mod types;
