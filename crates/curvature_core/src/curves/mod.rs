//! Discount curves with versioned value caching.
//!
//! A [`Curve`] holds dated discount-factor nodes whose free values can be
//! tagged as AD variables for calibration. Every interpolated lookup flows
//! through a [`ValueCache`] keyed by `(date, ad_order)` and stamped with
//! the curve version, so any node mutation invalidates prior entries in
//! O(1) by advancing the version.

mod cache;
mod curve;

pub use cache::ValueCache;
pub use curve::{Curve, CurveSet, Interpolation};
