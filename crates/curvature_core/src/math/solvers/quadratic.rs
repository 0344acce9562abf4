//! Closed-form quadratic solver with root discrimination.

use super::{RootResult, RootState};
use crate::types::{AdError, Number};

/// Solve `a x^2 + b x + c = 0`, returning the root nearest to `x0`.
///
/// Coefficients may carry AD sensitivities; the returned root then carries
/// the sensitivities of the selected closed-form solution. When `|a|` is
/// below `1e-15` the equation degenerates and is solved as linear in `b`
/// and `c`. A negative discriminant reports [`RootState::Failed`] with a
/// `NaN` root rather than an error.
///
/// # Example
///
/// ```
/// use curvature_core::math::solvers::quadratic_eqn;
/// use curvature_core::types::{Dual, Number};
///
/// let c = Number::Dual(Dual::new(-6.0, vec!["c".to_string()]));
/// let result = quadratic_eqn(&Number::F64(1.0), &Number::F64(1.0), &c, -2.9).unwrap();
/// assert!((result.root.real() + 3.0).abs() < 1e-12);
/// ```
pub fn quadratic_eqn(
    a: &Number,
    b: &Number,
    c: &Number,
    x0: f64,
) -> Result<RootResult, AdError> {
    let four_ac = a.try_mul(c)?.try_mul(&Number::F64(4.0))?;
    let discriminant = b.try_mul(b)?.try_sub(&four_ac)?;

    if discriminant.real() < 0.0 {
        return Ok(RootResult {
            root: Number::F64(f64::NAN),
            iterations: 0,
            state: RootState::Failed,
        });
    }

    // Degenerate in a: linear equation b x + c = 0
    if a.real().abs() <= 1e-15 {
        if b.real().abs() <= 1e-15 {
            return Ok(RootResult {
                root: Number::F64(f64::NAN),
                iterations: 0,
                state: RootState::Failed,
            });
        }
        let root = c.neg().try_div(b)?;
        return Ok(RootResult {
            root,
            iterations: 1,
            state: RootState::Converged,
        });
    }

    let sqrt_d = discriminant.sqrt();
    let two_a = a.try_mul(&Number::F64(2.0))?;
    let neg_b = b.neg();
    let r1 = neg_b.try_add(&sqrt_d)?.try_div(&two_a)?;
    let r2 = neg_b.try_sub(&sqrt_d)?.try_div(&two_a)?;

    let root = if (x0 - r1.real()).abs() < (x0 - r2.real()).abs() {
        r1
    } else {
        r2
    };
    Ok(RootResult {
        root,
        iterations: 1,
        state: RootState::Converged,
    })
}
