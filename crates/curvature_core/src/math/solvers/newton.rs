//! One-dimensional Newton-Raphson with AD-aware final iterations.

use super::RootConfig;
use crate::types::{AdError, AdOrder, Number};

/// Termination state of a scalar root search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    /// `|f(x)|` fell below the function tolerance.
    Converged,
    /// Successive iterates moved by less than the step tolerance.
    StepToleranceReached,
    /// Iteration cap exceeded or the iteration diverged.
    Failed,
}

/// Outcome of a scalar root search.
///
/// When the target function closes over AD operands the root is itself an
/// AD value: its gradient (and hessian, at second order) holds the implicit
/// sensitivities of the solution to those operands.
#[derive(Debug, Clone)]
pub struct RootResult {
    /// The located root, carrying any implicit sensitivities.
    pub root: Number,
    /// Function evaluations performed, including the AD finalisation steps.
    pub iterations: usize,
    /// How the search terminated.
    pub state: RootState,
}

impl RootResult {
    /// Whether the search terminated at a root.
    pub fn is_converged(&self) -> bool {
        self.state != RootState::Failed
    }
}

/// Find a root of `f(g) = 0` for a single unknown `g`.
///
/// `f` returns the function value and its analytic derivative with respect
/// to `g`, both as [`Number`]s. The search runs in plain floats (the
/// unknown is passed as `Number::F64`), then performs one extra
/// Newton step in AD arithmetic so the returned root carries the
/// sensitivities of any AD operands `f` closes over. Two extra steps are
/// taken at second order, which is required for the hessian of the
/// implicit solution to settle.
///
/// Divergence and an exhausted iteration cap are reported through
/// [`RootState::Failed`], not an error; errors are reserved for failures of
/// `f` itself.
///
/// # Example
///
/// ```
/// use curvature_core::math::solvers::{newton_1dim, RootConfig};
/// use curvature_core::types::{AdError, Dual, Number};
///
/// // Solve g^2 - s = 0 with s carrying a sensitivity tag.
/// let s = Number::Dual(Dual::new(2.0, vec!["s".to_string()]));
/// let result = newton_1dim(
///     |g: &Number| -> Result<(Number, Number), AdError> {
///         let f0 = g.try_mul(g)?.try_sub(&s)?;
///         let f1 = g.try_mul(&Number::F64(2.0))?;
///         Ok((f0, f1))
///     },
///     1.0,
///     &RootConfig::default(),
/// ).unwrap();
///
/// assert!((result.root.real() - 2.0_f64.sqrt()).abs() < 1e-12);
/// // d(sqrt(s))/ds = 1 / (2 sqrt(s))
/// assert!((result.root.gradient("s") - 0.5 / 2.0_f64.sqrt()).abs() < 1e-9);
/// ```
pub fn newton_1dim<F, E>(mut f: F, g0: f64, config: &RootConfig) -> Result<RootResult, E>
where
    F: FnMut(&Number) -> Result<(Number, Number), E>,
    E: From<AdError>,
{
    let mut g = g0;
    let mut iterations = 0;
    let mut state = RootState::Failed;

    while iterations < config.max_iterations {
        let (f0, f1) = f(&Number::F64(g))?;
        iterations += 1;
        let f0_val = f0.real();
        let f1_val = f1.real();
        let g_next = g - f0_val / f1_val;

        if f0_val.abs() < config.func_tol {
            state = RootState::Converged;
            break;
        }
        if !g_next.is_finite() {
            return Ok(RootResult {
                root: Number::F64(f64::NAN),
                iterations,
                state: RootState::Failed,
            });
        }
        if (g_next - g).abs() < config.conv_tol {
            g = g_next;
            state = RootState::StepToleranceReached;
            break;
        }
        g = g_next;
    }

    if state == RootState::Failed {
        return Ok(RootResult {
            root: Number::F64(g),
            iterations,
            state,
        });
    }

    // Final iterations in AD arithmetic to capture implicit sensitivities.
    let (f0, f1) = f(&Number::F64(g))?;
    let second_order =
        f0.ad_order() == AdOrder::Two || f1.ad_order() == AdOrder::Two;
    let any_ad = second_order
        || f0.ad_order() != AdOrder::Zero
        || f1.ad_order() != AdOrder::Zero;

    let mut root = Number::F64(g);
    if any_ad {
        iterations += 1;
        root = root.try_sub(&f0.try_div(&f1)?)?;
    }
    if second_order {
        let (f0, f1) = f(&root)?;
        iterations += 1;
        root = root.try_sub(&f0.try_div(&f1)?)?;
    }

    Ok(RootResult {
        root,
        iterations,
        state,
    })
}
