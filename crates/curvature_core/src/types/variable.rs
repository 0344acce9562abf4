//! Exogenous values with caller-supplied sensitivities.

use super::vars::{grad_eq, GradMap, HessMap};
use super::{AdError, Dual, Dual2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A user-defined, exogenous value: a nominal `f64` plus a sensitivity
/// vector that was supplied by the caller rather than derived by the
/// algebra.
///
/// A `Variable` is a pure data carrier with no derivation logic, used to
/// inject sensitivities that did not arise from the pricing computation
/// itself (e.g. model risk not captured by curve nodes). Once promoted it
/// participates in the algebra exactly like a derived value; the type is
/// the provenance tag that later lets risk reports isolate "manual"
/// sensitivities.
///
/// Scalar arithmetic keeps the exogenous tag; combination with a derived
/// [`Dual`] or [`Dual2`] promotes to that operand's order. Two `Variable`s
/// combined together resolve at first order; upcast explicitly through
/// [`Number::to_order`](super::Number::to_order) for second-order work.
///
/// # Examples
///
/// ```
/// use curvature_core::types::{Dual, Number, Variable};
///
/// let spread = Variable::new(0.0025, vec!["credit_spread".to_string()]);
/// let df = Dual::new(0.97, vec!["node1".to_string()]);
///
/// let adjusted = Number::Variable(spread)
///     .try_mul(&Number::F64(10_000.0))
///     .unwrap()
///     .try_add(&Number::Dual(df))
///     .unwrap();
/// assert_eq!(adjusted.gradient("credit_spread"), 10_000.0);
/// assert_eq!(adjusted.gradient("node1"), 1.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variable {
    real: f64,
    dual: GradMap,
    #[serde(with = "super::vars::hess_serde")]
    dual2: HessMap,
}

impl Variable {
    /// Create an exogenous value sensitive to `vars`, each with unit
    /// derivative.
    pub fn new(real: f64, vars: Vec<String>) -> Self {
        Self {
            real,
            dual: vars.into_iter().map(|v| (v, 1.0)).collect(),
            dual2: HessMap::new(),
        }
    }

    /// Create an exogenous value from an explicit gradient.
    pub fn from_gradient(real: f64, entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            real,
            dual: entries.into_iter().collect(),
            dual2: HessMap::new(),
        }
    }

    /// Attach an explicit hessian; validated like [`Dual2::from_parts`].
    pub fn with_hessian(
        self,
        hessian: impl IntoIterator<Item = ((String, String), f64)>,
    ) -> Result<Self, AdError> {
        let checked = Dual2::from_parts(self.real, self.dual.clone(), hessian)?;
        Ok(Self {
            real: self.real,
            dual: self.dual,
            dual2: checked.hessian_entries().clone(),
        })
    }

    /// The nominal scalar value.
    pub fn real(&self) -> f64 {
        self.real
    }

    /// The derivative with respect to `var` (zero if absent).
    pub fn gradient(&self, var: &str) -> f64 {
        self.dual.get(var).copied().unwrap_or(0.0)
    }

    /// The supplied second derivative with respect to `u` and `v` (zero if
    /// absent or never supplied).
    pub fn hessian(&self, u: &str, v: &str) -> f64 {
        self.dual2
            .get(&super::vars::pair_key(u, v))
            .copied()
            .unwrap_or(0.0)
    }

    /// The names this value carries sensitivity to.
    pub fn variable_names(&self) -> Vec<&str> {
        self.dual.keys().map(String::as_str).collect()
    }

    /// Promote to a first-order derived value (hessian discarded).
    pub fn to_dual(&self) -> Dual {
        Dual::from_gradient(self.real, self.dual.clone())
    }

    /// Promote to a second-order derived value (zero hessian if none was
    /// supplied).
    pub fn to_dual2(&self) -> Dual2 {
        Dual2::from_parts_unchecked(self.real, self.dual.clone(), self.dual2.clone())
    }

    pub(crate) fn scalar_add(&self, s: f64) -> Variable {
        Variable {
            real: self.real + s,
            dual: self.dual.clone(),
            dual2: self.dual2.clone(),
        }
    }

    pub(crate) fn scalar_mul(&self, s: f64) -> Variable {
        Variable {
            real: self.real * s,
            dual: self.dual.iter().map(|(k, g)| (k.clone(), g * s)).collect(),
            dual2: self.dual2.iter().map(|(k, h)| (k.clone(), h * s)).collect(),
        }
    }

    pub(crate) fn neg(&self) -> Variable {
        self.scalar_mul(-1.0)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.real == other.real
            && grad_eq(&self.dual, &other.dual)
            && super::vars::hess_eq(&self.dual2, &other.dual2)
    }
}

/// Orders by nominal value only.
impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.real.partial_cmp(&other.real)
    }
}
