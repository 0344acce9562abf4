//! Closed tagged variant over AD orders with checked combination.

use super::{AdError, Dual, Dual2, Variable};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The differentiation order of an AD value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdOrder {
    /// Plain scalar, no sensitivities.
    Zero,
    /// Gradient only.
    One,
    /// Gradient and hessian.
    Two,
}

/// A scalar that is either a plain float, a first-order or second-order AD
/// value, or an exogenous [`Variable`].
///
/// Every binary operation pattern-matches on the pair of tags and either
/// computes directly or promotes-then-computes:
///
/// - a plain `F64` is a constant to any AD operand (no variable-set change);
/// - `Dual` with `Dual2` is an [`AdError::OrderMismatch`]; callers must
///   upcast explicitly via [`Number::to_order`], which makes the loss of
///   second-order information impossible to trigger silently;
/// - a `Variable` promotes to the order of the derived operand it meets,
///   keeps its exogenous tag under scalar arithmetic, and resolves at first
///   order against another `Variable`.
///
/// Promotion is total: [`Number::to_order`] converts between any pair of
/// tags (downcasting discards higher-order coefficients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Number {
    /// Plain scalar.
    F64(f64),
    /// First-order AD value.
    Dual(Dual),
    /// Second-order AD value.
    Dual2(Dual2),
    /// Exogenous value with caller-supplied sensitivities.
    Variable(Variable),
}

/// Operand pair after tag resolution.
enum Pair {
    F64(f64, f64),
    Dual(Dual, Dual),
    Dual2(Dual2, Dual2),
}

impl Number {
    /// The nominal scalar value.
    pub fn real(&self) -> f64 {
        match self {
            Number::F64(v) => *v,
            Number::Dual(d) => d.real(),
            Number::Dual2(d) => d.real(),
            Number::Variable(v) => v.real(),
        }
    }

    /// The AD order this value computes at.
    ///
    /// A `Variable` reports [`AdOrder::One`], its default promotion order.
    pub fn ad_order(&self) -> AdOrder {
        match self {
            Number::F64(_) => AdOrder::Zero,
            Number::Dual(_) => AdOrder::One,
            Number::Dual2(_) => AdOrder::Two,
            Number::Variable(_) => AdOrder::One,
        }
    }

    /// Whether this value is an exogenous [`Variable`].
    pub fn is_exogenous(&self) -> bool {
        matches!(self, Number::Variable(_))
    }

    /// The derivative with respect to `var` (zero if absent or untracked).
    pub fn gradient(&self, var: &str) -> f64 {
        match self {
            Number::F64(_) => 0.0,
            Number::Dual(d) => d.gradient(var),
            Number::Dual2(d) => d.gradient(var),
            Number::Variable(v) => v.gradient(var),
        }
    }

    /// The full sparse gradient (empty for a plain scalar).
    pub fn gradient_entries(&self) -> std::collections::BTreeMap<String, f64> {
        match self {
            Number::F64(_) => Default::default(),
            Number::Dual(d) => d.gradient_entries().clone(),
            Number::Dual2(d) => d.gradient_entries().clone(),
            Number::Variable(v) => v.to_dual().gradient_entries().clone(),
        }
    }

    /// The second derivative with respect to `u` and `v`.
    ///
    /// Zero for plain scalars and first-order values. A `Variable` reports
    /// its caller-supplied hessian entries, mirroring [`Number::gradient`].
    pub fn hessian(&self, u: &str, v: &str) -> f64 {
        match self {
            Number::Dual2(d) => d.hessian(u, v),
            Number::Variable(var) => var.hessian(u, v),
            _ => 0.0,
        }
    }

    /// Total promotion between AD orders.
    ///
    /// Upcasting fills the new coefficients with zeros; downcasting
    /// discards the higher-order coefficients. A `Variable` converts to the
    /// requested derived representation, losing its exogenous tag.
    pub fn to_order(&self, order: AdOrder) -> Number {
        match (self, order) {
            (Number::F64(v), AdOrder::Zero) => Number::F64(*v),
            (Number::F64(v), AdOrder::One) => Number::Dual(Dual::from(*v)),
            (Number::F64(v), AdOrder::Two) => Number::Dual2(Dual2::from(*v)),
            (Number::Dual(d), AdOrder::Zero) => Number::F64(d.real()),
            (Number::Dual(d), AdOrder::One) => Number::Dual(d.clone()),
            (Number::Dual(d), AdOrder::Two) => Number::Dual2(d.to_dual2()),
            (Number::Dual2(d), AdOrder::Zero) => Number::F64(d.real()),
            (Number::Dual2(d), AdOrder::One) => Number::Dual(d.to_dual()),
            (Number::Dual2(d), AdOrder::Two) => Number::Dual2(d.clone()),
            (Number::Variable(v), AdOrder::Zero) => Number::F64(v.real()),
            (Number::Variable(v), AdOrder::One) => Number::Dual(v.to_dual()),
            (Number::Variable(v), AdOrder::Two) => Number::Dual2(v.to_dual2()),
        }
    }

    /// Resolve a pair of operands to a common representation, preserving
    /// operand order.
    fn coerce(&self, rhs: &Number) -> Result<Pair, AdError> {
        use Number::*;
        Ok(match (self, rhs) {
            (F64(a), F64(b)) => Pair::F64(*a, *b),
            (F64(a), Dual(b)) => Pair::Dual(super::Dual::from(*a), b.clone()),
            (Dual(a), F64(b)) => Pair::Dual(a.clone(), super::Dual::from(*b)),
            (F64(a), Dual2(b)) => Pair::Dual2(super::Dual2::from(*a), b.clone()),
            (Dual2(a), F64(b)) => Pair::Dual2(a.clone(), super::Dual2::from(*b)),
            (Dual(a), Dual(b)) => Pair::Dual(a.clone(), b.clone()),
            (Dual2(a), Dual2(b)) => Pair::Dual2(a.clone(), b.clone()),
            (Dual(_), Dual2(_)) | (Dual2(_), Dual(_)) => return Err(AdError::OrderMismatch),
            (Variable(a), Dual(b)) => Pair::Dual(a.to_dual(), b.clone()),
            (Dual(a), Variable(b)) => Pair::Dual(a.clone(), b.to_dual()),
            (Variable(a), Dual2(b)) => Pair::Dual2(a.to_dual2(), b.clone()),
            (Dual2(a), Variable(b)) => Pair::Dual2(a.clone(), b.to_dual2()),
            (Variable(a), Variable(b)) => Pair::Dual(a.to_dual(), b.to_dual()),
            (Variable(a), F64(b)) => Pair::Dual(a.to_dual(), super::Dual::from(*b)),
            (F64(a), Variable(b)) => Pair::Dual(super::Dual::from(*a), b.to_dual()),
        })
    }

    /// Checked addition.
    pub fn try_add(&self, rhs: &Number) -> Result<Number, AdError> {
        match (self, rhs) {
            (Number::Variable(v), Number::F64(s)) | (Number::F64(s), Number::Variable(v)) => {
                Ok(Number::Variable(v.scalar_add(*s)))
            }
            _ => Ok(match self.coerce(rhs)? {
                Pair::F64(a, b) => Number::F64(a + b),
                Pair::Dual(a, b) => Number::Dual(&a + &b),
                Pair::Dual2(a, b) => Number::Dual2(&a + &b),
            }),
        }
    }

    /// Checked subtraction.
    pub fn try_sub(&self, rhs: &Number) -> Result<Number, AdError> {
        match (self, rhs) {
            (Number::Variable(v), Number::F64(s)) => Ok(Number::Variable(v.scalar_add(-s))),
            (Number::F64(s), Number::Variable(v)) => Ok(Number::Variable(v.neg().scalar_add(*s))),
            _ => Ok(match self.coerce(rhs)? {
                Pair::F64(a, b) => Number::F64(a - b),
                Pair::Dual(a, b) => Number::Dual(&a - &b),
                Pair::Dual2(a, b) => Number::Dual2(&a - &b),
            }),
        }
    }

    /// Checked multiplication.
    pub fn try_mul(&self, rhs: &Number) -> Result<Number, AdError> {
        match (self, rhs) {
            (Number::Variable(v), Number::F64(s)) | (Number::F64(s), Number::Variable(v)) => {
                Ok(Number::Variable(v.scalar_mul(*s)))
            }
            _ => Ok(match self.coerce(rhs)? {
                Pair::F64(a, b) => Number::F64(a * b),
                Pair::Dual(a, b) => Number::Dual(&a * &b),
                Pair::Dual2(a, b) => Number::Dual2(&a * &b),
            }),
        }
    }

    /// Checked division.
    pub fn try_div(&self, rhs: &Number) -> Result<Number, AdError> {
        match (self, rhs) {
            (Number::Variable(v), Number::F64(s)) => Ok(Number::Variable(v.scalar_mul(1.0 / s))),
            _ => Ok(match self.coerce(rhs)? {
                Pair::F64(a, b) => Number::F64(a / b),
                Pair::Dual(a, b) => Number::Dual(&a / &b),
                Pair::Dual2(a, b) => Number::Dual2(&a / &b),
            }),
        }
    }

    /// Negation (a `Variable` keeps its exogenous tag).
    pub fn neg(&self) -> Number {
        match self {
            Number::F64(v) => Number::F64(-v),
            Number::Dual(d) => Number::Dual(-d),
            Number::Dual2(d) => Number::Dual2(-d),
            Number::Variable(v) => Number::Variable(v.neg()),
        }
    }

    /// Natural exponential (a `Variable` promotes to first order).
    pub fn exp(&self) -> Number {
        match self {
            Number::F64(v) => Number::F64(v.exp()),
            Number::Dual(d) => Number::Dual(d.exp()),
            Number::Dual2(d) => Number::Dual2(d.exp()),
            Number::Variable(v) => Number::Dual(v.to_dual().exp()),
        }
    }

    /// Natural logarithm (a `Variable` promotes to first order).
    pub fn log(&self) -> Number {
        match self {
            Number::F64(v) => Number::F64(v.ln()),
            Number::Dual(d) => Number::Dual(d.log()),
            Number::Dual2(d) => Number::Dual2(d.log()),
            Number::Variable(v) => Number::Dual(v.to_dual().log()),
        }
    }

    /// Square root (a `Variable` promotes to first order).
    pub fn sqrt(&self) -> Number {
        match self {
            Number::F64(v) => Number::F64(v.sqrt()),
            Number::Dual(d) => Number::Dual(d.sqrt()),
            Number::Dual2(d) => Number::Dual2(d.sqrt()),
            Number::Variable(v) => Number::Dual(v.to_dual().sqrt()),
        }
    }

    /// Absolute value (a `Variable` promotes to first order).
    pub fn abs(&self) -> Number {
        match self {
            Number::F64(v) => Number::F64(v.abs()),
            Number::Dual(d) => Number::Dual(d.abs()),
            Number::Dual2(d) => Number::Dual2(d.abs()),
            Number::Variable(v) => Number::Dual(v.to_dual().abs()),
        }
    }

    /// Power with a constant exponent (a `Variable` promotes to first
    /// order).
    pub fn pow(&self, exponent: f64) -> Number {
        match self {
            Number::F64(v) => Number::F64(v.powf(exponent)),
            Number::Dual(d) => Number::Dual(d.powf(exponent)),
            Number::Dual2(d) => Number::Dual2(d.powf(exponent)),
            Number::Variable(v) => Number::Dual(v.to_dual().powf(exponent)),
        }
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::F64(v)
    }
}

/// Orders by nominal value only; sensitivities never participate.
impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.real().partial_cmp(&other.real())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual(v: f64, var: &str) -> Number {
        Number::Dual(Dual::new(v, vec![var.to_string()]))
    }

    fn dual2(v: f64, var: &str) -> Number {
        Number::Dual2(Dual2::new(v, vec![var.to_string()]))
    }

    // ========================================
    // Order Mismatch Tests
    // ========================================

    #[test]
    fn test_order_mismatch_rejected() {
        let a = dual(1.0, "x");
        let b = dual2(2.0, "y");
        for result in [
            a.try_add(&b),
            a.try_sub(&b),
            a.try_mul(&b),
            a.try_div(&b),
            b.try_add(&a),
        ] {
            assert_eq!(result.unwrap_err(), AdError::OrderMismatch);
        }
    }

    #[test]
    fn test_upcast_then_combine() {
        let a = dual(2.0, "x");
        let b = dual2(3.0, "y");

        let c = a.to_order(AdOrder::Two).try_mul(&b).unwrap();
        assert_eq!(c.real(), 6.0);
        assert_eq!(c.gradient("x"), 3.0);
        assert_eq!(c.gradient("y"), 2.0);
        // the upcasted operand contributes zero own-curvature
        assert_eq!(c.hessian("x", "x"), 0.0);
        assert_eq!(c.hessian("x", "y"), 1.0);
    }

    // ========================================
    // Promotion Tests
    // ========================================

    #[test]
    fn test_scalar_is_constant_to_any_order() {
        let s = Number::F64(2.0);
        let d = dual(3.0, "x");
        let d2 = dual2(3.0, "x");

        let r1 = s.try_mul(&d).unwrap();
        assert_eq!(r1.gradient("x"), 2.0);
        assert_eq!(r1.ad_order(), AdOrder::One);

        let r2 = s.try_mul(&d2).unwrap();
        assert_eq!(r2.ad_order(), AdOrder::Two);
    }

    #[test]
    fn test_total_promotion_matrix() {
        let values = [
            Number::F64(1.5),
            dual(1.5, "x"),
            dual2(1.5, "x"),
            Number::Variable(Variable::new(1.5, vec!["x".to_string()])),
        ];
        for v in &values {
            for order in [AdOrder::Zero, AdOrder::One, AdOrder::Two] {
                let p = v.to_order(order);
                assert_eq!(p.ad_order(), order);
                assert_eq!(p.real(), 1.5);
            }
        }
    }

    #[test]
    fn test_downcast_discards_hessian() {
        let d2 = dual2(2.0, "x");
        let sq = d2.try_mul(&d2).unwrap();
        assert_eq!(sq.hessian("x", "x"), 2.0);

        let d1 = sq.to_order(AdOrder::One);
        assert_eq!(d1.gradient("x"), 4.0);
        assert_eq!(d1.hessian("x", "x"), 0.0);
    }

    // ========================================
    // Exogenous Variable Tests
    // ========================================

    #[test]
    fn test_variable_scalar_ops_keep_tag() {
        let v = Number::Variable(Variable::new(1.0, vec!["e".to_string()]));
        let w = v
            .try_mul(&Number::F64(2.0))
            .unwrap()
            .try_add(&Number::F64(3.0))
            .unwrap();
        assert!(w.is_exogenous());
        assert_eq!(w.real(), 5.0);
        assert_eq!(w.gradient("e"), 2.0);
    }

    #[test]
    fn test_variable_reports_supplied_hessian() {
        let v = Number::Variable(
            Variable::new(1.0, vec!["e1".to_string(), "e2".to_string()])
                .with_hessian(vec![(("e1".to_string(), "e2".to_string()), 0.5)])
                .unwrap(),
        );
        assert_eq!(v.hessian("e1", "e2"), 0.5);
        assert_eq!(v.hessian("e2", "e1"), 0.5);
        assert_eq!(v.gradient("e1"), 1.0);
    }

    #[test]
    fn test_variable_promotes_on_contact_with_dual2() {
        let v = Number::Variable(Variable::new(2.0, vec!["e".to_string()]));
        let d2 = dual2(3.0, "x");
        let r = v.try_mul(&d2).unwrap();
        assert_eq!(r.ad_order(), AdOrder::Two);
        assert_eq!(r.hessian("e", "x"), 1.0);
    }

    #[test]
    fn test_variable_pair_resolves_first_order() {
        let a = Number::Variable(Variable::new(2.0, vec!["e1".to_string()]));
        let b = Number::Variable(Variable::new(3.0, vec!["e2".to_string()]));
        let r = a.try_mul(&b).unwrap();
        assert_eq!(r.ad_order(), AdOrder::One);
        assert_eq!(r.gradient("e1"), 3.0);
        assert_eq!(r.gradient("e2"), 2.0);
    }

    // ========================================
    // Unary / Comparison Tests
    // ========================================

    #[test]
    fn test_unary_totality() {
        let v = Number::Variable(Variable::new(2.0, vec!["e".to_string()]));
        assert_eq!(v.exp().ad_order(), AdOrder::One);
        assert_eq!(v.log().ad_order(), AdOrder::One);
        assert_eq!(v.neg().real(), -2.0);
        assert!(v.neg().is_exogenous());
    }

    #[test]
    fn test_comparison_on_real_only() {
        let a = dual(1.0, "x");
        let b = dual2(2.0, "y");
        assert!(a < b);
        assert!(b > a);
    }
}
