//! First-order dual numbers with named, sparse variables.

use super::vars::{grad_eq, merge_grad, GradMap};
use super::Dual2;
use num_traits::{One, Pow, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A first-order AD value: a nominal `f64` plus a sparse gradient keyed by
/// variable name.
///
/// Every arithmetic operation returns a new value with the exact chain-rule
/// gradient over the union of the operands' variable sets; operands are
/// never mutated. Combining with a plain `f64` treats the scalar as a
/// constant (no variable-set change). Absent gradient entries are exactly
/// zero.
///
/// Ordering comparisons act on the nominal value only and never propagate
/// sensitivity; equality ([`PartialEq`]) compares the full coefficient set
/// and is used by serialization tests.
///
/// # Examples
///
/// ```
/// use curvature_core::types::Dual;
///
/// let x = Dual::new(2.0, vec!["x".to_string()]);
/// let y = (&x * &x).exp(); // e^(x^2)
///
/// assert_eq!(y.real(), (4.0_f64).exp());
/// assert_eq!(y.gradient("x"), 4.0 * (4.0_f64).exp()); // 2x * e^(x^2)
/// assert_eq!(y.gradient("unrelated"), 0.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dual {
    real: f64,
    dual: GradMap,
}

impl Dual {
    /// Create a value sensitive to `vars`, each with unit derivative.
    ///
    /// `Dual::new(v, vec![])` is a constant.
    pub fn new(real: f64, vars: Vec<String>) -> Self {
        Self {
            real,
            dual: vars.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }

    /// Create a value from an explicit gradient.
    pub fn from_gradient(real: f64, entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            real,
            dual: entries.into_iter().collect(),
        }
    }

    /// The nominal scalar value.
    pub fn real(&self) -> f64 {
        self.real
    }

    /// The derivative with respect to `var` (zero if absent).
    pub fn gradient(&self, var: &str) -> f64 {
        self.dual.get(var).copied().unwrap_or(0.0)
    }

    /// The sparse gradient, keyed by variable name in lexicographic order.
    pub fn gradient_entries(&self) -> &std::collections::BTreeMap<String, f64> {
        &self.dual
    }

    /// Upcast to second order with an implied zero hessian.
    pub fn to_dual2(&self) -> Dual2 {
        Dual2::from_parts_unchecked(self.real, self.dual.clone(), Default::default())
    }

    /// Apply a scalar function via the chain rule: `f` is the new value,
    /// `fp` its first derivative at the current value.
    fn chain(&self, f: f64, fp: f64) -> Dual {
        Dual {
            real: f,
            dual: self.dual.iter().map(|(k, g)| (k.clone(), fp * g)).collect(),
        }
    }

    /// Natural exponential.
    pub fn exp(&self) -> Dual {
        let e = self.real.exp();
        self.chain(e, e)
    }

    /// Natural logarithm.
    pub fn log(&self) -> Dual {
        self.chain(self.real.ln(), 1.0 / self.real)
    }

    /// Square root.
    pub fn sqrt(&self) -> Dual {
        let s = self.real.sqrt();
        self.chain(s, 0.5 / s)
    }

    /// Power with a constant exponent.
    pub fn powf(&self, exponent: f64) -> Dual {
        self.chain(
            self.real.powf(exponent),
            exponent * self.real.powf(exponent - 1.0),
        )
    }

    /// Absolute value (derivative is the sign of the nominal value).
    pub fn abs(&self) -> Dual {
        self.chain(self.real.abs(), self.real.signum())
    }
}

impl From<f64> for Dual {
    fn from(real: f64) -> Self {
        Dual {
            real,
            dual: GradMap::new(),
        }
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Dual: {:.6}, {} vars>", self.real, self.dual.len())
    }
}

/// Full-coefficient equality over the union variable set; explicit zero
/// entries compare equal to absent entries.
impl PartialEq for Dual {
    fn eq(&self, other: &Self) -> bool {
        self.real == other.real && grad_eq(&self.dual, &other.dual)
    }
}

/// Orders by nominal value only; sensitivities never participate.
impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.real.partial_cmp(&other.real)
    }
}

impl std::ops::Neg for &Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        self.chain(-self.real, -1.0)
    }
}

impl std::ops::Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        -&self
    }
}

impl std::ops::Add<&Dual> for &Dual {
    type Output = Dual;
    fn add(self, rhs: &Dual) -> Dual {
        Dual {
            real: self.real + rhs.real,
            dual: merge_grad(&self.dual, &rhs.dual, 1.0, 1.0),
        }
    }
}

impl std::ops::Sub<&Dual> for &Dual {
    type Output = Dual;
    fn sub(self, rhs: &Dual) -> Dual {
        Dual {
            real: self.real - rhs.real,
            dual: merge_grad(&self.dual, &rhs.dual, 1.0, -1.0),
        }
    }
}

impl std::ops::Mul<&Dual> for &Dual {
    type Output = Dual;
    fn mul(self, rhs: &Dual) -> Dual {
        Dual {
            real: self.real * rhs.real,
            dual: merge_grad(&self.dual, &rhs.dual, rhs.real, self.real),
        }
    }
}

impl std::ops::Div<&Dual> for &Dual {
    type Output = Dual;
    fn div(self, rhs: &Dual) -> Dual {
        Dual {
            real: self.real / rhs.real,
            dual: merge_grad(
                &self.dual,
                &rhs.dual,
                1.0 / rhs.real,
                -self.real / (rhs.real * rhs.real),
            ),
        }
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait<Dual> for Dual {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                (&self).$method(&rhs)
            }
        }
        impl std::ops::$trait<&Dual> for Dual {
            type Output = Dual;
            fn $method(self, rhs: &Dual) -> Dual {
                (&self).$method(rhs)
            }
        }
        impl std::ops::$trait<Dual> for &Dual {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                self.$method(&rhs)
            }
        }
        impl std::ops::$trait<f64> for &Dual {
            type Output = Dual;
            fn $method(self, rhs: f64) -> Dual {
                self.$method(&Dual::from(rhs))
            }
        }
        impl std::ops::$trait<f64> for Dual {
            type Output = Dual;
            fn $method(self, rhs: f64) -> Dual {
                (&self).$method(&Dual::from(rhs))
            }
        }
        impl std::ops::$trait<Dual> for f64 {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                (&Dual::from(self)).$method(&rhs)
            }
        }
        impl std::ops::$trait<&Dual> for f64 {
            type Output = Dual;
            fn $method(self, rhs: &Dual) -> Dual {
                (&Dual::from(self)).$method(rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl Zero for Dual {
    fn zero() -> Self {
        Dual::from(0.0)
    }

    fn is_zero(&self) -> bool {
        self.real == 0.0 && self.dual.values().all(|g| *g == 0.0)
    }
}

impl One for Dual {
    fn one() -> Self {
        Dual::from(1.0)
    }
}

impl Pow<f64> for Dual {
    type Output = Dual;
    fn pow(self, exponent: f64) -> Dual {
        self.powf(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn x(v: f64) -> Dual {
        Dual::new(v, vec!["x".to_string()])
    }

    fn central_diff(f: impl Fn(f64) -> f64, at: f64) -> f64 {
        let h = 1e-6 * at.abs().max(1.0);
        (f(at + h) - f(at - h)) / (2.0 * h)
    }

    // ========================================
    // Chain Rule Tests
    // ========================================

    #[test]
    fn test_add_sub() {
        let a = Dual::new(3.0, vec!["x".to_string()]);
        let b = Dual::new(5.0, vec!["y".to_string()]);

        let c = &a + &b;
        assert_eq!(c.real(), 8.0);
        assert_eq!(c.gradient("x"), 1.0);
        assert_eq!(c.gradient("y"), 1.0);

        let d = &a - &b;
        assert_eq!(d.real(), -2.0);
        assert_eq!(d.gradient("y"), -1.0);
    }

    #[test]
    fn test_mul_gradient() {
        let a = Dual::new(3.0, vec!["x".to_string()]);
        let b = Dual::new(5.0, vec!["y".to_string()]);

        let c = &a * &b;
        assert_eq!(c.real(), 15.0);
        assert_eq!(c.gradient("x"), 5.0);
        assert_eq!(c.gradient("y"), 3.0);
    }

    #[test]
    fn test_div_gradient() {
        let a = Dual::new(3.0, vec!["x".to_string()]);
        let b = Dual::new(5.0, vec!["y".to_string()]);

        let c = &a / &b;
        assert_relative_eq!(c.gradient("x"), 1.0 / 5.0, max_relative = 1e-12);
        assert_relative_eq!(c.gradient("y"), -3.0 / 25.0, max_relative = 1e-12);
    }

    #[test]
    fn test_exp_matches_central_difference() {
        let v = 0.7;
        let g = x(v).exp().gradient("x");
        assert_relative_eq!(g, central_diff(|t| t.exp(), v), max_relative = 1e-6);
    }

    #[test]
    fn test_log_matches_central_difference() {
        let v = 2.3;
        let g = x(v).log().gradient("x");
        assert_relative_eq!(g, central_diff(|t| t.ln(), v), max_relative = 1e-6);
    }

    #[test]
    fn test_sqrt_matches_central_difference() {
        let v = 4.2;
        let g = x(v).sqrt().gradient("x");
        assert_relative_eq!(g, central_diff(|t| t.sqrt(), v), max_relative = 1e-6);
    }

    #[test]
    fn test_powf_matches_central_difference() {
        let v = 1.9;
        let g = x(v).powf(2.5).gradient("x");
        assert_relative_eq!(g, central_diff(|t| t.powf(2.5), v), max_relative = 1e-6);
    }

    #[test]
    fn test_composed_expression() {
        // f(x, y) = exp(x * y) / x at (1.5, 0.5)
        let f = |xv: f64, yv: f64| (xv * yv).exp() / xv;
        let a = Dual::new(1.5, vec!["x".to_string()]);
        let b = Dual::new(0.5, vec!["y".to_string()]);
        let c = (&a * &b).exp() / &a;

        assert_relative_eq!(c.real(), f(1.5, 0.5), max_relative = 1e-12);
        assert_relative_eq!(
            c.gradient("x"),
            central_diff(|t| f(t, 0.5), 1.5),
            max_relative = 1e-6
        );
        assert_relative_eq!(
            c.gradient("y"),
            central_diff(|t| f(1.5, t), 0.5),
            max_relative = 1e-6
        );
    }

    // ========================================
    // Scalar and Variable-Set Tests
    // ========================================

    #[test]
    fn test_scalar_is_constant() {
        let a = x(2.0);
        let b = &a * 3.0 + 1.0;
        assert_eq!(b.real(), 7.0);
        assert_eq!(b.gradient("x"), 3.0);
        assert_eq!(b.gradient_entries().len(), 1);
    }

    #[test]
    fn test_absent_variable_is_exactly_zero() {
        let a = x(2.0);
        let b = Dual::new(3.0, vec!["y".to_string()]);
        let c = &a + &b;
        assert_eq!(c.gradient("z"), 0.0);
    }

    #[test]
    fn test_union_commutative_bit_exact() {
        let a = Dual::from_gradient(1.7, vec![("x".to_string(), 0.3), ("y".to_string(), 0.9)]);
        let b = Dual::from_gradient(2.9, vec![("y".to_string(), 1.1), ("z".to_string(), 0.2)]);

        assert_eq!(&a + &b, &b + &a);
        assert_eq!(&a * &b, &b * &a);
    }

    #[test]
    fn test_superset_operand_order_irrelevant() {
        // b's variable set is a strict superset of a's
        let a = Dual::from_gradient(1.0, vec![("x".to_string(), 2.0)]);
        let b = Dual::from_gradient(
            3.0,
            vec![("x".to_string(), 0.5), ("y".to_string(), 1.5)],
        );
        assert_eq!(&a * &b, &b * &a);
    }

    // ========================================
    // Comparison Tests
    // ========================================

    #[test]
    fn test_ordering_on_real_only() {
        let a = x(1.0);
        let b = Dual::new(2.0, vec!["y".to_string()]);
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn test_equality_compares_coefficients() {
        let a = x(1.0);
        let b = Dual::new(1.0, vec!["y".to_string()]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_zero_entry_equals_absent() {
        let a = Dual::from_gradient(1.0, vec![("x".to_string(), 0.0)]);
        let b = Dual::from(1.0);
        assert_eq!(a, b);
    }

    // ========================================
    // num-traits Tests
    // ========================================

    #[test]
    fn test_zero_one_pow() {
        assert!(Dual::zero().is_zero());
        assert_eq!(Dual::one().real(), 1.0);
        let p = x(2.0).pow(3.0);
        assert_eq!(p.real(), 8.0);
        assert_eq!(p.gradient("x"), 12.0);
    }

    // ========================================
    // Property Tests
    // ========================================

    proptest! {
        #[test]
        fn prop_add_commutative(av in -10.0f64..10.0, bv in -10.0f64..10.0,
                                ga in -2.0f64..2.0, gb in -2.0f64..2.0) {
            let a = Dual::from_gradient(av, vec![("u".to_string(), ga), ("v".to_string(), 0.5)]);
            let b = Dual::from_gradient(bv, vec![("v".to_string(), gb), ("w".to_string(), 1.5)]);
            prop_assert_eq!(&a + &b, &b + &a);
        }

        #[test]
        fn prop_mul_commutative(av in -10.0f64..10.0, bv in -10.0f64..10.0,
                                ga in -2.0f64..2.0, gb in -2.0f64..2.0) {
            let a = Dual::from_gradient(av, vec![("u".to_string(), ga)]);
            let b = Dual::from_gradient(bv, vec![("u".to_string(), gb), ("w".to_string(), 1.5)]);
            prop_assert_eq!(&a * &b, &b * &a);
        }

        #[test]
        fn prop_additive_identity(av in -10.0f64..10.0, ga in -2.0f64..2.0) {
            let a = Dual::from_gradient(av, vec![("u".to_string(), ga)]);
            prop_assert_eq!(&a + 0.0, a.clone());
        }
    }
}
