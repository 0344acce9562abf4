//! Second-order dual numbers with named, sparse variables.

use super::vars::{
    accumulate_cross, accumulate_outer, grad_eq, hess_eq, merge_grad, merge_hess, pair_key,
    GradMap, HessMap,
};
use super::{AdError, Dual};
use num_traits::{One, Pow, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A second-order AD value: nominal `f64`, sparse gradient, and sparse
/// hessian.
///
/// The hessian is stored once per canonical (lexicographically sorted)
/// variable pair; the symmetric mirror entry is implied. Hessian keys only
/// ever mention variables present in the gradient, so the two structures
/// always describe the same variable set. Absent entries are exactly zero.
///
/// All binary operations route through a single bivariate composition rule,
/// so every operation shares one alignment and accumulation path:
///
/// ```text
/// h = f(x, y)
/// ∇h   = fx·∇x + fy·∇y
/// ∇²h  = fx·∇²x + fy·∇²y + fxx·∇x⊗∇x + fxy·(∇x⊗∇y + ∇y⊗∇x) + fyy·∇y⊗∇y
/// ```
///
/// # Examples
///
/// ```
/// use curvature_core::types::Dual2;
///
/// let x = Dual2::new(2.0, vec!["x".to_string()]);
/// let y = Dual2::new(3.0, vec!["y".to_string()]);
///
/// let z = &x * &y;
/// assert_eq!(z.gradient("x"), 3.0);
/// assert_eq!(z.hessian("x", "y"), 1.0);
/// assert_eq!(z.hessian("x", "x"), 0.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dual2 {
    real: f64,
    dual: GradMap,
    #[serde(with = "super::vars::hess_serde")]
    dual2: HessMap,
}

impl Dual2 {
    /// Create a value sensitive to `vars`, each with unit first derivative
    /// and zero second derivatives.
    pub fn new(real: f64, vars: Vec<String>) -> Self {
        Self {
            real,
            dual: vars.into_iter().map(|v| (v, 1.0)).collect(),
            dual2: HessMap::new(),
        }
    }

    /// Create a value from an explicit gradient and hessian.
    ///
    /// Hessian keys are canonicalised (sorted pair); entries naming a
    /// variable absent from the gradient are rejected with
    /// [`AdError::InconsistentHessian`].
    pub fn from_parts(
        real: f64,
        gradient: impl IntoIterator<Item = (String, f64)>,
        hessian: impl IntoIterator<Item = ((String, String), f64)>,
    ) -> Result<Self, AdError> {
        let dual: GradMap = gradient.into_iter().collect();
        let mut dual2 = HessMap::new();
        for ((u, v), h) in hessian {
            for name in [&u, &v] {
                if !dual.contains_key(name) {
                    return Err(AdError::InconsistentHessian { name: name.clone() });
                }
            }
            *dual2.entry(pair_key(&u, &v)).or_insert(0.0) += h;
        }
        Ok(Self { real, dual, dual2 })
    }

    pub(crate) fn from_parts_unchecked(real: f64, dual: GradMap, dual2: HessMap) -> Self {
        Self { real, dual, dual2 }
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

    /// The second derivative with respect to `u` and `v` (zero if absent).
    ///
    /// Lookup is symmetric: `hessian("a", "b") == hessian("b", "a")`.
    pub fn hessian(&self, u: &str, v: &str) -> f64 {
        self.dual2.get(&pair_key(u, v)).copied().unwrap_or(0.0)
    }

    /// The sparse hessian, keyed by canonical variable pair.
    pub fn hessian_entries(&self) -> &std::collections::BTreeMap<(String, String), f64> {
        &self.dual2
    }

    /// Downcast to first order, discarding second-order information.
    pub fn to_dual(&self) -> Dual {
        Dual::from_gradient(self.real, self.dual.clone())
    }

    /// Chain rule for a scalar function with derivatives `fp`, `fpp` at the
    /// current value.
    fn chain(&self, f: f64, fp: f64, fpp: f64) -> Dual2 {
        let dual = self.dual.iter().map(|(k, g)| (k.clone(), fp * g)).collect();
        let mut dual2: HessMap = self
            .dual2
            .iter()
            .map(|(k, h)| (k.clone(), fp * h))
            .collect();
        accumulate_outer(&mut dual2, &self.dual, fpp);
        Dual2 { real: f, dual, dual2 }
    }

    /// Bivariate composition rule shared by all binary operations.
    fn combine(&self, rhs: &Dual2, f: f64, fx: f64, fy: f64, fxx: f64, fxy: f64, fyy: f64) -> Dual2 {
        let dual = merge_grad(&self.dual, &rhs.dual, fx, fy);
        let mut dual2 = merge_hess(&self.dual2, &rhs.dual2, fx, fy);
        accumulate_outer(&mut dual2, &self.dual, fxx);
        accumulate_cross(&mut dual2, &self.dual, &rhs.dual, fxy);
        accumulate_outer(&mut dual2, &rhs.dual, fyy);
        Dual2 { real: f, dual, dual2 }
    }

    /// Natural exponential.
    pub fn exp(&self) -> Dual2 {
        let e = self.real.exp();
        self.chain(e, e, e)
    }

    /// Natural logarithm.
    pub fn log(&self) -> Dual2 {
        self.chain(
            self.real.ln(),
            1.0 / self.real,
            -1.0 / (self.real * self.real),
        )
    }

    /// Square root.
    pub fn sqrt(&self) -> Dual2 {
        let s = self.real.sqrt();
        self.chain(s, 0.5 / s, -0.25 / (self.real * s))
    }

    /// Power with a constant exponent.
    pub fn powf(&self, exponent: f64) -> Dual2 {
        self.chain(
            self.real.powf(exponent),
            exponent * self.real.powf(exponent - 1.0),
            exponent * (exponent - 1.0) * self.real.powf(exponent - 2.0),
        )
    }

    /// Absolute value (zero curvature away from the kink).
    pub fn abs(&self) -> Dual2 {
        self.chain(self.real.abs(), self.real.signum(), 0.0)
    }
}

impl From<f64> for Dual2 {
    fn from(real: f64) -> Self {
        Dual2 {
            real,
            dual: GradMap::new(),
            dual2: HessMap::new(),
        }
    }
}

impl fmt::Display for Dual2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Dual2: {:.6}, {} vars>", self.real, self.dual.len())
    }
}

impl PartialEq for Dual2 {
    fn eq(&self, other: &Self) -> bool {
        self.real == other.real
            && grad_eq(&self.dual, &other.dual)
            && hess_eq(&self.dual2, &other.dual2)
    }
}

/// Orders by nominal value only; sensitivities never participate.
impl PartialOrd for Dual2 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.real.partial_cmp(&other.real)
    }
}

impl std::ops::Neg for &Dual2 {
    type Output = Dual2;
    fn neg(self) -> Dual2 {
        self.chain(-self.real, -1.0, 0.0)
    }
}

impl std::ops::Neg for Dual2 {
    type Output = Dual2;
    fn neg(self) -> Dual2 {
        -&self
    }
}

impl std::ops::Add<&Dual2> for &Dual2 {
    type Output = Dual2;
    fn add(self, rhs: &Dual2) -> Dual2 {
        self.combine(rhs, self.real + rhs.real, 1.0, 1.0, 0.0, 0.0, 0.0)
    }
}

impl std::ops::Sub<&Dual2> for &Dual2 {
    type Output = Dual2;
    fn sub(self, rhs: &Dual2) -> Dual2 {
        self.combine(rhs, self.real - rhs.real, 1.0, -1.0, 0.0, 0.0, 0.0)
    }
}

impl std::ops::Mul<&Dual2> for &Dual2 {
    type Output = Dual2;
    fn mul(self, rhs: &Dual2) -> Dual2 {
        self.combine(rhs, self.real * rhs.real, rhs.real, self.real, 0.0, 1.0, 0.0)
    }
}

impl std::ops::Div<&Dual2> for &Dual2 {
    type Output = Dual2;
    fn div(self, rhs: &Dual2) -> Dual2 {
        let y = rhs.real;
        self.combine(
            rhs,
            self.real / y,
            1.0 / y,
            -self.real / (y * y),
            0.0,
            -1.0 / (y * y),
            2.0 * self.real / (y * y * y),
        )
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait<Dual2> for Dual2 {
            type Output = Dual2;
            fn $method(self, rhs: Dual2) -> Dual2 {
                (&self).$method(&rhs)
            }
        }
        impl std::ops::$trait<&Dual2> for Dual2 {
            type Output = Dual2;
            fn $method(self, rhs: &Dual2) -> Dual2 {
                (&self).$method(rhs)
            }
        }
        impl std::ops::$trait<Dual2> for &Dual2 {
            type Output = Dual2;
            fn $method(self, rhs: Dual2) -> Dual2 {
                self.$method(&rhs)
            }
        }
        impl std::ops::$trait<f64> for &Dual2 {
            type Output = Dual2;
            fn $method(self, rhs: f64) -> Dual2 {
                self.$method(&Dual2::from(rhs))
            }
        }
        impl std::ops::$trait<f64> for Dual2 {
            type Output = Dual2;
            fn $method(self, rhs: f64) -> Dual2 {
                (&self).$method(&Dual2::from(rhs))
            }
        }
        impl std::ops::$trait<Dual2> for f64 {
            type Output = Dual2;
            fn $method(self, rhs: Dual2) -> Dual2 {
                (&Dual2::from(self)).$method(&rhs)
            }
        }
        impl std::ops::$trait<&Dual2> for f64 {
            type Output = Dual2;
            fn $method(self, rhs: &Dual2) -> Dual2 {
                (&Dual2::from(self)).$method(rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl Zero for Dual2 {
    fn zero() -> Self {
        Dual2::from(0.0)
    }

    fn is_zero(&self) -> bool {
        self.real == 0.0
            && self.dual.values().all(|g| *g == 0.0)
            && self.dual2.values().all(|h| *h == 0.0)
    }
}

impl One for Dual2 {
    fn one() -> Self {
        Dual2::from(1.0)
    }
}

impl Pow<f64> for Dual2 {
    type Output = Dual2;
    fn pow(self, exponent: f64) -> Dual2 {
        self.powf(exponent)
    }
}
