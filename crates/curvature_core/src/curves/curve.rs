//! Dated discount-factor curves with taggable node variables.

use super::ValueCache;
use crate::types::{AdOrder, CurveError, Date, DayCount, Dual, Dual2, Number};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Interpolation scheme between curve nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Linear in the log of the discount factor (piecewise-constant
    /// continuously-compounded forward rate).
    LogLinear,
    /// Linear in the discount factor itself.
    Linear,
    /// Step function holding the left node's value.
    FlatForward,
}

/// A discount-factor curve over dated nodes.
///
/// The first node is the anchor: it is never tagged as an AD variable and
/// calibration leaves it fixed (conventionally at `1.0`). Free nodes
/// `i >= 1` are tagged as variables named `{id}{i}` when the curve is set
/// to a non-zero AD order, which is what lets a calibration solver read
/// residual Jacobians directly off instrument gradients.
///
/// Every node mutation advances an internal version counter, so cached
/// interpolated values from before the mutation can never be served again.
///
/// # Example
///
/// ```
/// use curvature_core::curves::{Curve, Interpolation};
/// use curvature_core::types::{AdOrder, Date};
///
/// let d = |m: u32| Date::from_ymd_opt(2026, m, 1).unwrap();
/// let mut curve = Curve::new(
///     "sofr",
///     vec![(d(1), 1.0), (d(7), 0.985), (d(12), 0.971)],
///     Interpolation::LogLinear,
/// ).unwrap();
///
/// curve.set_ad_order(AdOrder::One);
/// let df = curve.discount_factor(d(9)).unwrap();
/// assert!(df.gradient("sofr1").abs() > 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curve {
    id: String,
    nodes: Vec<(Date, Number)>,
    interpolation: Interpolation,
    ad: AdOrder,
    version: u64,
    cache_enabled: bool,
    #[serde(skip)]
    cache: RefCell<ValueCache>,
}

impl Curve {
    /// Build a curve from dated discount factors.
    ///
    /// Requires at least two nodes with strictly increasing dates and
    /// positive values. The curve starts at [`AdOrder::Zero`] with caching
    /// enabled.
    pub fn new(
        id: impl Into<String>,
        nodes: Vec<(Date, f64)>,
        interpolation: Interpolation,
    ) -> Result<Self, CurveError> {
        if nodes.len() < 2 {
            return Err(CurveError::InsufficientNodes {
                got: nodes.len(),
                need: 2,
            });
        }
        for (i, window) in nodes.windows(2).enumerate() {
            if window[1].0 <= window[0].0 {
                return Err(CurveError::UnsortedNodes { index: i + 1 });
            }
        }
        if let Some(&(_, value)) = nodes.iter().find(|(_, v)| *v <= 0.0) {
            return Err(CurveError::NonPositiveValue { value });
        }

        Ok(Self {
            id: id.into(),
            nodes: nodes
                .into_iter()
                .map(|(d, v)| (d, Number::F64(v)))
                .collect(),
            interpolation,
            ad: AdOrder::Zero,
            version: 0,
            cache_enabled: true,
            cache: RefCell::new(ValueCache::new()),
        })
    }

    /// The curve identifier, also the prefix of its node variable names.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The current AD order of the free nodes.
    pub fn ad_order(&self) -> AdOrder {
        self.ad
    }

    /// The current version counter; advances on every node mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Date of the anchor node.
    pub fn anchor_date(&self) -> Date {
        self.nodes[0].0
    }

    /// Date of the last node.
    pub fn terminal_date(&self) -> Date {
        self.nodes[self.nodes.len() - 1].0
    }

    /// Number of nodes, anchor included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Variable names of the free nodes, in node order.
    pub fn node_variables(&self) -> Vec<String> {
        (1..self.nodes.len())
            .map(|i| format!("{}{}", self.id, i))
            .collect()
    }

    /// Nominal values of the free nodes, in node order.
    pub fn free_values(&self) -> Vec<f64> {
        self.nodes[1..].iter().map(|(_, v)| v.real()).collect()
    }

    /// Retag the free nodes at the given AD order.
    ///
    /// At order one each free node `i` becomes a [`Dual`] seeded on the
    /// single variable `{id}{i}`; at order two a [`Dual2`]; at order zero
    /// the nominal value alone. The anchor node always stays a plain
    /// scalar. Advances the version.
    pub fn set_ad_order(&mut self, order: AdOrder) {
        for i in 1..self.nodes.len() {
            let value = self.nodes[i].1.real();
            self.nodes[i].1 = Self::tag(&self.id, i, value, order);
        }
        self.ad = order;
        self.version += 1;
    }

    /// Replace the free node values, keeping the current AD order tags.
    ///
    /// `values` must hold exactly one entry per free node. Advances the
    /// version.
    pub fn set_node_vector(&mut self, values: &[f64]) -> Result<(), CurveError> {
        let expected = self.nodes.len() - 1;
        if values.len() != expected {
            return Err(CurveError::NodeCountMismatch {
                expected,
                got: values.len(),
            });
        }
        for (i, &value) in values.iter().enumerate() {
            self.nodes[i + 1].1 = Self::tag(&self.id, i + 1, value, self.ad);
        }
        self.version += 1;
        Ok(())
    }

    fn tag(id: &str, index: usize, value: f64, order: AdOrder) -> Number {
        let var = format!("{}{}", id, index);
        match order {
            AdOrder::Zero => Number::F64(value),
            AdOrder::One => Number::Dual(Dual::new(value, vec![var])),
            AdOrder::Two => Number::Dual2(Dual2::new(value, vec![var])),
        }
    }

    /// Enable or disable the value cache.
    ///
    /// Disabling only changes performance: lookups fall through to direct
    /// interpolation with identical results.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
        if !enabled {
            self.cache.borrow_mut().clear();
        }
    }

    /// Whether the value cache is active.
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Evict all cached values immediately.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// The discount factor at `date`.
    ///
    /// Dates before the anchor discount to zero (no payment can arise from
    /// the past). Dates beyond the last node extrapolate on the final
    /// segment. Results are served from the version-stamped cache when
    /// enabled.
    pub fn discount_factor(&self, date: Date) -> Result<Number, CurveError> {
        if date < self.anchor_date() {
            return Ok(Number::F64(0.0));
        }
        if !self.cache_enabled {
            return self.interpolate(date);
        }
        if let Some(hit) = self.cache.borrow_mut().get(self.version, date, self.ad) {
            return Ok(hit);
        }
        let value = self.interpolate(date)?;
        self.cache
            .borrow_mut()
            .insert(self.version, date, self.ad, value.clone());
        Ok(value)
    }

    /// The continuously-compounded zero rate from the anchor to `date`.
    ///
    /// Defined as `-ln(df) / tau` with `tau` the year fraction under
    /// `day_count`; undefined at or before the anchor.
    pub fn zero_rate(&self, date: Date, day_count: DayCount) -> Result<Number, CurveError> {
        let tenor = day_count.year_fraction(self.anchor_date(), date);
        if tenor <= 0.0 {
            return Err(CurveError::NonPositiveTenor { tenor });
        }
        let df = self.discount_factor(date)?;
        if df.real() <= 0.0 {
            return Err(CurveError::NonPositiveValue { value: df.real() });
        }
        Ok(df.log().neg().try_div(&Number::F64(tenor))?)
    }

    /// The simply-compounded forward rate between `start` and `end`.
    ///
    /// Defined as `(df(start) / df(end) - 1) / tau` with `tau` the year
    /// fraction of the period under `day_count`.
    pub fn forward_rate(
        &self,
        start: Date,
        end: Date,
        day_count: DayCount,
    ) -> Result<Number, CurveError> {
        let tenor = day_count.year_fraction(start, end);
        if tenor <= 0.0 {
            return Err(CurveError::NonPositiveTenor { tenor });
        }
        let df_start = self.discount_factor(start)?;
        let df_end = self.discount_factor(end)?;
        if df_end.real() <= 0.0 {
            return Err(CurveError::NonPositiveValue {
                value: df_end.real(),
            });
        }
        Ok(df_start
            .try_div(&df_end)?
            .try_sub(&Number::F64(1.0))?
            .try_div(&Number::F64(tenor))?)
    }

    fn interpolate(&self, date: Date) -> Result<Number, CurveError> {
        if let Some((_, value)) = self.nodes.iter().find(|(d, _)| *d == date) {
            return Ok(value.clone());
        }

        // Bracketing segment; dates past the last node reuse the final one.
        let right = self
            .nodes
            .iter()
            .position(|(d, _)| *d > date)
            .unwrap_or(self.nodes.len() - 1);
        let left = right - 1;
        let (d_left, v_left) = &self.nodes[left];
        let (d_right, v_right) = &self.nodes[right];

        let span = (*d_right - *d_left).num_days() as f64;
        let w = (date - *d_left).num_days() as f64 / span;

        match self.interpolation {
            Interpolation::LogLinear => {
                if v_left.real() <= 0.0 {
                    return Err(CurveError::NonPositiveValue {
                        value: v_left.real(),
                    });
                }
                if v_right.real() <= 0.0 {
                    return Err(CurveError::NonPositiveValue {
                        value: v_right.real(),
                    });
                }
                let log_df = v_left
                    .log()
                    .try_mul(&Number::F64(1.0 - w))?
                    .try_add(&v_right.log().try_mul(&Number::F64(w))?)?;
                Ok(log_df.exp())
            }
            Interpolation::Linear => Ok(v_left
                .try_mul(&Number::F64(1.0 - w))?
                .try_add(&v_right.try_mul(&Number::F64(w))?)?),
            Interpolation::FlatForward => Ok(v_left.clone()),
        }
    }
}

/// A keyed collection of curves consumed by pricing functions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveSet {
    curves: BTreeMap<String, Curve>,
}

impl CurveSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a curve under its own id, replacing any previous entry.
    pub fn insert(&mut self, curve: Curve) {
        self.curves.insert(curve.id().to_string(), curve);
    }

    /// Look up a curve by id.
    pub fn get(&self, id: &str) -> Result<&Curve, CurveError> {
        self.curves
            .get(id)
            .ok_or_else(|| CurveError::UnknownCurve { id: id.to_string() })
    }

    /// Look up a curve mutably by id.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Curve, CurveError> {
        self.curves
            .get_mut(id)
            .ok_or_else(|| CurveError::UnknownCurve { id: id.to_string() })
    }

    /// Iterate curves in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Curve> {
        self.curves.values()
    }

    /// Iterate curves mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Curve> {
        self.curves.values_mut()
    }

    /// Number of curves in the set.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Check if the set holds no curves.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
