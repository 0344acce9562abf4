//! Calibrating instruments and standard curve quotes.

use curvature_core::curves::CurveSet;
use curvature_core::types::{Date, DayCount, Number, PricingError};
use std::fmt;

/// An instrument a solver can calibrate to.
///
/// Implementations must be pure: `rate` reads curves, performs no I/O, and
/// returns the same value for the same curve state. When a required market
/// input is unavailable the implementation must return
/// [`PricingError::MissingMarketData`] rather than a placeholder, since a
/// silently defaulted quote corrupts calibration.
///
/// The returned [`Number`] carries AD sensitivities with respect to the
/// curve node variables at whatever order the curves are set to; the
/// solver reads its residual Jacobian directly off those gradients.
pub trait CalibrationInstrument: fmt::Debug {
    /// A stable label identifying this instrument in reports.
    fn label(&self) -> &str;

    /// The instrument's market rate (or value) implied by `curves`.
    fn rate(&self, curves: &CurveSet) -> Result<Number, PricingError>;
}

/// A direct quote of a discount factor at a date.
///
/// Mostly useful in tests and synthetic setups; real markets quote rates,
/// not discount factors.
#[derive(Debug, Clone)]
pub struct DiscountFactorQuote {
    label: String,
    curve_id: String,
    date: Date,
}

impl DiscountFactorQuote {
    /// Create a discount-factor quote on `curve_id` at `date`.
    pub fn new(label: impl Into<String>, curve_id: impl Into<String>, date: Date) -> Self {
        Self {
            label: label.into(),
            curve_id: curve_id.into(),
            date,
        }
    }
}

impl CalibrationInstrument for DiscountFactorQuote {
    fn label(&self) -> &str {
        &self.label
    }

    fn rate(&self, curves: &CurveSet) -> Result<Number, PricingError> {
        Ok(curves.get(&self.curve_id)?.discount_factor(self.date)?)
    }
}

/// A continuously-compounded zero rate from the curve anchor to a date.
#[derive(Debug, Clone)]
pub struct ZeroRateQuote {
    label: String,
    curve_id: String,
    date: Date,
    day_count: DayCount,
}

impl ZeroRateQuote {
    /// Create a zero-rate quote on `curve_id` maturing at `date`.
    pub fn new(
        label: impl Into<String>,
        curve_id: impl Into<String>,
        date: Date,
        day_count: DayCount,
    ) -> Self {
        Self {
            label: label.into(),
            curve_id: curve_id.into(),
            date,
            day_count,
        }
    }
}

impl CalibrationInstrument for ZeroRateQuote {
    fn label(&self) -> &str {
        &self.label
    }

    fn rate(&self, curves: &CurveSet) -> Result<Number, PricingError> {
        Ok(curves
            .get(&self.curve_id)?
            .zero_rate(self.date, self.day_count)?)
    }
}

/// The par swap rate over a payment schedule.
///
/// For schedule dates `s_0 < s_1 < ... < s_n` the par rate is
/// `(df(s_0) - df(s_n)) / sum_i tau_i df(s_i)` with `tau_i` the accrual
/// fraction of period `i` under the day count. Schedules reaching before
/// the curve anchor would require historical fixings this model does not
/// carry, and price as [`PricingError::MissingMarketData`].
#[derive(Debug, Clone)]
pub struct ParRateQuote {
    label: String,
    curve_id: String,
    schedule: Vec<Date>,
    day_count: DayCount,
}

impl ParRateQuote {
    /// Create a par-rate quote over `schedule` on `curve_id`.
    ///
    /// The schedule must hold at least two strictly increasing dates.
    pub fn new(
        label: impl Into<String>,
        curve_id: impl Into<String>,
        schedule: Vec<Date>,
        day_count: DayCount,
    ) -> Result<Self, PricingError> {
        if schedule.len() < 2 {
            return Err(PricingError::InvalidInstrument(format!(
                "par rate schedule needs at least 2 dates, got {}",
                schedule.len()
            )));
        }
        if schedule.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PricingError::InvalidInstrument(
                "par rate schedule dates must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            label: label.into(),
            curve_id: curve_id.into(),
            schedule,
            day_count,
        })
    }
}

impl CalibrationInstrument for ParRateQuote {
    fn label(&self) -> &str {
        &self.label
    }

    fn rate(&self, curves: &CurveSet) -> Result<Number, PricingError> {
        let curve = curves.get(&self.curve_id)?;
        if self.schedule[0] < curve.anchor_date() {
            return Err(PricingError::MissingMarketData {
                label: self.label.clone(),
                detail: format!(
                    "schedule starts {} before curve anchor {}",
                    self.schedule[0],
                    curve.anchor_date()
                ),
            });
        }

        let df_start = curve.discount_factor(self.schedule[0])?;
        let df_end = curve.discount_factor(self.schedule[self.schedule.len() - 1])?;
        let numerator = df_start.try_sub(&df_end)?;

        let mut annuity = Number::F64(0.0);
        for window in self.schedule.windows(2) {
            let tau = self.day_count.year_fraction(window[0], window[1]);
            let df = curve.discount_factor(window[1])?;
            annuity = annuity.try_add(&df.try_mul(&Number::F64(tau))?)?;
        }
        Ok(numerator.try_div(&annuity)?)
    }
}
