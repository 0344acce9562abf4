//! Date and day-count helpers.

use serde::{Deserialize, Serialize};

/// Calendar date used throughout the library.
pub type Date = chrono::NaiveDate;

/// Day-count conventions for year-fraction calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCount {
    /// Actual days divided by 365 (fixed).
    Act365F,
    /// Actual days divided by 360.
    Act360,
}

impl DayCount {
    /// Year fraction between two dates under this convention.
    ///
    /// Negative if `end` precedes `start`.
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        let days = (end - start).num_days() as f64;
        match self {
            DayCount::Act365F => days / 365.0,
            DayCount::Act360 => days / 360.0,
        }
    }
}

impl Default for DayCount {
    fn default() -> Self {
        DayCount::Act365F
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_act365f() {
        let yf = DayCount::Act365F.year_fraction(d(2025, 1, 1), d(2026, 1, 1));
        assert!((yf - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_act360() {
        let yf = DayCount::Act360.year_fraction(d(2025, 1, 1), d(2025, 7, 1));
        assert!((yf - 181.0 / 360.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_fraction() {
        let yf = DayCount::Act365F.year_fraction(d(2026, 1, 1), d(2025, 1, 1));
        assert!(yf < 0.0);
    }
}
