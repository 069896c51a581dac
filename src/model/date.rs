use std::fmt;

use serde::{Deserialize, Serialize};

const DAY_BITS: u32 = 9;
const DAY_MASK: u32 = (1 << DAY_BITS) - 1;

pub const DAYS_PER_YEAR: u32 = 360;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const DAYS_PER_MONTH: u32 = 30;

/// Simulation date packed into a `u32` as `[year:23][day_of_year:9]`.
///
/// Natural `u32` ordering equals chronological ordering. Days run 1–360 in twelve
/// thirty-day months.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "DateRepr", from = "DateRepr")]
pub struct SimDate(u32);

#[derive(Serialize, Deserialize)]
struct DateRepr {
    year: u32,
    #[serde(default = "first_day")]
    day: u32,
}

fn first_day() -> u32 {
    1
}

impl From<SimDate> for DateRepr {
    fn from(date: SimDate) -> Self {
        DateRepr {
            year: date.year(),
            day: date.day(),
        }
    }
}

impl From<DateRepr> for SimDate {
    fn from(repr: DateRepr) -> Self {
        // Saved dates are trusted only as far as the valid range.
        SimDate::new(repr.year, repr.day.clamp(1, DAYS_PER_YEAR))
    }
}

impl SimDate {
    /// Create a date from year and day-of-year (1–360).
    pub fn new(year: u32, day: u32) -> Self {
        assert!(
            (1..=DAYS_PER_YEAR).contains(&day),
            "day out of range: {day}"
        );
        Self((year << DAY_BITS) | day)
    }

    /// First day of `year`.
    pub fn from_year(year: u32) -> Self {
        Self::new(year, 1)
    }

    pub fn year(self) -> u32 {
        self.0 >> DAY_BITS
    }

    pub fn day(self) -> u32 {
        self.0 & DAY_MASK
    }

    /// Month of year (1–12).
    pub fn month(self) -> u32 {
        (self.day() - 1) / DAYS_PER_MONTH + 1
    }

    /// Day within the month (1–30).
    pub fn day_of_month(self) -> u32 {
        (self.day() - 1) % DAYS_PER_MONTH + 1
    }

    pub fn is_year_start(self) -> bool {
        self.day() == 1
    }

    pub fn is_month_start(self) -> bool {
        self.day_of_month() == 1
    }
}

impl Default for SimDate {
    fn default() -> Self {
        Self::from_year(0)
    }
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Y{}.M{}.D{}", self.year(), self.month(), self.day_of_month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing() {
        let d = SimDate::new(125, 180);
        assert_eq!(d.year(), 125);
        assert_eq!(d.day(), 180);
        assert_eq!(d.month(), 6);
        assert_eq!(d.day_of_month(), 30);
    }

    #[test]
    fn month_boundaries() {
        assert_eq!(SimDate::new(1, 1).month(), 1);
        assert_eq!(SimDate::new(1, 30).month(), 1);
        assert_eq!(SimDate::new(1, 31).month(), 2);
        assert!(SimDate::new(1, 31).is_month_start());
        assert_eq!(SimDate::new(1, 360).month(), 12);
        assert!(SimDate::new(1, 1).is_year_start());
        assert!(!SimDate::new(1, 31).is_year_start());
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(SimDate::new(1, 360) < SimDate::new(2, 1));
        assert!(SimDate::new(5, 10) < SimDate::new(5, 11));
    }

    #[test]
    fn serializes_as_year_and_day() {
        let json = serde_json::to_value(SimDate::new(42, 61)).unwrap();
        assert_eq!(json, serde_json::json!({"year": 42, "day": 61}));
        let back: SimDate = serde_json::from_value(json).unwrap();
        assert_eq!(back, SimDate::new(42, 61));
    }

    #[test]
    fn out_of_range_day_is_clamped_on_load() {
        let d: SimDate = serde_json::from_str(r#"{"year": 3, "day": 999}"#).unwrap();
        assert_eq!(d, SimDate::new(3, 360));
        let d: SimDate = serde_json::from_str(r#"{"year": 3}"#).unwrap();
        assert_eq!(d, SimDate::from_year(3));
    }

    #[test]
    #[should_panic(expected = "day out of range")]
    fn day_zero_panics() {
        SimDate::new(1, 0);
    }
}
