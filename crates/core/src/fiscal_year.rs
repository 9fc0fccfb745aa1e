//! Fiscal years, bounded to a configured range.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// A validated fiscal year.
///
/// Obtain one through [`YearRange::check`]; deserialization (fixtures,
/// provider rows) trusts the data as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalYear(i32);

impl FiscalYear {
    pub fn value(self) -> i32 {
        self.0
    }

    /// Whether this year has not closed yet, so its execution figures
    /// may still change between two fetches in the same session.
    pub fn is_open(self) -> bool {
        self.0 >= Utc::now().year()
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of fiscal years the system accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    /// Validate a user-supplied year against this range.
    pub fn check(&self, year: i32) -> Result<FiscalYear, PipelineError> {
        if self.contains(year) {
            Ok(FiscalYear(year))
        } else {
            Err(PipelineError::InvalidFiscalYear {
                year,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2010, 2025)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let range = YearRange::default();
        assert_eq!(range.check(2010).unwrap().value(), 2010);
        assert_eq!(range.check(2025).unwrap().value(), 2025);
    }

    #[test]
    fn out_of_range_year_rejected() {
        let range = YearRange::new(2010, 2025);
        let err = range.check(2009).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidFiscalYear {
                year: 2009,
                min: 2010,
                max: 2025
            }
        );
        assert!(range.check(2026).is_err());
    }

    #[test]
    fn closed_year_is_not_open() {
        let year = YearRange::default().check(2010).unwrap();
        assert!(!year.is_open());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let year = YearRange::default().check(2024).unwrap();
        assert_eq!(serde_json::to_string(&year).unwrap(), "2024");
        let back: FiscalYear = serde_json::from_str("2024").unwrap();
        assert_eq!(back, year);
    }
}
