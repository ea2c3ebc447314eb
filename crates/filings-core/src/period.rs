//! Fiscal period identity.
//!
//! [`PeriodType`] distinguishes annual from quarterly figures and
//! [`CanonicalPeriod`] is the `(fiscal_year, fiscal_quarter, period_type)` tuple
//! that every stored metric is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Period type for fundamental financial data.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

impl PeriodType {
    /// Returns the storage representation of this period type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }

    /// Parses the storage representation of a period type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "annual" => Some(Self::Annual),
            "quarterly" => Some(Self::Quarterly),
            _ => None,
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical fiscal period identity.
///
/// For an annual period `fiscal_quarter` is always `None`; use the
/// [`annual`](Self::annual) and [`quarterly`](Self::quarterly) constructors
/// to keep that invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalPeriod {
    /// Fiscal year the period belongs to.
    pub fiscal_year: i32,
    /// Fiscal quarter (1-4), `None` for annual periods.
    pub fiscal_quarter: Option<u8>,
    /// Annual or quarterly.
    pub period_type: PeriodType,
}

impl CanonicalPeriod {
    /// Full fiscal year period.
    #[must_use]
    pub const fn annual(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            fiscal_quarter: None,
            period_type: PeriodType::Annual,
        }
    }

    /// Fiscal quarter period.
    #[must_use]
    pub const fn quarterly(fiscal_year: i32, quarter: u8) -> Self {
        Self {
            fiscal_year,
            fiscal_quarter: Some(quarter),
            period_type: PeriodType::Quarterly,
        }
    }

    /// Returns true for annual periods.
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        matches!(self.period_type, PeriodType::Annual)
    }

    /// The same kind of period one fiscal year earlier.
    #[must_use]
    pub const fn prior_year(&self) -> Self {
        Self {
            fiscal_year: self.fiscal_year - 1,
            fiscal_quarter: self.fiscal_quarter,
            period_type: self.period_type,
        }
    }
}

impl fmt::Display for CanonicalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fiscal_quarter {
            Some(q) => write!(f, "FY{}Q{}", self.fiscal_year, q),
            None => write!(f, "FY{}", self.fiscal_year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_display() {
        assert_eq!(CanonicalPeriod::annual(2024).to_string(), "FY2024");
        assert_eq!(CanonicalPeriod::quarterly(2024, 3).to_string(), "FY2024Q3");
    }

    #[test]
    fn test_prior_year_keeps_quarter() {
        let q = CanonicalPeriod::quarterly(2024, 2).prior_year();
        assert_eq!(q, CanonicalPeriod::quarterly(2023, 2));
        assert!(CanonicalPeriod::annual(2024).prior_year().is_annual());
    }

    #[test]
    fn test_period_type_round_trip_str() {
        for pt in [PeriodType::Annual, PeriodType::Quarterly] {
            assert_eq!(PeriodType::parse(pt.as_str()), Some(pt));
        }
        assert_eq!(PeriodType::parse("monthly"), None);
    }
}
