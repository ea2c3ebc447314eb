//! Core data types for ingestion.
//!
//! - [`Ticker`] - Company ticker, also used as the storage company id
//! - [`Company`] - A company in the ingestion universe
//! - [`ParsedMetric`] - A finalized metric bound to one canonical period
//! - [`MetricRow`] - The persisted form of a metric

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{MetricUnit, Segment};
use crate::period::{CanonicalPeriod, PeriodType};

/// Source id recorded on derived metrics.
pub const DERIVED_SOURCE: &str = "derived";

/// Source name recorded on base metrics.
pub const XBRL_SOURCE: &str = "xbrl";

/// A company ticker.
///
/// Tickers are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A company in the ingestion universe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Ticker; doubles as the company id in storage.
    pub ticker: Ticker,
    /// SEC CIK, zero-padded to 10 digits when known.
    pub cik: Option<String>,
    /// Entity display name as last reported by the source.
    pub name: Option<String>,
    /// Industry segment, which gates derived metrics.
    pub segment: Segment,
    /// When the company last finished an ingestion run cleanly.
    pub last_ingested_at: Option<DateTime<Utc>>,
}

impl Company {
    /// Creates a company that has never been ingested.
    #[must_use]
    pub fn new(ticker: impl Into<Ticker>, segment: Segment) -> Self {
        Self {
            ticker: ticker.into(),
            cik: None,
            name: None,
            segment,
            last_ingested_at: None,
        }
    }

    /// Sets the SEC CIK number, zero-padding it to 10 digits.
    #[must_use]
    pub fn with_cik(mut self, cik: impl AsRef<str>) -> Self {
        self.cik = Some(format!("{:0>10}", cik.as_ref()));
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Storage company id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.ticker.as_str()
    }
}

/// Where a metric value came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// Reported in the filing with this accession number.
    Accession(String),
    /// Computed by formula.
    Derived,
}

impl SourceId {
    /// Accession number for reported values.
    #[must_use]
    pub fn accession(&self) -> Option<&str> {
        match self {
            Self::Accession(accn) => Some(accn),
            Self::Derived => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accession(accn) => f.write_str(accn),
            Self::Derived => f.write_str(DERIVED_SOURCE),
        }
    }
}

/// A finalized metric bound to one name and one canonical period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetric {
    /// Metric name (see [`crate::catalog`]).
    pub metric_name: String,
    /// Value in `unit`.
    pub value: f64,
    /// Unit of the value.
    pub unit: MetricUnit,
    /// Canonical period identity.
    pub period: CanonicalPeriod,
    /// Start of the reporting window; `None` for instant facts.
    pub period_start: Option<NaiveDate>,
    /// End of the reporting window.
    pub period_end: NaiveDate,
    /// Accession number or derived marker.
    pub source_id: SourceId,
    /// Filing date of the value (latest input filing for derived values).
    pub filed_date: NaiveDate,
    /// True when computed by formula.
    pub is_derived: bool,
}

impl ParsedMetric {
    /// Storage uniqueness key, less the company.
    #[must_use]
    pub fn storage_key(&self) -> MetricKey {
        MetricKey {
            metric_name: self.metric_name.clone(),
            period_type: self.period.period_type,
            fiscal_year: self.period.fiscal_year,
            fiscal_quarter: self.period.fiscal_quarter,
        }
    }
}

/// `(metric_name, period_type, fiscal_year, fiscal_quarter)`; with the company
/// id this is the storage uniqueness constraint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    /// Metric name.
    pub metric_name: String,
    /// Annual or quarterly.
    pub period_type: PeriodType,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Fiscal quarter, `None` for annual rows.
    pub fiscal_quarter: Option<u8>,
}

/// A persisted metric row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Company id (ticker).
    pub company_id: String,
    /// Metric name.
    pub metric_name: String,
    /// Metric value.
    pub metric_value: f64,
    /// Unit of the value.
    pub unit: MetricUnit,
    /// Annual or quarterly.
    pub period_type: PeriodType,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Fiscal quarter, `None` for annual rows.
    pub fiscal_quarter: Option<u8>,
    /// Start of the reporting window.
    pub period_start_date: Option<NaiveDate>,
    /// End of the reporting window.
    pub period_end_date: NaiveDate,
    /// True when computed by formula.
    pub is_derived: bool,
    /// `xbrl` or `derived`.
    pub source: String,
    /// Accession number for reported values.
    pub accession_number: Option<String>,
    /// Filing date.
    pub filed_at: NaiveDate,
}

impl MetricRow {
    /// Builds the row persisted for a metric of a company.
    #[must_use]
    pub fn from_metric(company_id: &str, metric: &ParsedMetric) -> Self {
        Self {
            company_id: company_id.to_string(),
            metric_name: metric.metric_name.clone(),
            metric_value: metric.value,
            unit: metric.unit,
            period_type: metric.period.period_type,
            fiscal_year: metric.period.fiscal_year,
            fiscal_quarter: metric.period.fiscal_quarter,
            period_start_date: metric.period_start,
            period_end_date: metric.period_end,
            is_derived: metric.is_derived,
            source: if metric.is_derived {
                DERIVED_SOURCE.to_string()
            } else {
                XBRL_SOURCE.to_string()
            },
            accession_number: metric.source_id.accession().map(str::to_string),
            filed_at: metric.filed_date,
        }
    }

    /// Storage uniqueness key, less the company.
    #[must_use]
    pub fn key(&self) -> MetricKey {
        MetricKey {
            metric_name: self.metric_name.clone(),
            period_type: self.period_type,
            fiscal_year: self.fiscal_year,
            fiscal_quarter: self.fiscal_quarter,
        }
    }
}
