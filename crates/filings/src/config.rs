//! Ingestion run configuration.

use chrono::{Datelike, NaiveDate};
use filings_core::{FilingsError, PeriodType, Result};
use filings_pipeline::{FilingType, FiscalYearFilter, PipelineOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default user agent sent to SEC EDGAR.
pub const DEFAULT_USER_AGENT: &str = "filings/0.1 (ops@factordynamics.com)";

/// Settings for an ingestion run.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes:
///
/// ```
/// use filings::IngestConfig;
///
/// let config = IngestConfig::from_json(r#"{ "batch_size": 10 }"#).unwrap();
/// assert_eq!(config.batch_size, 10);
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// User agent for the fact source.
    pub user_agent: String,
    /// Companies processed per run.
    pub batch_size: usize,
    /// Companies processed at the same time.
    pub concurrency: usize,
    /// Metric rows per store write.
    pub upsert_batch_size: usize,
    /// Wall-clock budget per run, in seconds.
    pub time_budget_secs: u64,
    /// Fiscal years read back from the current year; 0 reads every year.
    pub lookback_years: u32,
    /// Period types to ingest.
    pub period_types: Vec<PeriodType>,
    /// Token a run request must present, if any.
    pub trigger_token: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            batch_size: 5,
            concurrency: 2,
            upsert_batch_size: 100,
            time_budget_secs: 50,
            lookback_years: 6,
            period_types: vec![PeriodType::Annual],
            trigger_token: None,
        }
    }
}

impl IngestConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration, filling absent fields with defaults.
    ///
    /// # Errors
    /// [`FilingsError::Parse`] for malformed JSON and
    /// [`FilingsError::InvalidParameter`] for invalid settings.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FilingsError::Parse(format!("Invalid ingest config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are usable.
    ///
    /// # Errors
    /// [`FilingsError::InvalidParameter`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FilingsError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(FilingsError::InvalidParameter(
                "concurrency must be positive".to_string(),
            ));
        }
        if self.upsert_batch_size == 0 {
            return Err(FilingsError::InvalidParameter(
                "upsert_batch_size must be positive".to_string(),
            ));
        }
        if self.period_types.is_empty() {
            return Err(FilingsError::InvalidParameter(
                "period_types must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the number of companies per run.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of companies processed at the same time.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the number of rows per store write.
    #[must_use]
    pub const fn with_upsert_batch_size(mut self, upsert_batch_size: usize) -> Self {
        self.upsert_batch_size = upsert_batch_size;
        self
    }

    /// Sets the wall-clock budget.
    #[must_use]
    pub const fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_secs = budget.as_secs();
        self
    }

    /// Sets how many fiscal years back to read.
    #[must_use]
    pub const fn with_lookback_years(mut self, lookback_years: u32) -> Self {
        self.lookback_years = lookback_years;
        self
    }

    /// Sets the period types to ingest.
    #[must_use]
    pub fn with_period_types(mut self, period_types: impl Into<Vec<PeriodType>>) -> Self {
        self.period_types = period_types.into();
        self
    }

    /// Requires run requests to present `token`.
    #[must_use]
    pub fn with_trigger_token(mut self, token: impl Into<String>) -> Self {
        self.trigger_token = Some(token.into());
        self
    }

    /// The wall-clock budget as a [`Duration`].
    #[must_use]
    pub const fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    /// Fiscal-year filter for a run on `today`.
    #[must_use]
    pub fn fiscal_years(&self, today: NaiveDate) -> FiscalYearFilter {
        if self.lookback_years == 0 {
            return FiscalYearFilter::Any;
        }
        let year = today.year();
        let lookback = i32::try_from(self.lookback_years).unwrap_or(i32::MAX);
        FiscalYearFilter::Between(year.saturating_sub(lookback), year)
    }

    /// Pipeline options for each configured period type, in order.
    #[must_use]
    pub fn pipeline_options(&self, today: NaiveDate) -> Vec<PipelineOptions> {
        let fiscal_years = self.fiscal_years(today);
        self.period_types
            .iter()
            .map(|period_type| {
                let filing_type = match period_type {
                    PeriodType::Annual => FilingType::Annual,
                    PeriodType::Quarterly => FilingType::Quarterly,
                };
                PipelineOptions::new(filing_type).with_fiscal_years(fiscal_years)
            })
            .collect()
    }
}
