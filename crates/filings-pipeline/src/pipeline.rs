//! Per-company processing: payload in, reconciled metrics out.

use filings_core::{BaseMetric, CompanyFacts, ParsedMetric, Segment};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::classify::{FiscalCalendar, classify_all};
use crate::dedup::deduplicate;
use crate::derived::compute_derived;
use crate::extract::{FilingType, FiscalYearFilter, extract_metric};
use crate::growth::compute_growth;
use crate::reconcile::reconcile;
use crate::snapshot::BaseMetricSet;

/// What to extract from a company facts payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Filing type to read figures from.
    pub filing_type: FilingType,
    /// Fiscal years to accept, by the source's `fy` tag.
    pub fiscal_years: FiscalYearFilter,
}

impl PipelineOptions {
    /// Options for one filing type over every fiscal year.
    #[must_use]
    pub fn new(filing_type: FilingType) -> Self {
        Self {
            filing_type,
            ..Self::default()
        }
    }

    /// Restricts the fiscal years read.
    #[must_use]
    pub const fn with_fiscal_years(mut self, fiscal_years: FiscalYearFilter) -> Self {
        self.fiscal_years = fiscal_years;
        self
    }
}

/// Counters from one pipeline pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Observations extracted across all base metrics.
    pub observations: usize,
    /// Observations that classified into a period.
    pub classified: usize,
    /// Base metric values after deduplication.
    pub base_metrics: usize,
    /// Derived and growth values computed.
    pub derived_metrics: usize,
}

/// Output of [`process_company`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompanyMetrics {
    /// Fiscal calendar inferred from the payload's annual reports.
    pub calendar: FiscalCalendar,
    /// Deduplicated base metrics.
    pub base: BaseMetricSet,
    /// Base, derived and growth metrics, one per storage key, ordered by key.
    pub metrics: Vec<ParsedMetric>,
    /// Counters.
    pub stats: PipelineStats,
}

/// Runs extraction, classification, deduplication, derivation and
/// reconciliation over one company's payload.
#[instrument(skip(facts), fields(entity = %facts.entity_name))]
pub fn process_company(
    facts: &CompanyFacts,
    segment: Segment,
    options: PipelineOptions,
) -> CompanyMetrics {
    let mut stats = PipelineStats::default();
    let mut base = BaseMetricSet::new();
    let calendar = FiscalCalendar::from_facts(facts);

    for metric in BaseMetric::ALL {
        let observations =
            extract_metric(facts, metric, options.filing_type, options.fiscal_years);
        stats.observations += observations.len();

        let labeled = classify_all(observations, calendar);
        stats.classified += labeled.len();

        let series = deduplicate(metric, labeled);
        if !series.is_empty() {
            base.insert(series);
        }
    }
    stats.base_metrics = base.len();

    let mut derived = Vec::new();
    for snapshot in base.snapshots() {
        derived.extend(compute_derived(&snapshot, segment));

        if snapshot.period().is_annual()
            && let Some(prior) = base.snapshot(&snapshot.period().prior_year())
            && let Some(growth) = compute_growth(&snapshot, &prior, segment)
        {
            derived.push(growth);
        }
    }
    stats.derived_metrics = derived.len();

    let metrics = reconcile(base.iter().cloned().chain(derived));

    debug!(
        %segment,
        year_end_month = calendar.year_end_month(),
        observations = stats.observations,
        classified = stats.classified,
        base = stats.base_metrics,
        derived = stats.derived_metrics,
        "Processed company facts"
    );

    CompanyMetrics {
        calendar,
        base,
        metrics,
        stats,
    }
}
