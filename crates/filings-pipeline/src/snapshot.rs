//! Finalized base metrics and per-period snapshots.
//!
//! [`BaseMetricSet`] is the single source of truth for a company's base
//! metrics after deduplication: the values persisted and the values fed to
//! derived calculations both come from it. A [`MetricSnapshot`] is a view of
//! that set narrowed to exactly one [`CanonicalPeriod`], and is the only
//! input the derived and growth calculators accept.

use chrono::NaiveDate;
use filings_core::{BaseMetric, CanonicalPeriod, FilingsError, ParsedMetric, Result};
use std::collections::BTreeMap;

use crate::dedup::DedupedSeries;

/// Deduplicated base metrics of one company, indexed by period.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseMetricSet {
    periods: BTreeMap<CanonicalPeriod, BTreeMap<BaseMetric, ParsedMetric>>,
}

impl BaseMetricSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a deduplicated series, replacing any earlier series of the same metric.
    pub fn insert(&mut self, series: DedupedSeries) {
        let metric = series.metric();
        for metrics in self.periods.values_mut() {
            metrics.remove(&metric);
        }
        for (period, parsed) in series.into_inner() {
            self.periods.entry(period).or_default().insert(metric, parsed);
        }
        self.periods.retain(|_, metrics| !metrics.is_empty());
    }

    /// Periods that have at least one base metric, in order.
    pub fn periods(&self) -> impl Iterator<Item = CanonicalPeriod> + '_ {
        self.periods.keys().copied()
    }

    /// Number of base metric values across all periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the set holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// The value of one metric for one period.
    #[must_use]
    pub fn get(&self, period: &CanonicalPeriod, metric: BaseMetric) -> Option<&ParsedMetric> {
        self.periods.get(period)?.get(&metric)
    }

    /// All values, ordered by period then metric.
    pub fn iter(&self) -> impl Iterator<Item = &ParsedMetric> {
        self.periods.values().flat_map(BTreeMap::values)
    }

    /// Narrows the set to one exact period.
    ///
    /// Returns `None` when the period has no base metrics.
    #[must_use]
    pub fn snapshot(&self, period: &CanonicalPeriod) -> Option<MetricSnapshot> {
        self.periods.get(period).map(|metrics| MetricSnapshot {
            period: *period,
            metrics: metrics.clone(),
        })
    }

    /// Snapshots of every period, in order.
    pub fn snapshots(&self) -> impl Iterator<Item = MetricSnapshot> + '_ {
        self.periods.iter().map(|(period, metrics)| MetricSnapshot {
            period: *period,
            metrics: metrics.clone(),
        })
    }
}

/// Base metric values sharing one exact canonical period.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSnapshot {
    period: CanonicalPeriod,
    metrics: BTreeMap<BaseMetric, ParsedMetric>,
}

impl MetricSnapshot {
    /// Builds a snapshot from loose metrics, checking they belong together.
    ///
    /// # Errors
    /// [`FilingsError::PeriodMismatch`] if any metric carries another period;
    /// [`FilingsError::InvalidParameter`] for derived metrics, names outside
    /// the base catalog, or a metric given twice.
    pub fn try_new(
        period: CanonicalPeriod,
        metrics: impl IntoIterator<Item = ParsedMetric>,
    ) -> Result<Self> {
        let mut by_metric = BTreeMap::new();
        for parsed in metrics {
            if parsed.period != period {
                return Err(FilingsError::PeriodMismatch {
                    metric: parsed.metric_name,
                    expected: period.to_string(),
                    found: parsed.period.to_string(),
                });
            }
            if parsed.is_derived {
                return Err(FilingsError::InvalidParameter(format!(
                    "{} is derived, snapshots hold base metrics only",
                    parsed.metric_name
                )));
            }
            let metric = BaseMetric::from_name(&parsed.metric_name).ok_or_else(|| {
                FilingsError::InvalidParameter(format!(
                    "{} is not a base metric",
                    parsed.metric_name
                ))
            })?;
            if by_metric.insert(metric, parsed).is_some() {
                return Err(FilingsError::InvalidParameter(format!(
                    "{metric} given twice for {period}"
                )));
            }
        }
        Ok(Self {
            period,
            metrics: by_metric,
        })
    }

    /// The period every value in the snapshot belongs to.
    #[must_use]
    pub const fn period(&self) -> CanonicalPeriod {
        self.period
    }

    /// The value of a base metric.
    #[must_use]
    pub fn value(&self, metric: BaseMetric) -> Option<f64> {
        self.metrics.get(&metric).map(|m| m.value)
    }

    /// The full record of a base metric.
    #[must_use]
    pub fn metric(&self, metric: BaseMetric) -> Option<&ParsedMetric> {
        self.metrics.get(&metric)
    }

    /// The `metric name → value` view.
    #[must_use]
    pub fn values(&self) -> BTreeMap<&'static str, f64> {
        self.metrics
            .iter()
            .map(|(metric, parsed)| (metric.name(), parsed.value))
            .collect()
    }

    /// Iterates over the records in the snapshot.
    pub fn iter(&self) -> impl Iterator<Item = &ParsedMetric> {
        self.metrics.values()
    }

    /// Number of base metrics present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns true if no base metric is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Latest filed date across the snapshot.
    #[must_use]
    pub fn latest_filed(&self) -> Option<NaiveDate> {
        self.metrics.values().map(|m| m.filed_date).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FiscalCalendar, classify_all};
    use crate::dedup::deduplicate;
    use filings_core::{RawObservation, SourceId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(value: f64, year: i32, instant: bool) -> RawObservation {
        RawObservation {
            taxonomy: "us-gaap".to_string(),
            tag: "t".to_string(),
            value,
            unit: "USD".to_string(),
            filing_type: "10-K".to_string(),
            fiscal_year_tag: Some(2024),
            fiscal_period_tag: Some("FY".to_string()),
            period_start: (!instant).then(|| date(year, 1, 1)),
            period_end: date(year, 12, 31),
            filed_date: date(2025, 2, 20),
            accession_id: "0000000001-25-000001".to_string(),
            source_index: year as usize,
        }
    }

    fn parsed(name: &str, period: CanonicalPeriod) -> ParsedMetric {
        ParsedMetric {
            metric_name: name.to_string(),
            value: 1.0,
            unit: filings_core::MetricUnit::Currency,
            period,
            period_start: None,
            period_end: date(period.fiscal_year, 12, 31),
            source_id: SourceId::Accession("a".to_string()),
            filed_date: date(period.fiscal_year + 1, 2, 1),
            is_derived: false,
        }
    }

    fn three_year_set() -> BaseMetricSet {
        let mut set = BaseMetricSet::new();
        set.insert(deduplicate(
            BaseMetric::NetIncome,
            classify_all(
                vec![raw(10.0, 2022, false), raw(11.0, 2023, false), raw(12.0, 2024, false)],
                FiscalCalendar::DECEMBER,
            ),
        ));
        set.insert(deduplicate(
            BaseMetric::StockholdersEquity,
            classify_all(
                vec![raw(100.0, 2023, true), raw(120.0, 2024, true)],
                FiscalCalendar::DECEMBER,
            ),
        ));
        set
    }

    #[test]
    fn test_snapshot_holds_only_its_period() {
        let set = three_year_set();
        assert_eq!(set.len(), 5);

        for snapshot in set.snapshots() {
            assert!(snapshot.iter().all(|m| m.period == snapshot.period()));
        }

        let fy2024 = set.snapshot(&CanonicalPeriod::annual(2024)).unwrap();
        assert_eq!(fy2024.value(BaseMetric::NetIncome), Some(12.0));
        assert_eq!(fy2024.value(BaseMetric::StockholdersEquity), Some(120.0));

        let fy2022 = set.snapshot(&CanonicalPeriod::annual(2022)).unwrap();
        assert_eq!(fy2022.value(BaseMetric::StockholdersEquity), None);
        assert!(set.snapshot(&CanonicalPeriod::annual(2021)).is_none());
    }

    #[test]
    fn test_snapshot_values_match_persisted_base_values() {
        let set = three_year_set();
        for snapshot in set.snapshots() {
            for m in snapshot.iter() {
                let metric = BaseMetric::from_name(&m.metric_name).unwrap();
                assert_eq!(set.get(&snapshot.period(), metric), Some(m));
            }
        }
    }

    #[test]
    fn test_mixed_period_snapshot_rejected() {
        let fy2024 = CanonicalPeriod::annual(2024);
        let err = MetricSnapshot::try_new(
            fy2024,
            vec![
                parsed("net_income", fy2024),
                parsed("stockholders_equity", CanonicalPeriod::annual(2023)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FilingsError::PeriodMismatch { .. }));
    }

    #[test]
    fn test_duplicate_and_unknown_metrics_rejected() {
        let fy2024 = CanonicalPeriod::annual(2024);
        assert!(
            MetricSnapshot::try_new(
                fy2024,
                vec![parsed("net_income", fy2024), parsed("net_income", fy2024)]
            )
            .is_err()
        );
        assert!(MetricSnapshot::try_new(fy2024, vec![parsed("loss_ratio", fy2024)]).is_err());

        let ok = MetricSnapshot::try_new(fy2024, vec![parsed("net_income", fy2024)]).unwrap();
        assert_eq!(ok.values().get("net_income"), Some(&1.0));
    }

    #[test]
    fn test_reinsert_replaces_series() {
        let mut set = three_year_set();
        set.insert(deduplicate(
            BaseMetric::NetIncome,
            classify_all(vec![raw(99.0, 2024, false)], FiscalCalendar::DECEMBER),
        ));
        assert_eq!(
            set.get(&CanonicalPeriod::annual(2024), BaseMetric::NetIncome).map(|m| m.value),
            Some(99.0)
        );
        assert!(set.snapshot(&CanonicalPeriod::annual(2022)).is_none());
    }
}
