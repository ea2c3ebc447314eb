//! Observation deduplication.
//!
//! Deduplication runs in two passes:
//!
//! 1. Observations are grouped by their true reporting window
//!    `(period_start, period_end)`. Re-filings of the same window keep the
//!    latest filed date; ties keep the last one in source order.
//! 2. Surviving windows are grouped by [`CanonicalPeriod`]. When different
//!    windows land on the same period, [`window_precedence`] decides: latest
//!    window end, then latest filed date, then accession number, then source
//!    position. The filed date alone never decides between two windows.

use chrono::NaiveDate;
use filings_core::{BaseMetric, CanonicalPeriod, ParsedMetric, RawObservation, SourceId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

type Window = (Option<NaiveDate>, NaiveDate);

/// Deduplicated observations of one base metric: at most one per period.
///
/// Only [`deduplicate`] produces this type, so anything built from it is
/// known to have gone through both passes.
#[derive(Clone, Debug, PartialEq)]
pub struct DedupedSeries {
    metric: BaseMetric,
    by_period: BTreeMap<CanonicalPeriod, ParsedMetric>,
}

impl DedupedSeries {
    /// The base metric this series holds.
    #[must_use]
    pub const fn metric(&self) -> BaseMetric {
        self.metric
    }

    /// Number of periods with a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_period.len()
    }

    /// Returns true if no period has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }

    /// The value for a period.
    #[must_use]
    pub fn get(&self, period: &CanonicalPeriod) -> Option<&ParsedMetric> {
        self.by_period.get(period)
    }

    /// Iterates over the values in period order.
    pub fn iter(&self) -> impl Iterator<Item = &ParsedMetric> {
        self.by_period.values()
    }

    pub(crate) fn into_inner(self) -> BTreeMap<CanonicalPeriod, ParsedMetric> {
        self.by_period
    }
}

/// Total order deciding which of two windows represents a period.
///
/// `Ordering::Greater` means `a` wins.
#[must_use]
pub fn window_precedence(a: &RawObservation, b: &RawObservation) -> Ordering {
    a.period_end
        .cmp(&b.period_end)
        .then_with(|| a.filed_date.cmp(&b.filed_date))
        .then_with(|| a.accession_id.cmp(&b.accession_id))
        .then_with(|| a.source_index.cmp(&b.source_index))
}

/// Reduce classified observations of one metric to one value per period.
pub fn deduplicate(
    metric: BaseMetric,
    labeled: Vec<(RawObservation, CanonicalPeriod)>,
) -> DedupedSeries {
    // Pass 1: one observation per true reporting window.
    let mut by_window: BTreeMap<Window, (RawObservation, CanonicalPeriod)> = BTreeMap::new();
    for (obs, period) in labeled {
        match by_window.entry(obs.window()) {
            Entry::Vacant(slot) => {
                slot.insert((obs, period));
            }
            Entry::Occupied(mut slot) => {
                if obs.filed_date >= slot.get().0.filed_date {
                    slot.insert((obs, period));
                }
            }
        }
    }

    // Pass 2: one window per canonical period.
    let mut by_period: BTreeMap<CanonicalPeriod, RawObservation> = BTreeMap::new();
    for (obs, period) in by_window.into_values() {
        match by_period.entry(period) {
            Entry::Vacant(slot) => {
                slot.insert(obs);
            }
            Entry::Occupied(mut slot) => {
                let incumbent = slot.get();
                debug!(
                    metric = metric.name(),
                    %period,
                    kept_end = %incumbent.period_end.max(obs.period_end),
                    "Period collision between reporting windows"
                );
                if window_precedence(&obs, incumbent) == Ordering::Greater {
                    slot.insert(obs);
                }
            }
        }
    }

    let by_period = by_period
        .into_iter()
        .map(|(period, obs)| (period, to_metric(metric, period, obs)))
        .collect();

    DedupedSeries { metric, by_period }
}

fn to_metric(metric: BaseMetric, period: CanonicalPeriod, obs: RawObservation) -> ParsedMetric {
    ParsedMetric {
        metric_name: metric.name().to_string(),
        value: obs.value,
        unit: metric.unit(),
        period,
        period_start: obs.period_start,
        period_end: obs.period_end,
        source_id: SourceId::Accession(obs.accession_id),
        filed_date: obs.filed_date,
        is_derived: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FiscalCalendar, classify_all};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn annual(value: f64, year: i32, filed: NaiveDate, index: usize) -> RawObservation {
        RawObservation {
            taxonomy: "us-gaap".to_string(),
            tag: "IncurredClaimsPropertyCasualtyAndLiability".to_string(),
            value,
            unit: "USD".to_string(),
            filing_type: "10-K".to_string(),
            fiscal_year_tag: Some(2024),
            fiscal_period_tag: Some("FY".to_string()),
            period_start: Some(date(year, 1, 1)),
            period_end: date(year, 12, 31),
            filed_date: filed,
            accession_id: format!("0000000001-{}-000001", filed.format("%y")),
            source_index: index,
        }
    }

    #[test]
    fn test_comparative_years_do_not_collide() {
        let filed = date(2025, 2, 20);
        let observations = vec![
            annual(600.0, 2022, filed, 0),
            annual(620.0, 2023, filed, 1),
            annual(650.0, 2024, filed, 2),
        ];

        let labeled = classify_all(observations, FiscalCalendar::DECEMBER);
        let series = deduplicate(BaseMetric::LossesIncurred, labeled);
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(&CanonicalPeriod::annual(2024)).unwrap().value, 650.0);
        assert_eq!(series.get(&CanonicalPeriod::annual(2022)).unwrap().value, 600.0);
    }

    #[test]
    fn test_collapsed_periods_prefer_latest_window() {
        // Three windows forced onto one period, as a source tagging quirk
        // would produce; the 2024 window wins even though it was filed first.
        let period = CanonicalPeriod::annual(2024);
        let labeled = vec![
            (annual(650.0, 2024, date(2025, 2, 1), 0), period),
            (annual(620.0, 2023, date(2025, 3, 1), 1), period),
            (annual(600.0, 2022, date(2025, 4, 1), 2), period),
        ];

        let series = deduplicate(BaseMetric::LossesIncurred, labeled);
        assert_eq!(series.len(), 1);
        let kept = series.get(&period).unwrap();
        assert_eq!(kept.value, 650.0);
        assert_eq!(kept.period_end, date(2024, 12, 31));
    }

    #[test]
    fn test_amendment_of_same_window_keeps_latest_filing() {
        let labeled = classify_all(
            vec![
                annual(640.0, 2024, date(2025, 2, 20), 0),
                annual(655.0, 2024, date(2025, 6, 1), 1),
            ],
            FiscalCalendar::DECEMBER,
        );
        let series = deduplicate(BaseMetric::LossesIncurred, labeled);
        let kept = series.get(&CanonicalPeriod::annual(2024)).unwrap();
        assert_eq!(kept.value, 655.0);
        assert_eq!(kept.filed_date, date(2025, 6, 1));
    }

    #[test]
    fn test_same_window_same_filing_date_keeps_last_seen() {
        let filed = date(2025, 2, 20);
        let labeled = classify_all(
            vec![annual(1.0, 2024, filed, 0), annual(2.0, 2024, filed, 1)],
            FiscalCalendar::DECEMBER,
        );
        let series = deduplicate(BaseMetric::LossesIncurred, labeled);
        assert_eq!(series.get(&CanonicalPeriod::annual(2024)).unwrap().value, 2.0);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let period = CanonicalPeriod::annual(2024);
        let a = annual(650.0, 2024, date(2025, 2, 1), 0);
        let b = annual(620.0, 2023, date(2025, 3, 1), 1);

        let forward = deduplicate(
            BaseMetric::LossesIncurred,
            vec![(a.clone(), period), (b.clone(), period)],
        );
        let backward = deduplicate(BaseMetric::LossesIncurred, vec![(b, period), (a, period)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_window_precedence_total_order() {
        let filed = date(2025, 2, 20);
        let a = annual(1.0, 2024, filed, 0);
        let mut b = a.clone();
        b.source_index = 1;
        assert_eq!(window_precedence(&b, &a), Ordering::Greater);

        let mut c = a.clone();
        c.accession_id = "0000000001-25-000009".to_string();
        assert_eq!(window_precedence(&c, &b), Ordering::Greater);
    }

    #[test]
    fn test_parsed_metric_fields() {
        let series = deduplicate(
            BaseMetric::LossesIncurred,
            classify_all(
                vec![annual(650.0, 2024, date(2025, 2, 20), 0)],
                FiscalCalendar::DECEMBER,
            ),
        );
        let m = series.iter().next().unwrap();
        assert_eq!(m.metric_name, "losses_incurred");
        assert!(!m.is_derived);
        assert_eq!(m.source_id, SourceId::Accession("0000000001-25-000001".to_string()));
    }
}
