//! Year-over-year growth.

use filings_core::{ParsedMetric, Segment, SourceId};
use tracing::trace;

use crate::derived::guarded_div;
use crate::snapshot::MetricSnapshot;

/// Year-over-year growth of the segment's volume metric.
///
/// Both snapshots must be annual and `prior` must be the fiscal year right
/// before `current`. Returns `None` when the segment has no growth metric,
/// either side lacks the value, or the prior value is zero. The result
/// carries `current`'s period.
pub fn compute_growth(
    current: &MetricSnapshot,
    prior: &MetricSnapshot,
    segment: Segment,
) -> Option<ParsedMetric> {
    let (base, derived) = segment.growth_metric()?;

    let period = current.period();
    if !period.is_annual() || prior.period() != period.prior_year() {
        trace!(current = %period, prior = %prior.period(), "Growth periods are not adjacent years");
        return None;
    }

    let now = current.metric(base)?;
    let then = prior.metric(base)?;
    let value = guarded_div(now.value - then.value, then.value.abs())? * 100.0;
    if !value.is_finite() {
        return None;
    }

    Some(ParsedMetric {
        metric_name: derived.name().to_string(),
        value,
        unit: derived.unit(),
        period,
        period_start: now.period_start,
        period_end: now.period_end,
        source_id: SourceId::Derived,
        filed_date: now.filed_date.max(then.filed_date),
        is_derived: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use filings_core::{BaseMetric, CanonicalPeriod};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snap(period: CanonicalPeriod, metric: BaseMetric, value: f64) -> MetricSnapshot {
        let year = period.fiscal_year;
        MetricSnapshot::try_new(
            period,
            vec![ParsedMetric {
                metric_name: metric.name().to_string(),
                value,
                unit: metric.unit(),
                period,
                period_start: Some(date(year, 1, 1)),
                period_end: date(year, 12, 31),
                source_id: SourceId::Accession(format!("accn-{year}")),
                filed_date: date(year + 1, 2, 20),
                is_derived: false,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_premium_growth() {
        let current = snap(CanonicalPeriod::annual(2024), BaseMetric::NetPremiumsEarned, 1_100e6);
        let prior = snap(CanonicalPeriod::annual(2023), BaseMetric::NetPremiumsEarned, 1_000e6);

        let growth = compute_growth(&current, &prior, Segment::PropertyCasualty).unwrap();
        assert_eq!(growth.metric_name, "premium_growth_yoy");
        assert_relative_eq!(growth.value, 10.0, epsilon = 1e-9);
        assert_eq!(growth.period, CanonicalPeriod::annual(2024));
        assert_eq!(growth.filed_date, date(2025, 2, 20));
        assert!(growth.is_derived);
    }

    #[test]
    fn test_zero_prior_omitted() {
        let current = snap(CanonicalPeriod::annual(2024), BaseMetric::NetPremiumsEarned, 1_100e6);
        let prior = snap(CanonicalPeriod::annual(2023), BaseMetric::NetPremiumsEarned, 0.0);
        assert!(compute_growth(&current, &prior, Segment::Reinsurance).is_none());
    }

    #[test]
    fn test_negative_prior_uses_magnitude() {
        let current = snap(CanonicalPeriod::annual(2024), BaseMetric::Revenue, -50.0);
        let prior = snap(CanonicalPeriod::annual(2023), BaseMetric::Revenue, -100.0);
        let growth = compute_growth(&current, &prior, Segment::Broker).unwrap();
        assert_eq!(growth.metric_name, "revenue_growth_yoy");
        assert_relative_eq!(growth.value, 50.0);
    }

    #[test]
    fn test_requires_adjacent_annual_periods() {
        let current = snap(CanonicalPeriod::annual(2024), BaseMetric::Revenue, 110.0);
        let gap = snap(CanonicalPeriod::annual(2022), BaseMetric::Revenue, 100.0);
        assert!(compute_growth(&current, &gap, Segment::Health).is_none());

        let q = snap(CanonicalPeriod::quarterly(2024, 1), BaseMetric::Revenue, 110.0);
        let q_prior = snap(CanonicalPeriod::quarterly(2023, 1), BaseMetric::Revenue, 100.0);
        assert!(compute_growth(&q, &q_prior, Segment::Health).is_none());
    }

    #[test]
    fn test_segment_without_growth_metric() {
        let current = snap(CanonicalPeriod::annual(2024), BaseMetric::Revenue, 110.0);
        let prior = snap(CanonicalPeriod::annual(2023), BaseMetric::Revenue, 100.0);
        assert!(compute_growth(&current, &prior, Segment::LifeAnnuity).is_none());
        // P&C grows on premiums, which these snapshots lack.
        assert!(compute_growth(&current, &prior, Segment::PropertyCasualty).is_none());
    }
}
