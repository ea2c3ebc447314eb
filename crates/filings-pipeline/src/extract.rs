//! Fact extraction from a company facts payload.
//!
//! For each target metric the extractor walks the metric's alias list in
//! order and takes the first tag that has observations in the requested unit
//! bucket. Observations are never merged across aliases: once an alias
//! yields a bucket, later aliases are not consulted, even when the filters
//! below leave it thinner than a later alias would be.

use chrono::NaiveDate;
use filings_core::{BaseMetric, CompanyFacts, FactValue, RawObservation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Canonical filing type an extraction is restricted to.
///
/// Amendments belong to the same filing type as the report they amend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingType {
    /// Annual reports (10-K).
    #[default]
    Annual,
    /// Quarterly reports (10-Q).
    Quarterly,
}

impl FilingType {
    /// Form types belonging to this filing type.
    #[must_use]
    pub const fn forms(&self) -> &'static [&'static str] {
        match self {
            Self::Annual => &["10-K", "10-K/A"],
            Self::Quarterly => &["10-Q", "10-Q/A"],
        }
    }

    /// Returns true if `form` belongs to this filing type.
    #[must_use]
    pub fn matches(&self, form: &str) -> bool {
        self.forms().contains(&form.trim())
    }
}

/// Filter over the source's fiscal-year tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiscalYearFilter {
    /// Accept every fiscal year, including untagged observations.
    #[default]
    Any,
    /// Accept a single fiscal year.
    Exact(i32),
    /// Accept an inclusive range of fiscal years.
    Between(i32, i32),
}

impl FiscalYearFilter {
    /// Returns true if an observation tagged `fy` passes the filter.
    #[must_use]
    pub const fn matches(&self, fy: Option<i32>) -> bool {
        match (self, fy) {
            (Self::Any, _) => true,
            (Self::Exact(year), Some(fy)) => fy == *year,
            (Self::Between(from, to), Some(fy)) => fy >= *from && fy <= *to,
            (_, None) => false,
        }
    }
}

/// Extract observations for one base metric.
///
/// Convenience wrapper over [`extract_observations`] using the metric's
/// catalog aliases and unit.
pub fn extract_metric(
    facts: &CompanyFacts,
    metric: BaseMetric,
    filing_type: FilingType,
    fiscal_years: FiscalYearFilter,
) -> Vec<RawObservation> {
    extract_observations(
        facts,
        metric.aliases(),
        metric.unit().unit_key(),
        filing_type,
        fiscal_years,
    )
}

/// Extract observations for the first alias that has data.
///
/// Falls back to the first available unit bucket when `unit_key` is absent
/// under an alias. Returns observations in source order; an empty list means
/// no alias matched (or the matched alias had nothing after filtering).
pub fn extract_observations(
    facts: &CompanyFacts,
    aliases: &[&str],
    unit_key: &str,
    filing_type: FilingType,
    fiscal_years: FiscalYearFilter,
) -> Vec<RawObservation> {
    for alias in aliases {
        let Some((taxonomy, tag_facts)) = facts.find_tag(alias) else {
            continue;
        };

        let bucket = tag_facts
            .units
            .get_key_value(unit_key)
            .or_else(|| tag_facts.units.iter().next());

        let Some((unit, values)) = bucket else {
            continue;
        };
        if values.is_empty() {
            continue;
        }

        let observations: Vec<RawObservation> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                v.form
                    .as_deref()
                    .is_some_and(|form| filing_type.matches(form))
            })
            .filter(|(_, v)| fiscal_years.matches(v.fy))
            .filter_map(|(index, v)| to_observation(taxonomy, alias, unit, index, v))
            .collect();

        debug!(
            tag = *alias,
            unit = unit.as_str(),
            total = values.len(),
            kept = observations.len(),
            "Extracted observations"
        );
        return observations;
    }

    Vec::new()
}

fn to_observation(
    taxonomy: &str,
    tag: &str,
    unit: &str,
    index: usize,
    v: &FactValue,
) -> Option<RawObservation> {
    let Some(period_end) = parse_date(&v.end) else {
        warn!(tag, end = %v.end, "Skipping observation with unparseable end date");
        return None;
    };

    let period_start = match v.start.as_deref() {
        Some(start) => match parse_date(start) {
            Some(date) => Some(date),
            None => {
                warn!(tag, start, "Skipping observation with unparseable start date");
                return None;
            }
        },
        None => None,
    };

    let Some(filed_date) = v.filed.as_deref().and_then(parse_date) else {
        warn!(tag, end = %v.end, "Skipping observation without a filed date");
        return None;
    };

    let Some(accession_id) = v.accn.clone() else {
        warn!(tag, end = %v.end, "Skipping observation without an accession number");
        return None;
    };

    Some(RawObservation {
        taxonomy: taxonomy.to_string(),
        tag: tag.to_string(),
        value: v.val,
        unit: unit.to_string(),
        filing_type: v.form.clone().unwrap_or_default(),
        fiscal_year_tag: v.fy,
        fiscal_period_tag: v.fp.clone(),
        period_start,
        period_end,
        filed_date,
        accession_id,
        source_index: index,
    })
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filings_core::TagFacts;
    use std::collections::BTreeMap;

    fn fact(end: &str, val: f64, fy: i32, form: &str) -> FactValue {
        FactValue {
            start: None,
            end: end.to_string(),
            val,
            accn: Some(format!("accn-{fy}-{form}")),
            fy: Some(fy),
            fp: Some("FY".to_string()),
            form: Some(form.to_string()),
            filed: Some(format!("{}-02-15", fy + 1)),
            frame: None,
        }
    }

    fn payload(tags: Vec<(&str, &str, Vec<FactValue>)>) -> CompanyFacts {
        let mut us_gaap = BTreeMap::new();
        for (tag, unit, values) in tags {
            let entry: &mut TagFacts = us_gaap.entry(tag.to_string()).or_default();
            entry.units.insert(unit.to_string(), values);
        }
        let mut facts = BTreeMap::new();
        facts.insert("us-gaap".to_string(), us_gaap);
        CompanyFacts {
            cik: Some(1),
            entity_name: "Test Co".to_string(),
            facts,
        }
    }

    #[test]
    fn test_first_alias_wins_even_with_fewer_points() {
        let facts = payload(vec![
            ("StockholdersEquity", "USD", vec![fact("2024-12-31", 10.0, 2024, "10-K")]),
            (
                "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
                "USD",
                vec![
                    fact("2023-12-31", 20.0, 2023, "10-K"),
                    fact("2024-12-31", 21.0, 2024, "10-K"),
                ],
            ),
        ]);

        let obs = extract_metric(
            &facts,
            BaseMetric::StockholdersEquity,
            FilingType::Annual,
            FiscalYearFilter::Any,
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].tag, "StockholdersEquity");
        assert_eq!(obs[0].value, 10.0);
    }

    #[test]
    fn test_later_alias_used_when_earlier_missing() {
        let facts = payload(vec![(
            "ProfitLoss",
            "USD",
            vec![fact("2024-12-31", 5.0, 2024, "10-K")],
        )]);
        let obs = extract_metric(
            &facts,
            BaseMetric::NetIncome,
            FilingType::Annual,
            FiscalYearFilter::Any,
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].tag, "ProfitLoss");
    }

    #[test]
    fn test_filters_form_and_fiscal_year_preserving_order() {
        let facts = payload(vec![(
            "Assets",
            "USD",
            vec![
                fact("2024-12-31", 3.0, 2024, "10-K"),
                fact("2024-09-30", 2.0, 2024, "10-Q"),
                fact("2022-12-31", 1.0, 2022, "10-K"),
                fact("2023-12-31", 4.0, 2024, "10-K/A"),
            ],
        )]);

        let obs = extract_metric(
            &facts,
            BaseMetric::TotalAssets,
            FilingType::Annual,
            FiscalYearFilter::Between(2023, 2024),
        );
        let values: Vec<f64> = obs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![3.0, 4.0]);
        assert_eq!(obs[0].source_index, 0);
        assert_eq!(obs[1].source_index, 3);
    }

    #[test]
    fn test_unit_fallback_to_first_bucket() {
        let facts = payload(vec![(
            "Revenues",
            "EUR",
            vec![fact("2024-12-31", 7.0, 2024, "10-K")],
        )]);
        let obs = extract_observations(
            &facts,
            &["Revenues"],
            "USD",
            FilingType::Annual,
            FiscalYearFilter::Exact(2024),
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].unit, "EUR");
    }

    #[test]
    fn test_no_alias_yields_empty() {
        let facts = payload(vec![]);
        let obs = extract_metric(
            &facts,
            BaseMetric::Revenue,
            FilingType::Annual,
            FiscalYearFilter::Any,
        );
        assert!(obs.is_empty());
    }

    #[test]
    fn test_skips_unparseable_dates() {
        let mut bad = fact("not-a-date", 1.0, 2024, "10-K");
        bad.start = Some("2024-01-01".to_string());
        let facts = payload(vec![(
            "Revenues",
            "USD",
            vec![bad, fact("2024-12-31", 2.0, 2024, "10-K")],
        )]);
        let obs = extract_metric(
            &facts,
            BaseMetric::Revenue,
            FilingType::Annual,
            FiscalYearFilter::Any,
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].value, 2.0);
    }

    #[test]
    fn test_fiscal_year_filter() {
        assert!(FiscalYearFilter::Any.matches(None));
        assert!(!FiscalYearFilter::Exact(2024).matches(None));
        assert!(FiscalYearFilter::Exact(2024).matches(Some(2024)));
        assert!(FiscalYearFilter::Between(2020, 2024).matches(Some(2020)));
        assert!(!FiscalYearFilter::Between(2020, 2024).matches(Some(2025)));
    }

    #[test]
    fn test_filing_type_includes_amendments() {
        assert!(FilingType::Annual.matches("10-K/A"));
        assert!(!FilingType::Annual.matches("10-Q"));
        assert!(FilingType::Quarterly.matches("10-Q"));
    }
}
