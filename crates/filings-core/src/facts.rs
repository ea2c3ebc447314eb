//! Company facts payload as served by the XBRL fact API.
//!
//! The payload is organized as `facts[taxonomy][tag].units[unit_key]`, each
//! unit bucket holding the observations in source order. Maps are ordered
//! so that any "first available" lookup is deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Taxonomies searched for metric tags, in priority order.
pub const TAXONOMIES: [&str; 2] = ["us-gaap", "dei"];

/// Taxonomy of the document and entity information on a filing's cover page.
pub const COVER_TAXONOMY: &str = "dei";

/// Response from the company facts endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// CIK number.
    #[serde(default)]
    pub cik: Option<u64>,
    /// Entity display name.
    #[serde(default)]
    pub entity_name: String,
    /// Facts organized by taxonomy and tag.
    #[serde(default)]
    pub facts: BTreeMap<String, BTreeMap<String, TagFacts>>,
}

impl CompanyFacts {
    /// Looks up a tag across the searched taxonomies.
    #[must_use]
    pub fn tag(&self, tag: &str) -> Option<&TagFacts> {
        self.find_tag(tag).map(|(_, facts)| facts)
    }

    /// Looks up a tag across the searched taxonomies, returning the taxonomy
    /// it was found under.
    #[must_use]
    pub fn find_tag(&self, tag: &str) -> Option<(&'static str, &TagFacts)> {
        TAXONOMIES.iter().find_map(|taxonomy| {
            self.facts
                .get(*taxonomy)
                .and_then(|tags| tags.get(tag))
                .map(|facts| (*taxonomy, facts))
        })
    }
}

/// Facts for a specific XBRL tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFacts {
    /// Label.
    #[serde(default)]
    pub label: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Observations keyed by unit (USD, shares, ...).
    #[serde(default)]
    pub units: BTreeMap<String, Vec<FactValue>>,
}

/// A single fact value with filing metadata, exactly as served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactValue {
    /// Start date of the reporting window (absent for instant facts).
    #[serde(default)]
    pub start: Option<String>,
    /// End date of the reporting window.
    pub end: String,
    /// Value.
    pub val: f64,
    /// Accession number of the filing.
    #[serde(default)]
    pub accn: Option<String>,
    /// Fiscal year of the filing.
    #[serde(default)]
    pub fy: Option<i32>,
    /// Fiscal period of the filing (FY, Q1..Q4).
    #[serde(default)]
    pub fp: Option<String>,
    /// Form type.
    #[serde(default)]
    pub form: Option<String>,
    /// Filed date.
    #[serde(default)]
    pub filed: Option<String>,
    /// Calendar frame.
    #[serde(default)]
    pub frame: Option<String>,
}

/// One fact as reported by the source, with parsed dates.
///
/// Exists only while a company is being extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// Taxonomy the tag belongs to (`us-gaap`, `dei`).
    pub taxonomy: String,
    /// Tag the observation was found under.
    pub tag: String,
    /// Reported value.
    pub value: f64,
    /// Unit bucket the observation came from.
    pub unit: String,
    /// Form type of the filing (10-K, 10-Q, ...).
    pub filing_type: String,
    /// Fiscal year of the filing, as tagged by the source.
    pub fiscal_year_tag: Option<i32>,
    /// Fiscal period of the filing, as tagged by the source.
    pub fiscal_period_tag: Option<String>,
    /// Start of the reporting window; `None` for instant facts.
    pub period_start: Option<NaiveDate>,
    /// End of the reporting window.
    pub period_end: NaiveDate,
    /// Date the filing was accepted.
    pub filed_date: NaiveDate,
    /// Accession number of the filing.
    pub accession_id: String,
    /// Position in the source list; last-seen tie-breaks use it.
    pub source_index: usize,
}

impl RawObservation {
    /// Returns true for instant (balance sheet) facts.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.period_start.is_none()
    }

    /// Length of the reporting window in days, `None` for instant facts.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        self.period_start
            .map(|start| self.period_end.signed_duration_since(start).num_days())
    }

    /// Returns true for cover-page facts, which are dated after the period
    /// the filing reports on.
    #[must_use]
    pub fn is_cover(&self) -> bool {
        self.taxonomy == COVER_TAXONOMY
    }

    /// The true reporting window `(start, end)`.
    #[must_use]
    pub const fn window(&self) -> (Option<NaiveDate>, NaiveDate) {
        (self.period_start, self.period_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "cik": 86312,
        "entityName": "TRAVELERS COMPANIES, INC.",
        "facts": {
            "dei": {
                "EntityCommonStockSharesOutstanding": {
                    "label": "Entity Common Stock, Shares Outstanding",
                    "units": {
                        "shares": [
                            {"end": "2024-01-31", "val": 228000000, "accn": "0000086312-24-000010",
                             "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-15"}
                        ]
                    }
                }
            },
            "us-gaap": {
                "PremiumsEarnedNet": {
                    "label": "Premiums Earned, Net",
                    "units": {
                        "USD": [
                            {"start": "2023-01-01", "end": "2023-12-31", "val": 37761000000,
                             "accn": "0000086312-24-000010", "fy": 2023, "fp": "FY",
                             "form": "10-K", "filed": "2024-02-15", "frame": "CY2023"}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_company_facts() {
        let facts: CompanyFacts = serde_json::from_str(PAYLOAD).unwrap();
        assert_eq!(facts.cik, Some(86312));
        assert_eq!(facts.entity_name, "TRAVELERS COMPANIES, INC.");

        let premiums = facts.tag("PremiumsEarnedNet").unwrap();
        let usd = &premiums.units["USD"];
        assert_eq!(usd.len(), 1);
        assert_eq!(usd[0].start.as_deref(), Some("2023-01-01"));
        assert_eq!(usd[0].fy, Some(2023));
    }

    #[test]
    fn test_tag_falls_back_to_dei() {
        let facts: CompanyFacts = serde_json::from_str(PAYLOAD).unwrap();
        let (taxonomy, shares) = facts.find_tag("EntityCommonStockSharesOutstanding").unwrap();
        assert_eq!(taxonomy, COVER_TAXONOMY);
        assert!(shares.units.contains_key("shares"));
        assert_eq!(facts.find_tag("PremiumsEarnedNet").unwrap().0, "us-gaap");
        assert!(facts.tag("Revenues").is_none());
    }

    #[test]
    fn test_observation_duration() {
        let obs = RawObservation {
            taxonomy: "us-gaap".to_string(),
            tag: "PremiumsEarnedNet".to_string(),
            value: 1.0,
            unit: "USD".to_string(),
            filing_type: "10-K".to_string(),
            fiscal_year_tag: Some(2024),
            fiscal_period_tag: Some("FY".to_string()),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            period_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            filed_date: NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(),
            accession_id: "a".to_string(),
            source_index: 0,
        };
        assert_eq!(obs.duration_days(), Some(365));
        assert!(!obs.is_instant());
        assert!(!obs.is_cover());
    }
}
