//! Final reconciliation ahead of persistence.
//!
//! Base, derived and growth metrics are merged and reduced to one record per
//! storage key `(metric_name, period_type, fiscal_year, fiscal_quarter)`, so
//! a batch never carries two rows for the same stored slot.

use filings_core::{MetricKey, ParsedMetric};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

/// Merges metrics into at most one per storage key, ordered by key.
///
/// When two records share a key the later filed date wins; ties keep the
/// one seen last.
pub fn reconcile(metrics: impl IntoIterator<Item = ParsedMetric>) -> Vec<ParsedMetric> {
    let mut by_key: BTreeMap<MetricKey, ParsedMetric> = BTreeMap::new();
    for metric in metrics {
        match by_key.entry(metric.storage_key()) {
            Entry::Vacant(slot) => {
                slot.insert(metric);
            }
            Entry::Occupied(mut slot) => {
                debug!(
                    metric = %metric.metric_name,
                    period = %metric.period,
                    "Duplicate storage key during reconciliation"
                );
                if metric.filed_date >= slot.get().filed_date {
                    slot.insert(metric);
                }
            }
        }
    }
    by_key.into_values().collect()
}
