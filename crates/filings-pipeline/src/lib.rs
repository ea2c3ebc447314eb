#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Period classification.
pub mod classify;
/// Observation deduplication.
pub mod dedup;
/// Derived ratio metrics.
pub mod derived;
/// Fact extraction.
pub mod extract;
/// Year-over-year growth.
pub mod growth;
/// Per-company processing.
pub mod pipeline;
/// Storage-key reconciliation.
pub mod reconcile;
/// Base metric sets and period snapshots.
pub mod snapshot;

pub use classify::{FiscalCalendar, Unclassified, classify, classify_all};
pub use dedup::{DedupedSeries, deduplicate, window_precedence};
pub use derived::compute_derived;
pub use extract::{FilingType, FiscalYearFilter, extract_metric, extract_observations};
pub use growth::compute_growth;
pub use pipeline::{CompanyMetrics, PipelineOptions, PipelineStats, process_company};
pub use reconcile::reconcile;
pub use snapshot::{BaseMetricSet, MetricSnapshot};
