#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for XBRL filings ingestion.
//!
//! This crate provides the foundational abstractions shared by the pipeline:
//!
//! - [`FactSource`](source::FactSource) - Provider of raw company facts
//! - [`MetricStore`](store::MetricStore) - Keyed metric table with upsert semantics
//! - [`CanonicalPeriod`](period::CanonicalPeriod) - Fiscal period identity
//! - [`BaseMetric`](catalog::BaseMetric) / [`DerivedMetric`](catalog::DerivedMetric) - The metric catalog

/// Metric catalog, units and segments.
pub mod catalog;
/// Error types for ingestion.
pub mod error;
/// Company facts payload and raw observations.
pub mod facts;
/// Fiscal period identity.
pub mod period;
/// Fact source trait.
pub mod source;
/// Metric store trait.
pub mod store;
/// Core data types (Ticker, Company, ParsedMetric, ...).
pub mod types;

// Re-export commonly used items at crate root
pub use catalog::{BaseMetric, DerivedMetric, MetricUnit, Segment};
pub use error::{FilingsError, Result};
pub use facts::{CompanyFacts, FactValue, RawObservation, TagFacts};
pub use period::{CanonicalPeriod, PeriodType};
pub use source::FactSource;
pub use store::MetricStore;
pub use types::{Company, MetricKey, MetricRow, ParsedMetric, SourceId, Ticker};
