#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! XBRL filings ingestion for insurance companies.
//!
//! This crate ties the workspace together: it re-exports the core types, the
//! pipeline and the store implementations, and provides the [`Ingestor`]
//! that runs a batch of companies from a [`FactSource`] into a
//! [`MetricStore`].
//!
//! # Features
//!
//! - `edgar` - SEC EDGAR fact source
//! - `sqlite` - SQLite-based metric store
//!
//! # Example
//!
//! ```rust,ignore
//! use filings::{Company, IngestConfig, Ingestor, MetricStore, RunRequest, Segment, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> filings::Result<()> {
//!     let store = Arc::new(SqliteStore::new("filings.db")?);
//!     store
//!         .upsert_company(&Company::new("TRV", Segment::PropertyCasualty).with_cik("86312"))
//!         .await?;
//!
//!     let ingestor = Ingestor::edgar(store.clone(), IngestConfig::default())?;
//!     let summary = ingestor.run(RunRequest::new()).await?;
//!     println!("{} rows written", summary.metrics_written());
//!
//!     let frame = filings::metric_frame(&store.metrics("TRV").await?)?;
//!     println!("{frame}");
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use filings_core::*;

// Pipeline
pub use filings_pipeline::{
    BaseMetricSet, CompanyMetrics, FilingType, FiscalCalendar, FiscalYearFilter, MetricSnapshot,
    PipelineOptions, PipelineStats, process_company,
};

// Store implementations
#[cfg(feature = "sqlite")]
pub use filings_store::SqliteStore;
pub use filings_store::{InMemoryStore, NoopStore};

// Fact sources
#[cfg(feature = "edgar")]
pub use filings_edgar::EdgarClient;

mod config;
mod ingest;
mod timeseries;

pub use config::{DEFAULT_USER_AGENT, IngestConfig};
pub use ingest::{CompanyResult, Ingestor, RunRequest, RunSummary};
pub use timeseries::metric_frame;
