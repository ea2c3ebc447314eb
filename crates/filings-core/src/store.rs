//! Store trait for persisted metrics.
//!
//! This module defines the [`MetricStore`] trait: a keyed metric table with a
//! uniqueness constraint over `(company_id, metric_name, period_type,
//! fiscal_year, fiscal_quarter)` and upsert semantics, plus the company
//! universe the ingestion run draws from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    types::{Company, MetricRow},
};

/// Trait for persisting companies and their metrics.
///
/// Implementations are passed into the ingestion run explicitly; nothing in
/// the workspace holds a global store handle.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Inserts or replaces a company in the universe.
    async fn upsert_company(&self, company: &Company) -> Result<()>;

    /// Returns up to `limit` companies, least recently ingested first.
    ///
    /// Companies that were never ingested come before all others.
    async fn companies_due(&self, limit: usize) -> Result<Vec<Company>>;

    /// Records a clean ingestion of a company.
    ///
    /// `entity_name` replaces the stored display name when present.
    async fn mark_ingested(
        &self,
        company_id: &str,
        entity_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Upserts metric rows keyed on the uniqueness constraint.
    ///
    /// The batch is applied atomically. Returns the number of rows written.
    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<usize>;

    /// Returns all stored rows for a company, ordered by key.
    async fn metrics(&self, company_id: &str) -> Result<Vec<MetricRow>>;

    /// Clears all stored data.
    async fn clear(&self) -> Result<()>;
}
