//! No-op metric store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filings_core::{Company, MetricRow, MetricStore, Result};
use tracing::trace;

/// A store that accepts every write and keeps nothing.
///
/// Used for dry runs: the ingestion run fetches and processes the companies
/// it was given, reports how many rows it would have written, and leaves
/// no trace. `companies_due` serves the fixed list passed to
/// [`with_companies`](Self::with_companies).
#[derive(Debug, Clone, Default)]
pub struct NoopStore {
    companies: Vec<Company>,
}

impl NoopStore {
    /// Create a new no-op store with no companies.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            companies: Vec::new(),
        }
    }

    /// Create a no-op store that reports `companies` as due.
    #[must_use]
    pub const fn with_companies(companies: Vec<Company>) -> Self {
        Self { companies }
    }
}

#[async_trait]
impl MetricStore for NoopStore {
    async fn upsert_company(&self, _company: &Company) -> Result<()> {
        trace!("NoopStore: upsert_company called, doing nothing");
        Ok(())
    }

    async fn companies_due(&self, limit: usize) -> Result<Vec<Company>> {
        trace!("NoopStore: companies_due called, returning fixed list");
        Ok(self.companies.iter().take(limit).cloned().collect())
    }

    async fn mark_ingested(
        &self,
        _company_id: &str,
        _entity_name: Option<&str>,
        _at: DateTime<Utc>,
    ) -> Result<()> {
        trace!("NoopStore: mark_ingested called, doing nothing");
        Ok(())
    }

    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<usize> {
        trace!("NoopStore: upsert_metrics called, discarding {} rows", rows.len());
        Ok(rows.len())
    }

    async fn metrics(&self, _company_id: &str) -> Result<Vec<MetricRow>> {
        trace!("NoopStore: metrics called, returning empty");
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopStore: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filings_core::Segment;

    #[tokio::test]
    async fn test_noop_store_keeps_nothing() {
        let store = NoopStore::new();
        assert_eq!(store.upsert_metrics(&[]).await.unwrap(), 0);
        assert!(store.metrics("TRV").await.unwrap().is_empty());
        assert!(store.companies_due(5).await.unwrap().is_empty());
        assert!(store.clear().await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_store_serves_fixed_companies() {
        let store = NoopStore::with_companies(vec![
            Company::new("TRV", Segment::PropertyCasualty),
            Company::new("UNH", Segment::Health),
        ]);
        let due = store.companies_due(1).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), "TRV");
        assert!(store.mark_ingested("TRV", None, Utc::now()).await.is_ok());
    }
}
