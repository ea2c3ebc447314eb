//! In-memory metric store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filings_core::{Company, FilingsError, MetricKey, MetricRow, MetricStore, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Full storage key: company id plus the metric key.
type RowKey = (String, MetricKey);

/// Simple in-memory store for testing and development.
///
/// Data is stored in `RwLock`-protected `BTreeMap`s and is lost when the
/// store is dropped. Batches are validated before any row is written, so a
/// rejected batch leaves the store untouched.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    companies: RwLock<BTreeMap<String, Company>>,
    metrics: RwLock<BTreeMap<RowKey, MetricRow>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored metric rows across all companies.
    pub async fn len(&self) -> usize {
        self.metrics.read().await.len()
    }

    /// Returns true if no metric rows are stored.
    pub async fn is_empty(&self) -> bool {
        self.metrics.read().await.is_empty()
    }
}

#[async_trait]
impl MetricStore for InMemoryStore {
    #[instrument(skip(self, company), fields(company = %company.ticker))]
    async fn upsert_company(&self, company: &Company) -> Result<()> {
        let mut companies = self.companies.write().await;
        let mut company = company.clone();
        if let Some(existing) = companies.get(company.id()) {
            company.name = company.name.or_else(|| existing.name.clone());
            company.last_ingested_at = company.last_ingested_at.or(existing.last_ingested_at);
        }
        companies.insert(company.id().to_string(), company);
        debug!("Upserted company");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn companies_due(&self, limit: usize) -> Result<Vec<Company>> {
        let companies = self.companies.read().await;
        let mut due: Vec<Company> = companies.values().cloned().collect();
        // `None` sorts first, so never-ingested companies lead.
        due.sort_by(|a, b| {
            a.last_ingested_at
                .cmp(&b.last_ingested_at)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        due.truncate(limit);
        debug!("Found {} companies due", due.len());
        Ok(due)
    }

    #[instrument(skip(self, entity_name))]
    async fn mark_ingested(
        &self,
        company_id: &str,
        entity_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut companies = self.companies.write().await;
        let company = companies
            .get_mut(company_id)
            .ok_or_else(|| FilingsError::CompanyNotFound(company_id.to_string()))?;
        company.last_ingested_at = Some(at);
        if let Some(name) = entity_name {
            company.name = Some(name.to_string());
        }
        Ok(())
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<usize> {
        if let Some(bad) = rows.iter().find(|r| !r.metric_value.is_finite()) {
            return Err(FilingsError::Storage(format!(
                "Non-finite value for {} {}",
                bad.metric_name, bad.fiscal_year
            )));
        }

        let mut metrics = self.metrics.write().await;
        for row in rows {
            metrics.insert((row.company_id.clone(), row.key()), row.clone());
        }
        debug!("Upserted {} metric rows", rows.len());
        Ok(rows.len())
    }

    #[instrument(skip(self))]
    async fn metrics(&self, company_id: &str) -> Result<Vec<MetricRow>> {
        let metrics = self.metrics.read().await;
        let rows: Vec<MetricRow> = metrics
            .iter()
            .filter(|((id, _), _)| id == company_id)
            .map(|(_, row)| row.clone())
            .collect();
        debug!("Found {} stored metric rows", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.metrics.write().await.clear();
        self.companies.write().await.clear();
        debug!("Cleared all stored data");
        Ok(())
    }
}
