//! The ingestion run: fetch, process and persist a batch of companies.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use filings_core::{
    Company, CompanyFacts, FactSource, FilingsError, MetricRow, MetricStore, ParsedMetric, Result,
};
use filings_pipeline::{process_company, reconcile};

use crate::config::IngestConfig;

/// A request to run one ingestion batch.
///
/// Unset fields fall back to the [`IngestConfig`] of the [`Ingestor`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Trigger token, checked when the configuration requires one.
    pub token: Option<String>,
    /// Companies to process in this run.
    pub batch_size: Option<usize>,
    /// Wall-clock budget for this run.
    pub time_budget: Option<Duration>,
}

impl RunRequest {
    /// A request using the configured defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Presents a trigger token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Overrides the wall-clock budget.
    #[must_use]
    pub const fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Outcome for one company.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyResult {
    /// Company ticker.
    pub ticker: String,
    /// Metric rows written.
    pub metrics_written: usize,
    /// Failures, one entry per failed fetch or write.
    pub errors: Vec<String>,
}

impl CompanyResult {
    fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if the company finished without errors.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// One result per company processed, in selection order.
    pub results: Vec<CompanyResult>,
    /// Companies selected but not started before the budget ran out.
    pub skipped: Vec<String>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total metric rows written.
    #[must_use]
    pub fn metrics_written(&self) -> usize {
        self.results.iter().map(|r| r.metrics_written).sum()
    }

    /// Companies with at least one error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Runs ingestion batches against a fact source and a metric store.
///
/// Both collaborators are injected; the ingestor holds no other state, so
/// runs are independent and can be repeated safely.
///
/// # Example
///
/// ```rust,ignore
/// use filings::{IngestConfig, Ingestor, RunRequest, SqliteStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(SqliteStore::new("filings.db")?);
/// let ingestor = Ingestor::edgar(store, IngestConfig::default())?;
/// let summary = ingestor.run(RunRequest::new()).await?;
/// println!("wrote {} rows", summary.metrics_written());
/// ```
pub struct Ingestor {
    source: Arc<dyn FactSource>,
    store: Arc<dyn MetricStore>,
    config: IngestConfig,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("source", &self.source.name())
            .field("store", &"configured")
            .field("config", &self.config)
            .finish()
    }
}

impl Ingestor {
    /// Create an ingestor from its collaborators.
    #[must_use]
    pub fn new(
        source: Arc<dyn FactSource>,
        store: Arc<dyn MetricStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Create an ingestor reading from SEC EDGAR with the configured user agent.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "edgar")]
    pub fn edgar(store: Arc<dyn MetricStore>, config: IngestConfig) -> Result<Self> {
        let client = filings_edgar::EdgarClient::new(&config.user_agent)?;
        Ok(Self::new(Arc::new(client), store, config))
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Runs one batch.
    ///
    /// Selects up to `batch_size` companies, least recently ingested first,
    /// and processes them `concurrency` at a time. Per-company failures are
    /// recorded in the summary and never abort the run. Once the time budget
    /// is spent no further wave starts; the remaining companies are listed
    /// as skipped.
    ///
    /// # Errors
    /// [`FilingsError::AuthenticationFailed`] when the token does not match,
    /// [`FilingsError::InvalidParameter`] for an unusable configuration, or
    /// a storage error if the companies cannot be selected.
    #[instrument(skip(self, request), fields(source = self.source.name()))]
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary> {
        self.authenticate(request.token.as_deref())?;
        self.config.validate()?;

        let batch_size = request.batch_size.unwrap_or(self.config.batch_size);
        if batch_size == 0 {
            return Err(FilingsError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        let budget = request.time_budget.unwrap_or_else(|| self.config.time_budget());
        let started = Instant::now();

        let companies = self.store.companies_due(batch_size).await?;
        debug!(count = companies.len(), "Selected companies");

        let mut summary = RunSummary::default();
        let mut waves = companies.chunks(self.config.concurrency);
        while let Some(wave) = waves.next() {
            if started.elapsed() >= budget {
                summary.skipped.extend(wave.iter().map(|c| c.id().to_string()));
                summary
                    .skipped
                    .extend(waves.by_ref().flatten().map(|c| c.id().to_string()));
                warn!(skipped = summary.skipped.len(), "Time budget spent, skipping remaining companies");
                break;
            }

            let results = join_all(wave.iter().map(|company| self.ingest_company(company))).await;
            summary.results.extend(results);
        }

        summary.elapsed = started.elapsed();
        info!(
            processed = summary.results.len(),
            failed = summary.failed(),
            skipped = summary.skipped.len(),
            metrics_written = summary.metrics_written(),
            elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Ingestion run finished"
        );
        Ok(summary)
    }

    /// Fetches, processes and persists one company.
    ///
    /// The company's ingestion timestamp only advances when every step
    /// succeeded, so failed companies come first in the next run.
    #[instrument(skip(self, company), fields(company = %company.ticker))]
    pub async fn ingest_company(&self, company: &Company) -> CompanyResult {
        let mut result = CompanyResult::new(company.id());

        let facts = match self.source.fetch_company_facts(company).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "Failed to fetch company facts");
                result.errors.push(e.to_string());
                return result;
            }
        };

        let metrics = self.process(&facts, company);
        let rows: Vec<MetricRow> = metrics
            .iter()
            .map(|m| MetricRow::from_metric(company.id(), m))
            .collect();

        for (index, batch) in rows.chunks(self.config.upsert_batch_size).enumerate() {
            match self.store.upsert_metrics(batch).await {
                Ok(written) => result.metrics_written += written,
                Err(e) => {
                    warn!(batch = index, rows = batch.len(), error = %e, "Metric batch failed");
                    result.errors.push(format!("batch {index}: {e}"));
                }
            }
        }

        if result.is_success() {
            let entity_name = Some(facts.entity_name.trim()).filter(|name| !name.is_empty());
            if let Err(e) = self
                .store
                .mark_ingested(company.id(), entity_name, Utc::now())
                .await
            {
                warn!(error = %e, "Failed to record ingestion");
                result.errors.push(e.to_string());
            }
        }

        debug!(
            written = result.metrics_written,
            errors = result.errors.len(),
            "Company finished"
        );
        result
    }

    /// Runs the pipeline for every configured period type and reconciles
    /// the union to one metric per storage key.
    #[must_use]
    pub fn process(&self, facts: &CompanyFacts, company: &Company) -> Vec<ParsedMetric> {
        let today = Utc::now().date_naive();
        let metrics = self
            .config
            .pipeline_options(today)
            .into_iter()
            .flat_map(|options| process_company(facts, company.segment, options).metrics);
        reconcile(metrics)
    }

    fn authenticate(&self, token: Option<&str>) -> Result<()> {
        match (&self.config.trigger_token, token) {
            (None, _) => Ok(()),
            (Some(expected), Some(token)) if expected == token => Ok(()),
            (Some(_), Some(_)) => Err(FilingsError::AuthenticationFailed(
                "Invalid trigger token".to_string(),
            )),
            (Some(_), None) => Err(FilingsError::AuthenticationFailed(
                "Missing trigger token".to_string(),
            )),
        }
    }
}
