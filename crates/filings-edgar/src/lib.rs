#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR client for XBRL company facts.
//!
//! This crate provides:
//!
//! - CIK (Central Index Key) lookup from ticker symbols
//! - Company facts from the EDGAR XBRL API
//! - A [`FactSource`] implementation for the ingestion run
//!
//! # Example
//!
//! ```no_run
//! use filings_core::{Company, FactSource, Segment};
//! use filings_edgar::EdgarClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let company = Company::new("TRV", Segment::PropertyCasualty);
//!     let facts = client.fetch_company_facts(&company).await?;
//!     println!("{} reports {} taxonomies", facts.entity_name, facts.facts.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use filings_core::{Company, CompanyFacts, FactSource, FilingsError, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// SEC EDGAR API base URL
pub const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
pub const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Default HTTP timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now()
                .checked_sub(min_interval)
                .unwrap_or_else(Instant::now),
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR client.
///
/// Every request, including the ticker lookup, goes through one shared rate
/// limiter (max 10 requests/second), so clones of the `Arc` holding this
/// client can be used from concurrent tasks.
#[derive(Debug)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    tickers_url: String,
    tickers: OnceCell<HashMap<String, String>>,
}

impl EdgarClient {
    /// Create a new EDGAR client with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// [`FilingsError::Network`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FilingsError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR client with a custom HTTP client.
    ///
    /// The client must already carry an identifying user agent.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            base_url: EDGAR_BASE_URL.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
            tickers: OnceCell::new(),
        }
    }

    /// Overrides the API base URL (mirrors and test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the ticker file URL.
    #[must_use]
    pub fn with_tickers_url(mut self, tickers_url: impl Into<String>) -> Self {
        self.tickers_url = tickers_url.into();
        self
    }

    /// Sets the minimum interval between requests.
    #[must_use]
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(min_interval)));
        self
    }

    /// Look up a company's CIK number from its ticker symbol.
    ///
    /// The ticker file is downloaded once per client and reused.
    ///
    /// # Returns
    /// The company's CIK number as a zero-padded 10-digit string
    pub async fn get_cik(&self, ticker: &str) -> Result<String> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(FilingsError::InvalidParameter("Empty ticker".to_string()));
        }

        let tickers = self
            .tickers
            .get_or_try_init(|| self.fetch_tickers())
            .await?;

        match tickers.get(&ticker.to_uppercase()) {
            Some(cik) => {
                debug!("Found CIK {} for ticker {}", cik, ticker);
                Ok(cik.clone())
            }
            None => Err(FilingsError::CompanyNotFound(ticker.to_string())),
        }
    }

    /// Fetch the full company facts payload for a CIK.
    ///
    /// # Arguments
    /// * `cik` - Company's CIK number (will be zero-padded)
    pub async fn company_facts(&self, cik: &str) -> Result<CompanyFacts> {
        let cik_padded = format!("{:0>10}", cik.trim());
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{}.json",
            self.base_url, cik_padded
        );

        debug!("Fetching company facts from {}", url);
        self.get_json(&url, &cik_padded).await
    }

    async fn fetch_tickers(&self) -> Result<HashMap<String, String>> {
        debug!("Fetching company tickers from SEC");
        let data: HashMap<String, CompanyTickerInfo> =
            self.get_json(&self.tickers_url, "company tickers").await?;

        Ok(data
            .into_values()
            .map(|info| (info.ticker.to_uppercase(), format!("{:0>10}", info.cik_str)))
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, subject: &str) -> Result<T> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FilingsError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FilingsError::CompanyNotFound(subject.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(subject, ?retry_after, "Rate limited by SEC EDGAR");
            return Err(FilingsError::RateLimited {
                source_name: "SEC EDGAR".to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(FilingsError::Network(format!(
                "Failed to fetch {subject}: HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FilingsError::Parse(format!("Failed to parse {subject}: {e}")))
    }
}

#[async_trait]
impl FactSource for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn fetch_company_facts(&self, company: &Company) -> Result<CompanyFacts> {
        let cik = match &company.cik {
            Some(cik) => cik.clone(),
            None => self
                .get_cik(company.id())
                .await
                .map_err(|e| FilingsError::source_unavailable(company.id(), e))?,
        };

        self.company_facts(&cik)
            .await
            .map_err(|e| FilingsError::source_unavailable(company.id(), e))
    }
}

// =============================================================================
// Response types
// =============================================================================

/// Company ticker information from SEC
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
}

// =============================================================================
// Tests
// =============================================================================
