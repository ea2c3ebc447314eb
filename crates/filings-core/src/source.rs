//! Source trait for fetching company facts.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, facts::CompanyFacts, types::Company};

/// Provider of raw XBRL fact payloads.
///
/// The SEC EDGAR client is the production implementation; tests substitute
/// fixtures.
#[async_trait]
pub trait FactSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Fetches the full company facts payload for a company.
    async fn fetch_company_facts(&self, company: &Company) -> Result<CompanyFacts>;
}
