//! SQLite-based metric store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use filings_core::{
    Company, FilingsError, MetricRow, MetricStore, MetricUnit, PeriodType, Result, Segment, Ticker,
};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// Stored in place of a missing fiscal quarter.
///
/// SQLite treats NULLs as distinct in unique keys, so annual rows would never
/// conflict with each other if the quarter were stored as NULL.
const NO_QUARTER: i64 = 0;

/// SQLite-based metric store.
///
/// Data persists across runs in a single database file. The uniqueness key
/// `(company_id, metric_name, period_type, fiscal_year, fiscal_quarter)` is
/// the table's primary key and every batch is written in one transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| FilingsError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| FilingsError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS companies (
                company_id TEXT PRIMARY KEY,
                cik TEXT,
                name TEXT,
                segment TEXT NOT NULL,
                last_ingested_at TEXT
            )",
            [],
        )
        .map_err(|e| FilingsError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS financial_metrics (
                company_id TEXT NOT NULL,
                metric_name TEXT NOT NULL,
                metric_value REAL NOT NULL,
                unit TEXT NOT NULL,
                period_type TEXT NOT NULL,
                fiscal_year INTEGER NOT NULL,
                fiscal_quarter INTEGER NOT NULL DEFAULT 0,
                period_start_date TEXT,
                period_end_date TEXT NOT NULL,
                is_derived INTEGER NOT NULL,
                source TEXT NOT NULL,
                accession_number TEXT,
                filed_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (company_id, metric_name, period_type, fiscal_year, fiscal_quarter)
            )",
            [],
        )
        .map_err(|e| FilingsError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_companies_last_ingested
             ON companies(last_ingested_at)",
            [],
        )
        .map_err(|e| FilingsError::Storage(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

/// Fixed-width UTC timestamps sort correctly as text.
fn timestamp_to_str(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn str_to_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FilingsError::Storage(format!("Invalid timestamp {s}: {e}")))
}

fn str_to_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .map_err(|e| FilingsError::Storage(format!("Invalid date {s}: {e}")))
}

/// A `financial_metrics` row as read from SQLite, before type conversion.
struct StoredRow {
    company_id: String,
    metric_name: String,
    metric_value: f64,
    unit: String,
    period_type: String,
    fiscal_year: i32,
    fiscal_quarter: i64,
    period_start_date: Option<String>,
    period_end_date: String,
    is_derived: bool,
    source: String,
    accession_number: Option<String>,
    filed_at: String,
}

impl StoredRow {
    fn into_metric_row(self) -> Result<MetricRow> {
        let unit = MetricUnit::parse(&self.unit)
            .ok_or_else(|| FilingsError::Storage(format!("Invalid unit: {}", self.unit)))?;
        let period_type = PeriodType::parse(&self.period_type).ok_or_else(|| {
            FilingsError::Storage(format!("Invalid period type: {}", self.period_type))
        })?;
        let fiscal_quarter = match self.fiscal_quarter {
            NO_QUARTER => None,
            q => Some(u8::try_from(q).map_err(|e| FilingsError::Storage(e.to_string()))?),
        };

        Ok(MetricRow {
            company_id: self.company_id,
            metric_name: self.metric_name,
            metric_value: self.metric_value,
            unit,
            period_type,
            fiscal_year: self.fiscal_year,
            fiscal_quarter,
            period_start_date: self.period_start_date.as_deref().map(str_to_date).transpose()?,
            period_end_date: str_to_date(&self.period_end_date)?,
            is_derived: self.is_derived,
            source: self.source,
            accession_number: self.accession_number,
            filed_at: str_to_date(&self.filed_at)?,
        })
    }
}

/// A `companies` row as read from SQLite.
struct StoredCompany {
    company_id: String,
    cik: Option<String>,
    name: Option<String>,
    segment: String,
    last_ingested_at: Option<String>,
}

impl StoredCompany {
    fn into_company(self) -> Result<Company> {
        let segment = Segment::parse(&self.segment)
            .ok_or_else(|| FilingsError::Storage(format!("Invalid segment: {}", self.segment)))?;
        Ok(Company {
            ticker: Ticker::new(self.company_id),
            cik: self.cik,
            name: self.name,
            segment,
            last_ingested_at: self
                .last_ingested_at
                .as_deref()
                .map(str_to_timestamp)
                .transpose()?,
        })
    }
}

#[async_trait]
impl MetricStore for SqliteStore {
    #[instrument(skip(self, company), fields(company = %company.ticker))]
    async fn upsert_company(&self, company: &Company) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO companies (company_id, cik, name, segment, last_ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(company_id) DO UPDATE SET
                cik = excluded.cik,
                name = COALESCE(excluded.name, companies.name),
                segment = excluded.segment,
                last_ingested_at = COALESCE(excluded.last_ingested_at, companies.last_ingested_at)",
            params![
                company.id(),
                company.cik,
                company.name,
                company.segment.as_str(),
                company.last_ingested_at.map(timestamp_to_str),
            ],
        )
        .map_err(|e| FilingsError::Storage(e.to_string()))?;

        debug!("Upserted company");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn companies_due(&self, limit: usize) -> Result<Vec<Company>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT company_id, cik, name, segment, last_ingested_at
                 FROM companies
                 ORDER BY last_ingested_at IS NOT NULL, last_ingested_at ASC, company_id ASC
                 LIMIT ?1",
            )
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(StoredCompany {
                    company_id: row.get(0)?,
                    cik: row.get(1)?,
                    name: row.get(2)?,
                    segment: row.get(3)?,
                    last_ingested_at: row.get(4)?,
                })
            })
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let mut companies = Vec::new();
        for row in rows {
            let stored = row.map_err(|e| FilingsError::Storage(e.to_string()))?;
            companies.push(stored.into_company()?);
        }

        debug!("Found {} companies due", companies.len());
        Ok(companies)
    }

    #[instrument(skip(self, entity_name))]
    async fn mark_ingested(
        &self,
        company_id: &str,
        entity_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let updated = conn
            .execute(
                "UPDATE companies
                 SET last_ingested_at = ?1, name = COALESCE(?2, name)
                 WHERE company_id = ?3",
                params![timestamp_to_str(at), entity_name, company_id],
            )
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        if updated == 0 {
            return Err(FilingsError::CompanyNotFound(company_id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<usize> {
        let updated_at = timestamp_to_str(Utc::now());

        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        for row in rows {
            if !row.metric_value.is_finite() {
                return Err(FilingsError::Storage(format!(
                    "Non-finite value for {} {}",
                    row.metric_name, row.fiscal_year
                )));
            }

            tx.execute(
                "INSERT INTO financial_metrics
                 (company_id, metric_name, metric_value, unit, period_type, fiscal_year,
                  fiscal_quarter, period_start_date, period_end_date, is_derived, source,
                  accession_number, filed_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(company_id, metric_name, period_type, fiscal_year, fiscal_quarter)
                 DO UPDATE SET
                    metric_value = excluded.metric_value,
                    unit = excluded.unit,
                    period_start_date = excluded.period_start_date,
                    period_end_date = excluded.period_end_date,
                    is_derived = excluded.is_derived,
                    source = excluded.source,
                    accession_number = excluded.accession_number,
                    filed_at = excluded.filed_at,
                    updated_at = excluded.updated_at",
                params![
                    row.company_id,
                    row.metric_name,
                    row.metric_value,
                    row.unit.as_str(),
                    row.period_type.as_str(),
                    row.fiscal_year,
                    row.fiscal_quarter.map_or(NO_QUARTER, i64::from),
                    row.period_start_date.map(|d| d.to_string()),
                    row.period_end_date.to_string(),
                    row.is_derived,
                    row.source,
                    row.accession_number,
                    row.filed_at.to_string(),
                    updated_at,
                ],
            )
            .map_err(|e| FilingsError::Storage(e.to_string()))?;
        }

        tx.commit().map_err(|e| FilingsError::Storage(e.to_string()))?;
        debug!("Upserted {} metric rows", rows.len());
        Ok(rows.len())
    }

    #[instrument(skip(self))]
    async fn metrics(&self, company_id: &str) -> Result<Vec<MetricRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT company_id, metric_name, metric_value, unit, period_type, fiscal_year,
                        fiscal_quarter, period_start_date, period_end_date, is_derived, source,
                        accession_number, filed_at
                 FROM financial_metrics
                 WHERE company_id = ?1
                 ORDER BY metric_name, period_type, fiscal_year, fiscal_quarter",
            )
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![company_id], |row| {
                Ok(StoredRow {
                    company_id: row.get(0)?,
                    metric_name: row.get(1)?,
                    metric_value: row.get(2)?,
                    unit: row.get(3)?,
                    period_type: row.get(4)?,
                    fiscal_year: row.get(5)?,
                    fiscal_quarter: row.get(6)?,
                    period_start_date: row.get(7)?,
                    period_end_date: row.get(8)?,
                    is_derived: row.get(9)?,
                    source: row.get(10)?,
                    accession_number: row.get(11)?,
                    filed_at: row.get(12)?,
                })
            })
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        let mut metrics = Vec::new();
        for row in rows {
            let stored = row.map_err(|e| FilingsError::Storage(e.to_string()))?;
            metrics.push(stored.into_metric_row()?);
        }

        debug!("Found {} stored metric rows", metrics.len());
        Ok(metrics)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        conn.execute("DELETE FROM financial_metrics", [])
            .map_err(|e| FilingsError::Storage(e.to_string()))?;
        conn.execute("DELETE FROM companies", [])
            .map_err(|e| FilingsError::Storage(e.to_string()))?;

        debug!("Cleared all stored data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filings_core::{CanonicalPeriod, MetricKey};

    fn row(metric_name: &str, period: CanonicalPeriod, value: f64) -> MetricRow {
        MetricRow {
            company_id: "TRV".to_string(),
            metric_name: metric_name.to_string(),
            metric_value: value,
            unit: MetricUnit::Currency,
            period_type: period.period_type,
            fiscal_year: period.fiscal_year,
            fiscal_quarter: period.fiscal_quarter,
            period_start_date: NaiveDate::from_ymd_opt(period.fiscal_year, 1, 1),
            period_end_date: NaiveDate::from_ymd_opt(period.fiscal_year, 12, 31).unwrap(),
            is_derived: false,
            source: "xbrl".to_string(),
            accession_number: Some("0000086312-25-000007".to_string()),
            filed_at: NaiveDate::from_ymd_opt(period.fiscal_year + 1, 2, 14).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_annual_rows_conflict_on_key() {
        let store = SqliteStore::in_memory().unwrap();
        let fy24 = CanonicalPeriod::annual(2024);

        store.upsert_metrics(&[row("revenue", fy24, 1.0)]).await.unwrap();
        store.upsert_metrics(&[row("revenue", fy24, 2.0)]).await.unwrap();

        let rows = store.metrics("TRV").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metric_value, 2.0);
        assert_eq!(rows[0].fiscal_quarter, None);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_row() {
        let store = SqliteStore::in_memory().unwrap();
        let mut derived = row("roe", CanonicalPeriod::quarterly(2024, 3), 11.5);
        derived.is_derived = true;
        derived.source = "derived".to_string();
        derived.accession_number = None;
        derived.unit = MetricUnit::Percent;
        derived.period_start_date = None;

        store.upsert_metrics(&[derived.clone()]).await.unwrap();
        let rows = store.metrics("TRV").await.unwrap();
        assert_eq!(rows, vec![derived]);
    }

    #[tokio::test]
    async fn test_metrics_ordered_by_key() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_metrics(&[
                row("roe", CanonicalPeriod::annual(2024), 1.0),
                row("revenue", CanonicalPeriod::quarterly(2024, 2), 2.0),
                row("revenue", CanonicalPeriod::annual(2024), 3.0),
                row("revenue", CanonicalPeriod::annual(2023), 4.0),
            ])
            .await
            .unwrap();

        let keys: Vec<MetricKey> = store
            .metrics("TRV")
            .await
            .unwrap()
            .iter()
            .map(MetricRow::key)
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[tokio::test]
    async fn test_failed_batch_is_rolled_back() {
        let store = SqliteStore::in_memory().unwrap();
        let fy24 = CanonicalPeriod::annual(2024);
        let result = store
            .upsert_metrics(&[row("revenue", fy24, 1.0), row("roe", fy24, f64::NAN)])
            .await;
        assert!(matches!(result, Err(FilingsError::Storage(_))));
        assert!(store.metrics("TRV").await.unwrap().is_empty());

        // The connection is still usable after the rollback.
        assert_eq!(store.upsert_metrics(&[row("revenue", fy24, 1.0)]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_companies_due_stalest_first() {
        let store = SqliteStore::in_memory().unwrap();
        let old = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let mut cb = Company::new("CB", Segment::PropertyCasualty);
        cb.last_ingested_at = Some(new);
        let mut trv = Company::new("TRV", Segment::PropertyCasualty);
        trv.last_ingested_at = Some(old);
        let unh = Company::new("UNH", Segment::Health).with_cik("731766");

        for company in [&cb, &trv, &unh] {
            store.upsert_company(company).await.unwrap();
        }

        let due = store.companies_due(10).await.unwrap();
        let tickers: Vec<&str> = due.iter().map(Company::id).collect();
        assert_eq!(tickers, vec!["UNH", "TRV", "CB"]);
        assert_eq!(due[0].cik.as_deref(), Some("0000731766"));
        assert_eq!(due[1].last_ingested_at, Some(old));

        assert_eq!(store.companies_due(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_ingested() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_company(&Company::new("TRV", Segment::PropertyCasualty))
            .await
            .unwrap();

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        store
            .mark_ingested("TRV", Some("The Travelers Companies, Inc."), at)
            .await
            .unwrap();

        let due = store.companies_due(1).await.unwrap();
        assert_eq!(due[0].last_ingested_at, Some(at));
        assert_eq!(due[0].name.as_deref(), Some("The Travelers Companies, Inc."));

        // Re-registering keeps the ingestion timestamp.
        store
            .upsert_company(&Company::new("TRV", Segment::PropertyCasualty))
            .await
            .unwrap();
        assert_eq!(store.companies_due(1).await.unwrap()[0].last_ingested_at, Some(at));

        assert!(matches!(
            store.mark_ingested("NOPE", None, at).await,
            Err(FilingsError::CompanyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_store() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_company(&Company::new("TRV", Segment::PropertyCasualty))
            .await
            .unwrap();
        store
            .upsert_metrics(&[row("revenue", CanonicalPeriod::annual(2024), 1.0)])
            .await
            .unwrap();

        store.clear().await.unwrap();

        assert!(store.metrics("TRV").await.unwrap().is_empty());
        assert!(store.companies_due(10).await.unwrap().is_empty());
    }
}
