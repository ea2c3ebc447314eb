//! Stored metrics as a polars time series.

use filings_core::{FilingsError, MetricRow, Result};
use polars::prelude::*;

/// Builds a long-format `DataFrame` from stored rows.
///
/// Columns: `metric_name`, `period_type`, `fiscal_year`, `fiscal_quarter`,
/// `period_end` (date), `value`, `unit`, `is_derived`. Rows are ordered by
/// metric, then period.
///
/// # Errors
/// [`FilingsError::Other`] if the frame cannot be assembled.
pub fn metric_frame(rows: &[MetricRow]) -> Result<DataFrame> {
    let mut sorted: Vec<&MetricRow> = rows.iter().collect();
    sorted.sort_by_key(|row| row.key());

    let metric_names: Vec<&str> = sorted.iter().map(|r| r.metric_name.as_str()).collect();
    let period_types: Vec<&str> = sorted.iter().map(|r| r.period_type.as_str()).collect();
    let fiscal_years: Vec<i32> = sorted.iter().map(|r| r.fiscal_year).collect();
    let fiscal_quarters: Vec<Option<i32>> = sorted
        .iter()
        .map(|r| r.fiscal_quarter.map(i32::from))
        .collect();
    let period_ends: Vec<String> = sorted
        .iter()
        .map(|r| r.period_end_date.to_string())
        .collect();
    let values: Vec<f64> = sorted.iter().map(|r| r.metric_value).collect();
    let units: Vec<&str> = sorted.iter().map(|r| r.unit.as_str()).collect();
    let derived: Vec<bool> = sorted.iter().map(|r| r.is_derived).collect();

    let df = DataFrame::new(vec![
        Column::new("metric_name".into(), metric_names),
        Column::new("period_type".into(), period_types),
        Column::new("fiscal_year".into(), fiscal_years),
        Column::new("fiscal_quarter".into(), fiscal_quarters),
        Column::new("period_end".into(), period_ends),
        Column::new("value".into(), values),
        Column::new("unit".into(), units),
        Column::new("is_derived".into(), derived),
    ])
    .map_err(|e| FilingsError::Other(e.to_string()))?;

    // Convert date strings to Date type
    df.lazy()
        .with_column(col("period_end").cast(DataType::Date))
        .collect()
        .map_err(|e| FilingsError::Other(e.to_string()))
}
