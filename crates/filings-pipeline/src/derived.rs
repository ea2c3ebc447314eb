//! Derived ratio metrics.
//!
//! Every formula reads from one [`MetricSnapshot`], so a ratio can never
//! combine figures from two different periods. Division by a zero or absent
//! denominator suppresses the metric, as does any non-finite result.

use chrono::NaiveDate;
use filings_core::{BaseMetric, DerivedMetric, ParsedMetric, Segment, SourceId};
use tracing::trace;

use crate::snapshot::MetricSnapshot;

/// `numerator / denominator`, or `None` when the denominator is zero or the
/// result is not finite.
#[must_use]
pub fn guarded_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// Computes the derived metrics of one period for a company in `segment`.
///
/// Year-over-year growth is not computed here; it needs two periods (see
/// [`compute_growth`](crate::growth::compute_growth)).
pub fn compute_derived(snapshot: &MetricSnapshot, segment: Segment) -> Vec<ParsedMetric> {
    let mut out = Derivation::new(snapshot);
    let v = |metric| snapshot.value(metric);

    if segment.is_underwriting() {
        let premiums = v(BaseMetric::NetPremiumsEarned);

        let loss_ratio = premiums.and_then(|npe| {
            let losses = v(BaseMetric::LossesIncurred)?;
            guarded_div(losses, npe).map(|r| r * 100.0)
        });
        out.emit(
            DerivedMetric::LossRatio,
            loss_ratio,
            &[BaseMetric::LossesIncurred, BaseMetric::NetPremiumsEarned],
        );

        let acquisition = v(BaseMetric::AcquisitionCosts);
        let underwriting = v(BaseMetric::UnderwritingExpenses);
        let expenses = acquisition.unwrap_or(0.0) + underwriting.unwrap_or(0.0);
        let expense_ratio = premiums.and_then(|npe| {
            let has_component =
                acquisition.is_some_and(|a| a != 0.0) || underwriting.is_some_and(|u| u != 0.0);
            if has_component {
                guarded_div(expenses, npe).map(|r| r * 100.0)
            } else {
                None
            }
        });
        out.emit(
            DerivedMetric::ExpenseRatio,
            expense_ratio,
            &[
                BaseMetric::AcquisitionCosts,
                BaseMetric::UnderwritingExpenses,
                BaseMetric::NetPremiumsEarned,
            ],
        );

        let combined = loss_ratio
            .zip(expense_ratio)
            .map(|(loss, expense)| loss + expense)
            .filter(|c| c.is_finite());
        out.emit(
            DerivedMetric::CombinedRatio,
            combined,
            &[
                BaseMetric::LossesIncurred,
                BaseMetric::AcquisitionCosts,
                BaseMetric::UnderwritingExpenses,
                BaseMetric::NetPremiumsEarned,
            ],
        );
    }

    let net_income = v(BaseMetric::NetIncome);
    let equity = v(BaseMetric::StockholdersEquity);

    out.emit(
        DerivedMetric::Roe,
        net_income
            .zip(equity)
            .and_then(|(ni, eq)| guarded_div(ni, eq))
            .map(|r| r * 100.0),
        &[BaseMetric::NetIncome, BaseMetric::StockholdersEquity],
    );

    out.emit(
        DerivedMetric::Roa,
        net_income
            .zip(v(BaseMetric::TotalAssets))
            .and_then(|(ni, assets)| guarded_div(ni, assets))
            .map(|r| r * 100.0),
        &[BaseMetric::NetIncome, BaseMetric::TotalAssets],
    );

    out.emit(
        DerivedMetric::BookValuePerShare,
        equity
            .zip(v(BaseMetric::SharesOutstanding))
            .and_then(|(eq, shares)| guarded_div(eq, shares)),
        &[BaseMetric::StockholdersEquity, BaseMetric::SharesOutstanding],
    );

    out.emit(
        DerivedMetric::DebtToEquity,
        v(BaseMetric::TotalDebt)
            .zip(equity)
            .and_then(|(debt, eq)| guarded_div(debt, eq)),
        &[BaseMetric::TotalDebt, BaseMetric::StockholdersEquity],
    );

    if segment.is_health() {
        // Premiums are the regulatory denominator; revenue only when no
        // premium figure is reported. A zero premium figure suppresses the ratio.
        let denominator = match v(BaseMetric::NetPremiumsEarned) {
            Some(npe) => Some((BaseMetric::NetPremiumsEarned, npe)),
            None => v(BaseMetric::Revenue).map(|rev| (BaseMetric::Revenue, rev)),
        };
        match (v(BaseMetric::MedicalClaimsExpense), denominator) {
            (Some(claims), Some((denominator_metric, value))) => out.emit(
                DerivedMetric::MedicalLossRatio,
                guarded_div(claims, value).map(|r| r * 100.0),
                &[BaseMetric::MedicalClaimsExpense, denominator_metric],
            ),
            _ => out.emit(DerivedMetric::MedicalLossRatio, None, &[]),
        }
    }

    out.finish()
}

struct Derivation<'a> {
    snapshot: &'a MetricSnapshot,
    metrics: Vec<ParsedMetric>,
}

impl<'a> Derivation<'a> {
    const fn new(snapshot: &'a MetricSnapshot) -> Self {
        Self {
            snapshot,
            metrics: Vec::new(),
        }
    }

    fn emit(&mut self, metric: DerivedMetric, value: Option<f64>, inputs: &[BaseMetric]) {
        let Some(value) = value else {
            trace!(metric = metric.name(), period = %self.snapshot.period(), "Derived metric suppressed");
            return;
        };

        let used: Vec<&ParsedMetric> = inputs
            .iter()
            .filter_map(|input| self.snapshot.metric(*input))
            .collect();
        let Some(window) = InputWindow::of(&used) else {
            return;
        };

        self.metrics.push(ParsedMetric {
            metric_name: metric.name().to_string(),
            value,
            unit: metric.unit(),
            period: self.snapshot.period(),
            period_start: window.start,
            period_end: window.end,
            source_id: SourceId::Derived,
            filed_date: window.filed,
            is_derived: true,
        });
    }

    fn finish(self) -> Vec<ParsedMetric> {
        self.metrics
    }
}

/// Reporting window and filing date a derived value inherits from its inputs.
struct InputWindow {
    start: Option<NaiveDate>,
    end: NaiveDate,
    filed: NaiveDate,
}

impl InputWindow {
    fn of(inputs: &[&ParsedMetric]) -> Option<Self> {
        let end = inputs.iter().map(|m| m.period_end).max()?;
        let filed = inputs.iter().map(|m| m.filed_date).max()?;
        let start = inputs.iter().filter_map(|m| m.period_start).min();
        Some(Self { start, end, filed })
    }
}
