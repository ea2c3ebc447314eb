//! The fixed set of metrics this workspace ingests.
//!
//! Different filers use different XBRL tags for the same concept, so every
//! [`BaseMetric`] carries an ordered alias list, most authoritative first.
//! [`DerivedMetric`] names the figures computed by formula.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit a metric value is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Monetary amount.
    Currency,
    /// Percentage (already multiplied by 100).
    Percent,
    /// Plain ratio.
    Ratio,
    /// Amount per share.
    PerShare,
    /// Share count.
    Shares,
}

impl MetricUnit {
    /// Returns the storage representation of this unit.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Percent => "percent",
            Self::Ratio => "ratio",
            Self::PerShare => "per_share",
            Self::Shares => "shares",
        }
    }

    /// Parses the storage representation of a unit.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "currency" => Some(Self::Currency),
            "percent" => Some(Self::Percent),
            "ratio" => Some(Self::Ratio),
            "per_share" => Some(Self::PerShare),
            "shares" => Some(Self::Shares),
            _ => None,
        }
    }

    /// Unit bucket key in the fact payload.
    #[must_use]
    pub const fn unit_key(&self) -> &'static str {
        match self {
            Self::Currency => "USD",
            Self::PerShare => "USD/shares",
            Self::Shares => "shares",
            Self::Percent | Self::Ratio => "pure",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics taken directly from reported facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseMetric {
    /// Net premiums earned.
    NetPremiumsEarned,
    /// Net premiums written.
    NetPremiumsWritten,
    /// Losses and loss adjustment expenses incurred.
    LossesIncurred,
    /// Amortization of deferred policy acquisition costs.
    AcquisitionCosts,
    /// Other underwriting expenses.
    UnderwritingExpenses,
    /// Medical costs and benefits.
    MedicalClaimsExpense,
    /// Total revenue.
    Revenue,
    /// Net income.
    NetIncome,
    /// Net investment income.
    NetInvestmentIncome,
    /// Diluted earnings per share.
    EpsDiluted,
    /// Stockholders' equity.
    StockholdersEquity,
    /// Total assets.
    TotalAssets,
    /// Total debt.
    TotalDebt,
    /// Common shares outstanding.
    SharesOutstanding,
}

impl BaseMetric {
    /// Every base metric, in extraction order.
    pub const ALL: [Self; 14] = [
        Self::NetPremiumsEarned,
        Self::NetPremiumsWritten,
        Self::LossesIncurred,
        Self::AcquisitionCosts,
        Self::UnderwritingExpenses,
        Self::MedicalClaimsExpense,
        Self::Revenue,
        Self::NetIncome,
        Self::NetInvestmentIncome,
        Self::EpsDiluted,
        Self::StockholdersEquity,
        Self::TotalAssets,
        Self::TotalDebt,
        Self::SharesOutstanding,
    ];

    /// Stored metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NetPremiumsEarned => "net_premiums_earned",
            Self::NetPremiumsWritten => "net_premiums_written",
            Self::LossesIncurred => "losses_incurred",
            Self::AcquisitionCosts => "acquisition_costs",
            Self::UnderwritingExpenses => "underwriting_expenses",
            Self::MedicalClaimsExpense => "medical_claims_expense",
            Self::Revenue => "revenue",
            Self::NetIncome => "net_income",
            Self::NetInvestmentIncome => "net_investment_income",
            Self::EpsDiluted => "eps_diluted",
            Self::StockholdersEquity => "stockholders_equity",
            Self::TotalAssets => "total_assets",
            Self::TotalDebt => "total_debt",
            Self::SharesOutstanding => "shares_outstanding",
        }
    }

    /// Looks a base metric up by its stored name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Unit of the reported value.
    #[must_use]
    pub const fn unit(&self) -> MetricUnit {
        match self {
            Self::EpsDiluted => MetricUnit::PerShare,
            Self::SharesOutstanding => MetricUnit::Shares,
            _ => MetricUnit::Currency,
        }
    }

    /// Balance sheet items are reported as of a date, not over a window.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(
            self,
            Self::StockholdersEquity | Self::TotalAssets | Self::TotalDebt | Self::SharesOutstanding
        )
    }

    /// Candidate XBRL tags, most authoritative first.
    #[must_use]
    pub const fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::NetPremiumsEarned => &[
                "PremiumsEarnedNet",
                "PremiumsEarnedNetPropertyAndCasualty",
                "PremiumsEarnedNetLife",
                "PremiumsEarnedNetAccidentAndHealth",
            ],
            Self::NetPremiumsWritten => &[
                "PremiumsWrittenNet",
                "PremiumsWrittenNetPropertyAndCasualty",
            ],
            Self::LossesIncurred => &[
                "IncurredClaimsPropertyCasualtyAndLiability",
                "PolicyholderBenefitsAndClaimsIncurredNet",
                "LiabilityForClaimsAndClaimsAdjustmentExpenseIncurredClaims1",
            ],
            Self::AcquisitionCosts => &[
                "DeferredPolicyAcquisitionCostAmortizationExpense",
                "AmortizationOfDeferredPolicyAcquisitionCosts",
            ],
            Self::UnderwritingExpenses => &[
                "OtherUnderwritingExpense",
                "GeneralAndAdministrativeExpense",
            ],
            // The total benefits, losses and expenses line includes operating
            // costs, so it only stands in when no medical cost line is tagged.
            Self::MedicalClaimsExpense => &[
                "MedicalCostsAndBenefits",
                "PolicyholderBenefitsAndClaimsIncurredHealthCare",
                "BenefitsLossesAndExpenses",
            ],
            Self::Revenue => &[
                "Revenues",
                "RevenueFromContractWithCustomerExcludingAssessedTax",
            ],
            Self::NetIncome => &[
                "NetIncomeLoss",
                "ProfitLoss",
                "NetIncomeLossAvailableToCommonStockholdersBasic",
            ],
            Self::NetInvestmentIncome => &[
                "NetInvestmentIncome",
                "InvestmentIncomeInterestAndDividend",
            ],
            Self::EpsDiluted => &["EarningsPerShareDiluted"],
            Self::StockholdersEquity => &[
                "StockholdersEquity",
                "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            ],
            Self::TotalAssets => &["Assets"],
            Self::TotalDebt => &["DebtInstrumentCarryingAmount", "LongTermDebt", "SeniorNotes"],
            Self::SharesOutstanding => &[
                "CommonStockSharesOutstanding",
                "EntityCommonStockSharesOutstanding",
            ],
        }
    }
}

impl fmt::Display for BaseMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metrics computed by formula from same-period base metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedMetric {
    /// Losses incurred over net premiums earned.
    LossRatio,
    /// Acquisition and underwriting expenses over net premiums earned.
    ExpenseRatio,
    /// Loss ratio plus expense ratio.
    CombinedRatio,
    /// Return on equity.
    Roe,
    /// Return on assets.
    Roa,
    /// Equity per share.
    BookValuePerShare,
    /// Debt over equity.
    DebtToEquity,
    /// Medical claims over premiums (or revenue).
    MedicalLossRatio,
    /// Year-over-year change in net premiums earned.
    PremiumGrowthYoy,
    /// Year-over-year change in revenue.
    RevenueGrowthYoy,
}

impl DerivedMetric {
    /// Every derived metric.
    pub const ALL: [Self; 10] = [
        Self::LossRatio,
        Self::ExpenseRatio,
        Self::CombinedRatio,
        Self::Roe,
        Self::Roa,
        Self::BookValuePerShare,
        Self::DebtToEquity,
        Self::MedicalLossRatio,
        Self::PremiumGrowthYoy,
        Self::RevenueGrowthYoy,
    ];

    /// Stored metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LossRatio => "loss_ratio",
            Self::ExpenseRatio => "expense_ratio",
            Self::CombinedRatio => "combined_ratio",
            Self::Roe => "roe",
            Self::Roa => "roa",
            Self::BookValuePerShare => "book_value_per_share",
            Self::DebtToEquity => "debt_to_equity",
            Self::MedicalLossRatio => "medical_loss_ratio",
            Self::PremiumGrowthYoy => "premium_growth_yoy",
            Self::RevenueGrowthYoy => "revenue_growth_yoy",
        }
    }

    /// Unit of the computed value.
    #[must_use]
    pub const fn unit(&self) -> MetricUnit {
        match self {
            Self::BookValuePerShare => MetricUnit::PerShare,
            Self::DebtToEquity => MetricUnit::Ratio,
            _ => MetricUnit::Percent,
        }
    }
}

impl fmt::Display for DerivedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Industry segment of a company.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Property and casualty insurers.
    #[default]
    PropertyCasualty,
    /// Reinsurers.
    Reinsurance,
    /// Managed care and health insurers.
    Health,
    /// Life and annuity writers.
    LifeAnnuity,
    /// Insurance brokers.
    Broker,
}

impl Segment {
    /// Returns the storage representation of this segment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyCasualty => "property_casualty",
            Self::Reinsurance => "reinsurance",
            Self::Health => "health",
            Self::LifeAnnuity => "life_annuity",
            Self::Broker => "broker",
        }
    }

    /// Parses the storage representation of a segment.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "property_casualty" => Some(Self::PropertyCasualty),
            "reinsurance" => Some(Self::Reinsurance),
            "health" => Some(Self::Health),
            "life_annuity" => Some(Self::LifeAnnuity),
            "broker" => Some(Self::Broker),
            _ => None,
        }
    }

    /// Segments where loss, expense and combined ratios are meaningful.
    #[must_use]
    pub const fn is_underwriting(&self) -> bool {
        matches!(self, Self::PropertyCasualty | Self::Reinsurance)
    }

    /// Segments where the medical loss ratio is meaningful.
    #[must_use]
    pub const fn is_health(&self) -> bool {
        matches!(self, Self::Health)
    }

    /// The volume metric year-over-year growth is measured on, if any.
    ///
    /// Life and annuity writers are measured by capital return, not volume.
    #[must_use]
    pub const fn growth_metric(&self) -> Option<(BaseMetric, DerivedMetric)> {
        match self {
            Self::PropertyCasualty | Self::Reinsurance => {
                Some((BaseMetric::NetPremiumsEarned, DerivedMetric::PremiumGrowthYoy))
            }
            Self::Health | Self::Broker => {
                Some((BaseMetric::Revenue, DerivedMetric::RevenueGrowthYoy))
            }
            Self::LifeAnnuity => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
