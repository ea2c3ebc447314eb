//! Period classification.
//!
//! Assigns each raw observation a [`CanonicalPeriod`] from its reporting
//! window. The fiscal year comes from the window's end date read against the
//! company's [`FiscalCalendar`], never from the filing's fiscal-year tag: a
//! 10-K carries prior-year comparative columns under the same tag, and keying
//! off the tag would collapse them into one period.

use chrono::{Datelike, Days, NaiveDate};
use filings_core::{CanonicalPeriod, CompanyFacts, RawObservation};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

use crate::extract::{FilingType, parse_date};

/// Window lengths accepted as a full fiscal year (short and long years included).
pub const ANNUAL_DAYS: RangeInclusive<i64> = 350..=380;

/// Window lengths accepted as a fiscal quarter.
pub const QUARTER_DAYS: RangeInclusive<i64> = 80..=100;

/// Period ends this many days into a month still close the previous month
/// (52/53-week fiscal calendars).
const YEAR_END_GRACE_DAYS: u64 = 7;

/// Cover-page facts dated up to this many days after the fiscal year end
/// belong to that fiscal year.
const COVER_DATE_DAYS: i64 = 120;

/// A company's fiscal calendar, identified by the month its fiscal year
/// ends in.
///
/// A fiscal year is named after the calendar year it ends in: with a June
/// year end, July 2023 through June 2024 is FY2024.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FiscalCalendar {
    year_end_month: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self::DECEMBER
    }
}

impl FiscalCalendar {
    /// Fiscal years matching calendar years.
    pub const DECEMBER: Self = Self { year_end_month: 12 };

    /// Calendar whose fiscal year ends in `month` (1-12).
    #[must_use]
    pub fn ending_in(month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self { year_end_month: month })
    }

    /// Month the fiscal year ends in.
    #[must_use]
    pub const fn year_end_month(&self) -> u32 {
        self.year_end_month
    }

    /// Infers the calendar from the year-long windows of a company's annual
    /// reports.
    ///
    /// The most common year-end month wins; ties favour December, then the
    /// later month. Payloads without annual windows get
    /// [`DECEMBER`](Self::DECEMBER).
    #[must_use]
    pub fn from_facts(facts: &CompanyFacts) -> Self {
        let mut counts = [0_usize; 12];
        let windows = facts
            .facts
            .values()
            .flat_map(|tags| tags.values())
            .flat_map(|tag| tag.units.values())
            .flatten()
            .filter(|v| {
                v.fp.as_deref()
                    .is_some_and(|fp| fp.trim().eq_ignore_ascii_case("FY"))
            })
            .filter(|v| {
                v.form
                    .as_deref()
                    .is_some_and(|form| FilingType::Annual.matches(form))
            });

        for v in windows {
            let start = v.start.as_deref().and_then(parse_date);
            let (Some(start), Some(end)) = (start, parse_date(&v.end)) else {
                continue;
            };
            if !ANNUAL_DAYS.contains(&end.signed_duration_since(start).num_days()) {
                continue;
            }
            let month = anchor(end).month();
            if let Some(count) = usize::try_from(month - 1).ok().and_then(|i| counts.get_mut(i)) {
                *count += 1;
            }
        }

        let calendar = (1..=12_u32)
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .max_by_key(|(month, count)| (*count, *month == 12, *month))
            .and_then(|(month, _)| Self::ending_in(month))
            .unwrap_or_default();
        debug!(year_end_month = calendar.year_end_month, "Inferred fiscal calendar");
        calendar
    }

    /// Fiscal year a reporting window closing on `period_end` belongs to.
    ///
    /// Ends in the first days of the month after the year end still close
    /// that year.
    #[must_use]
    pub fn fiscal_year_of(&self, period_end: NaiveDate) -> i32 {
        let anchor = anchor(period_end);
        if anchor.month() <= self.year_end_month {
            anchor.year()
        } else {
            anchor.year() + 1
        }
    }

    /// Last day of `fiscal_year`.
    #[must_use]
    pub fn year_end(&self, fiscal_year: i32) -> Option<NaiveDate> {
        let (year, month) = if self.year_end_month == 12 {
            (fiscal_year.checked_add(1)?, 1)
        } else {
            (fiscal_year, self.year_end_month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
    }
}

fn anchor(period_end: NaiveDate) -> NaiveDate {
    period_end
        .checked_sub_days(Days::new(YEAR_END_GRACE_DAYS))
        .unwrap_or(period_end)
}

/// Why an observation could not be classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unclassified {
    /// No fiscal period tag on the observation.
    MissingPeriodTag,
    /// The fiscal period tag is not FY or Q1..Q4.
    UnrecognizedPeriodTag(String),
    /// The window ends before it starts.
    InvertedWindow,
    /// The window is neither a year nor a quarter long (e.g. year-to-date).
    DurationOutOfRange(i64),
    /// A year-long window in a filing not tagged as the full-year figure.
    AnnualWindowNotFullYear(i64),
    /// The window ends after the fiscal year the filing is tagged with.
    FiscalYearMismatch {
        /// Fiscal year tagged by the source.
        tagged: i32,
        /// Fiscal year computed from the window.
        computed: i32,
    },
    /// A prior-period balance carried in a quarterly filing.
    ComparativeInstant {
        /// Fiscal year tagged by the source.
        tagged: Option<i32>,
        /// Fiscal year computed from the window.
        computed: i32,
    },
}

impl fmt::Display for Unclassified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeriodTag => f.write_str("missing fiscal period tag"),
            Self::UnrecognizedPeriodTag(tag) => write!(f, "unrecognized fiscal period tag {tag}"),
            Self::InvertedWindow => f.write_str("window ends before it starts"),
            Self::DurationOutOfRange(days) => write!(f, "{days}-day window is not a year or quarter"),
            Self::AnnualWindowNotFullYear(days) => {
                write!(f, "{days}-day window not tagged as the full year")
            }
            Self::FiscalYearMismatch { tagged, computed } => {
                write!(f, "window falls in FY{computed} but filing is tagged FY{tagged}")
            }
            Self::ComparativeInstant { tagged, computed } => write!(
                f,
                "FY{computed} balance in a quarterly filing tagged {tagged:?}"
            ),
        }
    }
}

/// Source fiscal period tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PeriodTag {
    FullYear,
    Quarter(u8),
}

fn parse_period_tag(tag: Option<&str>) -> Result<PeriodTag, Unclassified> {
    let tag = tag.map(str::trim).ok_or(Unclassified::MissingPeriodTag)?;
    match tag.to_ascii_uppercase().as_str() {
        "FY" => Ok(PeriodTag::FullYear),
        "Q1" => Ok(PeriodTag::Quarter(1)),
        "Q2" => Ok(PeriodTag::Quarter(2)),
        "Q3" => Ok(PeriodTag::Quarter(3)),
        "Q4" => Ok(PeriodTag::Quarter(4)),
        "" => Err(Unclassified::MissingPeriodTag),
        _ => Err(Unclassified::UnrecognizedPeriodTag(tag.to_string())),
    }
}

/// Classify one observation against the company's fiscal calendar.
///
/// Durational facts are annual when the window is year-long and the filing
/// is tagged FY, quarterly when the window is quarter-long (an FY-tagged
/// quarter is the fourth). Instant facts take their period type from the tag.
/// Cover-page facts of an annual report, dated shortly after the year end,
/// belong to the year the report is tagged with.
pub fn classify(
    obs: &RawObservation,
    calendar: FiscalCalendar,
) -> Result<CanonicalPeriod, Unclassified> {
    let tag = parse_period_tag(obs.fiscal_period_tag.as_deref())?;
    let fiscal_year = calendar.fiscal_year_of(obs.period_end);

    if tag == PeriodTag::FullYear
        && obs.is_cover()
        && obs.is_instant()
        && let Some(tagged) = obs.fiscal_year_tag
        && tagged < fiscal_year
        && let Some(year_end) = calendar.year_end(tagged)
        && obs.period_end.signed_duration_since(year_end).num_days() <= COVER_DATE_DAYS
    {
        return Ok(CanonicalPeriod::annual(tagged));
    }

    if let Some(tagged) = obs.fiscal_year_tag
        && tagged < fiscal_year
    {
        return Err(Unclassified::FiscalYearMismatch {
            tagged,
            computed: fiscal_year,
        });
    }

    match obs.duration_days() {
        None => match tag {
            PeriodTag::FullYear => Ok(CanonicalPeriod::annual(fiscal_year)),
            PeriodTag::Quarter(q) => {
                if obs.fiscal_year_tag != Some(fiscal_year) {
                    return Err(Unclassified::ComparativeInstant {
                        tagged: obs.fiscal_year_tag,
                        computed: fiscal_year,
                    });
                }
                Ok(CanonicalPeriod::quarterly(fiscal_year, q))
            }
        },
        Some(days) if days < 0 => Err(Unclassified::InvertedWindow),
        Some(days) if ANNUAL_DAYS.contains(&days) => match tag {
            PeriodTag::FullYear => Ok(CanonicalPeriod::annual(fiscal_year)),
            PeriodTag::Quarter(_) => Err(Unclassified::AnnualWindowNotFullYear(days)),
        },
        Some(days) if QUARTER_DAYS.contains(&days) => match tag {
            PeriodTag::Quarter(q) => Ok(CanonicalPeriod::quarterly(fiscal_year, q)),
            PeriodTag::FullYear => Ok(CanonicalPeriod::quarterly(fiscal_year, 4)),
        },
        Some(days) => Err(Unclassified::DurationOutOfRange(days)),
    }
}

/// Classify a batch of observations, dropping the ones that do not classify.
///
/// Dropped observations are logged; they never fail the batch.
pub fn classify_all(
    observations: Vec<RawObservation>,
    calendar: FiscalCalendar,
) -> Vec<(RawObservation, CanonicalPeriod)> {
    observations
        .into_iter()
        .filter_map(|obs| match classify(&obs, calendar) {
            Ok(period) => Some((obs, period)),
            Err(reason) => {
                warn!(
                    tag = %obs.tag,
                    end = %obs.period_end,
                    accession = %obs.accession_id,
                    %reason,
                    "Dropping unclassifiable observation"
                );
                None
            }
        })
        .collect()
}
