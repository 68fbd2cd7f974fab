use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Requested span for the portfolio value chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRange {
    /// Last 365 days
    OneYear,
    /// Last 3 years
    ThreeYears,
    /// Last 5 years
    FiveYears,
    /// From the first transaction to today
    All,
}

impl HistoryRange {
    /// Parse the identifiers used in API requests ("1y", "3y", "5y", "all").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1y" => Some(HistoryRange::OneYear),
            "3y" => Some(HistoryRange::ThreeYears),
            "5y" => Some(HistoryRange::FiveYears),
            "all" => Some(HistoryRange::All),
            _ => None,
        }
    }

    /// Earliest date the range reaches back to from `today`.
    /// `None` means unbounded (clamped to the first transaction by the caller).
    pub fn start_from(&self, today: NaiveDate) -> Option<NaiveDate> {
        let days = match self {
            HistoryRange::OneYear => 365,
            HistoryRange::ThreeYears => 3 * 365,
            HistoryRange::FiveYears => 5 * 365,
            HistoryRange::All => return None,
        };
        Some(today - chrono::Duration::days(days))
    }
}

impl std::fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRange::OneYear => write!(f, "1y"),
            HistoryRange::ThreeYears => write!(f, "3y"),
            HistoryRange::FiveYears => write!(f, "5y"),
            HistoryRange::All => write!(f, "all"),
        }
    }
}

/// A single point of the portfolio value chart.
///
/// The core generates these; the frontend just renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Sample date
    pub date: NaiveDate,

    /// Total market value of all holdings on that date, in MXN
    pub value: Decimal,
}
