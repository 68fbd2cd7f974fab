use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kind of income payment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DividendKind {
    /// Ordinary stock dividend
    Dividend,
    /// Interest (CETES, bonds)
    Interest,
    /// FIBRA capital reimbursement
    ReturnOfCapital,
}

impl std::fmt::Display for DividendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DividendKind::Dividend => write!(f, "dividend"),
            DividendKind::Interest => write!(f, "interest"),
            DividendKind::ReturnOfCapital => write!(f, "return_of_capital"),
        }
    }
}

/// One income payment received (or announced) for a held ticker.
///
/// A record dated after "today" is pending: announced but not yet paid.
/// Pending records are excluded from received totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    /// Unique identifier
    pub id: Uuid,

    /// Ticker that paid, uppercased
    pub ticker: String,

    pub kind: DividendKind,

    /// Date the payment lands (or is scheduled to land)
    pub payment_date: NaiveDate,

    /// Amount before withholding, in MXN
    pub gross_amount: Decimal,

    /// Amount actually received after withholding, in MXN
    pub net_amount: Decimal,

    /// Optional free-text notes (e.g., "Q1 2024")
    #[serde(default)]
    pub notes: Option<String>,
}

impl DividendRecord {
    pub fn new(
        ticker: impl Into<String>,
        kind: DividendKind,
        payment_date: NaiveDate,
        gross_amount: Decimal,
        net_amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into().to_uppercase(),
            kind,
            payment_date,
            gross_amount,
            net_amount,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Income received over one calendar year, broken down three ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendSummary {
    pub year: i32,

    /// Net amount received in the year, in MXN
    pub total_net: Decimal,

    /// Gross amount received in the year, in MXN
    pub total_gross: Decimal,

    /// Payments received
    pub count: usize,

    /// Payments announced but not yet received
    pub pending_count: usize,

    /// `total_net / portfolio market value × 100` (0 when value unknown)
    pub yield_pct: Decimal,

    /// Net received per payment kind
    pub by_kind: BTreeMap<DividendKind, Decimal>,

    /// Net received per month, January first
    pub by_month: [Decimal; 12],

    /// Net received per ticker
    pub by_ticker: BTreeMap<String, Decimal>,
}
