use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::{DividendKind, DividendRecord, DividendSummary};
use crate::models::ledger::Ledger;

/// Tracks income payments (dividends, interest, FIBRA distributions) and
/// aggregates them per calendar year.
///
/// Pure business logic: no I/O, no API calls.
pub struct DividendService;

impl DividendService {
    pub fn new() -> Self {
        Self
    }

    /// Record a payment. Future payment dates are allowed: that is exactly
    /// what an announced-but-unpaid dividend looks like.
    pub fn add_dividend(
        &self,
        ledger: &mut Ledger,
        dividend: DividendRecord,
    ) -> Result<Uuid, CoreError> {
        Self::validate(&dividend)?;
        let id = dividend.id;
        ledger.dividends.push(dividend);
        Ok(id)
    }

    /// Remove a record by its UUID.
    pub fn remove_dividend(&self, ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let idx = ledger
            .dividends
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CoreError::DividendNotFound(id.to_string()))?;
        ledger.dividends.remove(idx);
        Ok(())
    }

    /// Replace a record's fields, keeping its id.
    pub fn update_dividend(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        mut updated: DividendRecord,
    ) -> Result<(), CoreError> {
        Self::validate(&updated)?;
        let record = ledger
            .dividends
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::DividendNotFound(id.to_string()))?;
        updated.id = record.id;
        *record = updated;
        Ok(())
    }

    /// All records, newest payment first.
    pub fn get_dividends<'a>(&self, ledger: &'a Ledger) -> Vec<&'a DividendRecord> {
        let mut dividends: Vec<&DividendRecord> = ledger.dividends.iter().collect();
        dividends.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        dividends
    }

    /// Aggregate one calendar year of income.
    ///
    /// Only payments landed by `today` count toward the totals and the
    /// breakdowns; later-dated records of the same year are merely counted
    /// as pending. The yield needs the portfolio's market value; pass
    /// `None` to skip it (reported as 0).
    pub fn summary(
        &self,
        ledger: &Ledger,
        year: i32,
        portfolio_value: Option<Decimal>,
        today: NaiveDate,
    ) -> DividendSummary {
        let mut total_net = Decimal::ZERO;
        let mut total_gross = Decimal::ZERO;
        let mut count = 0usize;
        let mut pending_count = 0usize;
        let mut by_kind: BTreeMap<DividendKind, Decimal> = BTreeMap::new();
        let mut by_month = [Decimal::ZERO; 12];
        let mut by_ticker: BTreeMap<String, Decimal> = BTreeMap::new();

        for dividend in &ledger.dividends {
            if dividend.payment_date.year() != year {
                continue;
            }
            if dividend.payment_date > today {
                pending_count += 1;
                continue;
            }

            total_net += dividend.net_amount;
            total_gross += dividend.gross_amount;
            count += 1;
            *by_kind.entry(dividend.kind).or_insert(Decimal::ZERO) += dividend.net_amount;
            by_month[dividend.payment_date.month0() as usize] += dividend.net_amount;
            *by_ticker
                .entry(dividend.ticker.clone())
                .or_insert(Decimal::ZERO) += dividend.net_amount;
        }

        let yield_pct = match portfolio_value {
            Some(value) if value > Decimal::ZERO => {
                (total_net / value * dec!(100)).round_dp(2)
            }
            _ => Decimal::ZERO,
        };

        for value in &mut by_month {
            *value = value.round_dp(2);
        }

        DividendSummary {
            year,
            total_net: total_net.round_dp(2),
            total_gross: total_gross.round_dp(2),
            count,
            pending_count,
            yield_pct,
            by_kind: by_kind.into_iter().map(|(k, v)| (k, v.round_dp(2))).collect(),
            by_month,
            by_ticker: by_ticker.into_iter().map(|(k, v)| (k, v.round_dp(2))).collect(),
        }
    }

    fn validate(dividend: &DividendRecord) -> Result<(), CoreError> {
        if dividend.ticker.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Dividend ticker cannot be empty".into(),
            ));
        }
        if dividend.gross_amount <= Decimal::ZERO || dividend.net_amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Dividend amounts must be positive".into(),
            ));
        }
        if dividend.net_amount > dividend.gross_amount {
            return Err(CoreError::ValidationError(
                "Net amount cannot exceed gross amount".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DividendService {
    fn default() -> Self {
        Self::new()
    }
}
