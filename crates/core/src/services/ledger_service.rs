use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::classify::Classifier;
use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::transaction::{Transaction, TransactionKind};
use crate::services::cost_basis::QUANTITY_EPSILON;

/// Manages ledger transactions (buy/sell) and derives held quantities.
///
/// Pure business logic: no I/O, no API calls. Every mutation validates
/// first and leaves the ledger untouched when it rejects.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Add a transaction to the ledger.
    ///
    /// Validates first (positive amounts, no far-future dates, sells covered
    /// by holdings). A back-dated sell is additionally checked against the
    /// sells that follow it and rolled back if it would strand one, so the
    /// ledger can never hold more sold than bought. Unclassified
    /// transactions are classified on the way in, so diversification
    /// analysis never has to re-derive the class.
    /// Returns the id of the stored transaction.
    pub fn add_transaction(
        &self,
        ledger: &mut Ledger,
        classifier: &dyn Classifier,
        mut txn: Transaction,
        today: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        self.validate_transaction(ledger, &txn, today)?;

        if txn.asset_class.is_none() {
            txn.asset_class = classifier.classify(&txn.ticker, txn.market);
        }

        let id = txn.id;
        let kind = txn.kind;
        let date = txn.date;
        Self::binary_insert(&mut ledger.transactions, txn);

        // A sell covered on its own date can still overdraw a later sell;
        // buys can only add coverage and skip the re-check
        if kind == TransactionKind::Sell {
            if let Err(e) = self.validate_ledger_consistency(ledger, date) {
                // Rollback: take the inserted transaction back out
                if let Some(idx) = ledger.transactions.iter().position(|t| t.id == id) {
                    ledger.transactions.remove(idx);
                }
                return Err(e);
            }
        }

        Ok(id)
    }

    /// Remove a transaction by its UUID.
    ///
    /// Removing a buy can strand later sells without coverage, so the whole
    /// ledger is re-checked and the removal rolled back if any sell would
    /// become invalid.
    pub fn remove_transaction(&self, ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let idx = ledger
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

        let removed = ledger.transactions.remove(idx);

        if removed.kind == TransactionKind::Buy {
            if let Err(e) = self.validate_ledger_consistency(ledger, removed.date) {
                // Rollback: re-insert at the correct position
                Self::binary_insert(&mut ledger.transactions, removed);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Replace a transaction's fields, keeping its id.
    ///
    /// The replacement is validated against the ledger without the old
    /// entry; on any failure the old entry is restored unchanged.
    pub fn update_transaction(
        &self,
        ledger: &mut Ledger,
        classifier: &dyn Classifier,
        id: Uuid,
        mut updated: Transaction,
        today: NaiveDate,
    ) -> Result<(), CoreError> {
        let idx = ledger
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

        let old = ledger.transactions.remove(idx);
        updated.id = old.id;
        if updated.asset_class.is_none() {
            updated.asset_class = classifier.classify(&updated.ticker, updated.market);
        }
        let updated_date = updated.date;

        if let Err(e) = self.validate_transaction(ledger, &updated, today) {
            // Rollback: put the old transaction back
            Self::binary_insert(&mut ledger.transactions, old);
            return Err(e);
        }

        Self::binary_insert(&mut ledger.transactions, updated);

        // Moving or shrinking a buy can strand sells after either date
        let check_from = old.date.min(updated_date);
        if let Err(e) = self.validate_ledger_consistency(ledger, check_from) {
            // Rollback: swap back to the old transaction
            if let Some(new_idx) = ledger.transactions.iter().position(|t| t.id == id) {
                ledger.transactions.remove(new_idx);
            }
            Self::binary_insert(&mut ledger.transactions, old);
            return Err(e);
        }

        Ok(())
    }

    /// Set or clear the notes on an existing transaction.
    pub fn set_notes(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<(), CoreError> {
        let txn = ledger
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        txn.notes = notes;
        Ok(())
    }

    /// All transactions sorted by date (newest first for display).
    pub fn get_transactions<'a>(&self, ledger: &'a Ledger) -> Vec<&'a Transaction> {
        let mut transactions: Vec<&Transaction> = ledger.transactions.iter().collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }

    /// Units held per ticker on a specific date.
    ///
    /// Sums buys minus sells over all transactions up to `date`. Tickers
    /// whose net quantity is dust (below QUANTITY_EPSILON) are dropped.
    pub fn get_holdings(&self, ledger: &Ledger, date: NaiveDate) -> HashMap<String, Decimal> {
        let mut holdings: HashMap<String, Decimal> = HashMap::new();

        for txn in &ledger.transactions {
            if txn.date > date {
                continue;
            }

            let quantity = holdings.entry(txn.ticker.clone()).or_insert(Decimal::ZERO);
            match txn.kind {
                TransactionKind::Buy => *quantity += txn.quantity,
                TransactionKind::Sell => *quantity -= txn.quantity,
            }
        }

        holdings.retain(|_, quantity| *quantity > QUANTITY_EPSILON);
        holdings
    }

    /// Validate a transaction before it enters the ledger.
    ///
    /// Rules:
    /// - Quantity and unit price must be positive, commission non-negative
    /// - Date must not be in the future (+1 day tolerance for timezones)
    /// - Sells must be covered by units held on the sell date; when the sell
    ///   names a custodian, only units at that custodian count
    fn validate_transaction(
        &self,
        ledger: &Ledger,
        txn: &Transaction,
        today: NaiveDate,
    ) -> Result<(), CoreError> {
        if txn.quantity <= Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Transaction quantity must be positive".into(),
            ));
        }
        if txn.unit_price <= Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Transaction unit price must be positive".into(),
            ));
        }
        if txn.commission < Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Transaction commission cannot be negative".into(),
            ));
        }

        if let Some(tomorrow) = today.succ_opt() {
            if txn.date > tomorrow {
                return Err(CoreError::ValidationError(format!(
                    "Transaction date {} is in the future, prices won't be available",
                    txn.date
                )));
            }
        }

        if txn.kind == TransactionKind::Sell {
            let available = Self::net_quantity(ledger, &txn.ticker, txn.custodian.as_deref(), txn.date);
            if available < txn.quantity {
                return Err(CoreError::ValidationError(format!(
                    "Cannot sell {} {}: only {} held on {}",
                    txn.quantity, txn.ticker, available, txn.date
                )));
            }
        }

        Ok(())
    }

    /// Check that every sell dated at or after `from_date` is still covered
    /// by the buys up to its date. Used after a removal or update.
    ///
    /// Works at date granularity (trades carry no time of day), so the check
    /// is order-independent: a sell is valid as long as the day it lands on
    /// ends with non-negative holdings in its scope.
    fn validate_ledger_consistency(
        &self,
        ledger: &Ledger,
        from_date: NaiveDate,
    ) -> Result<(), CoreError> {
        for txn in &ledger.transactions {
            if txn.kind != TransactionKind::Sell || txn.date < from_date {
                continue;
            }
            let net = Self::net_quantity(ledger, &txn.ticker, txn.custodian.as_deref(), txn.date);
            if net < Decimal::ZERO {
                return Err(CoreError::ValidationError(format!(
                    "Change would leave the sell of {} {} on {} uncovered \
                     (holdings would go {:.8} negative)",
                    txn.quantity,
                    txn.ticker,
                    txn.date,
                    net.abs(),
                )));
            }
        }
        Ok(())
    }

    /// Net units of `ticker` held through end of `date`.
    ///
    /// With a custodian, only transactions at that custodian count;
    /// without one, the ticker's whole history counts.
    fn net_quantity(
        ledger: &Ledger,
        ticker: &str,
        custodian: Option<&str>,
        date: NaiveDate,
    ) -> Decimal {
        ledger
            .transactions
            .iter()
            .filter(|t| t.date <= date && t.ticker == ticker)
            .filter(|t| custodian.map_or(true, |c| t.custodian.as_deref() == Some(c)))
            .fold(Decimal::ZERO, |net, t| match t.kind {
                TransactionKind::Buy => net + t.quantity,
                TransactionKind::Sell => net - t.quantity,
            })
    }

    /// Binary insert into a date-sorted Vec<Transaction> in O(log n).
    fn binary_insert(transactions: &mut Vec<Transaction>, txn: Transaction) {
        let pos = transactions
            .binary_search_by_key(&txn.date, |t| t.date)
            .unwrap_or_else(|pos| pos);
        transactions.insert(pos, txn);
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
