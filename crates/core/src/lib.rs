pub mod classify;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use classify::{Classifier, RulesClassifier};
use models::{
    allocation::{
        AllocationBreakdown, InvestmentSuggestion, RebalanceRecommendation, TargetAllocation,
    },
    dividend::{DividendRecord, DividendSummary},
    history::{HistoryPoint, HistoryRange},
    ledger::Ledger,
    position::PositionReport,
    settings::Settings,
    transaction::{AssetCategory, Market, Transaction},
};
use providers::registry::PriceProviderRegistry;
use services::{
    diversification_service::DiversificationService, dividend_service::DividendService,
    history_service::HistoryService, ledger_service::LedgerService,
    position_service::PositionService, price_service::PriceService,
};
use std::collections::HashMap;
use storage::manager::StorageManager;

use errors::CoreError;

/// Currency every stored amount, price and report is denominated in.
pub const REFERENCE_CURRENCY: &str = "MXN";

/// Main entry point for the portfolio core library.
/// Holds the ledger state and all services needed to operate on it.
#[must_use]
pub struct PortfolioTracker {
    ledger: Ledger,
    ledger_service: LedgerService,
    price_service: PriceService,
    position_service: PositionService,
    history_service: HistoryService,
    diversification_service: DiversificationService,
    dividend_service: DividendService,
    classifier: Box<dyn Classifier>,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("transactions", &self.ledger.transactions.len())
            .field("dividends", &self.ledger.dividends.len())
            .field("settings", &self.ledger.settings)
            .field("cached_prices", &self.ledger.price_cache.total_entries())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioTracker {
    /// Create a brand new empty ledger with default settings and the
    /// Swensen-for-Mexico target allocation.
    pub fn create_new() -> Self {
        let ledger = Ledger::default();
        Self::build(ledger)
    }

    /// Load an existing ledger from snapshot bytes.
    /// Use this when the caller handles file I/O itself.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, CoreError> {
        let ledger = StorageManager::load_from_bytes(data)?;
        Ok(Self::build(ledger))
    }

    /// Save the current ledger to snapshot bytes.
    /// Returns raw bytes that the caller can write to a file.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.ledger)?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Load from a snapshot file on disk.
    pub fn load_from_file(path: &str) -> Result<Self, CoreError> {
        let ledger = StorageManager::load_from_file(path)?;
        Ok(Self::build(ledger))
    }

    /// Save to a snapshot file on disk.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_file(&mut self, path: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.ledger, path)?;
        self.dirty = false;
        Ok(())
    }

    // ── Transaction Management ──────────────────────────────────────

    /// Add a buy/sell transaction to the ledger.
    ///
    /// Validates quantity/price/date and, for sells, that the ticker holds
    /// enough units to cover the sale. A missing asset class is filled in
    /// from the classification rules before the transaction lands.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<uuid::Uuid, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let id = self.ledger_service.add_transaction(
            &mut self.ledger,
            self.classifier.as_ref(),
            transaction,
            today,
        )?;
        self.dirty = true;
        Ok(id)
    }

    /// Add multiple transactions at once. All are validated first against a
    /// temporary copy of the ledger; if any fails, none are added
    /// (all-or-nothing). Returns the IDs of all added transactions.
    pub fn add_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<uuid::Uuid>, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let mut temp_ledger = self.ledger.clone();
        let mut ids = Vec::with_capacity(transactions.len());

        for transaction in transactions {
            let id = self.ledger_service.add_transaction(
                &mut temp_ledger,
                self.classifier.as_ref(),
                transaction,
                today,
            )?;
            ids.push(id);
        }

        self.ledger = temp_ledger;
        self.dirty = true;
        Ok(ids)
    }

    /// Remove a transaction by its ID.
    /// Validates that removal doesn't leave any later sell uncovered.
    pub fn remove_transaction(&mut self, transaction_id: uuid::Uuid) -> Result<(), CoreError> {
        self.ledger_service
            .remove_transaction(&mut self.ledger, transaction_id)?;
        self.dirty = true;
        Ok(())
    }

    /// Replace an existing transaction by its ID (corrective edit).
    /// Validates the replacement before committing; the ID survives the edit.
    pub fn update_transaction(
        &mut self,
        transaction_id: uuid::Uuid,
        updated: Transaction,
    ) -> Result<(), CoreError> {
        let today = chrono::Utc::now().date_naive();
        self.ledger_service.update_transaction(
            &mut self.ledger,
            self.classifier.as_ref(),
            transaction_id,
            updated,
            today,
        )?;
        self.dirty = true;
        Ok(())
    }

    /// Set or clear notes on an existing transaction.
    pub fn set_transaction_notes(
        &mut self,
        transaction_id: uuid::Uuid,
        notes: Option<String>,
    ) -> Result<(), CoreError> {
        self.ledger_service
            .set_notes(&mut self.ledger, transaction_id, notes)?;
        self.dirty = true;
        Ok(())
    }

    /// Get a single transaction by its ID.
    #[must_use]
    pub fn get_transaction(&self, transaction_id: uuid::Uuid) -> Option<&Transaction> {
        self.ledger
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
    }

    /// Get all transactions, newest first.
    #[must_use]
    pub fn get_transactions(&self) -> Vec<&Transaction> {
        self.ledger_service.get_transactions(&self.ledger)
    }

    /// Get transactions filtered by ticker (case-insensitive).
    /// Returns newest-first, consistent with `get_transactions()`.
    #[must_use]
    pub fn get_transactions_for_ticker(&self, ticker: &str) -> Vec<&Transaction> {
        let upper = ticker.to_uppercase();
        let mut transactions: Vec<&Transaction> = self
            .ledger
            .transactions
            .iter()
            .filter(|t| t.ticker == upper)
            .collect();
        transactions.reverse(); // internal storage is oldest-first; reverse for newest-first
        transactions
    }

    /// Get the total number of transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.ledger.transactions.len()
    }

    /// Get the date of the earliest transaction in the ledger.
    #[must_use]
    pub fn earliest_transaction_date(&self) -> Option<NaiveDate> {
        self.ledger.transactions.first().map(|t| t.date)
    }

    /// Get the date of the most recent transaction in the ledger.
    #[must_use]
    pub fn latest_transaction_date(&self) -> Option<NaiveDate> {
        self.ledger.transactions.last().map(|t| t.date)
    }

    // ── Holdings ────────────────────────────────────────────────────

    /// Net units held per ticker as of a given date (buys minus sells,
    /// tickers at effectively zero dropped).
    #[must_use]
    pub fn get_holdings(&self, date: NaiveDate) -> HashMap<String, Decimal> {
        self.ledger_service.get_holdings(&self.ledger, date)
    }

    /// Net units held per ticker as of today.
    #[must_use]
    pub fn get_current_holdings(&self) -> HashMap<String, Decimal> {
        let today = chrono::Utc::now().date_naive();
        self.ledger_service.get_holdings(&self.ledger, today)
    }

    // ── Positions & Valuation ───────────────────────────────────────

    /// Build the full position report: every open ticker with cost basis,
    /// live MXN price, unrealized/realized gains and portfolio weight,
    /// plus portfolio totals.
    ///
    /// Tickers whose price lookup fails stay in the report with `None`
    /// market fields; they never abort the computation.
    pub async fn list_positions(&mut self) -> Result<PositionReport, CoreError> {
        let now = chrono::Utc::now();

        // Temporarily take price_cache out of the ledger to satisfy the
        // borrow checker: build_report needs &Ledger (immutable) and
        // &mut PriceCache (mutable), and the cache lives inside the ledger.
        let mut price_cache = std::mem::take(&mut self.ledger.price_cache);

        let result = self
            .position_service
            .build_report(
                &self.ledger,
                &mut self.price_service,
                &mut price_cache,
                now,
            )
            .await;

        // Put the (now updated) cache back
        self.ledger.price_cache = price_cache;

        result
    }

    /// Generate the historical portfolio value series for a range.
    /// The last point is always dated today and priced live.
    pub async fn portfolio_history(
        &mut self,
        range: HistoryRange,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let now = chrono::Utc::now();

        let mut price_cache = std::mem::take(&mut self.ledger.price_cache);

        let result = self
            .history_service
            .generate(
                &self.ledger,
                &mut self.price_service,
                &mut price_cache,
                range,
                now,
            )
            .await;

        self.ledger.price_cache = price_cache;

        result
    }

    /// Force-refresh current prices for all held tickers from the APIs,
    /// bypassing the same-day freshness marks and the quote cache.
    /// Stops at the first provider failure.
    pub async fn refresh_prices(&mut self) -> Result<(), CoreError> {
        let now = chrono::Utc::now();
        let today = now.date_naive();
        let holdings = self.ledger_service.get_holdings(&self.ledger, today);

        // Each ticker's market comes from the ledger; the ledger is
        // date-sorted, so the newest entry wins.
        let mut markets: HashMap<String, Market> = HashMap::new();
        for txn in &self.ledger.transactions {
            markets.insert(txn.ticker.clone(), txn.market);
        }

        self.price_service.clear_quotes();
        self.ledger.price_cache.clear_freshness();

        let mut price_cache = std::mem::take(&mut self.ledger.price_cache);
        let mut outcome = Ok(());

        for ticker in holdings.keys() {
            if let Some(market) = markets.get(ticker).copied() {
                if let Err(e) = self
                    .price_service
                    .current_price_mxn(&mut price_cache, ticker, market, now)
                    .await
                {
                    outcome = Err(e);
                    break;
                }
            }
        }

        self.ledger.price_cache = price_cache;
        outcome
    }

    // ── Diversification & Rebalancing ───────────────────────────────

    /// Classify any transactions still missing an asset class, using the
    /// static rules table. Returns how many were backfilled.
    ///
    /// Idempotent: already-classified transactions are never touched.
    pub fn classify_holdings(&mut self) -> usize {
        let updated = self
            .diversification_service
            .classify_or_backfill(&mut self.ledger, self.classifier.as_ref());
        if updated > 0 {
            self.dirty = true;
        }
        updated
    }

    /// Current vs. target allocation across all asset classes.
    /// Backfills missing classifications first, then prices the portfolio.
    pub async fn allocation_breakdown(&mut self) -> Result<AllocationBreakdown, CoreError> {
        self.classify_holdings();
        let report = self.list_positions().await?;
        Ok(self
            .diversification_service
            .allocation_breakdown(&report, &self.ledger.targets))
    }

    /// Rebalancing actions for classes further off target than the
    /// configured threshold, sorted worst-first.
    pub async fn rebalancing_recommendations(
        &mut self,
    ) -> Result<Vec<RebalanceRecommendation>, CoreError> {
        let threshold = self.ledger.settings.rebalance_threshold;
        let breakdown = self.allocation_breakdown().await?;
        Ok(self
            .diversification_service
            .rebalancing_recommendations(&breakdown, threshold))
    }

    /// How to split a new lump-sum investment so the resulting portfolio
    /// moves toward the target allocation. Suggested amounts sum exactly
    /// to `amount`.
    pub async fn investment_allocation(
        &mut self,
        amount: Decimal,
    ) -> Result<Vec<InvestmentSuggestion>, CoreError> {
        let breakdown = self.allocation_breakdown().await?;
        self.diversification_service
            .investment_allocation(&breakdown, amount)
    }

    /// Get the configured target allocation.
    #[must_use]
    pub fn get_targets(&self) -> &TargetAllocation {
        &self.ledger.targets
    }

    /// Replace the target allocation. Entries must be non-negative and
    /// sum to exactly 100.
    pub fn set_targets(&mut self, targets: TargetAllocation) -> Result<(), CoreError> {
        self.diversification_service
            .set_targets(&mut self.ledger, targets)?;
        self.dirty = true;
        Ok(())
    }

    // ── Dividends ───────────────────────────────────────────────────

    /// Record an income payment (dividend, interest, capital return).
    /// A future payment date means "announced, pending".
    pub fn add_dividend(&mut self, dividend: DividendRecord) -> Result<uuid::Uuid, CoreError> {
        let id = self.dividend_service.add_dividend(&mut self.ledger, dividend)?;
        self.dirty = true;
        Ok(id)
    }

    /// Remove an income record by its ID.
    pub fn remove_dividend(&mut self, dividend_id: uuid::Uuid) -> Result<(), CoreError> {
        self.dividend_service
            .remove_dividend(&mut self.ledger, dividend_id)?;
        self.dirty = true;
        Ok(())
    }

    /// Replace an existing income record by its ID (corrective edit).
    pub fn update_dividend(
        &mut self,
        dividend_id: uuid::Uuid,
        updated: DividendRecord,
    ) -> Result<(), CoreError> {
        self.dividend_service
            .update_dividend(&mut self.ledger, dividend_id, updated)?;
        self.dirty = true;
        Ok(())
    }

    /// Get a single income record by its ID.
    #[must_use]
    pub fn get_dividend(&self, dividend_id: uuid::Uuid) -> Option<&DividendRecord> {
        self.ledger.dividends.iter().find(|d| d.id == dividend_id)
    }

    /// Get all income records, newest first.
    #[must_use]
    pub fn get_dividends(&self) -> Vec<&DividendRecord> {
        self.dividend_service.get_dividends(&self.ledger)
    }

    /// Annual income summary with per-kind/month/ticker breakdowns and the
    /// dividend yield against the current portfolio value.
    ///
    /// When the portfolio can't be priced the yield reports as 0 and the
    /// rest of the summary still comes back.
    pub async fn dividend_summary(&mut self, year: i32) -> DividendSummary {
        let today = chrono::Utc::now().date_naive();

        let portfolio_value = match self.list_positions().await {
            Ok(report) => Some(report.totals.current_value),
            Err(e) => {
                log::warn!("portfolio value unavailable for dividend yield: {e}");
                None
            }
        };

        self.dividend_service
            .summary(&self.ledger, year, portfolio_value, today)
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Get current settings.
    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.ledger.settings
    }

    /// Set the minimum deviation (percentage points) that triggers a
    /// rebalancing recommendation.
    pub fn set_rebalance_threshold(&mut self, threshold: Decimal) -> Result<(), CoreError> {
        if threshold <= Decimal::ZERO || threshold >= Decimal::ONE_HUNDRED {
            return Err(CoreError::ValidationError(format!(
                "Rebalance threshold must be between 0 and 100, got {threshold}"
            )));
        }
        self.ledger.settings.rebalance_threshold = threshold;
        self.dirty = true;
        Ok(())
    }

    /// Set an API key for a provider (e.g., "cryptocompare").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.ledger.settings.api_keys.insert(provider, key);

        // Rebuild registry with updated API keys
        let registry = PriceProviderRegistry::new_with_defaults(&self.ledger.settings.api_keys);
        self.price_service = PriceService::new(registry);
        self.dirty = true;
    }

    /// Remove an API key for a provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.ledger.settings.api_keys.remove(provider).is_some();
        if removed {
            let registry = PriceProviderRegistry::new_with_defaults(&self.ledger.settings.api_keys);
            self.price_service = PriceService::new(registry);
            self.dirty = true;
        }
        removed
    }

    /// Returns `true` if the ledger has been modified since the last save
    /// or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Cache Management ────────────────────────────────────────────

    /// Get the total number of cached price points.
    #[must_use]
    pub fn cache_total_entries(&self) -> usize {
        self.ledger.price_cache.total_entries()
    }

    /// Get the number of distinct tickers with cached prices.
    #[must_use]
    pub fn cache_ticker_count(&self) -> usize {
        self.ledger.price_cache.ticker_count()
    }

    /// Clear all cached price data, durable and in-memory.
    pub fn cache_clear(&mut self) {
        self.ledger.price_cache.clear();
        self.price_service.clear_quotes();
        self.dirty = true;
    }

    /// Get a specific cached MXN price.
    #[must_use]
    pub fn get_cached_price(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        self.ledger.price_cache.get_price(ticker, date)
    }

    /// Manually insert a price into the cache (useful for offline use or
    /// historical import).
    pub fn set_cached_price(&mut self, ticker: &str, date: NaiveDate, price: Decimal) {
        self.ledger.price_cache.set_price(ticker, date, price);
        self.dirty = true;
    }

    // ── Provider Availability ───────────────────────────────────────

    /// Check if at least one price provider is available for a category.
    #[must_use]
    pub fn is_provider_available(&self, category: AssetCategory) -> bool {
        self.price_service.has_provider_for(category)
    }

    /// Get the names of available providers for a category.
    #[must_use]
    pub fn get_provider_names(&self, category: AssetCategory) -> Vec<String> {
        self.price_service.get_provider_names(category)
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all transactions as a JSON string.
    pub fn export_transactions_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.ledger.transactions).map_err(|e| {
            CoreError::Serialization(format!("Failed to serialize transactions to JSON: {e}"))
        })
    }

    /// Import transactions from a JSON string. Each one is validated;
    /// all-or-nothing. Returns the number of transactions imported.
    pub fn import_transactions_from_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let transactions: Vec<Transaction> = serde_json::from_str(json)?;
        let count = transactions.len();
        self.add_transactions(transactions)?;
        Ok(count)
    }

    /// Export the full ledger as JSON (plain snapshot for debugging/display).
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(ledger: Ledger) -> Self {
        let registry = PriceProviderRegistry::new_with_defaults(&ledger.settings.api_keys);
        let price_service = PriceService::new(registry);

        Self {
            ledger,
            ledger_service: LedgerService::new(),
            price_service,
            position_service: PositionService::new(),
            history_service: HistoryService::new(),
            diversification_service: DiversificationService::new(),
            dividend_service: DividendService::new(),
            classifier: Box::new(RulesClassifier::new()),
            dirty: false,
        }
    }
}
