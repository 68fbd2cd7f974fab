use serde::{Deserialize, Serialize};

use super::allocation::TargetAllocation;
use super::dividend::DividendRecord;
use super::price::PriceCache;
use super::settings::Settings;
use super::transaction::Transaction;

/// The main data container. Everything in here gets serialized and saved
/// to the portable snapshot file.
///
/// The transaction list is the single source of truth: positions, history
/// and allocations are always recomputed from it, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// All buy/sell transactions, sorted ascending by trade date
    pub transactions: Vec<Transaction>,

    /// Income payments received or announced
    #[serde(default)]
    pub dividends: Vec<DividendRecord>,

    /// Target allocation the portfolio is compared against
    #[serde(default)]
    pub targets: TargetAllocation,

    /// User settings (API keys, rebalance threshold)
    pub settings: Settings,

    /// Cached price data — historical prices saved for offline use
    pub price_cache: PriceCache,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            dividends: Vec::new(),
            targets: TargetAllocation::swensen_mx(),
            settings: Settings::default(),
            price_cache: PriceCache::new(),
        }
    }
}
