use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::AssetClass;
use super::transaction::Market;

/// The net current holding in one ticker, derived from its transaction
/// history plus a live price lookup.
///
/// Price-dependent fields are `None` when no provider could quote the
/// ticker; the position still reports quantity, cost basis and realized
/// gain, which need no market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Ticker symbol, uppercased
    pub ticker: String,

    /// Market the instrument trades on
    pub market: Market,

    /// Diversification class, if classified
    pub asset_class: Option<AssetClass>,

    /// Units still held (bought minus sold; always > 0 here)
    pub open_quantity: Decimal,

    /// Blended average purchase price per unit, in MXN
    pub avg_buy_price: Decimal,

    /// Cost basis of the open quantity, in MXN
    pub cost_basis: Decimal,

    /// Latest market price per unit, in MXN
    pub current_price: Option<Decimal>,

    /// `open_quantity × current_price`, in MXN
    pub current_value: Option<Decimal>,

    /// `current_value - cost_basis`, in MXN
    pub unrealized_gain: Option<Decimal>,

    /// `unrealized_gain / cost_basis × 100` (0 when cost basis is 0)
    pub unrealized_gain_pct: Option<Decimal>,

    /// Profit locked in by past sells of this ticker, in MXN
    pub realized_gain: Decimal,

    /// Share of total priced portfolio value; `None` for unpriced positions
    pub weight_pct: Option<Decimal>,
}

/// Portfolio-level aggregates across all positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioTotals {
    /// Σ cost basis over open positions (priced or not), in MXN
    pub invested: Decimal,

    /// Σ current value over positions with a known price, in MXN
    pub current_value: Decimal,

    /// Σ unrealized gain over positions with a known price, in MXN
    pub unrealized_gain: Decimal,

    /// Σ realized gain over every ticker, including fully closed ones
    pub realized_gain: Decimal,

    /// `unrealized_gain + realized_gain`
    pub total_gain: Decimal,

    /// Number of open positions
    pub open_positions: usize,

    /// Open positions whose current price could not be resolved
    pub unpriced_positions: usize,
}

/// Full position listing: one entry per open ticker plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    /// Date this report was computed for
    pub as_of: NaiveDate,

    /// Open positions, descending by weight, unpriced last
    pub positions: Vec<Position>,

    pub totals: PortfolioTotals,
}
