use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::allocation::AssetClass;

/// Type of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Buying / acquiring an instrument
    Buy,
    /// Selling / disposing of an instrument
    Sell,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "Buy"),
            TransactionKind::Sell => write!(f, "Sell"),
        }
    }
}

/// The market an instrument trades on. Determines the price provider,
/// the provider-side symbol and the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// Bolsa Mexicana de Valores — Yahoo quotes with a `.MX` suffix, in MXN
    Mx,
    /// US exchanges (NYSE/NASDAQ) — Yahoo quotes, in USD
    Us,
    /// Cryptocurrencies — CryptoCompare quotes, requested directly in MXN
    Crypto,
}

impl Market {
    /// Parse the identifiers used in imports and API payloads ("MX", "US", "CRYPTO").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MX" => Some(Market::Mx),
            "US" => Some(Market::Us),
            "CRYPTO" => Some(Market::Crypto),
            _ => None,
        }
    }

    /// Broad category used for provider routing.
    pub fn category(&self) -> AssetCategory {
        match self {
            Market::Mx | Market::Us => AssetCategory::Equity,
            Market::Crypto => AssetCategory::Crypto,
        }
    }

    /// The symbol to send to the market's quote provider.
    ///
    /// Mexican listings need the `.MX` suffix on Yahoo; tickers that already
    /// carry it are passed through unchanged.
    pub fn provider_symbol(&self, ticker: &str) -> String {
        match self {
            Market::Mx if !ticker.ends_with(".MX") => format!("{ticker}.MX"),
            _ => ticker.to_string(),
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Mx => write!(f, "MX"),
            Market::Us => write!(f, "US"),
            Market::Crypto => write!(f, "CRYPTO"),
        }
    }
}

/// Instrument category — determines which API provider can quote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Listed equities and ETFs — Yahoo Finance
    Equity,
    /// Cryptocurrencies — CryptoCompare
    Crypto,
    /// Fiat currencies (FX rates) — Frankfurter
    Fiat,
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetCategory::Equity => write!(f, "Equity"),
            AssetCategory::Crypto => write!(f, "Crypto"),
            AssetCategory::Fiat => write!(f, "Fiat"),
        }
    }
}

/// A single buy/sell transaction in the ledger.
///
/// Prices are unit prices in MXN as executed, so the ledger is
/// self-contained: cost basis and realized P/L never need a network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: Uuid,

    /// Ticker symbol, uppercased (e.g., "NAFTRAC", "VOO", "BTC")
    pub ticker: String,

    /// Market the instrument trades on
    pub market: Market,

    /// Buy or Sell
    pub kind: TransactionKind,

    /// Trade date (no time component — daily granularity)
    pub date: NaiveDate,

    /// Executed unit price in MXN (always positive)
    pub unit_price: Decimal,

    /// Number of units (always positive; fractional for crypto)
    pub quantity: Decimal,

    /// Broker / institution holding the position (e.g., "GBM", "Bitso")
    #[serde(default)]
    pub custodian: Option<String>,

    /// Commission paid, in MXN. Informational; not part of cost basis.
    #[serde(default)]
    pub commission: Decimal,

    /// Asset class for diversification analysis. `None` until classified.
    #[serde(default)]
    pub asset_class: Option<AssetClass>,

    /// Optional free-text notes (e.g., reason, memo)
    #[serde(default)]
    pub notes: Option<String>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        ticker: impl Into<String>,
        market: Market,
        date: NaiveDate,
        unit_price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into().to_uppercase(),
            market,
            kind,
            date,
            unit_price,
            quantity,
            custodian: None,
            commission: Decimal::ZERO,
            asset_class: None,
            notes: None,
        }
    }

    pub fn with_custodian(mut self, custodian: impl Into<String>) -> Self {
        self.custodian = Some(custodian.into());
        self
    }

    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_asset_class(mut self, asset_class: AssetClass) -> Self {
        self.asset_class = Some(asset_class);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Cash moved by this transaction: `unit_price × quantity`, in MXN.
    pub fn gross_amount(&self) -> Decimal {
        self.unit_price * self.quantity
    }
}
