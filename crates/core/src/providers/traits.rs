use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::price::{PriceSeries, Quote};
use crate::models::transaction::AssetCategory;

/// Trait abstraction for all price data providers.
///
/// Each API (Yahoo Finance, CryptoCompare, Frankfurter) implements this
/// trait. If an API stops working or changes, we replace only that one
/// implementation — the rest of the codebase is untouched.
///
/// Symbols arrive provider-ready (e.g., Mexican listings already carry
/// their `.MX` suffix). Quotes come back in whatever currency the
/// provider natively serves; `PriceService` normalizes to MXN.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Which asset categories this provider can handle.
    fn supported_categories(&self) -> Vec<AssetCategory>;

    /// Get the current (latest) price of an instrument.
    async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// Get the price of an instrument on a specific past date.
    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Quote, CoreError>;

    /// Get prices for a date range (for valuation history).
    /// Points are sorted ascending by date.
    async fn price_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError>;
}

/// Convert a raw f64 price from an API into a `Decimal`.
/// Rejects NaN/infinite values, which some APIs emit on bad symbols.
pub(crate) fn decimal_price(value: f64, provider: &str, symbol: &str) -> Result<Decimal, CoreError> {
    Decimal::from_f64(value).ok_or_else(|| CoreError::Api {
        provider: provider.to_string(),
        message: format!("Non-finite price returned for {symbol}: {value}"),
    })
}
