use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use super::traits::{decimal_price, PriceProvider};
use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries, Quote};
use crate::models::transaction::AssetCategory;

/// Yahoo Finance provider for equity and ETF prices.
///
/// - **Free**: No API key required.
/// - **Coverage**: BMV listings (symbols with a `.MX` suffix, quoted in
///   MXN) and US listings (quoted in USD).
/// - **Data**: Real-time quotes + full historical OHLCV.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's public
/// endpoints. The quote currency is inferred from the symbol suffix;
/// USD quotes are converted downstream by `PriceService`.
pub struct YahooProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Currency Yahoo quotes a symbol in: MXN for BMV listings, USD otherwise.
    fn quote_currency(symbol: &str) -> &'static str {
        if symbol.to_uppercase().ends_with(".MX") {
            "MXN"
        } else {
            "USD"
        }
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month: time::Month = match date.month() {
            1 => time::Month::January,
            2 => time::Month::February,
            3 => time::Month::March,
            4 => time::Month::April,
            5 => time::Month::May,
            6 => time::Month::June,
            7 => time::Month::July,
            8 => time::Month::August,
            9 => time::Month::September,
            10 => time::Month::October,
            11 => time::Month::November,
            12 => time::Month::December,
            _ => unreachable!(),
        };

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Invalid date {date}: {e}"),
            })?
            .with_hms(0, 0, 0)
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Invalid time for {date}: {e}"),
            })?
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn supported_categories(&self) -> Vec<AssetCategory> {
        vec![AssetCategory::Equity]
    }

    async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch latest quote for {symbol}: {e}"),
            })?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        Ok(Quote {
            price: decimal_price(quote.close, "Yahoo Finance", symbol)?,
            currency: Self::quote_currency(symbol).to_string(),
        })
    }

    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Quote, CoreError> {
        let start = Self::to_offset_datetime(date)?;
        // Fetch a 3-day window to handle weekends/holidays
        let end_date = date + chrono::Duration::days(3);
        let end = Self::to_offset_datetime(end_date)?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch history for {symbol} on {date}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        // Closest quote to the requested date wins
        let target_ts = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Invalid date {date}"),
            })?
            .and_utc()
            .timestamp();

        let quote = quotes
            .iter()
            .min_by_key(|q| (q.timestamp - target_ts).unsigned_abs())
            .ok_or_else(|| CoreError::PriceNotAvailable {
                ticker: symbol.to_string(),
                date: date.to_string(),
            })?;

        Ok(Quote {
            price: decimal_price(quote.close, "Yahoo Finance", symbol)?,
            currency: Self::quote_currency(symbol).to_string(),
        })
    }

    async fn price_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch history range for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = Vec::with_capacity(quotes.len());
        for q in &quotes {
            let Some(date) = Self::timestamp_to_naive_date(q.timestamp) else {
                continue;
            };
            if date < from || date > to {
                continue;
            }
            points.push(PricePoint {
                date,
                price: decimal_price(q.close, "Yahoo Finance", symbol)?,
            });
        }
        points.sort_by_key(|p| p.date);

        Ok(PriceSeries {
            currency: Self::quote_currency(symbol).to_string(),
            points,
        })
    }
}
