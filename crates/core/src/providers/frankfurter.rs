use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{decimal_price, PriceProvider};
use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries, Quote};
use crate::models::transaction::AssetCategory;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter provider for fiat exchange rates into MXN.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Endpoints**: `/latest`, `/{date}`, `/{start}..{end}`
///
/// The "symbol" here is a currency code (e.g., "USD") and the quote is
/// how many MXN one unit of it buys. ECB publishes business days only,
/// so weekend dates resolve to the nearest prior rate upstream.
pub struct FrankfurterProvider {
    client: Client,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(15));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    rates: HashMap<String, HashMap<String, f64>>,
}

#[async_trait]
impl PriceProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    fn supported_categories(&self) -> Vec<AssetCategory> {
        vec![AssetCategory::Fiat]
    }

    async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let base = symbol.to_uppercase();

        // MXN in MXN is always 1
        if base == "MXN" {
            return Ok(Quote {
                price: dec!(1),
                currency: "MXN".to_string(),
            });
        }

        let url = format!("{BASE_URL}/latest?base={base}&symbols=MXN");

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse response for {base}/MXN: {e}"),
            })?;

        let rate = resp.rates.get("MXN").copied().ok_or_else(|| CoreError::Api {
            provider: "Frankfurter".into(),
            message: format!("No rate found for {base} → MXN"),
        })?;

        Ok(Quote {
            price: decimal_price(rate, "Frankfurter", &base)?,
            currency: "MXN".to_string(),
        })
    }

    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Quote, CoreError> {
        let base = symbol.to_uppercase();

        if base == "MXN" {
            return Ok(Quote {
                price: dec!(1),
                currency: "MXN".to_string(),
            });
        }

        let date_str = date.format("%Y-%m-%d");
        let url = format!("{BASE_URL}/{date_str}?base={base}&symbols=MXN");

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse historical rate for {base}/MXN on {date}: {e}"),
            })?;

        let rate = resp
            .rates
            .get("MXN")
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                ticker: base.clone(),
                date: date.to_string(),
            })?;

        Ok(Quote {
            price: decimal_price(rate, "Frankfurter", &base)?,
            currency: "MXN".to_string(),
        })
    }

    async fn price_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        let base = symbol.to_uppercase();

        if base == "MXN" {
            // Constant 1.0 for every day in the range
            let mut points = Vec::new();
            let mut d = from;
            while d <= to {
                points.push(PricePoint {
                    date: d,
                    price: dec!(1),
                });
                match d.succ_opt() {
                    Some(next) => d = next,
                    None => break,
                }
            }
            return Ok(PriceSeries {
                currency: "MXN".to_string(),
                points,
            });
        }

        let from_str = from.format("%Y-%m-%d");
        let to_str = to.format("%Y-%m-%d");
        let url = format!("{BASE_URL}/{from_str}..{to_str}?base={base}&symbols=MXN");

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse time series for {base}/MXN: {e}"),
            })?;

        let mut points = Vec::with_capacity(resp.rates.len());
        for (date_str, rates) in &resp.rates {
            let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
                continue;
            };
            let Some(rate) = rates.get("MXN") else {
                continue;
            };
            points.push(PricePoint {
                date,
                price: decimal_price(*rate, "Frankfurter", &base)?,
            });
        }
        points.sort_by_key(|p| p.date);

        Ok(PriceSeries {
            currency: "MXN".to_string(),
            points,
        })
    }
}
