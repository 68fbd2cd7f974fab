use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{decimal_price, PriceProvider};
use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries, Quote};
use crate::models::transaction::AssetCategory;

const BASE_URL: &str = "https://min-api.cryptocompare.com/data";

/// Maximum points per histoday call; longer spans use `allData` instead.
const HISTODAY_LIMIT: i64 = 2000;

/// CryptoCompare provider for cryptocurrency prices.
///
/// - **Free tier**: works without a key; a free API key raises the limits.
/// - **Quotes directly in MXN** (`tsyms=MXN`), so no FX conversion step.
/// - **Endpoints**: `/price`, `/pricehistorical`, `/v2/histoday`
///
/// Error payloads come back with HTTP 200 and a `Response: "Error"` body,
/// so responses are inspected, not just status-checked.
pub struct CryptoCompareProvider {
    client: Client,
    api_key: Option<String>,
}

impl CryptoCompareProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(15));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    fn append_key(&self, url: &mut String) {
        if let Some(key) = &self.api_key {
            url.push_str("&api_key=");
            url.push_str(key);
        }
    }

    fn api_error(symbol: &str, message: impl std::fmt::Display) -> CoreError {
        CoreError::Api {
            provider: "CryptoCompare".into(),
            message: format!("{symbol}: {message}"),
        }
    }
}

impl Default for CryptoCompareProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

// ── CryptoCompare API response types ────────────────────────────────

#[derive(Deserialize)]
struct HistoDayResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data")]
    data: Option<HistoDayData>,
}

#[derive(Deserialize)]
struct HistoDayData {
    #[serde(rename = "Data")]
    data: Vec<HistoDayPoint>,
}

#[derive(Deserialize)]
struct HistoDayPoint {
    time: i64, // unix timestamp in seconds
    close: f64,
}

#[async_trait]
impl PriceProvider for CryptoCompareProvider {
    fn name(&self) -> &str {
        "CryptoCompare"
    }

    fn supported_categories(&self) -> Vec<AssetCategory> {
        vec![AssetCategory::Crypto]
    }

    async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let sym = symbol.to_uppercase();
        let mut url = format!("{BASE_URL}/price?fsym={sym}&tsyms=MXN");
        self.append_key(&mut url);

        // Success shape is a flat currency map: {"MXN": 1234.5}.
        // Error shape replaces it with {"Response": "Error", "Message": ...}.
        let resp: HashMap<String, serde_json::Value> = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Self::api_error(&sym, format!("Failed to parse price response: {e}")))?;

        match resp.get("MXN").and_then(|v| v.as_f64()) {
            Some(price) => Ok(Quote {
                price: decimal_price(price, "CryptoCompare", &sym)?,
                currency: "MXN".to_string(),
            }),
            None => {
                let message = resp
                    .get("Message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("No MXN price in response");
                Err(Self::api_error(&sym, message))
            }
        }
    }

    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Quote, CoreError> {
        let sym = symbol.to_uppercase();
        let ts = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Self::api_error(&sym, format!("Invalid date {date}")))?
            .and_utc()
            .timestamp();

        let mut url = format!("{BASE_URL}/pricehistorical?fsym={sym}&tsyms=MXN&ts={ts}");
        self.append_key(&mut url);

        // Success shape: {"BTC": {"MXN": 1234.5}}
        let resp: HashMap<String, serde_json::Value> = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Self::api_error(&sym, format!("Failed to parse historical response: {e}")))?;

        let price = resp
            .get(&sym)
            .and_then(|v| v.get("MXN"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| CoreError::PriceNotAvailable {
                ticker: sym.clone(),
                date: date.to_string(),
            })?;

        Ok(Quote {
            price: decimal_price(price, "CryptoCompare", &sym)?,
            currency: "MXN".to_string(),
        })
    }

    async fn price_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        let sym = symbol.to_uppercase();
        let span_days = (to - from).num_days().max(0);

        let mut url = format!("{BASE_URL}/v2/histoday?fsym={sym}&tsym=MXN");
        if span_days > HISTODAY_LIMIT {
            url.push_str("&allData=true");
        } else {
            let to_ts = to
                .and_hms_opt(23, 59, 59)
                .ok_or_else(|| Self::api_error(&sym, format!("Invalid date {to}")))?
                .and_utc()
                .timestamp();
            url.push_str(&format!("&limit={span_days}&toTs={to_ts}"));
        }
        self.append_key(&mut url);

        let resp: HistoDayResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Self::api_error(&sym, format!("Failed to parse histoday response: {e}")))?;

        let data = match resp.data {
            Some(d) => d.data,
            None => {
                if resp.response.as_deref() == Some("Error") {
                    let message = resp.message.as_deref().unwrap_or("histoday request failed");
                    return Err(Self::api_error(&sym, message));
                }
                Vec::new()
            }
        };

        let mut points: Vec<PricePoint> = Vec::with_capacity(data.len());
        for p in &data {
            // histoday pads days before the asset listed with zero closes
            if p.close <= 0.0 {
                continue;
            }
            let Some(dt) = chrono::DateTime::from_timestamp(p.time, 0) else {
                continue;
            };
            let date = dt.date_naive();
            if date < from || date > to {
                continue;
            }
            points.push(PricePoint {
                date,
                price: decimal_price(p.close, "CryptoCompare", &sym)?,
            });
        }
        points.sort_by_key(|p| p.date);

        Ok(PriceSeries {
            currency: "MXN".to_string(),
            points,
        })
    }
}
