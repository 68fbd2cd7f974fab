use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::price::{PriceCache, PricePoint, Quote};
use crate::models::transaction::AssetCategory;
use crate::providers::registry::PriceProviderRegistry;
use crate::REFERENCE_CURRENCY;

/// The ECB publishes no weekend or holiday fixings; the latest cached rate
/// within this many days back stands in when a fetch fails.
const RATE_LOOKBACK_DAYS: i64 = 7;

/// Converts foreign-currency amounts into MXN.
///
/// Rates ride in the regular price cache under a synthetic key like
/// `USD/MXN` (the slash keeps them clear of real tickers), so historical
/// rates are fetched once and persist with the rest of the cache.
pub struct FxService;

impl FxService {
    pub fn new() -> Self {
        Self
    }

    fn cache_key(currency: &str) -> String {
        format!("{currency}/{REFERENCE_CURRENCY}")
    }

    /// Current MXN per one unit of `currency`.
    pub async fn rate_to_mxn(
        &self,
        registry: &PriceProviderRegistry,
        cache: &mut PriceCache,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CoreError> {
        let currency = currency.to_uppercase();
        if currency == REFERENCE_CURRENCY {
            return Ok(Decimal::ONE);
        }

        let today = now.date_naive();
        let key = Self::cache_key(&currency);

        if cache.is_today_fresh(&key, today) {
            if let Some(rate) = cache.get_price(&key, today) {
                return Ok(rate);
            }
        }

        let quote = self.fetch(registry, &currency, None).await?;
        cache.set_price(&key, today, quote.price);
        cache.mark_updated_today(&key, today);
        Ok(quote.price)
    }

    /// MXN per one unit of `currency` on a past date.
    ///
    /// Frankfurter resolves weekends and holidays to the closest preceding
    /// fixing server-side; if the fetch itself fails, a cached fixing from
    /// the previous few days stands in before the error propagates.
    pub async fn rate_to_mxn_on(
        &self,
        registry: &PriceProviderRegistry,
        cache: &mut PriceCache,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal, CoreError> {
        let currency = currency.to_uppercase();
        if currency == REFERENCE_CURRENCY {
            return Ok(Decimal::ONE);
        }

        let key = Self::cache_key(&currency);
        if let Some(rate) = cache.get_price(&key, date) {
            return Ok(rate);
        }

        match self.fetch(registry, &currency, Some(date)).await {
            Ok(quote) => {
                cache.set_price(&key, date, quote.price);
                Ok(quote.price)
            }
            Err(e) => {
                if let Some(point) = cache.get_price_on_or_before(&key, date, RATE_LOOKBACK_DAYS) {
                    log::warn!("using cached {key} rate from {} for {date}: {e}", point.date);
                    return Ok(point.price);
                }
                Err(e)
            }
        }
    }

    /// Daily MXN rates for `currency` over `[from, to]`, ascending.
    ///
    /// Only business days appear; callers walk back to the nearest earlier
    /// fixing for the gaps. Returns an empty series for MXN itself.
    pub async fn rate_series_to_mxn(
        &self,
        registry: &PriceProviderRegistry,
        cache: &mut PriceCache,
        currency: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let currency = currency.to_uppercase();
        if currency == REFERENCE_CURRENCY {
            return Ok(Vec::new());
        }

        let key = Self::cache_key(&currency);

        // Use the cache when it already spans the requested range (3-day
        // tolerance at each end for weekends/holidays)
        let cached = cache.get_price_range(&key, from, to);
        if cached.len() >= 2 {
            if let (Some(first), Some(last)) = (cached.first(), cached.last()) {
                if (first.date - from).num_days().abs() <= 3
                    && (to - last.date).num_days().abs() <= 3
                {
                    return Ok(cached);
                }
            }
        }

        let providers = registry.get_providers_for(AssetCategory::Fiat);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(AssetCategory::Fiat.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.price_series(&currency, from, to).await {
                Ok(series) => {
                    cache.set_prices(&key, &series.points);
                    return Ok(series.points);
                }
                Err(e) => {
                    last_error = Some(e);
                    // Try next provider
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(AssetCategory::Fiat.to_string())))
    }

    /// Fetch a single rate, current (`date == None`) or historical, trying
    /// providers in registration order.
    async fn fetch(
        &self,
        registry: &PriceProviderRegistry,
        currency: &str,
        date: Option<NaiveDate>,
    ) -> Result<Quote, CoreError> {
        let providers = registry.get_providers_for(AssetCategory::Fiat);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(AssetCategory::Fiat.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            let result = match date {
                Some(d) => provider.historical_price(currency, d).await,
                None => provider.current_price(currency).await,
            };

            match result {
                Ok(quote) => {
                    if quote.price <= Decimal::ZERO {
                        last_error = Some(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!(
                                "Non-positive rate returned for {currency}: {}",
                                quote.price
                            ),
                        });
                        continue;
                    }
                    return Ok(quote);
                }
                Err(e) => {
                    last_error = Some(e);
                    // Try next provider
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(AssetCategory::Fiat.to_string())))
    }
}

impl Default for FxService {
    fn default() -> Self {
        Self::new()
    }
}
