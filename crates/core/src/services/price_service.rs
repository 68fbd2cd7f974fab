use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::price::{nearest_on_or_before, PriceCache, PricePoint, PriceSeries, Quote, QuoteCache};
use crate::models::transaction::{AssetCategory, Market};
use crate::providers::registry::PriceProviderRegistry;
use crate::services::fx_service::FxService;
use crate::REFERENCE_CURRENCY;

/// When joining a foreign price series with its rate series, a fixing up to
/// this many days earlier may stand in (US and ECB holidays differ).
const SERIES_RATE_LOOKBACK_DAYS: i64 = 7;

/// Fetches instrument prices from API providers and normalizes them to MXN.
///
/// Cache strategy:
/// - **Historical dates (< today)**: fetched once into the durable
///   `PriceCache`, never re-fetched. Past prices don't change.
/// - **Today's date**: refreshed at most once per day in the durable cache,
///   fronted by a 5-minute in-memory `QuoteCache` so bursts of valuations
///   share one lookup.
/// - Foreign quotes (US listings trade in USD) are converted on the way in;
///   everything cached and returned downstream is MXN.
pub struct PriceService {
    registry: PriceProviderRegistry,
    fx: FxService,
    quotes: QuoteCache,
}

impl PriceService {
    pub fn new(registry: PriceProviderRegistry) -> Self {
        Self {
            registry,
            fx: FxService::new(),
            quotes: QuoteCache::default(),
        }
    }

    /// Check if at least one provider is available for a given category.
    pub fn has_provider_for(&self, category: AssetCategory) -> bool {
        self.registry.get_provider_for(category).is_some()
    }

    /// Names of all providers available for a given category.
    pub fn get_provider_names(&self, category: AssetCategory) -> Vec<String> {
        self.registry
            .get_providers_for(category)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Drop in-memory quotes so the next current-price lookup refetches.
    pub fn clear_quotes(&mut self) {
        self.quotes.clear();
    }

    /// Current price of `ticker` in MXN.
    ///
    /// 1. Serve from the in-memory quote cache while its TTL holds.
    /// 2. Serve from the durable cache if already refreshed today.
    /// 3. Otherwise fetch, convert to MXN, and store in both caches.
    pub async fn current_price_mxn(
        &mut self,
        cache: &mut PriceCache,
        ticker: &str,
        market: Market,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CoreError> {
        if let Some(price) = self.quotes.get(ticker, now) {
            return Ok(price);
        }

        let today = now.date_naive();
        if cache.is_today_fresh(ticker, today) {
            if let Some(price) = cache.get_price(ticker, today) {
                self.quotes.put(ticker, price, now);
                return Ok(price);
            }
        }

        let symbol = market.provider_symbol(ticker);
        let quote = self.fetch(&symbol, market.category(), None).await?;
        let price = self.to_mxn(cache, quote, None, now).await?;

        cache.set_price(ticker, today, price);
        cache.mark_updated_today(ticker, today);
        self.quotes.put(ticker, price, now);
        Ok(price)
    }

    /// Price of `ticker` in MXN on a specific date.
    ///
    /// Historical dates are trusted from the cache forever; `date >= today`
    /// routes to the current-price path.
    pub async fn historical_price_mxn(
        &mut self,
        cache: &mut PriceCache,
        ticker: &str,
        market: Market,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CoreError> {
        let today = now.date_naive();
        if date >= today {
            return self.current_price_mxn(cache, ticker, market, now).await;
        }

        if let Some(price) = cache.get_price(ticker, date) {
            return Ok(price);
        }

        let symbol = market.provider_symbol(ticker);
        let quote = self.fetch(&symbol, market.category(), Some(date)).await?;
        let price = self.to_mxn(cache, quote, Some(date), now).await?;

        cache.set_price(ticker, date, price);
        Ok(price)
    }

    /// Daily MXN prices for `ticker` over `[from, to]`, ascending.
    ///
    /// Uses the cache when it already spans the range; otherwise fetches the
    /// full span once, converts to MXN, and caches every point.
    pub async fn historical_series_mxn(
        &self,
        cache: &mut PriceCache,
        ticker: &str,
        market: Market,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        // Checking first/last dates is more reliable than counting points,
        // since weekends/holidays produce fewer points than calendar days
        let cached = cache.get_price_range(ticker, from, to);
        if cached.len() >= 2 {
            if let (Some(first), Some(last)) = (cached.first(), cached.last()) {
                if (first.date - from).num_days().abs() <= 3
                    && (to - last.date).num_days().abs() <= 3
                {
                    return Ok(cached);
                }
            }
        }

        let category = market.category();
        let providers = self.registry.get_providers_for(category);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(category.to_string()));
        }

        let symbol = market.provider_symbol(ticker);
        let mut last_error = None;
        for provider in &providers {
            match provider.price_series(&symbol, from, to).await {
                Ok(series) => {
                    let points = self.series_to_mxn(cache, series, from, to).await?;
                    cache.set_prices(ticker, &points);
                    return Ok(points);
                }
                Err(e) => {
                    last_error = Some(e);
                    // Try next provider
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(category.to_string())))
    }

    /// Convert a provider-native quote to MXN, looking the rate up for
    /// `date` (or the current rate when `date` is `None`).
    async fn to_mxn(
        &self,
        cache: &mut PriceCache,
        quote: Quote,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CoreError> {
        if quote.currency == REFERENCE_CURRENCY {
            return Ok(quote.price);
        }

        let rate = match date {
            Some(d) => {
                self.fx
                    .rate_to_mxn_on(&self.registry, cache, &quote.currency, d)
                    .await?
            }
            None => {
                self.fx
                    .rate_to_mxn(&self.registry, cache, &quote.currency, now)
                    .await?
            }
        };
        Ok(quote.price * rate)
    }

    /// Convert a provider series to MXN by joining each point with the
    /// nearest rate fixing at or before its date.
    async fn series_to_mxn(
        &self,
        cache: &mut PriceCache,
        series: PriceSeries,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        if series.currency == REFERENCE_CURRENCY {
            return Ok(series.points);
        }

        // Pull the rate window a week early so the first points can look back
        let rates = self
            .fx
            .rate_series_to_mxn(
                &self.registry,
                cache,
                &series.currency,
                from - chrono::Duration::days(SERIES_RATE_LOOKBACK_DAYS),
                to,
            )
            .await?;

        let mut points = Vec::with_capacity(series.points.len());
        for point in series.points {
            match nearest_on_or_before(&rates, point.date, SERIES_RATE_LOOKBACK_DAYS) {
                Some(rate) => points.push(PricePoint {
                    date: point.date,
                    price: point.price * rate.price,
                }),
                None => {
                    log::warn!(
                        "no {}/{} rate within {} days of {}, dropping point",
                        series.currency,
                        REFERENCE_CURRENCY,
                        SERIES_RATE_LOOKBACK_DAYS,
                        point.date
                    );
                }
            }
        }
        Ok(points)
    }

    /// Fetch a single quote with automatic provider fallback.
    ///
    /// Tries providers in registration order. If the primary fails (API
    /// down, rate limited, unknown symbol), the next one gets a chance.
    /// Non-positive prices are treated as provider failures.
    async fn fetch(
        &self,
        symbol: &str,
        category: AssetCategory,
        date: Option<NaiveDate>,
    ) -> Result<Quote, CoreError> {
        let providers = self.registry.get_providers_for(category);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(category.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            let result = match date {
                Some(d) => provider.historical_price(symbol, d).await,
                None => provider.current_price(symbol).await,
            };

            match result {
                Ok(quote) => {
                    if quote.price <= Decimal::ZERO {
                        last_error = Some(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!(
                                "Non-positive price returned for {symbol}: {}",
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

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(category.to_string())))
    }
}
