use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single price data point (date → MXN price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// A price as a provider returned it, in the provider's native currency.
/// Callers convert to MXN before anything downstream sees the number.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,

    /// ISO currency code ("MXN", "USD")
    pub currency: String,
}

/// A historical price series in the provider's native currency,
/// sorted ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    /// ISO currency code all points are denominated in
    pub currency: String,

    pub points: Vec<PricePoint>,
}

/// Find the latest point dated on or before `date`, looking back at most
/// `max_lookback_days`. `points` must be sorted ascending by date.
pub fn nearest_on_or_before(
    points: &[PricePoint],
    date: NaiveDate,
    max_lookback_days: i64,
) -> Option<&PricePoint> {
    // First index with point.date > date
    let idx = points.partition_point(|p| p.date <= date);
    if idx == 0 {
        return None;
    }
    let candidate = &points[idx - 1];
    if (date - candidate.date).num_days() <= max_lookback_days {
        Some(candidate)
    } else {
        None
    }
}

/// Durable cache of historical and current prices, all in MXN.
///
/// Stored inside the snapshot file so that:
/// - Historical prices (date < today) are fetched ONCE and never re-fetched.
/// - Valuations keep working offline with cached data.
/// - Today's price can be refreshed when online.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceCache {
    /// Ticker → sorted Vec of price points
    pub entries: HashMap<String, Vec<PricePoint>>,

    /// Day we last refreshed "today's" price per ticker.
    /// Used to avoid redundant API calls within the same day.
    pub last_updated: HashMap<String, NaiveDate>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached MXN price for (ticker, date), if any. Binary search, O(log n).
    pub fn get_price(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        let entries = self.entries.get(&ticker.to_uppercase())?;
        entries
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| entries[idx].price)
    }

    /// Latest cached price on or before `date`, within `max_lookback_days`.
    pub fn get_price_on_or_before(
        &self,
        ticker: &str,
        date: NaiveDate,
        max_lookback_days: i64,
    ) -> Option<PricePoint> {
        let entries = self.entries.get(&ticker.to_uppercase())?;
        nearest_on_or_before(entries, date, max_lookback_days).cloned()
    }

    /// Insert or update a price point, keeping the Vec sorted by date.
    pub fn set_price(&mut self, ticker: &str, date: NaiveDate, price: Decimal) {
        let entries = self.entries.entry(ticker.to_uppercase()).or_default();
        match entries.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => {
                entries[idx].price = price;
            }
            Err(idx) => {
                entries.insert(idx, PricePoint { date, price });
            }
        }
    }

    /// Insert multiple price points at once (e.g., a fetched historical series).
    pub fn set_prices(&mut self, ticker: &str, points: &[PricePoint]) {
        for point in points {
            self.set_price(ticker, point.date, point.price);
        }
    }

    /// All cached points for a ticker within `[from, to]`, ascending.
    pub fn get_price_range(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
        self.entries
            .get(&ticker.to_uppercase())
            .map(|entries| {
                let start = entries.partition_point(|p| p.date < from);
                let end = entries.partition_point(|p| p.date <= to);
                entries[start..end].to_vec()
            })
            .unwrap_or_default()
    }

    /// Whether today's price was already refreshed today.
    pub fn is_today_fresh(&self, ticker: &str, today: NaiveDate) -> bool {
        self.last_updated
            .get(&ticker.to_uppercase())
            .is_some_and(|&d| d == today)
    }

    /// Record that the current price for `ticker` was refreshed today.
    pub fn mark_updated_today(&mut self, ticker: &str, today: NaiveDate) {
        self.last_updated.insert(ticker.to_uppercase(), today);
    }

    /// Total cached price points across all tickers.
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    /// Number of distinct tickers cached.
    pub fn ticker_count(&self) -> usize {
        self.entries.len()
    }

    /// Forget which tickers were refreshed today, forcing the next
    /// current-price lookup per ticker to hit the network again.
    pub fn clear_freshness(&mut self) {
        self.last_updated.clear();
    }

    /// Drop all cached data.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_updated.clear();
    }
}

#[derive(Debug, Clone)]
struct CachedQuote {
    price: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Short-lived in-memory cache for "current price" lookups.
///
/// Advisory only: a miss just triggers a refetch. Never persisted.
/// Callers pass `now` explicitly so expiry is deterministic under test.
#[derive(Debug, Clone)]
pub struct QuoteCache {
    ttl: Duration,
    entries: HashMap<String, CachedQuote>,
}

impl QuoteCache {
    /// Cache with the given time-to-live per entry.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached quote for `ticker` if fetched within the TTL as of `now`.
    pub fn get(&self, ticker: &str, now: DateTime<Utc>) -> Option<Decimal> {
        let entry = self.entries.get(&ticker.to_uppercase())?;
        if now - entry.fetched_at <= self.ttl {
            Some(entry.price)
        } else {
            None
        }
    }

    /// Store a freshly fetched quote.
    pub fn put(&mut self, ticker: &str, price: Decimal, now: DateTime<Utc>) {
        self.entries.insert(
            ticker.to_uppercase(),
            CachedQuote {
                price,
                fetched_at: now,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        // Matches the 5-minute freshness window quotes are served with
        Self::new(Duration::minutes(5))
    }
}
