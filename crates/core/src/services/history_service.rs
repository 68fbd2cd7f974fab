use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::history::{HistoryPoint, HistoryRange};
use crate::models::ledger::Ledger;
use crate::models::price::PriceCache;
use crate::models::transaction::{Market, Transaction, TransactionKind};
use crate::services::cost_basis::QUANTITY_EPSILON;
use crate::services::price_service::PriceService;

/// Walking back this many days bridges any weekend or exchange holiday.
const PRICE_LOOKBACK_DAYS: i64 = 7;

/// Generates the portfolio-value-over-time series.
///
/// One series fetch per ticker up front, then a transaction replay over
/// stride-sampled dates: holdings advance incrementally and each sample is
/// valued from cached data only. The final point is forced onto today with
/// a live quote so the chart always ends at current market value.
///
/// A single ticker's fetch failure degrades that ticker to its most recent
/// trade price; it never aborts the chart.
pub struct HistoryService;

impl HistoryService {
    pub fn new() -> Self {
        Self
    }

    /// Build the value series for the requested range, ending today.
    pub async fn generate(
        &self,
        ledger: &Ledger,
        price_service: &mut PriceService,
        cache: &mut PriceCache,
        range: HistoryRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let today = now.date_naive();

        let first_date = match ledger.transactions.first() {
            Some(t) => t.date,
            None => return Ok(Vec::new()),
        };

        // Clamp so the chart never starts before the ledger does
        let start = match range.start_from(today) {
            Some(s) => s.max(first_date),
            None => first_date,
        };
        let start = start.min(today);

        let span_days = (today - start).num_days();
        let stride = Duration::days(Self::stride_days(span_days));

        let mut markets: HashMap<String, Market> = HashMap::new();
        for txn in &ledger.transactions {
            markets.insert(txn.ticker.clone(), txn.market);
        }

        // Replay everything strictly before `start`; transactions on the
        // start date itself are applied by the first sample below
        let mut holdings: HashMap<String, Decimal> = HashMap::new();
        let mut seeds: HashMap<String, Decimal> = HashMap::new();
        let mut txn_idx = 0;
        while txn_idx < ledger.transactions.len() && ledger.transactions[txn_idx].date < start {
            Self::apply(&mut holdings, &mut seeds, &ledger.transactions[txn_idx]);
            txn_idx += 1;
        }
        holdings.retain(|_, quantity| *quantity > QUANTITY_EPSILON);

        // One series fetch per ticker active anywhere in the window,
        // pulled a week early so the first samples can look back
        let mut active: BTreeSet<String> = holdings.keys().cloned().collect();
        for txn in &ledger.transactions[txn_idx..] {
            if txn.date <= today {
                active.insert(txn.ticker.clone());
            }
        }
        for ticker in &active {
            let market = match markets.get(ticker) {
                Some(m) => *m,
                None => continue,
            };
            if let Err(e) = price_service
                .historical_series_mxn(
                    cache,
                    ticker,
                    market,
                    start - Duration::days(PRICE_LOOKBACK_DAYS),
                    today,
                )
                .await
            {
                log::warn!("series fetch failed for {ticker}, falling back to trade prices: {e}");
            }
        }

        // Sample from `start` by stride; today is appended separately
        let mut last_resolved: HashMap<String, Decimal> = HashMap::new();
        let mut points = Vec::new();
        let mut sample = start;

        while sample < today {
            while txn_idx < ledger.transactions.len()
                && ledger.transactions[txn_idx].date <= sample
            {
                Self::apply(&mut holdings, &mut seeds, &ledger.transactions[txn_idx]);
                txn_idx += 1;
            }
            holdings.retain(|_, quantity| *quantity > QUANTITY_EPSILON);

            let value = Self::value_at(cache, &holdings, &mut last_resolved, &seeds, sample);
            points.push(HistoryPoint {
                date: sample,
                value: value.round_dp(2),
            });

            sample = match sample.checked_add_signed(stride) {
                Some(next) => next,
                None => break,
            };
        }

        // Final point always lands exactly on today with a live quote,
        // even when today falls off the stride
        while txn_idx < ledger.transactions.len() && ledger.transactions[txn_idx].date <= today {
            Self::apply(&mut holdings, &mut seeds, &ledger.transactions[txn_idx]);
            txn_idx += 1;
        }
        holdings.retain(|_, quantity| *quantity > QUANTITY_EPSILON);

        let mut value = Decimal::ZERO;
        for (ticker, quantity) in &holdings {
            let price = match markets.get(ticker) {
                Some(market) => {
                    match price_service
                        .current_price_mxn(cache, ticker, *market, now)
                        .await
                    {
                        Ok(p) => Some(p),
                        Err(e) => {
                            log::warn!("live price failed for {ticker}, using fallback: {e}");
                            Self::price_at(cache, &last_resolved, &seeds, ticker, today)
                        }
                    }
                }
                None => Self::price_at(cache, &last_resolved, &seeds, ticker, today),
            };
            if let Some(p) = price {
                value += *quantity * p;
            }
        }
        points.push(HistoryPoint {
            date: today,
            value: value.round_dp(2),
        });

        Ok(points)
    }

    /// Sampling stride in days: denser for short spans, coarser for long.
    fn stride_days(span_days: i64) -> i64 {
        if span_days <= 366 {
            2
        } else if span_days <= 1096 {
            3
        } else if span_days <= 1827 {
            5
        } else {
            7
        }
    }

    /// Apply one transaction to the running holdings. The trade price
    /// doubles as the ticker's last-ditch valuation seed.
    fn apply(
        holdings: &mut HashMap<String, Decimal>,
        seeds: &mut HashMap<String, Decimal>,
        txn: &Transaction,
    ) {
        let quantity = holdings.entry(txn.ticker.clone()).or_insert(Decimal::ZERO);
        match txn.kind {
            TransactionKind::Buy => *quantity += txn.quantity,
            TransactionKind::Sell => *quantity -= txn.quantity,
        }
        seeds.insert(txn.ticker.clone(), txn.unit_price);
    }

    /// Value all holdings on one date from cached data only.
    fn value_at(
        cache: &PriceCache,
        holdings: &HashMap<String, Decimal>,
        last_resolved: &mut HashMap<String, Decimal>,
        seeds: &HashMap<String, Decimal>,
        date: NaiveDate,
    ) -> Decimal {
        let mut value = Decimal::ZERO;
        for (ticker, quantity) in holdings {
            if let Some(price) = Self::price_at(cache, last_resolved, seeds, ticker, date) {
                last_resolved.insert(ticker.clone(), price);
                value += *quantity * price;
            }
        }
        value
    }

    /// Price for one ticker on one date, degrading gracefully: cached price
    /// at the date or up to a week earlier, else the last price resolved
    /// earlier in this run, else the most recent trade price. Positive
    /// holdings imply a past buy, so the chain always lands somewhere.
    fn price_at(
        cache: &PriceCache,
        last_resolved: &HashMap<String, Decimal>,
        seeds: &HashMap<String, Decimal>,
        ticker: &str,
        date: NaiveDate,
    ) -> Option<Decimal> {
        if let Some(point) = cache.get_price_on_or_before(ticker, date, PRICE_LOOKBACK_DAYS) {
            return Some(point.price);
        }
        if let Some(price) = last_resolved.get(ticker) {
            return Some(*price);
        }
        seeds.get(ticker).copied()
    }
}

impl Default for HistoryService {
    fn default() -> Self {
        Self::new()
    }
}
