use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::position::{PortfolioTotals, Position, PositionReport};
use crate::models::price::PriceCache;
use crate::models::transaction::Transaction;
use crate::services::cost_basis::CostBasis;
use crate::services::price_service::PriceService;

/// Reconstructs open positions from the ledger and values them live.
///
/// Fully closed tickers contribute their realized gain to the totals but
/// emit no row. A failed price lookup never fails the report: the position
/// appears with null market fields, stays out of the weight denominator,
/// and its cost basis still counts toward `invested`.
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Compute the full position listing as of `now`.
    ///
    /// 1. Group transactions by ticker and resolve each average-cost basis.
    /// 2. Drop closed tickers, keeping their realized gain.
    /// 3. Price each open position (failures isolate, never abort).
    /// 4. Weight by share of total priced value and sort largest first.
    pub async fn build_report(
        &self,
        ledger: &Ledger,
        price_service: &mut PriceService,
        cache: &mut PriceCache,
        now: DateTime<Utc>,
    ) -> Result<PositionReport, CoreError> {
        // BTreeMap keeps ticker iteration deterministic
        let mut by_ticker: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
        for txn in &ledger.transactions {
            by_ticker.entry(txn.ticker.clone()).or_default().push(txn);
        }

        // Rows paired with their unrounded market value, so weights are
        // computed on full precision once the total is known
        let mut rows: Vec<(Position, Option<Decimal>)> = Vec::new();
        let mut invested = Decimal::ZERO;
        let mut total_value = Decimal::ZERO;
        let mut unrealized_total = Decimal::ZERO;
        let mut realized_total = Decimal::ZERO;
        let mut unpriced = 0usize;

        for (ticker, txns) in &by_ticker {
            let basis = CostBasis::resolve(ticker, txns)?;
            realized_total += basis.realized_gain;

            if basis.is_closed() {
                continue;
            }

            // Market and class from the latest transaction; classification
            // backfill keeps older entries in sync anyway
            let latest = match txns.last() {
                Some(t) => *t,
                None => continue,
            };

            let price = match price_service
                .current_price_mxn(cache, ticker, latest.market, now)
                .await
            {
                Ok(p) => Some(p),
                Err(e) => {
                    log::warn!("current price lookup failed for {ticker}: {e}");
                    None
                }
            };

            let current_value = price.map(|p| basis.open_quantity * p);
            match current_value {
                Some(value) => {
                    total_value += value;
                    unrealized_total += value - basis.remaining_cost;
                }
                None => unpriced += 1,
            }
            invested += basis.remaining_cost;

            let position = Position {
                ticker: ticker.clone(),
                market: latest.market,
                asset_class: latest.asset_class,
                open_quantity: basis.open_quantity.round_dp(8),
                avg_buy_price: basis.avg_buy_price.round_dp(2),
                cost_basis: basis.remaining_cost.round_dp(2),
                current_price: price.map(|p| p.round_dp(2)),
                current_value: current_value.map(|v| v.round_dp(2)),
                unrealized_gain: current_value.map(|v| (v - basis.remaining_cost).round_dp(2)),
                unrealized_gain_pct: current_value.map(|v| {
                    if basis.remaining_cost > Decimal::ZERO {
                        ((v - basis.remaining_cost) / basis.remaining_cost * dec!(100)).round_dp(2)
                    } else {
                        Decimal::ZERO
                    }
                }),
                realized_gain: basis.realized_gain.round_dp(2),
                weight_pct: None, // filled below once the total is known
            };
            rows.push((position, current_value));
        }

        for (position, value) in &mut rows {
            if let Some(v) = value {
                position.weight_pct = Some(if total_value > Decimal::ZERO {
                    (*v / total_value * dec!(100)).round_dp(2)
                } else {
                    Decimal::ZERO
                });
            }
        }

        let mut positions: Vec<Position> = rows.into_iter().map(|(p, _)| p).collect();

        // Largest weight first, unpriced rows at the bottom, ties by ticker
        positions.sort_by(|a, b| match (a.weight_pct, b.weight_pct) {
            (Some(aw), Some(bw)) => bw.cmp(&aw).then_with(|| a.ticker.cmp(&b.ticker)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.ticker.cmp(&b.ticker),
        });

        let totals = PortfolioTotals {
            invested: invested.round_dp(2),
            current_value: total_value.round_dp(2),
            unrealized_gain: unrealized_total.round_dp(2),
            realized_gain: realized_total.round_dp(2),
            total_gain: (unrealized_total + realized_total).round_dp(2),
            open_positions: positions.len(),
            unpriced_positions: unpriced,
        };

        Ok(PositionReport {
            as_of: now.date_naive(),
            positions,
            totals,
        })
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}
