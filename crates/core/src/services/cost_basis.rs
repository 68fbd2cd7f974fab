use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::CoreError;
use crate::models::transaction::{Transaction, TransactionKind};

/// Quantities closer to zero than this are treated as exactly zero.
///
/// Fractional crypto sells routinely leave residues like 0.00000003 units
/// behind; below this threshold a position counts as fully closed.
pub const QUANTITY_EPSILON: Decimal = dec!(0.0001);

/// Average-cost resolution of one ticker's transaction history.
///
/// Every sold unit is costed at the blended average purchase price over the
/// ticker's entire buy history, not at the price of any particular lot.
/// Order of transactions therefore does not matter; only the totals do.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBasis {
    /// Units acquired across all buys
    pub total_bought: Decimal,

    /// MXN spent on buys (`unit_price × quantity`; commissions excluded)
    pub total_cost: Decimal,

    /// Units disposed across all sells
    pub total_sold: Decimal,

    /// MXN received from sells
    pub sell_proceeds: Decimal,

    /// `total_cost / total_bought`, zero when nothing was ever bought
    pub avg_buy_price: Decimal,

    /// `total_sold × avg_buy_price`
    pub cost_of_sold: Decimal,

    /// `sell_proceeds - cost_of_sold`
    pub realized_gain: Decimal,

    /// `total_bought - total_sold`, clamped to zero within QUANTITY_EPSILON
    pub open_quantity: Decimal,

    /// `total_cost - cost_of_sold`: what the still-open units cost
    pub remaining_cost: Decimal,
}

impl CostBasis {
    /// Resolve the average-cost figures for one ticker's transactions.
    ///
    /// Returns `CoreError::Inconsistency` if more units were sold than ever
    /// bought (beyond QUANTITY_EPSILON). The validated mutation paths make
    /// that unreachable; hitting it means the ledger was edited externally.
    pub fn resolve(ticker: &str, transactions: &[&Transaction]) -> Result<Self, CoreError> {
        let mut total_bought = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        let mut total_sold = Decimal::ZERO;
        let mut sell_proceeds = Decimal::ZERO;

        for txn in transactions {
            match txn.kind {
                TransactionKind::Buy => {
                    total_bought += txn.quantity;
                    total_cost += txn.gross_amount();
                }
                TransactionKind::Sell => {
                    total_sold += txn.quantity;
                    sell_proceeds += txn.gross_amount();
                }
            }
        }

        let avg_buy_price = if total_bought > Decimal::ZERO {
            total_cost / total_bought
        } else {
            Decimal::ZERO
        };
        let cost_of_sold = total_sold * avg_buy_price;
        let realized_gain = sell_proceeds - cost_of_sold;

        let mut open_quantity = total_bought - total_sold;
        if open_quantity.abs() < QUANTITY_EPSILON {
            open_quantity = Decimal::ZERO;
        }
        if open_quantity < Decimal::ZERO {
            return Err(CoreError::Inconsistency {
                ticker: ticker.to_string(),
                message: format!(
                    "sold {total_sold} units but only {total_bought} were ever bought"
                ),
            });
        }

        // A closed position carries no basis, even if clamping left
        // sub-epsilon rounding dust in total_cost - cost_of_sold.
        let remaining_cost = if open_quantity.is_zero() {
            Decimal::ZERO
        } else {
            total_cost - cost_of_sold
        };

        Ok(Self {
            total_bought,
            total_cost,
            total_sold,
            sell_proceeds,
            avg_buy_price,
            cost_of_sold,
            realized_gain,
            open_quantity,
            remaining_cost,
        })
    }

    /// Whether every unit ever bought has been sold back out.
    pub fn is_closed(&self) -> bool {
        self.open_quantity.is_zero()
    }
}
