use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::classify::Classifier;
use crate::errors::CoreError;
use crate::models::allocation::{
    AllocationBreakdown, AssetClass, ClassAllocation, InvestmentSuggestion, RebalanceAction,
    RebalanceRecommendation, Severity, TargetAllocation,
};
use crate::models::ledger::Ledger;
use crate::models::position::PositionReport;

/// Compares the portfolio's class mix against its target allocation and
/// suggests how to close the gap, either by rebalancing what's already
/// held or by steering new money.
pub struct DiversificationService;

impl DiversificationService {
    pub fn new() -> Self {
        Self
    }

    /// Classify every transaction that still lacks an asset class, writing
    /// the result back onto the record so it never has to be re-derived.
    /// Returns how many transactions were filled in.
    pub fn classify_or_backfill(
        &self,
        ledger: &mut Ledger,
        classifier: &dyn Classifier,
    ) -> usize {
        let mut updated = 0;
        for txn in &mut ledger.transactions {
            if txn.asset_class.is_none() {
                if let Some(class) = classifier.classify(&txn.ticker, txn.market) {
                    txn.asset_class = Some(class);
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Current market value grouped into the ten asset classes.
    ///
    /// Every class appears, held or not, so callers can render the whole
    /// model. Unpriced positions carry no market value and stay out.
    pub fn allocation_breakdown(
        &self,
        report: &PositionReport,
        targets: &TargetAllocation,
    ) -> AllocationBreakdown {
        let mut by_class: BTreeMap<AssetClass, Decimal> = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for position in &report.positions {
            if let (Some(class), Some(value)) = (position.asset_class, position.current_value) {
                *by_class.entry(class).or_insert(Decimal::ZERO) += value;
                total += value;
            }
        }

        let classes = AssetClass::ALL
            .iter()
            .map(|&asset_class| {
                let current_value = by_class.get(&asset_class).copied().unwrap_or(Decimal::ZERO);
                let current_pct = if total > Decimal::ZERO {
                    (current_value / total * dec!(100)).round_dp(2)
                } else {
                    Decimal::ZERO
                };
                let target_pct = targets.target_for(asset_class);
                ClassAllocation {
                    asset_class,
                    current_value: current_value.round_dp(2),
                    current_pct,
                    target_pct,
                    deviation_pct: (current_pct - target_pct).round_dp(2),
                }
            })
            .collect();

        AllocationBreakdown {
            total_value: total.round_dp(2),
            classes,
        }
    }

    /// Rebalancing suggestions for classes drifted beyond `threshold`
    /// percentage points. A class exactly at target never appears.
    pub fn rebalancing_recommendations(
        &self,
        breakdown: &AllocationBreakdown,
        threshold: Decimal,
    ) -> Vec<RebalanceRecommendation> {
        let mut recommendations = Vec::new();

        for class_allocation in &breakdown.classes {
            let deviation = class_allocation.deviation_pct;
            if deviation.abs() <= threshold {
                continue;
            }

            let action = if deviation > Decimal::ZERO {
                RebalanceAction::Reduce
            } else {
                RebalanceAction::Increase
            };
            let severity = if deviation.abs() > dec!(15) {
                Severity::High
            } else {
                Severity::Medium
            };
            let amount = (deviation.abs() / dec!(100) * breakdown.total_value).round_dp(2);

            recommendations.push(RebalanceRecommendation {
                asset_class: class_allocation.asset_class,
                action,
                current_pct: class_allocation.current_pct,
                target_pct: class_allocation.target_pct,
                deviation_pct: deviation,
                amount,
                severity,
            });
        }

        // Largest drift first; class order breaks exact ties
        recommendations.sort_by(|a, b| {
            b.deviation_pct
                .abs()
                .cmp(&a.deviation_pct.abs())
                .then_with(|| a.asset_class.cmp(&b.asset_class))
        });
        recommendations
    }

    /// Split a lump sum so the resulting allocation moves toward target.
    ///
    /// Each class with a positive target gets its future-value deficit
    /// `target% × (total + investment) − current value`. Classes already at
    /// or above their future share are skipped; the rest share the sum in
    /// proportion to their deficits, adjusted so the amounts add up to the
    /// investment exactly. A portfolio already at target therefore splits
    /// the sum proportionally to the target percentages themselves.
    pub fn investment_allocation(
        &self,
        breakdown: &AllocationBreakdown,
        investment: Decimal,
    ) -> Result<Vec<InvestmentSuggestion>, CoreError> {
        if investment <= Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Investment amount must be positive".into(),
            ));
        }

        let future_total = breakdown.total_value + investment;

        let mut suggestions = Vec::new();
        let mut total_deficit = Decimal::ZERO;
        for class_allocation in &breakdown.classes {
            if class_allocation.target_pct <= Decimal::ZERO {
                continue;
            }
            let ideal_future_value =
                (class_allocation.target_pct / dec!(100) * future_total).round_dp(2);
            let deficit = ideal_future_value - class_allocation.current_value;
            if deficit <= Decimal::ZERO {
                continue;
            }
            total_deficit += deficit;
            suggestions.push(InvestmentSuggestion {
                asset_class: class_allocation.asset_class,
                current_value: class_allocation.current_value,
                ideal_future_value,
                deficit,
                suggested_amount: Decimal::ZERO, // filled below
                suggested_pct: Decimal::ZERO,    // filled below
            });
        }

        if suggestions.is_empty() {
            return Ok(suggestions);
        }

        for suggestion in &mut suggestions {
            suggestion.suggested_amount =
                (suggestion.deficit / total_deficit * investment).round_dp(2);
        }

        // Largest deficit first; class order breaks exact ties
        suggestions.sort_by(|a, b| {
            b.deficit
                .cmp(&a.deficit)
                .then_with(|| a.asset_class.cmp(&b.asset_class))
        });

        // Fold the rounding residue into the largest entry so the amounts
        // sum to exactly the investment
        let allocated: Decimal = suggestions.iter().map(|s| s.suggested_amount).sum();
        if let Some(first) = suggestions.first_mut() {
            first.suggested_amount += investment - allocated;
        }

        for suggestion in &mut suggestions {
            suggestion.suggested_pct =
                (suggestion.suggested_amount / investment * dec!(100)).round_dp(2);
        }

        Ok(suggestions)
    }

    /// Replace the target allocation. Targets must be non-negative and the
    /// active entries must total exactly 100.
    pub fn set_targets(
        &self,
        ledger: &mut Ledger,
        targets: TargetAllocation,
    ) -> Result<(), CoreError> {
        for (class, pct) in &targets.targets {
            if *pct < Decimal::ZERO {
                return Err(CoreError::InvalidTargetAllocation(format!(
                    "Target for {class} cannot be negative"
                )));
            }
        }
        let total = targets.total();
        if total != dec!(100) {
            return Err(CoreError::InvalidTargetAllocation(format!(
                "Targets must sum to 100, got {total}"
            )));
        }
        ledger.targets = targets;
        Ok(())
    }
}

impl Default for DiversificationService {
    fn default() -> Self {
        Self::new()
    }
}
