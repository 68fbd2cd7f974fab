use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diversification bucket for the Swensen model adapted to Mexico.
///
/// Closed set: every classified instrument falls into exactly one of these.
/// Serialized ids match the classification table the ledger imports use
/// (e.g., `acciones_mexico`), so files written by older tools round-trip.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AssetClass {
    /// Mexican listed companies
    #[serde(rename = "acciones_mexico")]
    MexicoEquity,
    /// US listed companies
    #[serde(rename = "acciones_usa")]
    UsEquity,
    /// Developed markets outside North America
    #[serde(rename = "acciones_internacionales")]
    InternationalEquity,
    /// Developing-country equities
    #[serde(rename = "mercados_emergentes")]
    EmergingMarkets,
    /// Mexican real-estate investment trusts
    #[serde(rename = "fibras")]
    Fibra,
    /// Mexican treasury certificates
    #[serde(rename = "cetes")]
    Cetes,
    /// Long-term government bonds
    #[serde(rename = "bonos_gubernamentales")]
    GovernmentBonds,
    /// Inflation-linked government bonds
    #[serde(rename = "udibonos")]
    Udibonos,
    /// Gold and other commodities
    #[serde(rename = "oro_materias_primas")]
    Commodities,
    /// Digital assets
    #[serde(rename = "criptomonedas")]
    Crypto,
}

impl AssetClass {
    /// All classes, in display order.
    pub const ALL: [AssetClass; 10] = [
        AssetClass::MexicoEquity,
        AssetClass::UsEquity,
        AssetClass::InternationalEquity,
        AssetClass::EmergingMarkets,
        AssetClass::Fibra,
        AssetClass::Cetes,
        AssetClass::GovernmentBonds,
        AssetClass::Udibonos,
        AssetClass::Commodities,
        AssetClass::Crypto,
    ];

    /// Stable identifier used in serialized data and API payloads.
    pub fn slug(&self) -> &'static str {
        match self {
            AssetClass::MexicoEquity => "acciones_mexico",
            AssetClass::UsEquity => "acciones_usa",
            AssetClass::InternationalEquity => "acciones_internacionales",
            AssetClass::EmergingMarkets => "mercados_emergentes",
            AssetClass::Fibra => "fibras",
            AssetClass::Cetes => "cetes",
            AssetClass::GovernmentBonds => "bonos_gubernamentales",
            AssetClass::Udibonos => "udibonos",
            AssetClass::Commodities => "oro_materias_primas",
            AssetClass::Crypto => "criptomonedas",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::MexicoEquity => "Acciones Mexico",
            AssetClass::UsEquity => "Acciones Estados Unidos",
            AssetClass::InternationalEquity => "Acciones Internacionales",
            AssetClass::EmergingMarkets => "Mercados Emergentes",
            AssetClass::Fibra => "FIBRAs",
            AssetClass::Cetes => "CETES",
            AssetClass::GovernmentBonds => "Bonos Gubernamentales",
            AssetClass::Udibonos => "UDIBONOS",
            AssetClass::Commodities => "Oro y Materias Primas",
            AssetClass::Crypto => "Criptomonedas",
        }
    }

    /// Recommended percentage in the Swensen-for-Mexico model.
    /// Commodities and crypto carry 0: tolerated holdings, not targets.
    pub fn default_target(&self) -> Decimal {
        match self {
            AssetClass::MexicoEquity => dec!(15),
            AssetClass::UsEquity => dec!(30),
            AssetClass::InternationalEquity => dec!(15),
            AssetClass::EmergingMarkets => dec!(5),
            AssetClass::Fibra => dec!(20),
            AssetClass::Cetes => dec!(5),
            AssetClass::GovernmentBonds => dec!(5),
            AssetClass::Udibonos => dec!(5),
            AssetClass::Commodities => dec!(0),
            AssetClass::Crypto => dec!(0),
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Target percentage per asset class. Active entries must sum to 100;
/// writers enforce that before the map is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAllocation {
    pub targets: BTreeMap<AssetClass, Decimal>,
}

impl TargetAllocation {
    /// The Swensen model adapted to Mexico (sums to 100).
    pub fn swensen_mx() -> Self {
        let targets = AssetClass::ALL
            .iter()
            .map(|class| (*class, class.default_target()))
            .collect();
        Self { targets }
    }

    /// Target percent for a class; classes absent from the map target 0.
    pub fn target_for(&self, class: AssetClass) -> Decimal {
        self.targets.get(&class).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all configured targets. Valid configurations total 100.
    pub fn total(&self) -> Decimal {
        self.targets.values().sum()
    }
}

impl Default for TargetAllocation {
    fn default() -> Self {
        Self::swensen_mx()
    }
}

/// Current vs. target allocation for one asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAllocation {
    pub asset_class: AssetClass,

    /// Market value held in this class, in MXN
    pub current_value: Decimal,

    /// Share of total portfolio value (0 when the portfolio is empty)
    pub current_pct: Decimal,

    /// Configured target share
    pub target_pct: Decimal,

    /// `current_pct - target_pct` (positive = overweight)
    pub deviation_pct: Decimal,
}

/// Allocation of the whole portfolio across asset classes.
/// Every class appears, including those with nothing held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationBreakdown {
    /// Total market value of classified positions, in MXN
    pub total_value: Decimal,

    /// One row per asset class, in display order
    pub classes: Vec<ClassAllocation>,
}

impl AllocationBreakdown {
    /// Row for one class; all classes are always present.
    pub fn class(&self, class: AssetClass) -> Option<&ClassAllocation> {
        self.classes.iter().find(|c| c.asset_class == class)
    }
}

/// Direction of a rebalancing adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceAction {
    /// Overweight class: sell down toward target
    Reduce,
    /// Underweight class: buy up toward target
    Increase,
}

impl std::fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceAction::Reduce => write!(f, "reduce"),
            RebalanceAction::Increase => write!(f, "increase"),
        }
    }
}

/// How far off target a recommendation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// One suggested rebalancing adjustment for an off-target class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceRecommendation {
    pub asset_class: AssetClass,
    pub action: RebalanceAction,

    /// Current share of portfolio value
    pub current_pct: Decimal,

    /// Configured target share
    pub target_pct: Decimal,

    /// `current_pct - target_pct`
    pub deviation_pct: Decimal,

    /// MXN amount to move to land on target
    pub amount: Decimal,

    pub severity: Severity,
}

/// Suggested share of a new lump-sum investment for one asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentSuggestion {
    pub asset_class: AssetClass,

    /// Market value currently held in this class, in MXN
    pub current_value: Decimal,

    /// Value this class should hold after investing, per its target
    pub ideal_future_value: Decimal,

    /// `ideal_future_value - current_value` (always positive here)
    pub deficit: Decimal,

    /// MXN amount of the new investment to direct to this class
    pub suggested_amount: Decimal,

    /// Share of the new investment (`suggested_amount / investment × 100`)
    pub suggested_pct: Decimal,
}
