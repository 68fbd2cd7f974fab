use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User-configurable settings, stored inside the snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "cryptocompare"). Values: the key string.
    pub api_keys: HashMap<String, String>,

    /// Minimum deviation, in percentage points, before a rebalancing
    /// recommendation is emitted.
    pub rebalance_threshold: Decimal,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            rebalance_threshold: dec!(5),
        }
    }
}
