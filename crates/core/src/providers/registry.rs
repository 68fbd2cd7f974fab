use std::collections::HashMap;

use crate::models::transaction::AssetCategory;

use super::cryptocompare::CryptoCompareProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::PriceProvider;
use super::yahoo::YahooProvider;

/// Registry of all available price providers.
///
/// Routes requests to the correct provider based on `AssetCategory`.
/// New providers can be added without modifying existing code.
pub struct PriceProviderRegistry {
    providers: Vec<Box<dyn PriceProvider>>,
}

impl PriceProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // CryptoCompare — crypto in MXN; key optional (raises rate limits)
        let cc_key = api_keys.get("cryptocompare").cloned();
        registry.register(Box::new(CryptoCompareProvider::new(cc_key)));

        // Frankfurter — fiat rates into MXN, no API key needed
        registry.register(Box::new(FrankfurterProvider::new()));

        // Yahoo Finance — BMV and US equities, no API key needed
        if let Ok(yahoo) = YahooProvider::new() {
            registry.register(Box::new(yahoo));
        }

        registry
    }

    /// Register a new price provider.
    pub fn register(&mut self, provider: Box<dyn PriceProvider>) {
        self.providers.push(provider);
    }

    /// Find the first provider that supports the given asset category.
    pub fn get_provider_for(&self, category: AssetCategory) -> Option<&dyn PriceProvider> {
        self.providers
            .iter()
            .find(|p| p.supported_categories().contains(&category))
            .map(|p| p.as_ref())
    }

    /// All providers that support the given category, in registration order.
    /// Used for fallback: if the first provider fails, try the next one.
    pub fn get_providers_for(&self, category: AssetCategory) -> Vec<&dyn PriceProvider> {
        self.providers
            .iter()
            .filter(|p| p.supported_categories().contains(&category))
            .map(|p| p.as_ref())
            .collect()
    }
}

impl Default for PriceProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
