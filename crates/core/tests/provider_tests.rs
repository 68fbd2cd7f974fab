// ═══════════════════════════════════════════════════════════════════
// Provider Tests — Registry, CryptoCompare, Frankfurter, Yahoo logic
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use portafolio_core::errors::CoreError;
use portafolio_core::models::price::{PriceSeries, Quote};
use portafolio_core::models::transaction::AssetCategory;
use portafolio_core::providers::cryptocompare::CryptoCompareProvider;
use portafolio_core::providers::frankfurter::FrankfurterProvider;
use portafolio_core::providers::registry::PriceProviderRegistry;
use portafolio_core::providers::traits::PriceProvider;
use portafolio_core::providers::yahoo::YahooProvider;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Minimal provider: a name and a category list, nothing fetchable.
struct MockProvider {
    name: &'static str,
    categories: Vec<AssetCategory>,
}

impl MockProvider {
    fn new(name: &'static str, categories: Vec<AssetCategory>) -> Self {
        Self { name, categories }
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_categories(&self) -> Vec<AssetCategory> {
        self.categories.clone()
    }

    async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        Err(CoreError::PriceNotAvailable {
            ticker: symbol.into(),
            date: "current".into(),
        })
    }

    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Quote, CoreError> {
        Err(CoreError::PriceNotAvailable {
            ticker: symbol.into(),
            date: date.to_string(),
        })
    }

    async fn price_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        Err(CoreError::PriceNotAvailable {
            ticker: symbol.into(),
            date: from.to_string(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry — construction and lookup
// ═══════════════════════════════════════════════════════════════════

mod registry_lookup {
    use super::*;

    #[test]
    fn empty_registry_has_no_providers() {
        let registry = PriceProviderRegistry::new();
        assert!(registry.get_provider_for(AssetCategory::Equity).is_none());
        assert!(registry.get_provider_for(AssetCategory::Crypto).is_none());
        assert!(registry.get_provider_for(AssetCategory::Fiat).is_none());
    }

    #[test]
    fn default_is_empty() {
        let registry = PriceProviderRegistry::default();
        assert!(registry.get_provider_for(AssetCategory::Equity).is_none());
    }

    #[test]
    fn finds_provider_by_category() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(MockProvider::new("Crypto A", vec![AssetCategory::Crypto])));
        registry.register(Box::new(MockProvider::new("Fiat A", vec![AssetCategory::Fiat])));

        let provider = registry.get_provider_for(AssetCategory::Fiat).unwrap();
        assert_eq!(provider.name(), "Fiat A");
        assert!(registry.get_provider_for(AssetCategory::Equity).is_none());
    }

    #[test]
    fn first_registered_wins() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(MockProvider::new("Primary", vec![AssetCategory::Equity])));
        registry.register(Box::new(MockProvider::new("Backup", vec![AssetCategory::Equity])));

        let provider = registry.get_provider_for(AssetCategory::Equity).unwrap();
        assert_eq!(provider.name(), "Primary");
    }

    #[test]
    fn multi_category_provider_matches_each() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(MockProvider::new(
            "Wide",
            vec![AssetCategory::Equity, AssetCategory::Crypto],
        )));

        assert!(registry.get_provider_for(AssetCategory::Equity).is_some());
        assert!(registry.get_provider_for(AssetCategory::Crypto).is_some());
        assert!(registry.get_provider_for(AssetCategory::Fiat).is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry — fallback ordering
// ═══════════════════════════════════════════════════════════════════

mod registry_fallback {
    use super::*;

    #[test]
    fn all_matching_providers_in_registration_order() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(MockProvider::new("First", vec![AssetCategory::Equity])));
        registry.register(Box::new(MockProvider::new("Fiat only", vec![AssetCategory::Fiat])));
        registry.register(Box::new(MockProvider::new("Second", vec![AssetCategory::Equity])));

        let providers = registry.get_providers_for(AssetCategory::Equity);
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn no_match_is_an_empty_list() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(MockProvider::new("Fiat only", vec![AssetCategory::Fiat])));
        assert!(registry.get_providers_for(AssetCategory::Crypto).is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry — default provider set
// ═══════════════════════════════════════════════════════════════════

mod registry_defaults {
    use super::*;

    #[test]
    fn covers_every_category() {
        let registry = PriceProviderRegistry::new_with_defaults(&HashMap::new());

        assert!(registry.get_provider_for(AssetCategory::Crypto).is_some());
        assert!(registry.get_provider_for(AssetCategory::Fiat).is_some());
        assert!(registry.get_provider_for(AssetCategory::Equity).is_some());
    }

    #[test]
    fn default_provider_names() {
        let registry = PriceProviderRegistry::new_with_defaults(&HashMap::new());

        let crypto = registry.get_provider_for(AssetCategory::Crypto).unwrap();
        assert_eq!(crypto.name(), "CryptoCompare");

        let fiat = registry.get_provider_for(AssetCategory::Fiat).unwrap();
        assert_eq!(fiat.name(), "Frankfurter");

        let equity = registry.get_provider_for(AssetCategory::Equity).unwrap();
        assert_eq!(equity.name(), "Yahoo Finance");
    }

    #[test]
    fn accepts_cryptocompare_api_key() {
        let mut keys = HashMap::new();
        keys.insert("cryptocompare".to_string(), "my-key".to_string());

        let registry = PriceProviderRegistry::new_with_defaults(&keys);
        assert!(registry.get_provider_for(AssetCategory::Crypto).is_some());
    }

    #[test]
    fn unknown_api_keys_are_ignored() {
        let mut keys = HashMap::new();
        keys.insert("some_future_provider".to_string(), "abc".to_string());

        let registry = PriceProviderRegistry::new_with_defaults(&keys);
        assert!(registry.get_provider_for(AssetCategory::Crypto).is_some());
        assert!(registry.get_provider_for(AssetCategory::Fiat).is_some());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Concrete providers — construction and metadata
// ═══════════════════════════════════════════════════════════════════

mod cryptocompare {
    use super::*;

    #[test]
    fn name_and_categories() {
        let provider = CryptoCompareProvider::new(None);
        assert_eq!(provider.name(), "CryptoCompare");
        assert_eq!(provider.supported_categories(), vec![AssetCategory::Crypto]);
    }

    #[test]
    fn api_key_does_not_change_identity() {
        let provider = CryptoCompareProvider::new(Some("key-123".into()));
        assert_eq!(provider.name(), "CryptoCompare");
    }

    #[test]
    fn default_has_no_key() {
        let provider = CryptoCompareProvider::default();
        assert_eq!(provider.name(), "CryptoCompare");
    }
}

mod frankfurter {
    use super::*;

    #[test]
    fn name_and_categories() {
        let provider = FrankfurterProvider::new();
        assert_eq!(provider.name(), "Frankfurter");
        assert_eq!(provider.supported_categories(), vec![AssetCategory::Fiat]);
    }

    #[test]
    fn default_matches_new() {
        let provider = FrankfurterProvider::default();
        assert_eq!(provider.name(), "Frankfurter");
    }
}

mod yahoo {
    use super::*;

    #[test]
    fn name_and_categories() {
        let provider = YahooProvider::new().unwrap();
        assert_eq!(provider.name(), "Yahoo Finance");
        assert_eq!(provider.supported_categories(), vec![AssetCategory::Equity]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trait object ergonomics
// ═══════════════════════════════════════════════════════════════════

mod trait_objects {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn providers_are_send_and_sync() {
        assert_send_sync::<CryptoCompareProvider>();
        assert_send_sync::<FrankfurterProvider>();
        assert_send_sync::<YahooProvider>();
        assert_send_sync::<Box<dyn PriceProvider>>();
    }

    #[test]
    fn boxed_provider_usable_through_trait() {
        let boxed: Box<dyn PriceProvider> = Box::new(MockProvider::new(
            "Boxed",
            vec![AssetCategory::Equity],
        ));
        assert_eq!(boxed.name(), "Boxed");
        assert_eq!(boxed.supported_categories(), vec![AssetCategory::Equity]);
    }
}
