use crate::models::allocation::AssetClass;
use crate::models::transaction::Market;

/// Maps a ticker to its diversification bucket.
///
/// Classification is ticker/market-invariant, so results can be cached
/// back onto transactions and reused without re-asking.
pub trait Classifier: Send + Sync {
    /// Classify a ticker, or decline with `None` when the rules don't know it.
    fn classify(&self, ticker: &str, market: Market) -> Option<AssetClass>;
}

/// Known FIBRAs on the BMV. Matched as substrings so series variants
/// (FUNO11, DANHOS13) hit without enumerating every series number.
const KNOWN_FIBRAS: [&str; 18] = [
    "FUNO11", "FUNO", "DANHOS13", "DANHOS", "FIHO14", "FIHO", "FINN13", "FINN", "FMTY14", "FMTY",
    "FIBRAMQ12", "FIBRAMQ", "FIBRAPL14", "FIBRAPL", "TERRA13", "TERRA", "FSHOP13", "FSHOP",
];

const KNOWN_CRYPTOS: [&str; 10] = [
    "BTC", "ETH", "SOL", "XRP", "PAXG", "USDT", "USDC", "ADA", "DOT", "MATIC",
];

const KNOWN_COMMODITIES: [&str; 6] = ["PAXG", "GLD", "SLV", "GDX", "IAU", "GOLD"];

/// US ETFs cross-listed on the BMV's international quotation system (SIC).
const US_ETFS_ON_BMV: [&str; 24] = [
    "VOO", "VTI", "SPY", "QQQ", "IVV", "VEA", "VWO", "IEMG", "VGK", "EFA", "EEM", "VNQ", "VNQI",
    "BND", "AGG", "TLT", "IWM", "DIA", "ARKK", "XLF", "XLK", "XLE", "XLV", "SCHD",
];

const EMERGING_MARKET_ETFS: [&str; 4] = ["VWO", "IEMG", "EEM", "SCHE"];

const INTERNATIONAL_ETFS: [&str; 6] = ["VEA", "VGK", "EFA", "IEFA", "VPL", "VXUS"];

/// Static rules table mapping tickers to asset classes.
///
/// Rule order matters: crypto and commodity identities override market
/// defaults, and the emerging/international/US ETF lists carve cross-listed
/// funds out of the "Mexican listing means Mexican equity" fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesClassifier;

impl RulesClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for RulesClassifier {
    fn classify(&self, ticker: &str, market: Market) -> Option<AssetClass> {
        let t = ticker.to_uppercase().replace(".MX", "");

        // Crypto market, or a crypto ticker that arrived mis-marketed.
        // PAXG is tokenized gold, not generic crypto.
        if market == Market::Crypto || KNOWN_CRYPTOS.contains(&t.as_str()) {
            return Some(if t == "PAXG" {
                AssetClass::Commodities
            } else {
                AssetClass::Crypto
            });
        }

        if KNOWN_COMMODITIES.contains(&t.as_str()) {
            return Some(AssetClass::Commodities);
        }

        match market {
            Market::Mx => {
                if KNOWN_FIBRAS.iter().any(|fibra| t.contains(fibra)) || t.contains("FIBRA") {
                    return Some(AssetClass::Fibra);
                }
                if EMERGING_MARKET_ETFS.contains(&t.as_str()) {
                    return Some(AssetClass::EmergingMarkets);
                }
                if INTERNATIONAL_ETFS.contains(&t.as_str()) {
                    return Some(AssetClass::InternationalEquity);
                }
                if US_ETFS_ON_BMV.contains(&t.as_str()) {
                    return Some(AssetClass::UsEquity);
                }
                Some(AssetClass::MexicoEquity)
            }
            Market::Us => Some(AssetClass::UsEquity),
            Market::Crypto => Some(AssetClass::Crypto),
        }
    }
}
