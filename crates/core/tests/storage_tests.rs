// ═══════════════════════════════════════════════════════════════════
// Storage Tests — file format, StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use portafolio_core::errors::CoreError;
use portafolio_core::models::allocation::{AssetClass, TargetAllocation};
use portafolio_core::models::dividend::{DividendKind, DividendRecord};
use portafolio_core::models::ledger::Ledger;
use portafolio_core::models::transaction::{Market, Transaction, TransactionKind};
use portafolio_core::storage::format::{self, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use portafolio_core::storage::manager::StorageManager;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A ledger exercising every persisted section.
fn sample_ledger() -> Ledger {
    let mut ledger = Ledger::default();

    ledger.transactions.push(
        Transaction::new(
            TransactionKind::Buy,
            "NAFTRAC",
            Market::Mx,
            d(2024, 1, 15),
            dec!(123.45),
            dec!(10),
        )
        .with_custodian("GBM")
        .with_commission(dec!(12.50))
        .with_asset_class(AssetClass::MexicoEquity)
        .with_notes("aportación de enero"),
    );
    ledger.transactions.push(Transaction::new(
        TransactionKind::Buy,
        "BTC",
        Market::Crypto,
        d(2024, 2, 1),
        dec!(812345.67),
        dec!(0.00000001),
    ));
    ledger.transactions.push(Transaction::new(
        TransactionKind::Sell,
        "NAFTRAC",
        Market::Mx,
        d(2024, 3, 1),
        dec!(130.10),
        dec!(4),
    ));

    ledger.dividends.push(
        DividendRecord::new(
            "NAFTRAC",
            DividendKind::Dividend,
            d(2024, 3, 10),
            dec!(500.75),
            dec!(450.25),
        )
        .with_notes("Q1 2024"),
    );

    ledger.targets.targets.insert(AssetClass::MexicoEquity, dec!(10));
    ledger.targets.targets.insert(AssetClass::Cetes, dec!(10));

    ledger.price_cache.set_price("NAFTRAC", d(2024, 1, 15), dec!(123.45));
    ledger.price_cache.set_price("USD/MXN", d(2024, 1, 15), dec!(17.18));
    ledger.price_cache.mark_updated_today("NAFTRAC", d(2024, 3, 1));

    ledger.settings.api_keys.insert("cryptocompare".into(), "k-123".into());
    ledger.settings.rebalance_threshold = dec!(7.5);

    ledger
}

// ═══════════════════════════════════════════════════════════════════
// File format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let payload = b"ledger payload bytes";
        let bytes = format::write_file(CURRENT_VERSION, payload);

        let (header, parsed_payload) = format::read_file(&bytes).unwrap();
        assert_eq!(header.version, CURRENT_VERSION);
        assert_eq!(header.payload_len, payload.len() as u64);
        assert_eq!(parsed_payload, payload);
    }

    #[test]
    fn empty_payload_roundtrip() {
        let bytes = format::write_file(CURRENT_VERSION, b"");
        let (header, payload) = format::read_file(&bytes).unwrap();

        assert_eq!(header.payload_len, 0);
        assert!(payload.is_empty());
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    #[test]
    fn magic_bytes_lead_the_file() {
        let bytes = format::write_file(CURRENT_VERSION, b"x");
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(&bytes[0..4], b"PFOL");
    }

    #[test]
    fn version_encoded_little_endian() {
        let bytes = format::write_file(1, b"x");
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], 0);
    }

    #[test]
    fn payload_length_encoded_little_endian() {
        let payload = vec![0u8; 300];
        let bytes = format::write_file(CURRENT_VERSION, &payload);

        let len = u64::from_le_bytes(bytes[6..14].try_into().unwrap());
        assert_eq!(len, 300);
    }

    #[test]
    fn total_size_is_header_plus_payload() {
        let payload = vec![7u8; 123];
        let bytes = format::write_file(CURRENT_VERSION, &payload);
        assert_eq!(bytes.len(), HEADER_SIZE + 123);
    }

    #[test]
    fn too_small_rejected() {
        let result = format::read_file(b"PFO");
        match result.unwrap_err() {
            CoreError::InvalidFileFormat(msg) => assert!(msg.contains("too small")),
            other => panic!("Expected InvalidFileFormat, got {:?}", other),
        }
    }

    #[test]
    fn empty_input_rejected() {
        assert!(format::read_file(b"").is_err());
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"payload");
        bytes[0..4].copy_from_slice(b"NOPE");

        match format::read_file(&bytes).unwrap_err() {
            CoreError::InvalidFileFormat(msg) => assert!(msg.contains("magic")),
            other => panic!("Expected InvalidFileFormat, got {:?}", other),
        }
    }

    #[test]
    fn version_zero_rejected() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"payload");
        bytes[4] = 0;
        bytes[5] = 0;

        match format::read_file(&bytes).unwrap_err() {
            CoreError::UnsupportedVersion(v) => assert_eq!(v, 0),
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn future_version_rejected() {
        let bytes = format::write_file(CURRENT_VERSION + 1, b"payload");
        match format::read_file(&bytes).unwrap_err() {
            CoreError::UnsupportedVersion(v) => assert_eq!(v, CURRENT_VERSION + 1),
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn truncated_payload_rejected() {
        let bytes = format::write_file(CURRENT_VERSION, b"full payload here");
        let cut = &bytes[..bytes.len() - 5];

        match format::read_file(cut).unwrap_err() {
            CoreError::InvalidFileFormat(msg) => assert!(msg.contains("truncated")),
            other => panic!("Expected InvalidFileFormat, got {:?}", other),
        }
    }

    #[test]
    fn oversized_payload_length_rejected() {
        // Hand-built header claiming u64::MAX payload bytes; must come back
        // as an error, not an arithmetic panic
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);

        match format::read_file(&bytes).unwrap_err() {
            CoreError::InvalidFileFormat(msg) => assert!(msg.contains("truncated")),
            other => panic!("Expected InvalidFileFormat, got {:?}", other),
        }
    }

    #[test]
    fn trailing_bytes_ignored() {
        // The header's payload_len is authoritative; bytes past it don't
        // corrupt the read
        let mut bytes = format::write_file(CURRENT_VERSION, b"payload");
        bytes.extend_from_slice(b"trailing junk");

        let (header, payload) = format::read_file(&bytes).unwrap();
        assert_eq!(header.payload_len, 7);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn header_constants() {
        assert_eq!(HEADER_SIZE, 14);
        assert_eq!(CURRENT_VERSION, 1);
        assert_eq!(MAGIC, b"PFOL");
    }

    #[test]
    fn file_header_debug() {
        let bytes = format::write_file(CURRENT_VERSION, b"x");
        let (header, _) = format::read_file(&bytes).unwrap();
        let debug = format!("{:?}", header);
        assert!(debug.contains("version"));
        assert!(debug.contains("payload_len"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager — bytes
// ═══════════════════════════════════════════════════════════════════

mod storage_manager {
    use super::*;

    #[test]
    fn empty_ledger_roundtrip() {
        let bytes = StorageManager::save_to_bytes(&Ledger::default()).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert!(loaded.transactions.is_empty());
        assert!(loaded.dividends.is_empty());
        assert_eq!(loaded.targets, TargetAllocation::swensen_mx());
        assert_eq!(loaded.settings.rebalance_threshold, dec!(5));
    }

    #[test]
    fn transactions_roundtrip_exactly() {
        let ledger = sample_ledger();
        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert_eq!(loaded.transactions.len(), 3);

        let naftrac = &loaded.transactions[0];
        assert_eq!(naftrac.id, ledger.transactions[0].id);
        assert_eq!(naftrac.ticker, "NAFTRAC");
        assert_eq!(naftrac.market, Market::Mx);
        assert_eq!(naftrac.kind, TransactionKind::Buy);
        assert_eq!(naftrac.date, d(2024, 1, 15));
        assert_eq!(naftrac.unit_price, dec!(123.45));
        assert_eq!(naftrac.quantity, dec!(10));
        assert_eq!(naftrac.commission, dec!(12.50));
        assert_eq!(naftrac.custodian.as_deref(), Some("GBM"));
        assert_eq!(naftrac.asset_class, Some(AssetClass::MexicoEquity));
        assert_eq!(naftrac.notes.as_deref(), Some("aportación de enero"));

        let btc = &loaded.transactions[1];
        assert_eq!(btc.unit_price, dec!(812345.67));
        assert_eq!(btc.quantity, dec!(0.00000001));
    }

    #[test]
    fn dividends_roundtrip() {
        let ledger = sample_ledger();
        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert_eq!(loaded.dividends.len(), 1);
        let dividend = &loaded.dividends[0];
        assert_eq!(dividend.id, ledger.dividends[0].id);
        assert_eq!(dividend.ticker, "NAFTRAC");
        assert_eq!(dividend.kind, DividendKind::Dividend);
        assert_eq!(dividend.payment_date, d(2024, 3, 10));
        assert_eq!(dividend.gross_amount, dec!(500.75));
        assert_eq!(dividend.net_amount, dec!(450.25));
        assert_eq!(dividend.notes.as_deref(), Some("Q1 2024"));
    }

    #[test]
    fn targets_roundtrip() {
        let ledger = sample_ledger();
        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert_eq!(loaded.targets.target_for(AssetClass::MexicoEquity), dec!(10));
        assert_eq!(loaded.targets.target_for(AssetClass::Cetes), dec!(10));
        assert_eq!(loaded.targets.target_for(AssetClass::UsEquity), dec!(30));
    }

    #[test]
    fn price_cache_roundtrip() {
        let ledger = sample_ledger();
        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert_eq!(
            loaded.price_cache.get_price("NAFTRAC", d(2024, 1, 15)),
            Some(dec!(123.45))
        );
        assert_eq!(
            loaded.price_cache.get_price("USD/MXN", d(2024, 1, 15)),
            Some(dec!(17.18))
        );
        assert!(loaded.price_cache.is_today_fresh("NAFTRAC", d(2024, 3, 1)));
    }

    #[test]
    fn settings_roundtrip() {
        let ledger = sample_ledger();
        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        assert_eq!(loaded.settings.api_keys["cryptocompare"], "k-123");
        assert_eq!(loaded.settings.rebalance_threshold, dec!(7.5));
    }

    #[test]
    fn garbage_bytes_rejected() {
        let result = StorageManager::load_from_bytes(&[0xFF; 32]);
        assert!(matches!(result.unwrap_err(), CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn valid_envelope_with_bad_payload_rejected() {
        // Correct header, payload that is not a bincode ledger
        let bytes = format::write_file(CURRENT_VERSION, b"xx");
        match StorageManager::load_from_bytes(&bytes).unwrap_err() {
            CoreError::Deserialization(msg) => assert!(msg.contains("deserialize")),
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }

    #[test]
    fn saved_bytes_carry_the_snapshot_magic() {
        let bytes = StorageManager::save_to_bytes(&Ledger::default()).unwrap();
        assert!(bytes.starts_with(b"PFOL"));
        assert!(bytes.len() > HEADER_SIZE);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Decimal fidelity through the snapshot
// ═══════════════════════════════════════════════════════════════════

mod decimal_fidelity {
    use super::*;

    #[test]
    fn user_entered_amounts_survive_roundtrip() {
        // Typical hand-entered values: centavo prices, satoshi quantities
        let cases = [
            dec!(0.00000001),
            dec!(0.0001),
            dec!(1),
            dec!(17.18),
            dec!(105.50),
            dec!(812345.67),
            dec!(1700000),
        ];

        let mut ledger = Ledger::default();
        for (i, price) in cases.iter().enumerate() {
            ledger.transactions.push(Transaction::new(
                TransactionKind::Buy,
                format!("T{i}"),
                Market::Mx,
                d(2024, 1, 15),
                *price,
                dec!(1),
            ));
        }

        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();

        for (i, price) in cases.iter().enumerate() {
            assert_eq!(
                loaded.transactions[i].unit_price, *price,
                "value {price} did not survive"
            );
        }
    }

    #[test]
    fn zero_decimal_roundtrip() {
        let mut ledger = Ledger::default();
        ledger.settings.rebalance_threshold = Decimal::ZERO;

        let bytes = StorageManager::save_to_bytes(&ledger).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded.settings.rebalance_threshold, Decimal::ZERO);
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager — files on disk
// ═══════════════════════════════════════════════════════════════════

mod file_io {
    use super::*;

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portafolio.pfol");
        let path = path.to_str().unwrap();

        let ledger = sample_ledger();
        StorageManager::save_to_file(&ledger, path).unwrap();

        let loaded = StorageManager::load_from_file(path).unwrap();
        assert_eq!(loaded.transactions.len(), 3);
        assert_eq!(loaded.transactions[0].id, ledger.transactions[0].id);
        assert_eq!(loaded.dividends.len(), 1);
    }

    #[test]
    fn load_nonexistent_file_fails() {
        let result = StorageManager::load_from_file("/nonexistent/portafolio.pfol");
        assert!(matches!(result.unwrap_err(), CoreError::FileIO(_)));
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portafolio.pfol");
        let path = path.to_str().unwrap();

        StorageManager::save_to_file(&sample_ledger(), path).unwrap();
        StorageManager::save_to_file(&Ledger::default(), path).unwrap();

        let loaded = StorageManager::load_from_file(path).unwrap();
        assert!(loaded.transactions.is_empty());
    }

    #[test]
    fn file_on_disk_starts_with_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portafolio.pfol");

        StorageManager::save_to_file(&Ledger::default(), path.to_str().unwrap()).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(raw.starts_with(b"PFOL"));
    }
}
