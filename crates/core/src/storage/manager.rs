use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::format;

/// High-level storage operations: save/load the ledger to/from snapshot bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Serialize a ledger to raw snapshot bytes (portable, platform-independent).
    ///
    /// Flow: Ledger → bincode → PFOL format bytes
    pub fn save_to_bytes(ledger: &Ledger) -> Result<Vec<u8>, CoreError> {
        // 1. Serialize ledger to binary
        let payload = bincode::serialize(ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;

        // 2. Assemble file format
        let file_bytes = format::write_file(format::CURRENT_VERSION, &payload);

        Ok(file_bytes)
    }

    /// Deserialize a ledger from raw snapshot bytes.
    ///
    /// Flow: PFOL bytes → parse header → bincode → Ledger
    pub fn load_from_bytes(data: &[u8]) -> Result<Ledger, CoreError> {
        // 1. Parse file header
        let (_header, payload) = format::read_file(data)?;

        // 2. Deserialize
        let ledger: Ledger = bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))?;

        Ok(ledger)
    }

    /// Save the ledger to a snapshot file on disk.
    pub fn save_to_file(ledger: &Ledger, path: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(ledger)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a ledger from a snapshot file on disk.
    pub fn load_from_file(path: &str) -> Result<Ledger, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}
