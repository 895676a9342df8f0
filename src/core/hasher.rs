//! Archive fingerprinting with BLAKE3.
//!
//! The fingerprint is recorded in the submission audit event so a scan on
//! the service can be traced back to the exact archive that was uploaded.

use serde::{Deserialize, Serialize};

/// Content fingerprint of an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFingerprint {
    /// BLAKE3 hash, lowercase hex.
    pub blake3: String,
    /// Archive size in bytes.
    pub size: u64,
}

impl ArchiveFingerprint {
    /// Fingerprints archive bytes already in memory.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            blake3: blake3::hash(data).to_hex().to_string(),
            size: data.len() as u64,
        }
    }
}
