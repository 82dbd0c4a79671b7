//! Canonical fingerprints
//!
//! A fingerprint is the canonical representation of a record's
//! identity-bearing fields, used to look up or create a DedupEntry. The
//! recipe - which fields, in what order - is explicit, versioned
//! configuration: changing it is an auditable operation, never a silent
//! behavior change. The store refuses to open a file written under a
//! different recipe.

use dedupx_core::{field, Record};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex length of a fingerprint digest.
const DIGEST_LEN: usize = 16;

/// Versioned field list a fingerprint is derived from.
///
/// Fields are read from the standardized record, so the `*_STD` derivations
/// carry the same normalization used for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecipe {
    pub version: u32,
    pub fields: Vec<String>,
}

impl Default for FingerprintRecipe {
    fn default() -> Self {
        Self {
            version: 1,
            fields: vec![
                field::SOURCE_TYPE.to_string(),
                field::SOURCE_ID.to_string(),
                field::COMPANY_NAME_STD.to_string(),
                field::ADDRESS1_STD.to_string(),
                field::PHONE_STD.to_string(),
            ],
        }
    }
}

impl FingerprintRecipe {
    /// Fingerprint of a standardized record under this recipe.
    pub fn fingerprint(&self, record: &Record) -> Fingerprint {
        let mut hasher = Sha256::new();
        for (i, name) in self.fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            let value = record.get(name).trim();
            // Source type tags compare case-insensitively across feeds.
            if name == field::SOURCE_TYPE {
                hasher.update(value.to_uppercase().as_bytes());
            } else {
                hasher.update(value.as_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(DIGEST_LEN);
        for byte in digest.iter().take(DIGEST_LEN / 2) {
            hex.push_str(&format!("{:02x}", byte));
        }
        Fingerprint(hex)
    }
}

/// Truncated hex digest identifying a canonical record identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
