//! Content fingerprinting — SHA-256 over normalized content, used as the cache key.
//!
//! Field order is fixed: normalized text, then the canonical layout summary.
//! Blocks are deliberately excluded: two extractions that agree on text and
//! layout are the same analyzable document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::ExtractedContent;

const DOMAIN_TAG: &[u8] = b"resume-analysis/fingerprint/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 32]);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FingerprintParseError {
    #[error("fingerprint must be 64 hex characters, got {0}")]
    Length(usize),
    #[error("fingerprint is not valid hex")]
    Hex,
}

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Leading digest byte; uniformly distributed, so it spreads keys evenly.
    pub fn prefix(&self) -> u8 {
        self.0[0]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(FingerprintParseError::Length(s.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| FingerprintParseError::Hex)?;
        Ok(Fingerprint(bytes))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

/// Pure and infallible. Malformed content hashes as its canonical form
/// (empty text, one column) instead of being rejected.
pub fn fingerprint(content: &ExtractedContent) -> Fingerprint {
    let text = content.normalized_text();
    let layout = &content.layout;

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update((text.len() as u64).to_be_bytes());
    hasher.update(text.as_bytes());
    hasher.update([
        layout.canonical_columns(),
        layout.has_header as u8,
        layout.has_footer as u8,
    ]);

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Fingerprint(bytes)
}
