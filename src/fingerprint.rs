//! Content fingerprints used as the dedup key.
//!
//! A fingerprint is the SHA-256 of a record's fields concatenated in column
//! order with no separator, as 64 lowercase hex characters.
use std::fmt;

use sha2::{Digest, Sha256};

use crate::record::LeakRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(record: &LeakRecord) -> Self {
        let mut hasher = Sha256::new();
        for field in record.fields() {
            hasher.update(field.as_bytes());
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Wrap a value read back from the store.
    pub fn from_stored(hash: String) -> Self {
        Fingerprint(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
