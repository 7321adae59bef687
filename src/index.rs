//! In-memory dedup index mirroring the fingerprints already in the store.
//!
//! Rebuilt from the store at the start of every run and never persisted. The
//! pipeline only calls [`DedupIndex::add`] after the matching insert has
//! committed, so membership here implies membership in the store.
use std::collections::HashSet;

use crate::fingerprint::Fingerprint;
use crate::store::{Store, StoreError};

#[derive(Debug, Default)]
pub struct DedupIndex {
    known: HashSet<Fingerprint>,
}

impl DedupIndex {
    /// Read every fingerprint the store holds for its shape.
    pub fn load(store: &Store) -> Result<Self, StoreError> {
        Ok(Self {
            known: store.load_fingerprints()?,
        })
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.known.contains(fp)
    }

    /// Returns false if the fingerprint was already present.
    pub fn add(&mut self, fp: Fingerprint) -> bool {
        self.known.insert(fp)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
