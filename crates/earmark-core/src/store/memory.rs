//! In-process catalog.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::FingerprintStore;
use crate::types::{Fingerprint, IngestOutcome};
use crate::{Error, Result};

/// Entries plus an inverted index from hash to identities.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    entries: BTreeMap<String, Vec<String>>,
    index: HashMap<String, BTreeSet<String>>,
    closed: bool,
}

impl Catalog {
    pub(crate) fn from_fingerprints(fingerprints: Vec<Fingerprint>) -> Result<Self> {
        let mut catalog = Self::default();
        for fingerprint in fingerprints {
            let identity = fingerprint.identity;
            let outcome = catalog.insert(identity.clone(), fingerprint.hashes);
            if outcome == IngestOutcome::AlreadyExists {
                return Err(Error::store(format!(
                    "duplicate identity in catalog: {identity}"
                )));
            }
        }
        Ok(catalog)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::store("store is closed"));
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub(crate) fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub(crate) fn insert(&mut self, identity: String, hashes: Vec<String>) -> IngestOutcome {
        if self.entries.contains_key(&identity) {
            return IngestOutcome::AlreadyExists;
        }

        for hash in &hashes {
            self.index
                .entry(hash.clone())
                .or_default()
                .insert(identity.clone());
        }
        self.entries.insert(identity, hashes);
        IngestOutcome::Stored
    }

    pub(crate) fn candidates(&self, query: &[String]) -> BTreeSet<String> {
        query
            .iter()
            .filter_map(|hash| self.index.get(hash))
            .flatten()
            .cloned()
            .collect()
    }

    pub(crate) fn hashes(&self, identity: &str) -> Option<Vec<String>> {
        self.entries.get(identity).cloned()
    }

    pub(crate) fn identities(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn to_fingerprints(&self) -> Vec<Fingerprint> {
        self.entries
            .iter()
            .map(|(identity, hashes)| Fingerprint {
                identity: identity.clone(),
                hashes: hashes.clone(),
            })
            .collect()
    }
}

/// Catalog held in memory for the lifetime of the handle.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `fingerprints`.
    pub fn with_fingerprints(fingerprints: Vec<Fingerprint>) -> Result<Self> {
        Ok(Self {
            catalog: RwLock::new(Catalog::from_fingerprints(fingerprints)?),
        })
    }
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    #[instrument(skip(self, hashes), fields(count = hashes.len()))]
    async fn put(&self, identity: &str, hashes: &[String]) -> Result<IngestOutcome> {
        let mut catalog = self.catalog.write().await;
        catalog.ensure_open()?;

        let outcome = catalog.insert(identity.to_string(), hashes.to_vec());
        match outcome {
            IngestOutcome::Stored => debug!("Fingerprint stored"),
            IngestOutcome::AlreadyExists => warn!("Identity already exists, skipping"),
        }
        Ok(outcome)
    }

    async fn lookup_candidates(&self, query: &[String]) -> Result<BTreeSet<String>> {
        let catalog = self.catalog.read().await;
        catalog.ensure_open()?;
        Ok(catalog.candidates(query))
    }

    async fn get_hashes(&self, identity: &str) -> Result<Option<Vec<String>>> {
        let catalog = self.catalog.read().await;
        catalog.ensure_open()?;
        Ok(catalog.hashes(identity))
    }

    async fn identities(&self) -> Result<Vec<String>> {
        let catalog = self.catalog.read().await;
        catalog.ensure_open()?;
        Ok(catalog.identities())
    }

    async fn close(&self) -> Result<()> {
        self.catalog.write().await.close();
        Ok(())
    }
}
