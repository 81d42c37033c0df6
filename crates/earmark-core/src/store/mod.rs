//! Fingerprint catalog storage.
//!
//! The pipeline never owns a store. Callers open one, pass a reference into
//! ingest and match operations, and close it when done.

mod file;
mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::types::IngestOutcome;
use crate::Result;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Catalog of fingerprints keyed by identity.
///
/// Implementations must insert atomically only when the identity is absent,
/// and make a completed insert visible to every later lookup.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Store `hashes` under `identity`. An existing identity is left
    /// untouched and reported as [`IngestOutcome::AlreadyExists`].
    async fn put(&self, identity: &str, hashes: &[String]) -> Result<IngestOutcome>;

    /// Identities whose stored hashes share at least one value with
    /// `query`, in ascending order.
    async fn lookup_candidates(&self, query: &[String]) -> Result<BTreeSet<String>>;

    /// Hashes stored for `identity`, exactly as inserted.
    async fn get_hashes(&self, identity: &str) -> Result<Option<Vec<String>>>;

    /// Every stored identity, ascending.
    async fn identities(&self) -> Result<Vec<String>>;

    /// Flush and release the store. Later calls fail with
    /// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).
    async fn close(&self) -> Result<()>;
}
