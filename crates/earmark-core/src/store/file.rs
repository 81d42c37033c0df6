//! JSON-file backed catalog.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::memory::Catalog;
use super::FingerprintStore;
use crate::types::{Fingerprint, IngestOutcome};
use crate::{Error, Result};

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    fingerprints: Vec<Fingerprint>,
}

/// Catalog persisted as one JSON document.
///
/// Every successful `put` rewrites the file before it becomes visible, so a
/// failed write leaves both the file and the in-memory view unchanged.
/// Reads and `close` never touch the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    catalog: RwLock<Catalog>,
}

impl FileStore {
    /// Open the catalog at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<CatalogFile>(&raw).map_err(|e| {
                Error::store(format!("corrupt catalog {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => CatalogFile::default(),
            Err(e) => {
                return Err(Error::store(format!(
                    "cannot read catalog {}: {e}",
                    path.display()
                )))
            }
        };

        info!(
            path = %path.display(),
            songs = file.fingerprints.len(),
            "Opened fingerprint catalog"
        );

        Ok(Self {
            catalog: RwLock::new(Catalog::from_fingerprints(file.fingerprints)?),
            path,
        })
    }

    /// Location of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, fingerprints: Vec<Fingerprint>) -> Result<()> {
        let json = serde_json::to_string(&CatalogFile { fingerprints })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::store(format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::store(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::store(format!("cannot replace {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl FingerprintStore for FileStore {
    #[instrument(skip(self, hashes), fields(count = hashes.len()))]
    async fn put(&self, identity: &str, hashes: &[String]) -> Result<IngestOutcome> {
        let mut catalog = self.catalog.write().await;
        catalog.ensure_open()?;

        if catalog.contains(identity) {
            warn!("Identity already exists, skipping");
            return Ok(IngestOutcome::AlreadyExists);
        }

        let mut snapshot = catalog.to_fingerprints();
        snapshot.push(Fingerprint {
            identity: identity.to_string(),
            hashes: hashes.to_vec(),
        });
        snapshot.sort_by(|a, b| a.identity.cmp(&b.identity));
        self.persist(snapshot).await?;

        Ok(catalog.insert(identity.to_string(), hashes.to_vec()))
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
        let mut catalog = self.catalog.write().await;
        if catalog.ensure_open().is_err() {
            return Ok(());
        }

        // Every successful put has already been written through
        catalog.close();
        info!(path = %self.path.display(), "Closed fingerprint catalog");
        Ok(())
    }
}
