//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use earmark_core::{EngineConfig, FileStore, FingerprintStore, QueryInput, Recognizer};
use tracing::debug;

use crate::output::{self, OutputFormat};

/// Settings shared by every command.
pub struct App {
    store_path: PathBuf,
    recognizer: Recognizer,
    format: OutputFormat,
}

impl App {
    /// Resolve configuration: file (if any), then the threshold override.
    pub fn new(
        store_path: PathBuf,
        config_path: Option<PathBuf>,
        threshold: Option<f64>,
        format: String,
    ) -> anyhow::Result<Self> {
        let mut config = match &config_path {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(threshold) = threshold {
            config.matching.threshold = threshold;
        }
        debug!(
            store = %store_path.display(),
            config = ?config_path,
            threshold = config.matching.threshold,
            sample_rate = config.fingerprint.sample_rate,
            "Resolved engine configuration"
        );

        Ok(Self {
            store_path,
            recognizer: Recognizer::with_config(config)?,
            format: OutputFormat::from(format.as_str()),
        })
    }

    async fn open_store(&self) -> anyhow::Result<FileStore> {
        FileStore::open(&self.store_path)
            .await
            .with_context(|| format!("opening catalog {}", self.store_path.display()))
    }

    /// Add one song to the catalog
    pub async fn ingest(&self, identity: &str, path: &Path) -> anyhow::Result<()> {
        let store = self.open_store().await?;
        let result = self.recognizer.ingest(&store, identity, path).await;
        store.close().await?;

        let outcome = result?;
        println!(
            "{}",
            output::format_ingest(&[(identity.to_string(), outcome)], &self.format)
        );
        Ok(())
    }

    /// Add every matching file of a directory
    pub async fn ingest_dir(&self, dir: &Path, ext: &str) -> anyhow::Result<()> {
        let store = self.open_store().await?;
        let result = self.recognizer.ingest_dir(&store, dir, ext).await;
        store.close().await?;

        let outcomes = result?;
        println!("{}", output::format_ingest(&outcomes, &self.format));
        Ok(())
    }

    /// Export a fingerprint document
    pub async fn fingerprint(
        &self,
        input: &Path,
        output_path: &Path,
        song_name: Option<String>,
    ) -> anyhow::Result<()> {
        let document = self.recognizer.fingerprint_document(input, song_name).await?;
        document.write_to(output_path)?;

        println!(
            "{}",
            output::format_document(&document, output_path, &self.format)
        );
        Ok(())
    }

    /// Identify a query clip
    pub async fn identify(&self, input: &Path) -> anyhow::Result<()> {
        let query = QueryInput::from_path(input)?;
        let store = self.open_store().await?;
        let result = self.recognizer.identify(&store, query).await;
        store.close().await?;

        let report = result?.to_report();
        println!("{}", output::format_match(&report, &self.format));
        Ok(())
    }

    /// List catalog identities
    pub async fn list(&self) -> anyhow::Result<()> {
        let store = self.open_store().await?;
        let identities = store.identities().await;
        store.close().await?;

        println!("{}", output::format_list(&identities?, &self.format));
        Ok(())
    }
}
