//! End-to-end ingest and query flows.
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐   ┌────────────────┐
//! │ SignalLoader │──▶│ Spectrogram │──▶│ PeakExtractor │──▶│ LandmarkHasher │
//! └──────────────┘   └─────────────┘   └───────────────┘   └───────┬────────┘
//!                                                                  │
//!                                    ┌─────────────────────────────┴──────┐
//!                                    ▼                                    ▼
//!                          FingerprintStore::put                 Matcher::find_best_match
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::{EngineConfig, FingerprintConfig};
use crate::landmark::LandmarkHasher;
use crate::matcher::Matcher;
use crate::peaks::PeakExtractor;
use crate::signal::SignalLoader;
use crate::spectrogram::SpectrogramAnalyzer;
use crate::store::FingerprintStore;
use crate::types::*;
use crate::{Error, Result};

/// Runs the signal → hashes chain with one configuration.
pub struct Fingerprinter {
    loader: SignalLoader,
    analyzer: SpectrogramAnalyzer,
    extractor: PeakExtractor,
    hasher: LandmarkHasher,
}

impl Fingerprinter {
    /// Create a fingerprinter with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FingerprintConfig::default())
    }

    /// Create a fingerprinter with custom configuration.
    pub fn with_config(config: &FingerprintConfig) -> Self {
        Self {
            loader: SignalLoader::from_config(config),
            analyzer: SpectrogramAnalyzer::new(config.frame_size, config.hop_size),
            extractor: PeakExtractor::new(config.top_n, config.amp_min_db),
            hasher: LandmarkHasher::new(config.fan_value, config.max_delta_t),
        }
    }

    /// Decode an audio file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<AudioSignal> {
        self.loader.decode(path)
    }

    /// Hash a prepared signal.
    pub fn fingerprint_signal(&self, signal: &AudioSignal) -> Vec<LandmarkHash> {
        let frames = self.analyzer.compute(signal);
        let peaks = self.extractor.extract(&frames);
        let hashes = self.hasher.hash(&peaks);

        debug!(
            samples = signal.len(),
            frames = frames.len(),
            peaks = peaks.len(),
            hashes = hashes.len(),
            "Fingerprinted signal"
        );
        hashes
    }

    /// Decode and hash an audio file. Returns the hashes and the decoded
    /// duration in seconds.
    pub fn fingerprint_file(&self, path: impl AsRef<Path>) -> Result<(Vec<LandmarkHash>, f64)> {
        let signal = self.load(path)?;
        Ok((self.fingerprint_signal(&signal), signal.duration_secs()))
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingests songs into, and identifies clips against, a caller-provided store.
pub struct Recognizer {
    config: EngineConfig,
    matcher: Matcher,
}

impl Recognizer {
    /// Create a recognizer with default configuration.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            matcher: Matcher::from_config(&config.matching),
            config,
        }
    }

    /// Create a recognizer after validating `config`.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            matcher: Matcher::from_config(&config.matching),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decode and hash `path` off the async executor.
    pub async fn hash_file(&self, path: impl AsRef<Path>) -> Result<(Vec<String>, f64)> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let config = self.config.fingerprint.clone();

        let (hashes, duration) = tokio::task::spawn_blocking(move || {
            Fingerprinter::with_config(&config).fingerprint_file(&path)
        })
        .await
        .map_err(|e| Error::Internal(format!("fingerprint task failed: {e}")))??;

        Ok((hashes.into_iter().map(|h| h.hash).collect(), duration))
    }

    /// Build a fingerprint document for `path`.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn fingerprint_document(
        &self,
        path: impl AsRef<Path>,
        song_name: Option<String>,
    ) -> Result<FingerprintDocument> {
        let (fingerprints, duration) = self.hash_file(path.as_ref()).await?;
        info!(hashes = fingerprints.len(), duration, "Fingerprint document ready");

        Ok(FingerprintDocument {
            fingerprints,
            duration,
            timestamp: Utc::now().timestamp(),
            song_name,
        })
    }

    /// Fingerprint `path` and store it under `identity`.
    #[instrument(skip(self, store, path), fields(path = %path.as_ref().display()))]
    pub async fn ingest<S>(
        &self,
        store: &S,
        identity: &str,
        path: impl AsRef<Path>,
    ) -> Result<IngestOutcome>
    where
        S: FingerprintStore + ?Sized,
    {
        let (hashes, _) = self.hash_file(path).await?;
        self.ingest_hashes(store, identity, &hashes).await
    }

    /// Store precomputed hashes under `identity`.
    pub async fn ingest_hashes<S>(
        &self,
        store: &S,
        identity: &str,
        hashes: &[String],
    ) -> Result<IngestOutcome>
    where
        S: FingerprintStore + ?Sized,
    {
        let outcome = store.put(identity, hashes).await?;
        match outcome {
            IngestOutcome::Stored => info!(identity, hashes = hashes.len(), "Added fingerprint"),
            IngestOutcome::AlreadyExists => warn!(identity, "Song already exists, skipped"),
        }
        Ok(outcome)
    }

    /// Identify a query clip.
    pub async fn identify<S>(&self, store: &S, input: QueryInput) -> Result<MatchResult>
    where
        S: FingerprintStore + ?Sized,
    {
        let hashes = match input {
            QueryInput::Audio(path) => self.hash_file(&path).await?.0,
            QueryInput::Document(document) => document.fingerprints,
        };
        self.matcher.find_best_match(store, &hashes).await
    }

    /// Ingest every file in `dir` with extension `ext`, identity = file stem,
    /// in ascending file-name order.
    pub async fn ingest_dir<S>(
        &self,
        store: &S,
        dir: impl AsRef<Path>,
        ext: &str,
    ) -> Result<Vec<(String, IngestOutcome)>>
    where
        S: FingerprintStore + ?Sized,
    {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if matches_ext && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        info!(dir = %dir.display(), files = files.len(), "Ingesting directory");

        let mut outcomes = Vec::with_capacity(files.len());
        for path in files {
            let Some(identity) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
            else {
                warn!(path = %path.display(), "Skipping file without a usable name");
                continue;
            };
            let outcome = self.ingest(store, &identity, &path).await?;
            outcomes.push((identity, outcome));
        }
        Ok(outcomes)
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn chord(sample_rate: u32, duration_secs: f32, freqs: &[f32]) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                // Frequencies switch every quarter second so peaks move over time
                let step = (t * 4.0) as usize;
                let freq = freqs[step % freqs.len()];
                0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
                    + 0.3 * (2.0 * std::f32::consts::PI * freq * 1.5 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_signal_fingerprint_deterministic() {
        let fingerprinter = Fingerprinter::new();
        let signal = AudioSignal::new(chord(22_050, 3.0, &[440.0, 660.0, 523.0]), 22_050);

        let first = fingerprinter.fingerprint_signal(&signal);
        let second = fingerprinter.fingerprint_signal(&signal);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_signal_has_no_hashes() {
        let fingerprinter = Fingerprinter::new();
        let signal = AudioSignal::new(vec![0.1; 1000], 22_050);
        assert!(fingerprinter.fingerprint_signal(&signal).is_empty());
    }

    #[tokio::test]
    async fn test_document_query_matches_ingested_hashes() {
        let store = MemoryStore::new();
        let recognizer = Recognizer::new();
        let signal = AudioSignal::new(chord(22_050, 3.0, &[440.0, 660.0, 523.0]), 22_050);
        let hashes: Vec<String> = Fingerprinter::new()
            .fingerprint_signal(&signal)
            .into_iter()
            .map(|h| h.hash)
            .collect();

        recognizer.ingest_hashes(&store, "chords", &hashes).await.unwrap();

        let document = FingerprintDocument {
            fingerprints: hashes,
            duration: signal.duration_secs(),
            timestamp: 0,
            song_name: None,
        };
        let result = recognizer
            .identify(&store, QueryInput::Document(document))
            .await
            .unwrap();
        assert_eq!(result.identity.as_deref(), Some("chords"));
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_missing_audio_query_is_decode_error() {
        let store = MemoryStore::new();
        let err = Recognizer::new()
            .identify(&store, QueryInput::Audio("/no/such/clip.wav".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.matching.threshold = 2.0;
        assert!(Recognizer::with_config(config).is_err());
    }
}
