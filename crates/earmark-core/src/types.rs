//! Core types for landmark fingerprinting.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Decoded mono audio at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    /// PCM samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSignal {
    /// Create a new signal from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Get number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the signal is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One STFT column in decibels relative to the loudest bin of the whole
/// spectrogram. Index `i` of `amplitudes_db` is frequency bin `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Frame index (hop number)
    pub t: u32,
    /// Per-bin amplitude in dB, always <= 0
    pub amplitudes_db: Vec<f32>,
}

impl SpectralFrame {
    /// Iterate `(frequency_bin, amplitude_db)` pairs.
    pub fn bins(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.amplitudes_db
            .iter()
            .enumerate()
            .map(|(f, &db)| (f as u32, db))
    }
}

/// A spectral peak. Ordering is canonical: time first, then frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Peak {
    /// Frame index
    pub time_frame: u32,
    /// Frequency bin index
    pub freq_bin: u32,
}

impl Peak {
    /// Create a new peak.
    pub fn new(time_frame: u32, freq_bin: u32) -> Self {
        Self {
            time_frame,
            freq_bin,
        }
    }
}

impl From<(u32, u32)> for Peak {
    fn from((time_frame, freq_bin): (u32, u32)) -> Self {
        Self::new(time_frame, freq_bin)
    }
}

/// A pair of peaks that survived the fan-out and time-delta filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landmark {
    /// Frequency bin of the earlier peak
    pub anchor_freq: u32,
    /// Frequency bin of the later peak
    pub target_freq: u32,
    /// Frame distance between the two peaks, in `(0, max_delta_t]`
    pub time_delta: u32,
    /// Frame of the earlier peak
    pub anchor_time: u32,
}

/// A landmark digest together with the time of its anchor peak.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LandmarkHash {
    /// 20 lowercase hex characters
    pub hash: String,
    /// Frame of the anchor peak
    pub anchor_time: u32,
}

/// A catalog entry: a unique identity and every hash produced for it,
/// duplicates included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Unique key, typically the song name
    pub identity: String,
    /// Hash multiset in insertion order
    pub hashes: Vec<String>,
}

/// Outcome of a catalog insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The fingerprint was written
    Stored,
    /// The identity was already present; nothing was written
    AlreadyExists,
}

/// Outcome of a catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Best matching identity, if any candidate cleared the threshold
    pub identity: Option<String>,
    /// Overlap score in [0, 1]
    pub score: f64,
    /// Distinct query hashes found in the winning candidate
    pub matched_count: usize,
    /// Number of query hashes, duplicates included
    pub total_count: usize,
    /// Threshold the query was evaluated against
    pub threshold: f64,
}

impl MatchResult {
    /// A result without a winner.
    pub fn no_match(total_count: usize, threshold: f64) -> Self {
        Self {
            identity: None,
            score: 0.0,
            matched_count: 0,
            total_count,
            threshold,
        }
    }

    /// Whether a candidate was selected.
    pub fn is_match(&self) -> bool {
        self.identity.is_some()
    }

    /// Build the externally visible query report.
    pub fn to_report(&self) -> MatchReport {
        MatchReport {
            is_match: self.is_match(),
            song_name: self.identity.clone(),
            score: self.score,
            debug_info: MatchDebugInfo {
                matched_peaks: self.matched_count,
                total_peaks: self.total_count,
                similarity_percent: self.score * 100.0,
                threshold: self.threshold,
            },
        }
    }
}

/// Query outcome in its wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Whether a song was identified
    #[serde(rename = "match")]
    pub is_match: bool,
    /// Identified song
    pub song_name: Option<String>,
    /// Overlap score (0-1)
    pub score: f64,
    /// Scoring details
    pub debug_info: MatchDebugInfo,
}

/// Scoring details attached to a [`MatchReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDebugInfo {
    pub matched_peaks: usize,
    pub total_peaks: usize,
    pub similarity_percent: f64,
    pub threshold: f64,
}

/// A precomputed fingerprint of an audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintDocument {
    /// Landmark hashes in emission order
    pub fingerprints: Vec<String>,
    /// Decoded duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Creation time, Unix seconds
    #[serde(default)]
    pub timestamp: i64,
    /// Song the document was generated for, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
}

impl FingerprintDocument {
    /// Read and parse a document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::document(path, e))?;
        serde_json::from_str(&raw).map_err(|e| Error::document(path, e))
    }

    /// Write the document as pretty JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// What a query is made of, decided once at the pipeline entry.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// An audio file to decode and fingerprint
    Audio(PathBuf),
    /// A fingerprint computed earlier
    Document(FingerprintDocument),
}

impl QueryInput {
    /// Classify a path: `.json` files are fingerprint documents, anything
    /// else is treated as audio.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Ok(QueryInput::Document(FingerprintDocument::from_file(path)?))
        } else {
            Ok(QueryInput::Audio(path.to_path_buf()))
        }
    }
}
