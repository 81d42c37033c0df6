//! Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Parameters of the load → spectrogram → peaks → hashes chain.
///
/// Catalog and query fingerprints are only comparable when both were
/// produced with the same configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Peak normalization headroom below full scale, in dB
    pub headroom_db: f32,
    /// STFT window size
    pub frame_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Peaks kept per frame
    pub top_n: usize,
    /// Peaks must be louder than this, in dB relative to the global maximum
    pub amp_min_db: f32,
    /// Fan-out factor: each peak pairs with the next `fan_value - 1` peaks
    pub fan_value: usize,
    /// Largest allowed frame distance within a pair
    pub max_delta_t: u32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            headroom_db: 20.0,
            frame_size: 4096,
            hop_size: 512,
            top_n: 10,
            amp_min_db: -20.0,
            fan_value: 5,
            max_delta_t: 100,
        }
    }
}

impl FingerprintConfig {
    /// Reject parameter sets the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("sample_rate", self.sample_rate as usize),
            ("frame_size", self.frame_size),
            ("hop_size", self.hop_size),
            ("top_n", self.top_n),
            ("fan_value", self.fan_value),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        if let Some((name, _)) = zero {
            return Err(Error::InvalidConfig(format!("{name} must be greater than zero")));
        }
        if !self.headroom_db.is_finite() || self.headroom_db < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "headroom_db must be a non-negative number, got {}",
                self.headroom_db
            )));
        }
        if !self.amp_min_db.is_finite() {
            return Err(Error::InvalidConfig("amp_min_db must be finite".into()));
        }
        Ok(())
    }
}

/// Catalog matching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum overlap score for a candidate to count as a match
    pub threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { threshold: 0.05 }
    }
}

impl MatchConfig {
    /// Threshold must lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Complete engine configuration, loadable from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fingerprinting parameters
    pub fingerprint: FingerprintConfig,
    /// Matching parameters
    pub matching: MatchConfig,
}

impl EngineConfig {
    /// Load a configuration file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.fingerprint.validate()?;
        self.matching.validate()
    }
}
