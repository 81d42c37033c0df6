//! Earmark Core - Landmark Audio Fingerprinting
//!
//! Identifies a music track from a short clip by matching combinatorial
//! hashes of spectral peaks against a catalog:
//!
//! - **Signal loading**: multi-format decoding, headroom normalization,
//!   downmix and resampling to one mono rate
//! - **Spectrogram**: Hann-windowed STFT in dB relative to the loudest bin
//!   of the whole clip
//! - **Peaks**: the strongest bins of every frame, with deterministic ties
//! - **Landmarks**: peak pairs hashed as truncated SHA-1 digests
//! - **Matching**: best hash-set overlap among catalog candidates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  SignalLoader   │───▶│ Spectrogram      │───▶│ PeakExtractor   │
//! └─────────────────┘    └──────────────────┘    └────────┬────────┘
//!                                                         │
//!                                                ┌────────▼────────┐
//!                                                │ LandmarkHasher  │
//!                                                └────────┬────────┘
//!                               ┌─────────────────────────┴─────────┐
//!                               ▼                                   ▼
//!                      ┌─────────────────┐                 ┌─────────────────┐
//!                      │ Store::put      │                 │ Matcher         │
//!                      │ (ingest)        │                 │ (query)         │
//!                      └─────────────────┘                 └─────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use earmark_core::{FileStore, FingerprintStore, QueryInput, Recognizer};
//!
//! #[tokio::main]
//! async fn main() -> earmark_core::Result<()> {
//!     let store = FileStore::open("fingerprints.json").await?;
//!     let recognizer = Recognizer::new();
//!
//!     recognizer.ingest(&store, "Song A", "songs/song_a.wav").await?;
//!
//!     let result = recognizer
//!         .identify(&store, QueryInput::from_path("clip.wav")?)
//!         .await?;
//!     println!("{:?} ({:.1}%)", result.identity, result.score * 100.0);
//!
//!     store.close().await
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod landmark;
pub mod matcher;
pub mod peaks;
pub mod pipeline;
pub mod signal;
pub mod spectrogram;
pub mod store;
pub mod types;

pub use config::{EngineConfig, FingerprintConfig, MatchConfig};
pub use error::{Error, Result};
pub use landmark::LandmarkHasher;
pub use matcher::Matcher;
pub use peaks::PeakExtractor;
pub use pipeline::{Fingerprinter, Recognizer};
pub use signal::SignalLoader;
pub use spectrogram::SpectrogramAnalyzer;
pub use store::{FileStore, FingerprintStore, MemoryStore};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup
pub fn init() {
    tracing::info!(version = VERSION, "Earmark Core initialized");
}
