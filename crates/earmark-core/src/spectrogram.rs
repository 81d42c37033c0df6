//! Short-time Fourier analysis.
//!
//! Produces a log-amplitude spectrogram whose decibel scale is anchored to
//! the loudest bin of the whole clip, not of each frame, so a quiet passage
//! never produces peaks as strong as the chorus.

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::types::{AudioSignal, SpectralFrame};

/// Magnitudes below this are treated as this value before taking the log.
const AMIN: f32 = 1e-5;

/// Dynamic range kept below the global maximum, in dB.
const TOP_DB: f32 = 80.0;

/// Windowed STFT producing dB frames.
pub struct SpectrogramAnalyzer {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f32>,
}

impl SpectrogramAnalyzer {
    /// Create a new analyzer.
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        // Periodic Hann window
        let window: Vec<f32> = (0..frame_size)
            .map(|i| {
                0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / frame_size as f32).cos()
            })
            .collect();

        Self {
            frame_size,
            hop_size,
            window,
        }
    }

    /// Number of frequency bins per frame.
    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Number of frames for `num_samples` input samples, without padding.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples < self.frame_size || self.hop_size == 0 {
            return 0;
        }
        (num_samples - self.frame_size) / self.hop_size + 1
    }

    /// Compute the dB spectrogram of `signal`.
    pub fn compute(&self, signal: &AudioSignal) -> Vec<SpectralFrame> {
        self.compute_samples(&signal.samples)
    }

    /// Compute the dB spectrogram of raw mono samples.
    pub fn compute_samples(&self, samples: &[f32]) -> Vec<SpectralFrame> {
        let magnitudes = self.magnitude_spectrogram(samples);
        let global_max = magnitudes
            .iter()
            .flat_map(|frame| frame.iter())
            .fold(0.0f32, |acc, &m| acc.max(m));

        debug!(
            frames = magnitudes.len(),
            global_max, "Computed magnitude spectrogram"
        );

        magnitudes
            .into_iter()
            .enumerate()
            .map(|(t, frame)| SpectralFrame {
                t: t as u32,
                amplitudes_db: to_db(&frame, global_max),
            })
            .collect()
    }

    /// Linear magnitude spectrogram: one `|X(f)|` vector per hop.
    pub fn magnitude_spectrogram(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let num_frames = self.num_frames(samples.len());
        if num_frames == 0 {
            return Vec::new();
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.frame_size);
        let num_bins = self.num_bins();

        let mut spectrogram = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_size];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            let frame_samples = &samples[start..start + self.frame_size];

            for ((slot, &s), &w) in buffer
                .iter_mut()
                .zip(frame_samples.iter())
                .zip(self.window.iter())
            {
                *slot = Complex::new(s * w, 0.0);
            }

            fft.process(&mut buffer);

            let magnitude: Vec<f32> = buffer[..num_bins].iter().map(|c| c.norm()).collect();
            spectrogram.push(magnitude);
        }

        spectrogram
    }
}

/// Convert magnitudes to dB relative to `reference`, clipped to `TOP_DB`
/// below the reference.
fn to_db(magnitudes: &[f32], reference: f32) -> Vec<f32> {
    let floor = -TOP_DB;
    if reference <= 0.0 {
        return vec![floor; magnitudes.len()];
    }

    let ref_db = 20.0 * reference.max(AMIN).log10();
    magnitudes
        .iter()
        .map(|&m| (20.0 * m.max(AMIN).log10() - ref_db).max(floor))
        .collect()
}
