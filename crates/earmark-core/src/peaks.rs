//! Per-frame spectral peak selection.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{Peak, SpectralFrame};

/// Picks the strongest bins of every frame.
#[derive(Debug, Clone)]
pub struct PeakExtractor {
    top_n: usize,
    amp_min_db: f32,
}

impl PeakExtractor {
    /// Keep up to `top_n` bins per frame that are louder than `amp_min_db`.
    pub fn new(top_n: usize, amp_min_db: f32) -> Self {
        Self { top_n, amp_min_db }
    }

    /// Extract peaks from every frame.
    pub fn extract(&self, frames: &[SpectralFrame]) -> BTreeSet<Peak> {
        let peaks: BTreeSet<Peak> = frames
            .iter()
            .flat_map(|frame| {
                self.frame_peaks(&frame.amplitudes_db)
                    .into_iter()
                    .map(move |bin| Peak::new(frame.t, bin))
            })
            .collect();

        debug!(frames = frames.len(), peaks = peaks.len(), "Extracted spectral peaks");
        peaks
    }

    /// Bins selected in one frame, ascending.
    ///
    /// The top-`n` partition orders bins by amplitude descending and breaks
    /// ties by ascending bin index, so equal amplitudes always resolve the
    /// same way.
    pub fn frame_peaks(&self, amplitudes_db: &[f32]) -> Vec<u32> {
        let n = self.top_n.min(amplitudes_db.len());
        if n == 0 {
            return Vec::new();
        }

        let rank = |a: &usize, b: &usize| -> Ordering {
            amplitudes_db[*b]
                .total_cmp(&amplitudes_db[*a])
                .then_with(|| a.cmp(b))
        };

        let mut indices: Vec<usize> = (0..amplitudes_db.len()).collect();
        if n < indices.len() {
            indices.select_nth_unstable_by(n - 1, rank);
            indices.truncate(n);
        }

        let mut selected: Vec<u32> = indices
            .into_iter()
            .filter(|&f| amplitudes_db[f] > self.amp_min_db)
            .map(|f| f as u32)
            .collect();
        selected.sort_unstable();
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: u32, amplitudes_db: Vec<f32>) -> SpectralFrame {
        SpectralFrame { t, amplitudes_db }
    }

    #[test]
    fn test_top_n_selection() {
        let extractor = PeakExtractor::new(2, -20.0);
        let bins = extractor.frame_peaks(&[-10.0, -1.0, -5.0, 0.0, -15.0]);
        assert_eq!(bins, vec![1, 3]);
    }

    #[test]
    fn test_ties_prefer_lower_bins() {
        let extractor = PeakExtractor::new(3, -20.0);
        let bins = extractor.frame_peaks(&[-3.0; 8]);
        assert_eq!(bins, vec![0, 1, 2]);

        let bins = extractor.frame_peaks(&[-9.0, -3.0, -9.0, -3.0, -9.0, -3.0, -3.0]);
        assert_eq!(bins, vec![1, 3, 5]);
    }

    #[test]
    fn test_amplitude_floor_is_strict() {
        let extractor = PeakExtractor::new(10, -20.0);
        let bins = extractor.frame_peaks(&[-20.0, -19.9, -25.0, 0.0]);
        assert_eq!(bins, vec![1, 3]);
    }

    #[test]
    fn test_frame_may_yield_nothing() {
        let extractor = PeakExtractor::new(10, -20.0);
        assert!(extractor.frame_peaks(&[-80.0; 32]).is_empty());
        assert!(extractor.frame_peaks(&[]).is_empty());
    }

    #[test]
    fn test_fewer_bins_than_top_n() {
        let extractor = PeakExtractor::new(10, -20.0);
        assert_eq!(extractor.frame_peaks(&[0.0, -1.0, -2.0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_extract_tags_frame_time() {
        let extractor = PeakExtractor::new(1, -20.0);
        let peaks = extractor.extract(&[
            frame(0, vec![-5.0, 0.0, -3.0]),
            frame(1, vec![-80.0, -80.0, -80.0]),
            frame(2, vec![0.0, -1.0, -2.0]),
        ]);
        let peaks: Vec<Peak> = peaks.into_iter().collect();
        assert_eq!(peaks, vec![Peak::new(0, 1), Peak::new(2, 0)]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let amplitudes: Vec<f32> = (0..2049)
            .map(|i| -((i * 7919 % 97) as f32) / 4.0)
            .collect();
        let extractor = PeakExtractor::new(10, -20.0);

        let first = extractor.frame_peaks(&amplitudes);
        for _ in 0..5 {
            assert_eq!(extractor.frame_peaks(&amplitudes), first);
        }
        assert_eq!(first.len(), 10);
    }
}
