//! Combinatorial landmark hashing.
//!
//! Peaks are put in canonical order (time, then frequency). Every peak is
//! paired with the next `fan_value - 1` peaks in that order, and each pair
//! whose frame distance lies in `(0, max_delta_t]` becomes a landmark
//! `(f1, f2, Δt)` anchored at the earlier peak. The landmark is hashed as
//! the first 20 hex characters of `SHA-1("{f1}|{f2}|{Δt}")`.

use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use tracing::debug;

use crate::types::{Landmark, LandmarkHash, Peak};

/// Hex characters kept from each digest.
pub const HASH_HEX_LEN: usize = 20;

/// Turns peak constellations into landmark hashes.
#[derive(Debug, Clone)]
pub struct LandmarkHasher {
    fan_value: usize,
    max_delta_t: u32,
}

impl LandmarkHasher {
    /// Create a hasher. `fan_value = 1` never pairs anything.
    pub fn new(fan_value: usize, max_delta_t: u32) -> Self {
        Self {
            fan_value,
            max_delta_t,
        }
    }

    /// Hash a peak constellation. The output order follows the canonical
    /// peak order and is identical for identical input.
    pub fn hash<'a, I>(&self, peaks: I) -> Vec<LandmarkHash>
    where
        I: IntoIterator<Item = &'a Peak>,
    {
        let hashes: Vec<LandmarkHash> = self
            .landmarks(peaks)
            .iter()
            .map(|landmark| LandmarkHash {
                hash: landmark_digest(landmark),
                anchor_time: landmark.anchor_time,
            })
            .collect();

        debug!(hashes = hashes.len(), "Generated landmark hashes");
        hashes
    }

    /// Pair peaks into landmarks without hashing them.
    pub fn landmarks<'a, I>(&self, peaks: I) -> Vec<Landmark>
    where
        I: IntoIterator<Item = &'a Peak>,
    {
        let mut points: Vec<Peak> = peaks.into_iter().copied().collect();
        points.sort_unstable();

        let mut landmarks = Vec::new();
        for (i, anchor) in points.iter().enumerate() {
            for target in points.iter().skip(i + 1).take(self.fan_value.saturating_sub(1)) {
                let time_delta = target.time_frame - anchor.time_frame;
                if time_delta > 0 && time_delta <= self.max_delta_t {
                    landmarks.push(Landmark {
                        anchor_freq: anchor.freq_bin,
                        target_freq: target.freq_bin,
                        time_delta,
                        anchor_time: anchor.time_frame,
                    });
                }
            }
        }

        landmarks
    }
}

/// Truncated SHA-1 of `"{f1}|{f2}|{Δt}"`.
pub fn landmark_digest(landmark: &Landmark) -> String {
    let input = format!(
        "{}|{}|{}",
        landmark.anchor_freq, landmark.target_freq, landmark.time_delta
    );
    let digest = digest(&SHA1_FOR_LEGACY_USE_ONLY, input.as_bytes());
    hex::encode(&digest.as_ref()[..HASH_HEX_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(points: &[(u32, u32)]) -> Vec<Peak> {
        points.iter().map(|&p| Peak::from(p)).collect()
    }

    #[test]
    fn test_worked_example() {
        let hasher = LandmarkHasher::new(5, 100);
        let input = peaks(&[(0, 10), (3, 12), (150, 10)]);

        let landmarks = hasher.landmarks(&input);
        assert_eq!(
            landmarks,
            vec![Landmark {
                anchor_freq: 10,
                target_freq: 12,
                time_delta: 3,
                anchor_time: 0,
            }]
        );

        let hashes = hasher.hash(&input);
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].anchor_time, 0);
    }

    #[test]
    fn test_known_digest() {
        let landmark = Landmark {
            anchor_freq: 10,
            target_freq: 12,
            time_delta: 3,
            anchor_time: 0,
        };
        let hash = landmark_digest(&landmark);
        assert_eq!(hash, "82adf871b67636f3ea0a");
        assert_eq!(hash.len(), HASH_HEX_LEN);
    }

    #[test]
    fn test_same_frame_pairs_rejected() {
        let hasher = LandmarkHasher::new(5, 100);
        assert!(hasher.landmarks(&peaks(&[(4, 1), (4, 2), (4, 3)])).is_empty());
    }

    #[test]
    fn test_fan_out_limits_partners() {
        let hasher = LandmarkHasher::new(3, 100);
        let input = peaks(&[(0, 1), (1, 1), (2, 1), (3, 1)]);
        let landmarks = hasher.landmarks(&input);

        // Each anchor reaches at most two later peaks
        let from_first = landmarks.iter().filter(|l| l.anchor_time == 0).count();
        assert_eq!(from_first, 2);
        assert_eq!(landmarks.len(), 2 + 2 + 1);
    }

    #[test]
    fn test_fan_value_one_pairs_nothing() {
        let hasher = LandmarkHasher::new(1, 100);
        assert!(hasher.landmarks(&peaks(&[(0, 1), (1, 2)])).is_empty());
    }

    #[test]
    fn test_canonical_order_independent_of_input_order() {
        let hasher = LandmarkHasher::new(5, 100);
        let ordered = peaks(&[(0, 5), (0, 9), (2, 3), (7, 1)]);
        let shuffled = peaks(&[(7, 1), (0, 9), (2, 3), (0, 5)]);
        assert_eq!(hasher.hash(&ordered), hasher.hash(&shuffled));
    }

    #[test]
    fn test_delta_bound() {
        let hasher = LandmarkHasher::new(5, 100);
        let input: Vec<Peak> = (0..400u32)
            .map(|i| Peak::new(i * 13 % 517, i % 31))
            .collect();

        let landmarks = hasher.landmarks(&input);
        assert!(!landmarks.is_empty());
        assert!(landmarks
            .iter()
            .all(|l| l.time_delta > 0 && l.time_delta <= 100));
    }

    #[test]
    fn test_frequency_order_matters() {
        let hasher = LandmarkHasher::new(5, 100);
        let up = hasher.hash(&peaks(&[(0, 10), (1, 20)]));
        let down = hasher.hash(&peaks(&[(0, 20), (1, 10)]));
        assert_ne!(up[0].hash, down[0].hash);
    }
}
