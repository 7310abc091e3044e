//! Cover quality scoring.
//!
//! A pure function over a raster cover; front-ends use it to steer users
//! toward covers with enough texture to hide in. The embedder never
//! consults it - capacity checks are the position engine's job.

use std::path::Path;

use crate::cover::Cover;
use crate::cover::raster::RasterCover;
use crate::position::{VARIANCE_THRESHOLD, variance_map};
use crate::{Error, Result};

/// Human-facing quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreLabel {
    fn for_score(score: u8) -> Self {
        match score {
            75.. => ScoreLabel::Excellent,
            55.. => ScoreLabel::Good,
            35.. => ScoreLabel::Fair,
            _ => ScoreLabel::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Good => "Good",
            ScoreLabel::Fair => "Fair",
            ScoreLabel::Poor => "Poor",
        }
    }
}

/// Score plus its components, each already scaled to `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    /// 0-100.
    pub score: u8,
    pub label: ScoreLabel,
    /// Normalised entropy of the 8-bit sample histogram.
    pub entropy: f64,
    /// Fraction of pixels whose 3×3 variance clears the eligibility
    /// threshold - the same mask the adaptive embedder uses.
    pub texture: f64,
    /// `min(1, pixels / 1920·1080)`.
    pub resolution: f64,
}

/// Score the raster cover at `path`.
///
/// Non-raster covers are not scored; capacity is the meaningful metric
/// for JPEG and WAV.
pub fn score(path: &Path) -> Result<Score> {
    match Cover::load(path)? {
        Cover::Raster(raster) => Ok(score_raster(&raster)),
        _ => Err(Error::ModeMismatch("scoring applies to raster covers")),
    }
}

/// Entropy ×0.40 + texture ×0.40 + resolution ×0.20, rounded to 0-100.
pub fn score_raster(raster: &RasterCover) -> Score {
    let entropy = histogram_entropy(raster.pixels()) / 8.0;

    let var = variance_map(raster);
    let textured = var.iter().filter(|&&v| v >= VARIANCE_THRESHOLD).count();
    let texture = textured as f64 / var.len() as f64;

    let pixels = raster.width() as f64 * raster.height() as f64;
    let resolution = (pixels / (1920.0 * 1080.0)).min(1.0);

    let combined = entropy * 0.40 + texture * 0.40 + resolution * 0.20;
    let score = (combined * 100.0).round() as u8;
    Score {
        score,
        label: ScoreLabel::for_score(score),
        entropy,
        texture,
        resolution,
    }
}

/// Shannon entropy of the byte histogram, in bits per sample.
fn histogram_entropy(samples: &[u8]) -> f64 {
    let mut histogram = [0u64; 256];
    for &b in samples {
        histogram[b as usize] += 1;
    }
    let total = samples.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn noise_outscores_flat_grey() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut pixels = vec![0u8; 128 * 128 * 3];
        rng.fill_bytes(&mut pixels);
        let noisy = score_raster(&RasterCover::from_raw(128, 128, pixels));

        let flat = score_raster(&RasterCover::from_raw(128, 128, vec![128u8; 128 * 128 * 3]));

        assert!(noisy.score > flat.score);
        assert!(noisy.entropy > 0.9);
        assert!(noisy.texture > 0.9);
        assert_eq!(flat.texture, 0.0);
        assert_eq!(flat.label, ScoreLabel::Poor);
    }

    #[test]
    fn resolution_term_saturates() {
        let small = score_raster(&RasterCover::from_raw(8, 8, vec![0u8; 8 * 8 * 3]));
        assert!(small.resolution < 0.001);
        // 1920·1080 would need a big allocation; check the formula instead.
        assert_eq!((2073600.0f64 / 2073600.0).min(1.0), 1.0);
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(ScoreLabel::for_score(100), ScoreLabel::Excellent);
        assert_eq!(ScoreLabel::for_score(75), ScoreLabel::Excellent);
        assert_eq!(ScoreLabel::for_score(74), ScoreLabel::Good);
        assert_eq!(ScoreLabel::for_score(55), ScoreLabel::Good);
        assert_eq!(ScoreLabel::for_score(54), ScoreLabel::Fair);
        assert_eq!(ScoreLabel::for_score(35), ScoreLabel::Fair);
        assert_eq!(ScoreLabel::for_score(34), ScoreLabel::Poor);
    }

    #[test]
    fn entropy_of_uniform_bytes_is_eight_bits() {
        let samples: Vec<u8> = (0..=255u8).collect();
        assert!((histogram_entropy(&samples) - 8.0).abs() < 1e-9);
    }
}
