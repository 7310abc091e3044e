//! Deterministic slot sequences.
//!
//! The embedder and the extractor never communicate; they agree on where
//! the payload lives purely by re-deriving the same slot sequence from
//! (cover, mode, key material). Everything in this module is therefore
//! bit-exact by construction:
//!
//! * The raster eligibility mask is computed from samples with the
//!   embedding bit masked out, so the mask derived from a stego file is
//!   identical to the one derived from its cover.
//! * JPEG slots exclude coefficient values {-2, -1, 0, 1}. Excluding -2 is
//!   what keeps the usable set closed under LSB writes: in two's
//!   complement `(-2 & !1) | 1 == -1`, and -1 is skipped by the extractor.
//! * The keyed permutation is a Fisher-Yates shuffle driven by a ChaCha20
//!   stream (nonce zero, counter zero) with rejection-sampled uniform
//!   indices, so both sides draw the identical index sequence.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::cover::jpeg::JpegCover;
use crate::cover::raster::RasterCover;
use crate::cover::{Cover, Slot};
use crate::{Error, Result};

/// Minimum 3×3 intensity variance for a raster pixel to be eligible.
///
/// A design constant, not data-dependent; applied to the mask computed
/// from LSB-masked samples on both sides.
pub const VARIANCE_THRESHOLD: f64 = 10.0;

/// How payload bits are mapped onto a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StegMode {
    /// Raster: variance-masked slots, keyed permutation. The default.
    Adaptive,
    /// Raster: plain row-major order, no key. Debugging only.
    Sequential,
    /// JPEG: usable AC coefficients in component order.
    Dct,
    /// WAV: every sample byte in order.
    Pcm,
}

impl StegMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StegMode::Adaptive => "adaptive",
            StegMode::Sequential => "sequential",
            StegMode::Dct => "dct",
            StegMode::Pcm => "pcm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "adaptive" => Some(StegMode::Adaptive),
            "sequential" => Some(StegMode::Sequential),
            "dct" => Some(StegMode::Dct),
            "pcm" => Some(StegMode::Pcm),
            _ => None,
        }
    }

    /// The default mode for a cover family.
    pub fn for_cover(cover: &Cover) -> Self {
        match cover {
            Cover::Raster(_) => StegMode::Adaptive,
            Cover::Jpeg(_) => StegMode::Dct,
            Cover::Wav(_) => StegMode::Pcm,
        }
    }
}

/// Produce the slot sequence for `cover` under `mode`.
///
/// `key` seeds the adaptive permutation and is ignored by every other
/// mode; pass `None` for the unpermuted adaptive enumeration (the deniable
/// splitter's input). Returns [`Error::ModeMismatch`] when the mode does
/// not apply to the cover family.
pub fn slot_sequence(cover: &Cover, mode: StegMode, key: Option<&[u8; 32]>) -> Result<Vec<Slot>> {
    match (cover, mode) {
        (Cover::Raster(r), StegMode::Adaptive) => {
            let mut slots = eligible_slots(r);
            if let Some(seed) = key {
                shuffle(&mut slots, seed);
            }
            Ok(slots)
        }
        (Cover::Raster(r), StegMode::Sequential) => {
            Ok((0..r.pixels().len() as u32).map(|i| Slot::new(0, i)).collect())
        }
        (Cover::Jpeg(j), StegMode::Dct) => Ok(dct_slots(j)),
        (Cover::Wav(w), StegMode::Pcm) => {
            Ok((0..w.sample_len() as u32).map(|i| Slot::new(0, i)).collect())
        }
        _ => Err(Error::ModeMismatch("steg mode does not fit cover type")),
    }
}

/// 3×3 clamped-window variance of the channel-averaged intensity, one
/// value per pixel.
///
/// Intensities are taken from LSB-masked samples (`b & !1`), which is what
/// makes the map - and the mask thresholded from it - exactly invariant
/// under embedding.
pub(crate) fn variance_map(raster: &RasterCover) -> Vec<f64> {
    let (w, h) = (raster.width() as usize, raster.height() as usize);
    let pixels = raster.pixels();

    let mut intensity = vec![0f64; w * h];
    for (i, px) in pixels.chunks_exact(3).enumerate() {
        let sum = (px[0] & !1) as u32 + (px[1] & !1) as u32 + (px[2] & !1) as u32;
        intensity[i] = sum as f64 / 3.0;
    }

    let mut var = vec![0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0f64;
            let mut sum_sq = 0f64;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;
                    let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
                    let g = intensity[ny * w + nx];
                    sum += g;
                    sum_sq += g * g;
                }
            }
            let mean = sum / 9.0;
            var[y * w + x] = sum_sq / 9.0 - mean * mean;
        }
    }
    var
}

/// Eligible raster slots in pixel row-major × channel (R,G,B) order.
fn eligible_slots(raster: &RasterCover) -> Vec<Slot> {
    let var = variance_map(raster);
    let mut slots = Vec::new();
    for (pixel, v) in var.iter().enumerate() {
        if *v >= VARIANCE_THRESHOLD {
            let base = pixel as u32 * 3;
            slots.push(Slot::new(0, base));
            slots.push(Slot::new(0, base + 1));
            slots.push(Slot::new(0, base + 2));
        }
    }
    slots
}

/// Usable AC coefficient slots: all components in scan order, row-major
/// over each component's 2-D array.
fn dct_slots(jpeg: &JpegCover) -> Vec<Slot> {
    let mut slots = Vec::new();
    for (p, plane) in jpeg.planes().iter().enumerate() {
        for (idx, &value) in plane.data.iter().enumerate() {
            let (r, c) = (idx / plane.width, idx % plane.width);
            if r % 8 == 0 && c % 8 == 0 {
                continue; // DC term
            }
            if coefficient_usable(value) {
                slots.push(Slot::new(p as u8, idx as u32));
            }
        }
    }
    slots
}

/// A coefficient can carry a bit iff its value is outside {-2, -1, 0, 1}.
#[inline]
pub(crate) fn coefficient_usable(value: i16) -> bool {
    !(-2..=1).contains(&value)
}

/// Keyed Fisher-Yates shuffle.
///
/// The ChaCha20 stream starts at position zero for every call, so embed
/// and extract draw identical index sequences for the same seed.
pub(crate) fn shuffle(slots: &mut [Slot], seed: &[u8; 32]) {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    for i in (1..slots.len()).rev() {
        let j = uniform(&mut rng, i as u32 + 1);
        slots.swap(i, j as usize);
    }
}

/// Uniform sample from `[0, n)` by rejection, so no modulo bias couples
/// the permutation to the stream length.
#[inline]
fn uniform(rng: &mut ChaCha20Rng, n: u32) -> u32 {
    debug_assert!(n > 0);
    let span = 1u64 << 32;
    let limit = span - span % n as u64;
    loop {
        let v = rng.next_u32() as u64;
        if v < limit {
            return (v % n as u64) as u32;
        }
    }
}

/// Deterministic non-overlapping partition for deniable embedding.
///
/// Permutes the full (unkeyed) adaptive sequence with a Fisher-Yates
/// shuffle seeded by `partition_seed` - independent of either payload's
/// steg key - and splits it in half. Half 0 is `π(S)[0 .. N/2]`, half 1
/// the rest.
pub fn partition(mut slots: Vec<Slot>, partition_seed: &[u8; 32]) -> (Vec<Slot>, Vec<Slot>) {
    shuffle(&mut slots, partition_seed);
    let tail = slots.split_off(slots.len() / 2);
    (slots, tail)
}
