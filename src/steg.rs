//! Embedding and extraction.
//!
//! These operations own the whole pipeline for one call: decode the cover,
//! derive the slot sequence, move bits, re-encode. The cover buffers are
//! owned exclusively for the duration of a call and nothing mutates the
//! cover between slot enumeration and the writes, so the sequence the
//! embedder walks is exactly the one the position engine produced.
//!
//! Payload bytes here are *ciphertext*: callers run
//! [`crate::crypto::envelope::encrypt`] first and feed the sealed bytes
//! in. The 32-byte steg key doubles as the permutation seed for adaptive
//! mode ([`crate::position`]).

use std::path::Path;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::bits;
use crate::cover::Cover;
use crate::position::{self, StegMode, partition, shuffle};
use crate::{Error, Result};

/// Total embeddable bytes for `cover_path` under `mode` (`None` = the
/// cover family's default mode).
///
/// The frame header spends 4 of these, so the largest payload is
/// `capacity - 4` bytes.
pub fn capacity(cover_path: &Path, mode: Option<StegMode>) -> Result<usize> {
    let cover = Cover::load(cover_path)?;
    let mode = mode.unwrap_or_else(|| StegMode::for_cover(&cover));
    let slots = position::slot_sequence(&cover, mode, None)?;
    Ok(slots.len() / 8)
}

/// Embed `payload` into the cover at `cover_path`, writing the stego file
/// to `output_path`.
///
/// `key` seeds the adaptive permutation and is ignored by the other
/// modes. Fails [`Error::OutputExists`] when the target exists and
/// `overwrite` is false, and [`Error::CoverTooSmall`] before anything is
/// written.
pub fn embed(
    cover_path: &Path,
    payload: &[u8],
    output_path: &Path,
    key: &[u8; 32],
    mode: StegMode,
    overwrite: bool,
) -> Result<()> {
    check_output(output_path, overwrite)?;
    let mut cover = Cover::load(cover_path)?;
    let slots = position::slot_sequence(&cover, mode, adaptive_key(mode, key))?;

    let stream = bits::frame(payload);
    if stream.len() > slots.len() {
        return Err(Error::CoverTooSmall {
            needed: stream.len(),
            available: slots.len(),
        });
    }
    log::info!(
        "embedding {} payload bytes into {} of {} slots ({})",
        payload.len(),
        stream.len(),
        slots.len(),
        mode.as_str()
    );

    for (&bit, &slot) in stream.iter().zip(&slots) {
        cover.write_lsb(slot, bit);
    }
    cover.save(output_path)
}

/// Recover the embedded payload from the stego file at `stego_path`.
pub fn extract(stego_path: &Path, key: &[u8; 32], mode: StegMode) -> Result<Vec<u8>> {
    let cover = Cover::load(stego_path)?;
    let slots = position::slot_sequence(&cover, mode, adaptive_key(mode, key))?;
    let stream: Vec<u8> = slots.iter().map(|&slot| cover.read_lsb(slot)).collect();
    bits::unframe(&stream)
}

/// Embed two independent payloads into one raster cover.
///
/// The full unkeyed adaptive sequence is permuted with a fresh random
/// 32-byte partition seed and split in half; the real payload lands in a
/// randomly chosen half, the decoy in the other. Within its half each
/// payload's slot order is then permuted by its own steg key, exactly as
/// in plain adaptive mode.
///
/// Returns `(partition_seed, real_half)` for the two sidecars.
pub fn embed_deniable(
    cover_path: &Path,
    real_payload: &[u8],
    decoy_payload: &[u8],
    output_path: &Path,
    real_key: &[u8; 32],
    decoy_key: &[u8; 32],
    overwrite: bool,
) -> Result<([u8; 32], u8)> {
    check_output(output_path, overwrite)?;
    let mut cover = Cover::load(cover_path)?;
    if !cover.is_raster() {
        return Err(Error::ModeMismatch("deniable embedding needs a raster cover"));
    }

    // The partitioned sequence must be identical for both passphrases, so
    // it is enumerated unkeyed; secrecy of slot order comes from the
    // per-half steg-key permutation below.
    let full = position::slot_sequence(&cover, StegMode::Adaptive, None)?;
    let mut partition_seed = [0u8; 32];
    OsRng.fill_bytes(&mut partition_seed);
    let (h0, h1) = partition(full, &partition_seed);

    let real_half = (OsRng.next_u32() & 1) as u8;
    let (mut real_slots, mut decoy_slots) = if real_half == 0 { (h0, h1) } else { (h1, h0) };
    shuffle(&mut real_slots, real_key);
    shuffle(&mut decoy_slots, decoy_key);

    for (payload, slots) in [(real_payload, &real_slots), (decoy_payload, &decoy_slots)] {
        let stream = bits::frame(payload);
        if stream.len() > slots.len() {
            return Err(Error::CoverTooSmall {
                needed: stream.len(),
                available: slots.len(),
            });
        }
        for (&bit, &slot) in stream.iter().zip(slots.iter()) {
            cover.write_lsb(slot, bit);
        }
    }
    log::info!(
        "deniable embed: {} + {} payload bytes across halves of {} slots",
        real_payload.len(),
        decoy_payload.len(),
        real_slots.len() + decoy_slots.len()
    );

    cover.save(output_path)?;
    Ok((partition_seed, real_half))
}

/// Recover one payload of a deniable embedding.
///
/// `partition_half` selects which half of the seed-permuted sequence this
/// payload occupies; `key` is its steg key.
pub fn extract_deniable(
    stego_path: &Path,
    key: &[u8; 32],
    partition_seed: &[u8; 32],
    partition_half: u8,
) -> Result<Vec<u8>> {
    if partition_half > 1 {
        return Err(Error::ModeMismatch("partition half must be 0 or 1"));
    }
    let cover = Cover::load(stego_path)?;
    if !cover.is_raster() {
        return Err(Error::ModeMismatch("deniable extraction needs a raster cover"));
    }

    let full = position::slot_sequence(&cover, StegMode::Adaptive, None)?;
    let (h0, h1) = partition(full, partition_seed);
    let mut slots = if partition_half == 0 { h0 } else { h1 };
    shuffle(&mut slots, key);

    let stream: Vec<u8> = slots.iter().map(|&slot| cover.read_lsb(slot)).collect();
    bits::unframe(&stream)
}

fn adaptive_key<'k>(mode: StegMode, key: &'k [u8; 32]) -> Option<&'k [u8; 32]> {
    (mode == StegMode::Adaptive).then_some(key)
}

fn check_output(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(Error::OutputExists(path.to_path_buf()));
    }
    Ok(())
}
