//! Bit framing primitives shared by all embedders.
//!
//! A payload travels through the cover as a *frame*: a 4-byte big-endian
//! length prefix followed by the payload bytes, viewed as a big-endian bit
//! stream (MSB first within each byte). Each function consumes exactly the
//! bits it promises or returns an error - there is no partial-read
//! ambiguity.

use crate::{Error, Result};

/// Bits consumed by the length prefix.
pub const HEADER_BITS: usize = 32;

/// Expand bytes into bits, MSB first within each byte.
///
/// Each output element is 0 or 1, ready to be written into a slot LSB.
#[inline]
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Pack bits (MSB first) back into bytes.
///
/// `bits.len()` must be a multiple of 8; framing guarantees this.
#[inline]
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    debug_assert!(bits.len() % 8 == 0, "bit stream not byte-aligned");
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit))
        .collect()
}

/// Frame a payload: prepend the 4-byte big-endian length, emit the bit
/// stream.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    bytes_to_bits(&framed)
}

/// Recover the payload bytes from an extracted bit stream.
///
/// Consumes 32 header bits, interprets them as the payload length `L`, then
/// consumes `8·L` bits.
///
/// Returns [`Error::ShortRead`] if the stream terminates before the header
/// or payload is complete, and [`Error::OversizeHeader`] if `L` exceeds the
/// capacity remaining after the header (a garbage header read from a
/// non-stego cover or the wrong slot sequence).
pub fn unframe(bits: &[u8]) -> Result<Vec<u8>> {
    if bits.len() < HEADER_BITS {
        return Err(Error::ShortRead);
    }
    let header = bits_to_bytes(&bits[..HEADER_BITS]);
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;

    let remaining = (bits.len() - HEADER_BITS) / 8;
    if len > remaining {
        return Err(Error::OversizeHeader);
    }
    let body = &bits[HEADER_BITS..HEADER_BITS + len * 8];
    Ok(bits_to_bytes(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrip() {
        let payload = b"hello world";
        let bits = frame(payload);
        assert_eq!(bits.len(), HEADER_BITS + payload.len() * 8);
        assert_eq!(unframe(&bits).unwrap(), payload);
    }

    #[test]
    fn frame_is_big_endian_msb_first() {
        let bits = frame(b"x");
        // Length 1 = 31 zero bits then a one.
        assert!(bits[..31].iter().all(|&b| b == 0));
        assert_eq!(bits[31], 1);
        // 'x' = 0x78 = 0111_1000.
        assert_eq!(&bits[32..40], &[0, 1, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn empty_payload_frames() {
        let bits = frame(b"");
        assert_eq!(bits.len(), HEADER_BITS);
        assert_eq!(unframe(&bits).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn unframe_short_header() {
        assert!(matches!(unframe(&[0u8; 31]), Err(Error::ShortRead)));
    }

    #[test]
    fn unframe_oversize_header() {
        // Header claims 1000 bytes but only 8 payload bits follow.
        let mut bits = bytes_to_bits(&1000u32.to_be_bytes());
        bits.extend_from_slice(&[0u8; 8]);
        assert!(matches!(unframe(&bits), Err(Error::OversizeHeader)));
    }

    #[test]
    fn trailing_slack_is_ignored() {
        let mut bits = frame(b"ab");
        bits.extend_from_slice(&[1, 0, 1, 1, 0]);
        assert_eq!(unframe(&bits).unwrap(), b"ab");
    }
}
