//! Baseline JPEG covers with coefficient-level access.
//!
//! The embedder needs the raw quantised DCT coefficients, so this module
//! transcodes at the entropy-coding layer instead of decoding to pixels:
//!
//! ```text
//! JPEG → marker parse → Huffman decode → [i16] planes → LSB writes
//!                                             ↓
//!        JPEG ← writer ← Huffman encode ←─────┘
//! ```
//!
//! Quantisation tables travel verbatim from input to output and the
//! coefficients are never touched by anything but the embedder, so the
//! save path cannot re-quantise. The output carries the standard Annex K
//! Huffman tables (see [`huffman`]) and no restart markers; every other
//! segment is copied byte-for-byte in its original position.

pub(crate) mod huffman;
pub(crate) mod marker;
pub(crate) mod scan;

use std::path::Path;

use marker::FrameInfo;
pub use scan::CoeffPlane;

use crate::Result;

/// A decoded JPEG cover: verbatim segments plus mutable coefficient planes.
pub struct JpegCover {
    frame: FrameInfo,
    copied: Vec<Vec<u8>>,
    /// Component index (into `frame.components`) per scan position.
    scan_order: Vec<usize>,
    planes: Vec<CoeffPlane>,
}

impl JpegCover {
    /// Parse and entropy-decode the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let parsed = marker::parse(bytes)?;
        let planes = scan::decode_scan(&parsed)?;
        let scan_order = parsed.scan.iter().map(|&(ci, _, _)| ci).collect();
        log::debug!(
            "jpeg cover {}x{}, {} component(s)",
            parsed.frame.width,
            parsed.frame.height,
            planes.len()
        );
        Ok(Self {
            frame: parsed.frame,
            copied: parsed.copied,
            scan_order,
            planes,
        })
    }

    /// Re-encode the scan and write the assembled file to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let scan_data = scan::encode_scan(&self.frame, &self.scan_order, &self.planes);
        let mut out = vec![0xFF, 0xD8];
        for seg in &self.copied {
            out.extend_from_slice(seg);
        }
        out.extend_from_slice(&self.dht_segment());
        out.extend_from_slice(&self.sos_header());
        out.extend_from_slice(&scan_data);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    /// The coefficient planes in scan order (Y, Cb, Cr for colour files).
    pub fn planes(&self) -> &[CoeffPlane] {
        &self.planes
    }

    #[inline]
    pub fn read_lsb(&self, plane: u8, index: u32) -> u8 {
        (self.planes[plane as usize].data[index as usize] & 1) as u8
    }

    #[inline]
    pub fn write_lsb(&mut self, plane: u8, index: u32, bit: u8) {
        let coef = &mut self.planes[plane as usize].data[index as usize];
        *coef = (*coef & !1) | bit as i16;
    }

    /// DHT segment carrying the standard tables the writer encodes with:
    /// table id 0 (luma) always, table id 1 (chroma) when there is more
    /// than one component.
    fn dht_segment(&self) -> Vec<u8> {
        let mut tables: Vec<(u8, &[u8; 16], &[u8])> = vec![
            (0x00, &huffman::STD_DC_LUMA_COUNTS, &huffman::STD_DC_LUMA_SYMBOLS),
            (0x10, &huffman::STD_AC_LUMA_COUNTS, &huffman::STD_AC_LUMA_SYMBOLS),
        ];
        if self.planes.len() > 1 {
            tables.push((
                0x01,
                &huffman::STD_DC_CHROMA_COUNTS,
                &huffman::STD_DC_CHROMA_SYMBOLS,
            ));
            tables.push((
                0x11,
                &huffman::STD_AC_CHROMA_COUNTS,
                &huffman::STD_AC_CHROMA_SYMBOLS,
            ));
        }
        let body_len: usize = tables.iter().map(|(_, _, syms)| 17 + syms.len()).sum();
        let mut seg = Vec::with_capacity(body_len + 4);
        seg.extend_from_slice(&[0xFF, 0xC4]);
        seg.extend_from_slice(&((body_len + 2) as u16).to_be_bytes());
        for (tc_th, counts, symbols) in tables {
            seg.push(tc_th);
            seg.extend_from_slice(counts.as_slice());
            seg.extend_from_slice(symbols);
        }
        seg
    }

    fn sos_header(&self) -> Vec<u8> {
        let ns = self.scan_order.len();
        let mut seg = Vec::with_capacity(8 + 2 * ns);
        seg.extend_from_slice(&[0xFF, 0xDA]);
        seg.extend_from_slice(&((6 + 2 * ns) as u16).to_be_bytes());
        seg.push(ns as u8);
        for (si, &ci) in self.scan_order.iter().enumerate() {
            seg.push(self.frame.components[ci].id);
            // Scan position 0 encodes with the luma tables, the rest with
            // the chroma tables; must match `scan::encode_scan`.
            seg.push(if si == 0 { 0x00 } else { 0x11 });
        }
        seg.extend_from_slice(&[0x00, 0x3F, 0x00]);
        seg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    /// Encode seeded RGB noise as a baseline JPEG with jpeg-encoder.
    pub(crate) fn noise_jpeg(width: u16, height: u16, quality: u8, seed: u64) -> Vec<u8> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        rng.fill_bytes(&mut pixels);
        let mut out = Vec::new();
        let encoder = jpeg_encoder::Encoder::new(&mut out, quality);
        encoder
            .encode(&pixels, width, height, jpeg_encoder::ColorType::Rgb)
            .unwrap();
        out
    }

    #[test]
    fn transcode_preserves_every_coefficient() {
        let jpeg = noise_jpeg(96, 80, 80, 7);
        let cover = JpegCover::from_bytes(&jpeg).unwrap();
        let rewritten = cover.to_bytes();

        let again = JpegCover::from_bytes(&rewritten).unwrap();
        assert_eq!(cover.planes().len(), again.planes().len());
        for (a, b) in cover.planes().iter().zip(again.planes()) {
            assert_eq!((a.width, a.height), (b.width, b.height));
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn lsb_writes_survive_transcode() {
        let jpeg = noise_jpeg(64, 64, 85, 11);
        let mut cover = JpegCover::from_bytes(&jpeg).unwrap();

        // Flip the LSB of every usable AC coefficient in plane 0.
        let width = cover.planes()[0].width;
        let mut touched = Vec::new();
        for idx in 0..cover.planes()[0].data.len() {
            let (r, c) = (idx / width, idx % width);
            if r % 8 == 0 && c % 8 == 0 {
                continue;
            }
            let v = cover.planes()[0].data[idx];
            if !(-2..=1).contains(&v) {
                let bit = ((v & 1) ^ 1) as u8;
                cover.write_lsb(0, idx as u32, bit);
                touched.push((idx, bit));
            }
        }
        assert!(!touched.is_empty());

        let reloaded = JpegCover::from_bytes(&cover.to_bytes()).unwrap();
        for (idx, bit) in touched {
            assert_eq!(reloaded.read_lsb(0, idx as u32), bit);
        }
    }

    #[test]
    fn grayscale_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut pixels = vec![0u8; 40 * 40];
        rng.fill_bytes(&mut pixels);
        let mut jpeg = Vec::new();
        let encoder = jpeg_encoder::Encoder::new(&mut jpeg, 90);
        encoder
            .encode(&pixels, 40, 40, jpeg_encoder::ColorType::Luma)
            .unwrap();

        let cover = JpegCover::from_bytes(&jpeg).unwrap();
        assert_eq!(cover.planes().len(), 1);
        let again = JpegCover::from_bytes(&cover.to_bytes()).unwrap();
        assert_eq!(cover.planes()[0].data, again.planes()[0].data);
    }

    #[test]
    fn rejects_progressive() {
        // Hand-build a minimal header claiming SOF2.
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xC2];
        bytes.extend_from_slice(&11u16.to_be_bytes());
        bytes.extend_from_slice(&[8, 0, 8, 0, 8, 1, 0x11, 0]);
        assert!(matches!(
            JpegCover::from_bytes(&bytes),
            Err(crate::Error::MalformedCover(_))
        ));
    }

    #[test]
    fn stock_decoder_reads_rewritten_file() {
        let jpeg = noise_jpeg(48, 48, 80, 21);
        let cover = JpegCover::from_bytes(&jpeg).unwrap();
        let rewritten = cover.to_bytes();
        let decoded = image::load_from_memory(&rewritten);
        assert!(decoded.is_ok(), "image crate rejected transcoded JPEG");
    }
}
