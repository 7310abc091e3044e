//! PCM WAV covers.
//!
//! ## Layout
//! ```text
//! [0x00] "RIFF"                       (4 bytes)
//! [0x04] RiffSize                     (u32 LE, file size - 8)
//! [0x08] "WAVE"                       (4 bytes)
//! [0x0C] Chunks: id (4 bytes) + size (u32 LE) + data (+ pad byte if odd)
//!        ... "fmt " must appear before "data" ...
//! ```
//!
//! The file is split into three regions: everything up to and including the
//! `data` chunk header (preserved verbatim), the `data` chunk payload (the
//! only mutable region), and everything after it (trailing chunks such as
//! `LIST`, also preserved verbatim). `save` concatenates the three, so a
//! cover that was never written round-trips byte-identical.
//!
//! Sample width is deliberately ignored: the slot sequence covers every
//! byte of the sample region, so for 16-bit audio both the low and the
//! high byte of each sample donate their LSB. The low bit of a high byte
//! is bit 8 of the sample; at typical payload densities this stays well
//! under the noise floor of real recordings.

use std::io::Cursor;
use std::path::Path;

use crate::utils::{bytesa, bytesv, le_u16, le_u32, magic};
use crate::{Error, Result};

/// A WAV cover split at the `data` chunk.
pub struct WavCover {
    /// Bytes up to and including the `data` chunk id and size fields.
    head: Vec<u8>,
    /// The raw sample bytes - the mutable region.
    samples: Vec<u8>,
    /// Pad byte and any chunks after `data`.
    tail: Vec<u8>,
}

impl WavCover {
    /// Parse the file at `path`, locating the `data` chunk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(bytes)
    }

    fn parse(bytes: Vec<u8>) -> Result<Self> {
        let mut r = Cursor::new(&bytes);
        magic(&mut r, b"RIFF")?;
        let _riff_size = le_u32(&mut r)?;
        magic(&mut r, b"WAVE")?;

        loop {
            let id = bytesa::<4>(&mut r)
                .map_err(|_| Error::MalformedCover("no data chunk".into()))?;
            let size = le_u32(&mut r)? as usize;
            let pos = r.position() as usize;

            match &id {
                b"data" => {
                    if pos + size > bytes.len() {
                        return Err(Error::MalformedCover("data chunk overruns file".into()));
                    }
                    let head = bytes[..pos].to_vec();
                    let samples = bytes[pos..pos + size].to_vec();
                    let tail = bytes[pos + size..].to_vec();
                    log::debug!("wav cover: {} sample bytes, {} tail bytes", size, tail.len());
                    return Ok(Self {
                        head,
                        samples,
                        tail,
                    });
                }
                b"fmt " => {
                    let body = bytesv(&mut r, size)?;
                    let mut f = Cursor::new(&body);
                    let format_tag = le_u16(&mut f)?;
                    // 1 = PCM, 0xFFFE = extensible (PCM subformat in practice).
                    if format_tag != 1 && format_tag != 0xFFFE {
                        log::warn!("wav format tag {format_tag:#x} is not PCM; embedding anyway");
                    }
                    if size % 2 == 1 {
                        let _pad = bytesa::<1>(&mut r)?;
                    }
                }
                _ => {
                    let skip = size + (size & 1);
                    let _ = bytesv(&mut r, skip)
                        .map_err(|_| Error::MalformedCover("chunk overruns file".into()))?;
                }
            }
        }
    }

    /// Write head, samples and tail back out, byte for byte.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(self.head.len() + self.samples.len() + self.tail.len());
        out.extend_from_slice(&self.head);
        out.extend_from_slice(&self.samples);
        out.extend_from_slice(&self.tail);
        std::fs::write(path, out)?;
        Ok(())
    }

    /// Number of sample bytes, i.e. the number of slots.
    pub fn sample_len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn read_lsb(&self, index: u32) -> u8 {
        self.samples[index as usize] & 1
    }

    #[inline]
    pub fn write_lsb(&mut self, index: u32, bit: u8) {
        let byte = &mut self.samples[index as usize];
        *byte = (*byte & !1) | bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 16-bit mono PCM file with `n` samples and a trailing LIST
    /// chunk, built by hand so the header layout is fully controlled.
    fn synth_wav(n: usize) -> Vec<u8> {
        let data_size = n * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes()); // patched below
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&44100u32.to_le_bytes());
        out.extend_from_slice(&88200u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_size as u32).to_le_bytes());
        for i in 0..n {
            out.extend_from_slice(&((i as i16).wrapping_mul(257)).to_le_bytes());
        }
        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(b"INFO");
        let riff_size = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&riff_size.to_le_bytes());
        out
    }

    #[test]
    fn untouched_cover_roundtrips_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let original = synth_wav(64);
        std::fs::write(&path, &original).unwrap();

        let cover = WavCover::load(&path).unwrap();
        let out = dir.path().join("b.wav");
        cover.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), original);
    }

    #[test]
    fn header_and_tail_survive_lsb_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let original = synth_wav(64);
        std::fs::write(&path, &original).unwrap();

        let mut cover = WavCover::load(&path).unwrap();
        let n = cover.sample_len();
        assert_eq!(n, 128);
        for i in 0..n as u32 {
            cover.write_lsb(i, 1);
        }
        let out = dir.path().join("b.wav");
        cover.save(&out).unwrap();

        let written = std::fs::read(&out).unwrap();
        assert_eq!(written.len(), original.len());
        // Header (up to data payload) and trailer byte-identical.
        let data_start = original.len() - 12 - 128;
        assert_eq!(&written[..data_start], &original[..data_start]);
        assert_eq!(&written[original.len() - 12..], &original[original.len() - 12..]);
        // Every sample byte has LSB 1 and is otherwise unchanged.
        for (w, o) in written[data_start..original.len() - 12]
            .iter()
            .zip(&original[data_start..original.len() - 12])
        {
            assert_eq!(*w, o | 1);
        }
    }

    #[test]
    fn missing_data_chunk_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let mut bytes = synth_wav(4);
        // Corrupt the data chunk id.
        let pos = bytes.windows(4).position(|w| w == b"data").unwrap();
        bytes[pos..pos + 4].copy_from_slice(b"datx");
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            WavCover::load(&path),
            Err(Error::MalformedCover(_))
        ));
    }
}
