//! Cover codecs - decode a media file into a mutable bit substrate and
//! re-encode it losslessly.
//!
//! Each submodule targets one cover family. All codecs follow the same
//! conventions:
//!
//! * **Owned buffers** - `load` copies pixel/coefficient/sample data out of
//!   the decoder into a buffer owned by the cover and releases decoder
//!   resources before returning. Nothing hands an alias back to an encoder.
//! * **Lossless round-trip** - `save` re-emits the file such that a
//!   subsequent `load` observes exactly the bits the embedder wrote.
//! * **Slot addressing** - every writable bit location is addressed by a
//!   [`Slot`]; the position engine decides which slots are used and in what
//!   order, the cover only reads/writes LSBs.
//!
//! | Module | Cover | Substrate |
//! |--------|-------|-----------|
//! | [`raster`] | PNG / BMP | H×W×3 RGB bytes |
//! | [`jpeg`]   | baseline JPEG | quantised DCT coefficients per component |
//! | [`wav`]    | RIFF/WAVE | raw sample bytes of the `data` chunk |

pub mod jpeg;
pub mod raster;
pub mod wav;

use std::path::Path;

use crate::{Error, Result};

/// One addressable bit location in a cover.
///
/// `plane` selects the substrate plane (JPEG component index; always 0 for
/// raster and WAV), `index` the byte/coefficient within it. For raster
/// covers `index = pixel_linear_index * 3 + channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub plane: u8,
    pub index: u32,
}

impl Slot {
    #[inline]
    pub fn new(plane: u8, index: u32) -> Self {
        Self { plane, index }
    }
}

/// A decoded cover, ready for slot enumeration and LSB writes.
pub enum Cover {
    Raster(raster::RasterCover),
    Jpeg(jpeg::JpegCover),
    Wav(wav::WavCover),
}

impl Cover {
    /// Decode the cover at `path`, dispatching on the file extension.
    ///
    /// Returns [`Error::UnsupportedFormat`] for unknown extensions and
    /// [`Error::MalformedCover`] when the decoder rejects the contents.
    pub fn load(path: &Path) -> Result<Self> {
        match extension_of(path)?.as_str() {
            "png" | "bmp" => Ok(Cover::Raster(raster::RasterCover::load(path)?)),
            "jpg" | "jpeg" => Ok(Cover::Jpeg(jpeg::JpegCover::load(path)?)),
            "wav" => Ok(Cover::Wav(wav::WavCover::load(path)?)),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// Re-encode the (possibly mutated) cover to `path`.
    ///
    /// The target extension must belong to the same cover family the data
    /// was loaded from; saving a raster cover through a lossy codec would
    /// silently destroy the embedded bits.
    pub fn save(&self, path: &Path) -> Result<()> {
        let ext = extension_of(path)?;
        match (self, ext.as_str()) {
            (Cover::Raster(r), "png" | "bmp") => r.save(path),
            (Cover::Jpeg(j), "jpg" | "jpeg") => j.save(path),
            (Cover::Wav(w), "wav") => w.save(path),
            _ => Err(Error::UnsupportedFormat(ext)),
        }
    }

    /// Read the LSB stored at `slot`.
    #[inline]
    pub fn read_lsb(&self, slot: Slot) -> u8 {
        match self {
            Cover::Raster(r) => r.read_lsb(slot.index),
            Cover::Jpeg(j) => j.read_lsb(slot.plane, slot.index),
            Cover::Wav(w) => w.read_lsb(slot.index),
        }
    }

    /// Write `bit` into the LSB at `slot`: `value ← (value & !1) | bit`.
    #[inline]
    pub fn write_lsb(&mut self, slot: Slot, bit: u8) {
        debug_assert!(bit <= 1);
        match self {
            Cover::Raster(r) => r.write_lsb(slot.index, bit),
            Cover::Jpeg(j) => j.write_lsb(slot.plane, slot.index, bit),
            Cover::Wav(w) => w.write_lsb(slot.index, bit),
        }
    }

    /// True when this cover family supports the raster steg modes.
    pub fn is_raster(&self) -> bool {
        matches!(self, Cover::Raster(_))
    }
}

fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
}
