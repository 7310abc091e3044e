//! Lossless raster covers (PNG, BMP).
//!
//! The substrate is a contiguous H×W×3 RGB byte buffer. An alpha channel in
//! the source is stripped on load and not restored; alpha carries no
//! payload and keeping it would double the aliasing surface for no
//! capacity.

use std::path::Path;

use crate::{Error, Result};

/// A decoded raster cover.
///
/// `pixels` is owned by this struct, not aliased with any decoder memory:
/// the conversion in [`RasterCover::load`] copies out of the decoded image
/// and the decoder is dropped before the constructor returns. All embedder
/// writes go directly through this buffer and `save` re-encodes from it.
pub struct RasterCover {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterCover {
    /// Decode the image at `path` into an owned RGB buffer.
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| Error::MalformedCover(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        log::debug!("raster cover {}x{} from {}", width, height, path.display());
        Ok(Self {
            width,
            height,
            pixels: rgb.into_raw(),
        })
    }

    /// Re-encode the buffer to `path` (format chosen by extension; the
    /// dispatcher only routes lossless extensions here).
    pub fn save(&self, path: &Path) -> Result<()> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }

    /// Build a cover directly from a raw RGB buffer (test fixtures).
    #[cfg(test)]
    pub(crate) fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw H×W×3 buffer, pixel row-major, channels R,G,B.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn read_lsb(&self, index: u32) -> u8 {
        self.pixels[index as usize] & 1
    }

    #[inline]
    pub fn write_lsb(&mut self, index: u32, bit: u8) {
        let byte = &mut self.pixels[index as usize];
        *byte = (*byte & !1) | bit;
    }
}
