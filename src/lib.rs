//! **stegkit** - a crypto-steganography engine.
//!
//! Conceals an arbitrary byte payload inside an ordinary media file such
//! that the cover remains perceptually unchanged, the hidden bytes are
//! authenticated-encrypted under a passphrase, and - in deniable mode - a
//! plausible decoy payload can be revealed without exposing the real one.
//!
//! # Supported covers
//! | Module | Cover | Technique |
//! |--------|-------|-----------|
//! | [`cover::raster`] | PNG / BMP | spatial LSB, variance-adaptive or sequential |
//! | [`cover::jpeg`]   | baseline JPEG | LSB of quantised AC DCT coefficients |
//! | [`cover::wav`]    | PCM WAV | LSB of raw sample bytes |
//!
//! # Pipeline
//! ```text
//! payload → zstd → AEAD (crypto) → frame (bits) → slot order (position)
//!         → LSB writes (cover) → stego file + sidecar (sidecar)
//! ```
//!
//! Extraction inverts the pipeline from the sidecar alone; both sides
//! re-derive identical slot sequences from (cover, mode, key), which is
//! the invariant everything else leans on - see [`position`].

pub mod bits;
pub mod cover;
pub mod crypto;
pub mod error;
pub mod position;
pub mod score;
pub mod sidecar;
pub mod steg;
mod utils;

pub use cover::{Cover, Slot};
pub use crypto::CipherId;
pub use crypto::envelope::{Envelope, decrypt, decrypt_with_key, derive_key, encrypt};
pub use error::{Error, Result};
pub use position::StegMode;
pub use score::{Score, ScoreLabel, score};
pub use sidecar::Sidecar;
pub use steg::{capacity, embed, embed_deniable, extract, extract_deniable};
