//! Library-wide error and result types.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used throughout stegkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type. Recoverable input errors
/// carry the responsible path or field. [`Error::AuthFail`] deliberately
/// carries nothing: a wrong passphrase and a tampered stego are
/// indistinguishable by construction.
#[derive(Debug)]
pub enum Error {
    /// AEAD tag verification failed - wrong passphrase or corrupted stego.
    AuthFail,
    /// The cover does not have enough eligible slots for the framed payload.
    CoverTooSmall {
        /// Bits required by the framed payload.
        needed: usize,
        /// Bits the cover can hold in the requested mode.
        available: usize,
    },
    /// The cover file extension maps to no supported codec.
    UnsupportedFormat(String),
    /// A required sidecar field is missing or invalid (message names it).
    MalformedSidecar(&'static str),
    /// The cover decoder rejected its input (message describes why).
    MalformedCover(String),
    /// Deniable flags or steg mode are inconsistent with the sidecar.
    ModeMismatch(&'static str),
    /// The output file exists and overwriting was not permitted.
    OutputExists(PathBuf),
    /// The embedded bit stream ended before the framed length was read.
    ShortRead,
    /// The framed length header exceeds the remaining cover capacity.
    OversizeHeader,
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AuthFail => write!(f, "authentication failed"),
            Error::CoverTooSmall { needed, available } => {
                write!(f, "cover too small: need {needed} bits, have {available}")
            }
            Error::UnsupportedFormat(ext) => write!(f, "unsupported cover format: {ext}"),
            Error::MalformedSidecar(s) => write!(f, "malformed sidecar: {s}"),
            Error::MalformedCover(s) => write!(f, "malformed cover: {s}"),
            Error::ModeMismatch(s) => write!(f, "mode mismatch: {s}"),
            Error::OutputExists(p) => write!(f, "output exists: {}", p.display()),
            Error::ShortRead => write!(f, "embedded stream ended early"),
            Error::OversizeHeader => write!(f, "length header exceeds capacity"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
