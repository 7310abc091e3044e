//! The sidecar key file.
//!
//! Extraction needs more than the passphrase: the cipher id, the steg
//! mode, the KDF salt, the AEAD nonce and - for deniable covers - the
//! partition parameters. All of that travels out-of-band in a small
//! human-inspectable text record. The passphrase and the derived key are
//! **never** present; losing the sidecar to an adversary costs nothing but
//! the knowledge that a stego file exists.
//!
//! ## File format
//! Simple `name = value` text, one entry per line, comments prefixed with
//! `#`. Binary values are base64 (standard alphabet, with padding).
//! Unknown names are skipped so the format stays forward-compatible;
//! missing required names are a parse error.
//!
//! ```text
//! cipher = Ascon-128
//! steg_mode = adaptive
//! deniable = true
//! nonce = 3q2+796tvu/erb7v3q2+7w==
//! salt = 3q2+796tvu/erb7v3q2+7w==
//! info_type = txt
//! partition_seed = WLg4aFplaXNvbGF0ZWQtc2VlZC1ieXRlcy4uLi4=
//! partition_half = 0
//! ```

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::crypto::CipherId;
use crate::crypto::envelope::{Envelope, SALT_LEN};
use crate::position::StegMode;
use crate::{Error, Result};

/// Parsed sidecar record.
///
/// Fields that are absent in non-deniable records are [`None`]; the
/// constructor-side invariants (deniable ⇒ partition fields present,
/// deniable ⇒ adaptive mode) are enforced by [`Sidecar::parse`] so a
/// loaded record is always internally consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidecar {
    pub cipher: CipherId,
    pub steg_mode: StegMode,
    pub deniable: bool,
    pub nonce: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    /// Filename extension hint for the recovered payload.
    pub info_type: Option<String>,
    pub partition_seed: Option<[u8; 32]>,
    /// Which half of the partition this record's payload occupies.
    pub partition_half: Option<u8>,
}

impl Sidecar {
    /// Build the record for a plain (non-deniable) embedding.
    pub fn new(envelope: &Envelope, steg_mode: StegMode, info_type: Option<String>) -> Self {
        Self {
            cipher: envelope.cipher,
            steg_mode,
            deniable: false,
            nonce: envelope.nonce.clone(),
            salt: envelope.salt,
            info_type,
            partition_seed: None,
            partition_half: None,
        }
    }

    /// Build one of the two records for a deniable embedding.
    ///
    /// The real and decoy records carry the same `partition_seed` and are
    /// structurally identical; only the half (and of course nonce/salt)
    /// differ.
    pub fn new_deniable(
        envelope: &Envelope,
        info_type: Option<String>,
        partition_seed: [u8; 32],
        partition_half: u8,
    ) -> Self {
        Self {
            cipher: envelope.cipher,
            steg_mode: StegMode::Adaptive,
            deniable: true,
            nonce: envelope.nonce.clone(),
            salt: envelope.salt,
            info_type,
            partition_seed: Some(partition_seed),
            partition_half: Some(partition_half),
        }
    }

    /// Reassemble the envelope from this record and extracted ciphertext.
    pub fn envelope(&self, ciphertext: Vec<u8>) -> Envelope {
        Envelope {
            ciphertext,
            nonce: self.nonce.clone(),
            salt: self.salt,
            cipher: self.cipher,
        }
    }

    /// Serialise in the fixed field order.
    ///
    /// The order never varies, so render → parse → render is
    /// byte-identical.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("cipher = {}\n", self.cipher.as_str()));
        out.push_str(&format!("steg_mode = {}\n", self.steg_mode.as_str()));
        out.push_str(&format!("deniable = {}\n", self.deniable));
        out.push_str(&format!("nonce = {}\n", BASE64.encode(&self.nonce)));
        out.push_str(&format!("salt = {}\n", BASE64.encode(self.salt)));
        if let Some(hint) = &self.info_type {
            out.push_str(&format!("info_type = {hint}\n"));
        }
        if let Some(seed) = &self.partition_seed {
            out.push_str(&format!("partition_seed = {}\n", BASE64.encode(seed)));
        }
        if let Some(half) = self.partition_half {
            out.push_str(&format!("partition_half = {half}\n"));
        }
        out
    }

    /// Parse a sidecar record.
    ///
    /// Lines beginning with `#` and blank lines are ignored, as are
    /// unknown field names.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cipher = None;
        let mut steg_mode = None;
        let mut deniable = false;
        let mut nonce = None;
        let mut salt = None;
        let mut info_type = None;
        let mut partition_seed = None;
        let mut partition_half = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();

            match name {
                "cipher" => {
                    cipher =
                        Some(CipherId::parse(value).ok_or(Error::MalformedSidecar("cipher"))?);
                }
                "steg_mode" => {
                    steg_mode =
                        Some(StegMode::parse(value).ok_or(Error::MalformedSidecar("steg_mode"))?);
                }
                "deniable" => {
                    deniable = match value {
                        "true" => true,
                        "false" => false,
                        _ => return Err(Error::MalformedSidecar("deniable")),
                    };
                }
                "nonce" => {
                    nonce = Some(
                        BASE64
                            .decode(value)
                            .map_err(|_| Error::MalformedSidecar("nonce"))?,
                    );
                }
                "salt" => {
                    let bytes = BASE64
                        .decode(value)
                        .map_err(|_| Error::MalformedSidecar("salt"))?;
                    let bytes: [u8; SALT_LEN] = bytes
                        .try_into()
                        .map_err(|_| Error::MalformedSidecar("salt"))?;
                    salt = Some(bytes);
                }
                "info_type" => info_type = Some(value.to_string()),
                "partition_seed" => {
                    let bytes = BASE64
                        .decode(value)
                        .map_err(|_| Error::MalformedSidecar("partition_seed"))?;
                    let bytes: [u8; 32] = bytes
                        .try_into()
                        .map_err(|_| Error::MalformedSidecar("partition_seed"))?;
                    partition_seed = Some(bytes);
                }
                "partition_half" => {
                    partition_half = Some(match value {
                        "0" => 0,
                        "1" => 1,
                        _ => return Err(Error::MalformedSidecar("partition_half")),
                    });
                }
                // Unknown fields are ignored for forward compatibility.
                _ => {}
            }
        }

        let record = Self {
            cipher: cipher.ok_or(Error::MalformedSidecar("cipher missing"))?,
            steg_mode: steg_mode.ok_or(Error::MalformedSidecar("steg_mode missing"))?,
            deniable,
            nonce: nonce.ok_or(Error::MalformedSidecar("nonce missing"))?,
            salt: salt.ok_or(Error::MalformedSidecar("salt missing"))?,
            info_type,
            partition_seed,
            partition_half,
        };

        if record.deniable {
            if record.partition_seed.is_none() || record.partition_half.is_none() {
                return Err(Error::MalformedSidecar("deniable without partition fields"));
            }
            if record.steg_mode != StegMode::Adaptive {
                return Err(Error::ModeMismatch("deniable requires adaptive mode"));
            }
        }
        Ok(record)
    }

    /// Read and parse the record at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Write the record to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sidecar {
        Sidecar {
            cipher: CipherId::ChaCha20Poly1305,
            steg_mode: StegMode::Adaptive,
            deniable: false,
            nonce: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            salt: [7u8; SALT_LEN],
            info_type: Some("txt".to_string()),
            partition_seed: None,
            partition_half: None,
        }
    }

    #[test]
    fn render_parse_render_is_byte_identical() {
        let rendered = sample().render();
        let reparsed = Sidecar::parse(&rendered).unwrap();
        assert_eq!(reparsed, sample());
        assert_eq!(reparsed.render(), rendered);
    }

    #[test]
    fn deniable_roundtrip() {
        let mut record = sample();
        record.deniable = true;
        record.partition_seed = Some([9u8; 32]);
        record.partition_half = Some(1);
        let reparsed = Sidecar::parse(&record.render()).unwrap();
        assert_eq!(reparsed, record);
    }

    #[test]
    fn unknown_fields_and_comments_are_ignored() {
        let mut text = String::from("# written by a future version\nfuture_field = 42\n");
        text.push_str(&sample().render());
        let parsed = Sidecar::parse(&text).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn missing_required_field_fails() {
        let text = sample()
            .render()
            .lines()
            .filter(|l| !l.starts_with("salt"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(matches!(
            Sidecar::parse(&text),
            Err(Error::MalformedSidecar("salt missing"))
        ));
    }

    #[test]
    fn deniable_without_partition_fields_fails() {
        let text = sample().render().replace("deniable = false", "deniable = true");
        assert!(matches!(
            Sidecar::parse(&text),
            Err(Error::MalformedSidecar("deniable without partition fields"))
        ));
    }

    #[test]
    fn bad_base64_names_the_field() {
        let text = sample().render().replace(
            &format!("nonce = {}", BASE64.encode(&sample().nonce)),
            "nonce = !!!",
        );
        assert!(matches!(
            Sidecar::parse(&text),
            Err(Error::MalformedSidecar("nonce"))
        ));
    }

    #[test]
    fn partition_half_must_be_binary() {
        let mut record = sample();
        record.deniable = true;
        record.partition_seed = Some([0u8; 32]);
        record.partition_half = Some(1);
        let text = record.render().replace("partition_half = 1", "partition_half = 2");
        assert!(matches!(
            Sidecar::parse(&text),
            Err(Error::MalformedSidecar("partition_half"))
        ));
    }
}
