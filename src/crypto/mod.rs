//! Cryptographic envelope around the payload.
//!
//! A payload never reaches a cover in the clear: it is compressed, then
//! authenticated-encrypted under a key derived from the passphrase, and
//! only the resulting ciphertext is framed and embedded. Decryption that
//! fails tag verification surfaces as [`crate::Error::AuthFail`] and never
//! returns partial plaintext.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`envelope`] | Argon2id key derivation, compress-then-encrypt, AEAD dispatch |
//!
//! ## Ciphers
//!
//! | id | algorithm | key bytes | nonce bytes |
//! |----|-----------|-----------|-------------|
//! | `Ascon-128` | Ascon-128 AEAD | 16 | 16 |
//! | `ChaCha20-Poly1305` | IETF ChaCha20-Poly1305 | 32 | 12 |
//! | `AES-256-GCM` | AES-256-GCM | 32 | 12 |
//!
//! The KDF always produces 32 bytes; Ascon-128 uses the first 16 as its
//! key. The full 32 bytes double as the *steg key* seeding the adaptive
//! position permutation ([`crate::position`]), which binds slot order to
//! the passphrase.

pub mod envelope;

/// AEAD algorithm selector, serialised into the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherId {
    Ascon128,
    ChaCha20Poly1305,
    Aes256Gcm,
}

impl CipherId {
    /// Every supported cipher, in presentation order.
    pub const ALL: [CipherId; 3] = [
        CipherId::Ascon128,
        CipherId::ChaCha20Poly1305,
        CipherId::Aes256Gcm,
    ];

    /// The identifier written to sidecars.
    pub fn as_str(self) -> &'static str {
        match self {
            CipherId::Ascon128 => "Ascon-128",
            CipherId::ChaCha20Poly1305 => "ChaCha20-Poly1305",
            CipherId::Aes256Gcm => "AES-256-GCM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Ascon-128" => Some(CipherId::Ascon128),
            "ChaCha20-Poly1305" => Some(CipherId::ChaCha20Poly1305),
            "AES-256-GCM" => Some(CipherId::Aes256Gcm),
            _ => None,
        }
    }

    /// AEAD key length in bytes (the 32-byte derived key is truncated).
    pub fn key_len(self) -> usize {
        match self {
            CipherId::Ascon128 => 16,
            CipherId::ChaCha20Poly1305 | CipherId::Aes256Gcm => 32,
        }
    }

    /// Nonce length in bytes.
    pub fn nonce_len(self) -> usize {
        match self {
            CipherId::Ascon128 => 16,
            CipherId::ChaCha20Poly1305 | CipherId::Aes256Gcm => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_ids_roundtrip_their_names() {
        for id in CipherId::ALL {
            assert_eq!(CipherId::parse(id.as_str()), Some(id));
        }
        assert_eq!(CipherId::parse("ROT13"), None);
    }

    #[test]
    fn key_and_nonce_sizes() {
        assert_eq!(CipherId::Ascon128.key_len(), 16);
        assert_eq!(CipherId::Ascon128.nonce_len(), 16);
        assert_eq!(CipherId::ChaCha20Poly1305.key_len(), 32);
        assert_eq!(CipherId::ChaCha20Poly1305.nonce_len(), 12);
        assert_eq!(CipherId::Aes256Gcm.key_len(), 32);
        assert_eq!(CipherId::Aes256Gcm.nonce_len(), 12);
    }
}
