//! Key derivation and the compress-then-encrypt envelope.
//!
//! Pipeline (embed direction): payload → Zstandard (default level) → AEAD.
//! The KDF is Argon2id with fixed parameters (t=3, m=65536 KiB, p=4,
//! 32-byte output) and a fresh 16-byte salt per operation; nonces come
//! from the OS CSPRNG and are never reused for a key. Derived keys and
//! intermediate plaintext live in [`Zeroizing`] buffers so every exit
//! path, including errors, wipes them.

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit};
use argon2::{Algorithm, Argon2, Params, Version};
use ascon_aead::Ascon128;
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::CipherId;
use crate::{Error, Result};

/// Bytes produced by the KDF; also the steg key length.
pub const KEY_LEN: usize = 32;
/// Argon2id salt length.
pub const SALT_LEN: usize = 16;

/// Argon2id iteration count.
const KDF_TIME_COST: u32 = 3;
/// Argon2id memory in KiB.
const KDF_MEMORY_KIB: u32 = 65536;
/// Argon2id lane count.
const KDF_PARALLELISM: u32 = 4;

/// Everything the extractor needs besides the passphrase.
///
/// `ciphertext` is the AEAD output and therefore carries the
/// authentication tag; there is no separate tag field.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    pub cipher: CipherId,
}

/// Generate `N` bytes from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn kdf_failure(e: impl std::fmt::Display) -> Error {
    // Parameter and length errors only; nothing here depends on input data.
    Error::Io(std::io::Error::other(format!("kdf failure: {e}")))
}

/// Derive the 32-byte key for `passphrase` and `salt`.
///
/// The same bytes serve as the AEAD key (truncated for Ascon-128) and as
/// the steg key for the adaptive permutation. Deliberately blocking
/// (~50 ms); callers needing responsiveness run this on their own worker
/// thread.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(KDF_MEMORY_KIB, KDF_TIME_COST, KDF_PARALLELISM, Some(KEY_LEN))
        .map_err(kdf_failure)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, key.as_mut_slice())
        .map_err(kdf_failure)?;
    Ok(key)
}

/// Compress and encrypt `plaintext` under `passphrase`.
///
/// Returns the envelope together with the derived key so the caller can
/// seed the position permutation without a second KDF run.
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &str,
    cipher: CipherId,
) -> Result<(Envelope, Zeroizing<[u8; KEY_LEN]>)> {
    let salt = random_bytes::<SALT_LEN>();
    let key = derive_key(passphrase, &salt)?;

    let compressed = Zeroizing::new(
        zstd::encode_all(plaintext, zstd::DEFAULT_COMPRESSION_LEVEL)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?,
    );

    let mut nonce = vec![0u8; cipher.nonce_len()];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = seal(cipher, &key[..], &nonce, &compressed)?;
    log::debug!(
        "sealed {} plaintext bytes into {} ciphertext bytes with {}",
        plaintext.len(),
        ciphertext.len(),
        cipher.as_str()
    );
    Ok((
        Envelope {
            ciphertext,
            nonce,
            salt,
            cipher,
        },
        key,
    ))
}

/// Decrypt an envelope with a passphrase (derives the key internally).
pub fn decrypt(envelope: &Envelope, passphrase: &str) -> Result<Vec<u8>> {
    let key = derive_key(passphrase, &envelope.salt)?;
    decrypt_with_key(envelope, &key)
}

/// Decrypt an envelope with an already-derived key.
///
/// Any tag mismatch - wrong passphrase, flipped ciphertext bit, wrong
/// cipher in the sidecar - surfaces as [`Error::AuthFail`].
pub fn decrypt_with_key(envelope: &Envelope, key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
    if envelope.nonce.len() != envelope.cipher.nonce_len() {
        return Err(Error::MalformedSidecar("nonce length does not fit cipher"));
    }
    let compressed = Zeroizing::new(open(
        envelope.cipher,
        &key[..],
        &envelope.nonce,
        &envelope.ciphertext,
    )?);
    // Authenticated bytes that fail to decompress indicate a bug, not an
    // attacker; still refuse rather than return garbage.
    zstd::decode_all(compressed.as_slice()).map_err(|e| Error::Io(std::io::Error::other(e)))
}

fn bad_key_len(e: impl std::fmt::Display) -> Error {
    Error::Io(std::io::Error::other(format!("cipher setup failed: {e}")))
}

fn seal(cipher: CipherId, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let sealed = match cipher {
        CipherId::Ascon128 => Ascon128::new_from_slice(&key[..16])
            .map_err(bad_key_len)?
            .encrypt(ascon_aead::Nonce::<Ascon128>::from_slice(nonce), plaintext),
        CipherId::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(bad_key_len)?
            .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext),
        CipherId::Aes256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(bad_key_len)?
            .encrypt(aes_gcm::Nonce::from_slice(nonce), plaintext),
    };
    sealed.map_err(|_| Error::Io(std::io::Error::other("aead encryption failed")))
}

fn open(cipher: CipherId, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let opened = match cipher {
        CipherId::Ascon128 => Ascon128::new_from_slice(&key[..16])
            .map_err(bad_key_len)?
            .decrypt(ascon_aead::Nonce::<Ascon128>::from_slice(nonce), ciphertext),
        CipherId::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(bad_key_len)?
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext),
        CipherId::Aes256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(bad_key_len)?
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
    };
    opened.map_err(|_| Error::AuthFail)
}
