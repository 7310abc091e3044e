//! End-to-end scenarios exercising the full pipeline: compress → encrypt →
//! frame → position → embed → save, and back.
//!
//! Wrong-key paths can surface either as `AuthFail` (garbage ciphertext
//! reached the AEAD) or as a framing error (garbage length header), since
//! the slot permutation is itself passphrase-bound; both mean the payload
//! stays sealed.

use std::path::{Path, PathBuf};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use stegkit::crypto::envelope;
use stegkit::{CipherId, Cover, Error, Sidecar, StegMode};

/// Uniform Gaussian-noise PNG (Irwin-Hall approximation, σ ≈ 30).
fn gaussian_png(dir: &Path, name: &str, w: u32, h: u32, seed: u64) -> PathBuf {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut pixels = Vec::with_capacity((w * h * 3) as usize);
    for _ in 0..w * h * 3 {
        let z: f64 = (0..12).map(|_| rng.r#gen::<f64>()).sum::<f64>() - 6.0;
        pixels.push((128.0 + 30.0 * z).clamp(0.0, 255.0) as u8);
    }
    let path = dir.join(name);
    image::save_buffer(&path, &pixels, w, h, image::ColorType::Rgb8).unwrap();
    path
}

fn noise_jpeg(dir: &Path, name: &str, w: u16, h: u16, quality: u8, seed: u64) -> PathBuf {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut pixels = vec![0u8; w as usize * h as usize * 3];
    rng.fill_bytes(&mut pixels);
    let mut jpeg = Vec::new();
    let encoder = jpeg_encoder::Encoder::new(&mut jpeg, quality);
    encoder
        .encode(&pixels, w, h, jpeg_encoder::ColorType::Rgb)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, &jpeg).unwrap();
    path
}

fn assert_sealed(result: stegkit::Result<Vec<u8>>) {
    match result {
        Err(Error::AuthFail | Error::OversizeHeader | Error::ShortRead) => {}
        Err(e) => panic!("unexpected error kind: {e}"),
        Ok(bytes) => panic!("payload leaked: {} bytes", bytes.len()),
    }
}

/// Scenario 1: PNG adaptive happy path, plus the wrong-passphrase check.
#[test]
fn png_adaptive_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let cover = gaussian_png(dir.path(), "cover.png", 512, 512, 101);
    let stego = dir.path().join("stego.png");

    let passphrase = "correct horse battery staple";
    let (sealed, key) = envelope::encrypt(b"hello world", passphrase, CipherId::Ascon128).unwrap();
    stegkit::embed(&cover, &sealed.ciphertext, &stego, &key, StegMode::Adaptive, false).unwrap();

    let sidecar = Sidecar::new(&sealed, StegMode::Adaptive, Some("txt".to_string()));

    // Same passphrase: exact payload back.
    let key = envelope::derive_key(passphrase, &sidecar.salt).unwrap();
    let ciphertext = stegkit::extract(&stego, &key, sidecar.steg_mode).unwrap();
    let plaintext = envelope::decrypt_with_key(&sidecar.envelope(ciphertext), &key).unwrap();
    assert_eq!(plaintext, b"hello world");

    // Wrong passphrase: sealed.
    let wrong = envelope::derive_key("wrong", &sidecar.salt).unwrap();
    let result = stegkit::extract(&stego, &wrong, sidecar.steg_mode)
        .and_then(|ct| envelope::decrypt_with_key(&sidecar.envelope(ct), &wrong));
    assert_sealed(result);
}

/// Scenario 2: JPEG round-trip near the capacity boundary.
#[test]
fn jpeg_roundtrip_with_random_payload() {
    let dir = tempfile::tempdir().unwrap();
    let cover = noise_jpeg(dir.path(), "cover.jpg", 256, 256, 80, 202);
    let stego = dir.path().join("stego.jpg");

    let mut payload = vec![0u8; 2048];
    ChaCha20Rng::seed_from_u64(203).fill_bytes(&mut payload);

    let (sealed, key) = envelope::encrypt(&payload, "jpeg pass", CipherId::Aes256Gcm).unwrap();
    stegkit::embed(&cover, &sealed.ciphertext, &stego, &key, StegMode::Dct, false).unwrap();

    // A stock decoder accepts the re-encoded file.
    let stego_bytes = std::fs::read(&stego).unwrap();
    image::load_from_memory(&stego_bytes).expect("stock decoder rejected stego JPEG");

    let sidecar = Sidecar::new(&sealed, StegMode::Dct, None);
    let key = envelope::derive_key("jpeg pass", &sidecar.salt).unwrap();
    let ciphertext = stegkit::extract(&stego, &key, StegMode::Dct).unwrap();
    let plaintext = envelope::decrypt_with_key(&sidecar.envelope(ciphertext), &key).unwrap();
    assert_eq!(plaintext, payload);
}

/// Scenario 3: capacity exhaustion on a low-variance cover.
#[test]
fn capacity_exhaustion_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let cover = dir.path().join("grey.png");
    image::save_buffer(&cover, &vec![128u8; 64 * 64 * 3], 64, 64, image::ColorType::Rgb8)
        .unwrap();
    let stego = dir.path().join("stego.png");

    let payload = vec![0x42u8; 10_000];
    let (sealed, key) = envelope::encrypt(&payload, "pw", CipherId::ChaCha20Poly1305).unwrap();
    let err = stegkit::embed(&cover, &sealed.ciphertext, &stego, &key, StegMode::Adaptive, false)
        .unwrap_err();
    assert!(matches!(err, Error::CoverTooSmall { .. }));
    assert!(!stego.exists());
}

/// Scenario 4: deniable embedding, both halves, swapped passphrases sealed.
#[test]
fn deniable_both_halves() {
    let dir = tempfile::tempdir().unwrap();
    let cover = gaussian_png(dir.path(), "cover.png", 1024, 1024, 404);
    let stego = dir.path().join("stego.png");

    let real_plain = b"real";
    let decoy_plain = b"decoy content that is plausible";
    let (real_sealed, real_key) =
        envelope::encrypt(real_plain, "real pass", CipherId::Ascon128).unwrap();
    let (decoy_sealed, decoy_key) =
        envelope::encrypt(decoy_plain, "decoy pass", CipherId::Ascon128).unwrap();

    let (seed, real_half) = stegkit::embed_deniable(
        &cover,
        &real_sealed.ciphertext,
        &decoy_sealed.ciphertext,
        &stego,
        &real_key,
        &decoy_key,
        false,
    )
    .unwrap();

    let real_sidecar = Sidecar::new_deniable(&real_sealed, None, seed, real_half);
    let decoy_sidecar = Sidecar::new_deniable(&decoy_sealed, None, seed, 1 - real_half);

    // The two records are structurally identical.
    let field_names = |s: &Sidecar| -> Vec<String> {
        s.render()
            .lines()
            .map(|l| l.split('=').next().unwrap().trim().to_string())
            .collect()
    };
    assert_eq!(field_names(&real_sidecar), field_names(&decoy_sidecar));

    // Real sidecar + real passphrase.
    let key = envelope::derive_key("real pass", &real_sidecar.salt).unwrap();
    let ct = stegkit::extract_deniable(
        &stego,
        &key,
        &real_sidecar.partition_seed.unwrap(),
        real_sidecar.partition_half.unwrap(),
    )
    .unwrap();
    let plain = envelope::decrypt_with_key(&real_sidecar.envelope(ct), &key).unwrap();
    assert_eq!(plain, real_plain);

    // Decoy sidecar + decoy passphrase.
    let key = envelope::derive_key("decoy pass", &decoy_sidecar.salt).unwrap();
    let ct = stegkit::extract_deniable(
        &stego,
        &key,
        &decoy_sidecar.partition_seed.unwrap(),
        decoy_sidecar.partition_half.unwrap(),
    )
    .unwrap();
    let plain = envelope::decrypt_with_key(&decoy_sidecar.envelope(ct), &key).unwrap();
    assert_eq!(plain, decoy_plain);

    // Swapped passphrases: sealed either way.
    let wrong = envelope::derive_key("decoy pass", &real_sidecar.salt).unwrap();
    let result = stegkit::extract_deniable(
        &stego,
        &wrong,
        &real_sidecar.partition_seed.unwrap(),
        real_sidecar.partition_half.unwrap(),
    )
    .and_then(|ct| envelope::decrypt_with_key(&real_sidecar.envelope(ct), &wrong));
    assert_sealed(result);
}

/// Scenario 5: sequential debug mode writes the frame row-major from the
/// first byte: 32 header bits (length, big-endian) then the payload.
#[test]
fn sequential_mode_lsb_layout() {
    let dir = tempfile::tempdir().unwrap();
    let cover = gaussian_png(dir.path(), "cover.png", 32, 32, 505);
    let stego = dir.path().join("stego.png");

    let key = [0u8; 32];
    stegkit::embed(&cover, b"x", &stego, &key, StegMode::Sequential, false).unwrap();

    let Cover::Raster(raster) = Cover::load(&stego).unwrap() else {
        panic!("expected raster cover");
    };
    let expected = stegkit::bits::frame(b"x");
    assert_eq!(expected.len(), 40);
    for (i, &bit) in expected.iter().enumerate() {
        assert_eq!(raster.pixels()[i] & 1, bit, "LSB {i}");
    }
}

/// Scenario 6: a single flipped payload bit in the stego fails closed.
#[test]
fn tampered_stego_fails_auth() {
    let dir = tempfile::tempdir().unwrap();
    let cover = gaussian_png(dir.path(), "cover.png", 512, 512, 606);
    let stego = dir.path().join("stego.png");

    let passphrase = "correct horse battery staple";
    let (sealed, key) = envelope::encrypt(b"hello world", passphrase, CipherId::Ascon128).unwrap();
    stegkit::embed(&cover, &sealed.ciphertext, &stego, &key, StegMode::Adaptive, false).unwrap();
    let sidecar = Sidecar::new(&sealed, StegMode::Adaptive, None);

    // Flip one ciphertext-carrying LSB (slot 40 is past the 32-bit length
    // header, so the frame still parses and the AEAD sees the damage).
    let mut tampered = Cover::load(&stego).unwrap();
    let slots =
        stegkit::position::slot_sequence(&tampered, StegMode::Adaptive, Some(&key)).unwrap();
    let slot = slots[40];
    let flipped = tampered.read_lsb(slot) ^ 1;
    tampered.write_lsb(slot, flipped);
    let tampered_path = dir.path().join("tampered.png");
    tampered.save(&tampered_path).unwrap();

    let key = envelope::derive_key(passphrase, &sidecar.salt).unwrap();
    let ciphertext = stegkit::extract(&tampered_path, &key, StegMode::Adaptive).unwrap();
    assert!(matches!(
        envelope::decrypt_with_key(&sidecar.envelope(ciphertext), &key),
        Err(Error::AuthFail)
    ));
}
