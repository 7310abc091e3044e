//! Command-line front-end for the stegkit engine.
//!
//! Exit code 0 on success, 1 on any error; errors go to stderr.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use zeroize::Zeroizing;

use stegkit::crypto::envelope;
use stegkit::{CipherId, Sidecar, StegMode};

#[derive(Parser)]
#[command(name = "stegkit", version, about = "Hide encrypted payloads in images and audio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a payload and hide it in a cover file
    Embed {
        /// Cover image or audio file (png, bmp, jpg, wav)
        cover: PathBuf,
        /// File whose bytes get hidden
        payload: PathBuf,
        /// Stego file to create
        output: PathBuf,
        /// AEAD cipher
        #[arg(long, default_value = "ChaCha20-Poly1305", value_parser = parse_cipher)]
        cipher: CipherId,
        /// Raster slot selection: adaptive (default) or sequential (debug)
        #[arg(long, value_parser = parse_raster_mode)]
        mode: Option<StegMode>,
        /// Hide a second, decoy payload revealable under coercion
        #[arg(long, requires = "decoy")]
        deniable: bool,
        /// Decoy payload file (deniable mode)
        #[arg(long)]
        decoy: Option<PathBuf>,
        /// Passphrase on the command line. INSECURE: visible in shell
        /// history and the process table; prefer the interactive prompt.
        #[arg(long)]
        passphrase: Option<String>,
        /// Decoy passphrase (deniable mode; same caveat as --passphrase)
        #[arg(long)]
        decoy_passphrase: Option<String>,
        /// Sidecar path (default: <output>.key)
        #[arg(long)]
        key: Option<PathBuf>,
        /// Decoy sidecar path (default: <output>.decoy.key)
        #[arg(long)]
        decoy_key: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
        /// Skip the cover quality report
        #[arg(long)]
        no_score: bool,
    },
    /// Recover a hidden payload from a stego file
    Extract {
        /// Stego file produced by embed
        stego: PathBuf,
        /// Sidecar path (default: <stego>.key)
        #[arg(long)]
        key: Option<PathBuf>,
        /// Where to write the payload (default derived from the sidecar)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Passphrase on the command line. INSECURE: visible in shell
        /// history and the process table; prefer the interactive prompt.
        #[arg(long)]
        passphrase: Option<String>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },
    /// Rate how well a raster cover hides data
    Score { cover: PathBuf },
    /// Inspect a sidecar or report cover capacity
    Info { path: PathBuf },
    /// List supported AEAD ciphers
    Ciphers,
    /// Interactive guided embed/extract
    Wizard,
}

fn parse_cipher(s: &str) -> std::result::Result<CipherId, String> {
    CipherId::parse(s).ok_or_else(|| {
        format!(
            "unknown cipher (expected one of: {})",
            CipherId::ALL.map(|c| c.as_str()).join(", ")
        )
    })
}

fn parse_raster_mode(s: &str) -> std::result::Result<StegMode, String> {
    match s {
        "adaptive" => Ok(StegMode::Adaptive),
        "sequential" => Ok(StegMode::Sequential),
        _ => Err("expected 'adaptive' or 'sequential'".to_string()),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    match Cli::parse().command {
        Command::Embed {
            cover,
            payload,
            output,
            cipher,
            mode,
            deniable,
            decoy,
            passphrase,
            decoy_passphrase,
            key,
            decoy_key,
            force,
            no_score,
        } => {
            let mode = resolve_mode(&cover, mode)?;
            if deniable {
                if mode != StegMode::Adaptive {
                    bail!("--deniable requires a raster cover in adaptive mode");
                }
                let decoy = decoy.context("--deniable requires --decoy")?;
                embed_deniable(
                    &cover,
                    &payload,
                    &decoy,
                    &output,
                    cipher,
                    passphrase,
                    decoy_passphrase,
                    key,
                    decoy_key,
                    force,
                )?;
            } else {
                embed_plain(&cover, &payload, &output, cipher, mode, passphrase, key, force)?;
            }
            if !no_score && matches!(mode, StegMode::Adaptive | StegMode::Sequential) {
                report_score(&cover)?;
            }
            Ok(())
        }
        Command::Extract {
            stego,
            key,
            output,
            passphrase,
            force,
        } => extract(&stego, key, output, passphrase, force),
        Command::Score { cover } => report_score(&cover),
        Command::Info { path } => info(&path),
        Command::Ciphers => {
            for cipher in CipherId::ALL {
                println!(
                    "{:<18} key {:>2} bytes, nonce {:>2} bytes",
                    cipher.as_str(),
                    cipher.key_len(),
                    cipher.nonce_len()
                );
            }
            Ok(())
        }
        Command::Wizard => wizard(),
    }
}

/// Map the cover extension (and optional --mode) to a steg mode.
fn resolve_mode(cover: &Path, flag: Option<StegMode>) -> Result<StegMode> {
    let ext = cover
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" | "bmp" => Ok(flag.unwrap_or(StegMode::Adaptive)),
        "jpg" | "jpeg" => {
            if flag.is_some() {
                bail!("--mode applies to raster covers only");
            }
            Ok(StegMode::Dct)
        }
        "wav" => {
            if flag.is_some() {
                bail!("--mode applies to raster covers only");
            }
            Ok(StegMode::Pcm)
        }
        other => bail!("unsupported cover format: {other}"),
    }
}

#[allow(clippy::too_many_arguments)]
fn embed_plain(
    cover: &Path,
    payload_path: &Path,
    output: &Path,
    cipher: CipherId,
    mode: StegMode,
    passphrase: Option<String>,
    key_path: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let payload = Zeroizing::new(std::fs::read(payload_path).context("reading payload")?);
    let passphrase = passphrase_or_prompt(passphrase, "Passphrase: ")?;

    let (sealed, key) = envelope::encrypt(&payload, &passphrase, cipher)?;
    stegkit::embed(cover, &sealed.ciphertext, output, &key, mode, force)?;

    let sidecar = Sidecar::new(&sealed, mode, extension_hint(payload_path));
    let key_path = key_path.unwrap_or_else(|| sibling(output, ".key"));
    sidecar.save(&key_path)?;

    println!("stego written to {}", output.display());
    println!("sidecar written to {}", key_path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn embed_deniable(
    cover: &Path,
    real_path: &Path,
    decoy_path: &Path,
    output: &Path,
    cipher: CipherId,
    passphrase: Option<String>,
    decoy_passphrase: Option<String>,
    key_path: Option<PathBuf>,
    decoy_key_path: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let real = Zeroizing::new(std::fs::read(real_path).context("reading payload")?);
    let decoy = Zeroizing::new(std::fs::read(decoy_path).context("reading decoy payload")?);
    let real_pass = passphrase_or_prompt(passphrase, "Real passphrase: ")?;
    let decoy_pass = passphrase_or_prompt(decoy_passphrase, "Decoy passphrase: ")?;
    if *real_pass == *decoy_pass {
        bail!("real and decoy passphrases must differ");
    }

    let (real_sealed, real_key) = envelope::encrypt(&real, &real_pass, cipher)?;
    let (decoy_sealed, decoy_key) = envelope::encrypt(&decoy, &decoy_pass, cipher)?;

    let (partition_seed, real_half) = stegkit::embed_deniable(
        cover,
        &real_sealed.ciphertext,
        &decoy_sealed.ciphertext,
        output,
        &real_key,
        &decoy_key,
        force,
    )?;

    let real_sidecar = Sidecar::new_deniable(
        &real_sealed,
        extension_hint(real_path),
        partition_seed,
        real_half,
    );
    let decoy_sidecar = Sidecar::new_deniable(
        &decoy_sealed,
        extension_hint(decoy_path),
        partition_seed,
        1 - real_half,
    );

    let key_path = key_path.unwrap_or_else(|| sibling(output, ".key"));
    let decoy_key_path = decoy_key_path.unwrap_or_else(|| sibling(output, ".decoy.key"));
    real_sidecar.save(&key_path)?;
    decoy_sidecar.save(&decoy_key_path)?;

    println!("stego written to {}", output.display());
    println!("real sidecar written to {}", key_path.display());
    println!("decoy sidecar written to {}", decoy_key_path.display());
    println!("store the two sidecars separately; they are structurally identical");
    Ok(())
}

fn extract(
    stego: &Path,
    key_path: Option<PathBuf>,
    output: Option<PathBuf>,
    passphrase: Option<String>,
    force: bool,
) -> Result<()> {
    let key_path = key_path.unwrap_or_else(|| sibling(stego, ".key"));
    let sidecar = Sidecar::load(&key_path)
        .with_context(|| format!("loading sidecar {}", key_path.display()))?;
    let passphrase = passphrase_or_prompt(passphrase, "Passphrase: ")?;
    let key = envelope::derive_key(&passphrase, &sidecar.salt)?;

    let ciphertext = if sidecar.deniable {
        // Parse-time validation guarantees both fields are present.
        let seed = sidecar
            .partition_seed
            .ok_or(stegkit::Error::MalformedSidecar("partition_seed"))?;
        let half = sidecar
            .partition_half
            .ok_or(stegkit::Error::MalformedSidecar("partition_half"))?;
        stegkit::extract_deniable(stego, &key, &seed, half)?
    } else {
        stegkit::extract(stego, &key, sidecar.steg_mode)?
    };

    let plaintext = envelope::decrypt_with_key(&sidecar.envelope(ciphertext), &key)?;

    let output = output.unwrap_or_else(|| {
        let ext = sidecar.info_type.as_deref().unwrap_or("bin");
        sibling(stego, &format!(".payload.{ext}"))
    });
    if !force && output.exists() {
        return Err(stegkit::Error::OutputExists(output).into());
    }
    std::fs::write(&output, &plaintext)?;
    println!("payload ({} bytes) written to {}", plaintext.len(), output.display());
    Ok(())
}

fn report_score(cover: &Path) -> Result<()> {
    let s = stegkit::score(cover)?;
    println!(
        "score {}/100 ({}) - entropy {:.2}, texture {:.2}, resolution {:.2}",
        s.score,
        s.label.as_str(),
        s.entropy,
        s.texture,
        s.resolution
    );
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    // A sidecar if it parses as one, otherwise a cover.
    if let Ok(text) = std::fs::read_to_string(path)
        && let Ok(sidecar) = Sidecar::parse(&text)
    {
        println!("sidecar record:");
        print!("{}", sidecar.render());
        return Ok(());
    }
    let cap = stegkit::capacity(path, None)?;
    println!("cover capacity: {cap} bytes ({} usable for payload)", cap.saturating_sub(4));
    if stegkit::score(path).is_ok() {
        report_score(path)?;
    }
    Ok(())
}

fn wizard() -> Result<()> {
    println!("stegkit wizard - answers are read from stdin");
    let action = prompt("embed or extract? [embed] ")?;
    match action.as_str() {
        "" | "embed" => {
            let cover = PathBuf::from(required(prompt("cover file: ")?)?);
            let payload = PathBuf::from(required(prompt("payload file: ")?)?);
            let output = PathBuf::from(required(prompt("output file: ")?)?);
            let cipher = match prompt("cipher [ChaCha20-Poly1305]: ")?.as_str() {
                "" => CipherId::ChaCha20Poly1305,
                other => parse_cipher(other).map_err(anyhow::Error::msg)?,
            };
            let mode = resolve_mode(&cover, None)?;
            embed_plain(&cover, &payload, &output, cipher, mode, None, None, false)?;
            if matches!(mode, StegMode::Adaptive) {
                report_score(&cover)?;
            }
            Ok(())
        }
        "extract" => {
            let stego = PathBuf::from(required(prompt("stego file: ")?)?);
            let key = match prompt("sidecar file [<stego>.key]: ")?.as_str() {
                "" => None,
                other => Some(PathBuf::from(other)),
            };
            extract(&stego, key, None, None, false)
        }
        other => bail!("unknown action: {other}"),
    }
}

/// `<path><suffix>` next to the original file.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn extension_hint(payload: &Path) -> Option<String> {
    payload
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn passphrase_or_prompt(flag: Option<String>, msg: &str) -> Result<Zeroizing<String>> {
    if let Some(p) = flag {
        log::warn!("passphrase taken from the command line; it may linger in shell history");
        return Ok(Zeroizing::new(p));
    }
    let entered = prompt(msg)?;
    if entered.is_empty() {
        bail!("empty passphrase");
    }
    Ok(Zeroizing::new(entered))
}

fn prompt(msg: &str) -> Result<String> {
    eprint!("{msg}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn required(value: String) -> Result<String> {
    if value.is_empty() {
        bail!("a value is required");
    }
    Ok(value)
}
