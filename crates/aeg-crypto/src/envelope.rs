//! Seal / open / inspect workflows over the envelope format
//!
//! Sealing: validate → fresh salt + nonce → PBKDF2 → encode header →
//! AES-256-GCM(AAD = header) → header ‖ ciphertext ‖ tag.
//!
//! Opening reverses it: decode + validate the header before the password is
//! touched, re-derive with the embedded salt and iteration count, decrypt
//! with the header prefix as AAD.
//!
//! Every sensitive buffer (plaintext, normalized password, key, salt, nonce)
//! lives in a zeroizing wrapper owned by the call, so it is scrubbed on every
//! exit path, including `?` returns and cancellation.

use std::fmt;

use secrecy::SecretString;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::EnvelopeError;
use crate::header::{self, Envelope, HeaderParams};
use crate::kdf::{KdfAlgorithm, KdfParams};
use crate::random::random_array;
use crate::validation;
use crate::{cipher, DEFAULT_ITERATIONS, NONCE_SIZE, TAG_BITS};

/// Pipeline phase reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    DerivingKey,
    Encrypting,
    Decrypting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Validating => "validating",
            Stage::DerivingKey => "deriving key",
            Stage::Encrypting => "encrypting",
            Stage::Decrypting => "decrypting",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Progress callback type (stage, percent complete 0-100)
pub type ProgressFn = Box<dyn Fn(Stage, u8) + Send + Sync>;

/// Optional progress reporting and cancellation for one pipeline call.
///
/// Cancellation is honoured before key derivation and again right before
/// the AEAD call. Once the cipher runs it is never interrupted.
#[derive(Default)]
pub struct Hooks {
    pub progress: Option<ProgressFn>,
    pub cancel: Option<CancellationToken>,
}

impl Hooks {
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn report(&self, stage: Stage, percent: u8) {
        debug!(%stage, percent, "envelope pipeline");
        if let Some(progress) = &self.progress {
            progress(stage, percent);
        }
    }

    fn checkpoint(&self) -> Result<(), EnvelopeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(EnvelopeError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Caller choices for sealing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealOptions {
    /// PBKDF2 iteration count, must lie in `[MIN_ITERATIONS, MAX_ITERATIONS]`
    pub iterations: u32,
    /// Original filename recorded in the header
    pub filename: Option<String>,
    /// Record an empty filename instead of the real one
    pub hide_name: bool,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            filename: None,
            hide_name: false,
        }
    }
}

impl SealOptions {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn hide_name(mut self, hide: bool) -> Self {
        self.hide_name = hide;
        self
    }

    fn header_filename(&self) -> &str {
        match (&self.filename, self.hide_name) {
            (Some(name), false) => name,
            _ => "",
        }
    }
}

/// Header fields for display; produced without any cryptographic work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeMetadata {
    pub version: u8,
    pub plaintext_size: u64,
    pub kdf: KdfAlgorithm,
    pub iterations: u32,
    pub tag_bits: u8,
    pub salt_len: usize,
    pub nonce_len: usize,
    /// `None` when the filename field is empty (hidden)
    pub filename: Option<String>,
}

impl EnvelopeMetadata {
    fn from_envelope(envelope: &Envelope<'_>) -> Self {
        let filename = (!envelope.filename.is_empty())
            .then(|| envelope.filename_lossy().into_owned());
        Self {
            version: envelope.version,
            plaintext_size: envelope.plaintext_size,
            kdf: KdfAlgorithm::Pbkdf2Sha256,
            iterations: envelope.iterations,
            tag_bits: envelope.tag_bits,
            salt_len: envelope.salt.len(),
            nonce_len: envelope.nonce.len(),
            filename,
        }
    }

    /// Empty and whitespace-only names both count as hidden.
    pub fn is_hidden(&self) -> bool {
        self.filename
            .as_deref()
            .map_or(true, |name| name.trim().is_empty())
    }

    pub fn display_name(&self) -> &str {
        match self.filename.as_deref() {
            Some(name) if !self.is_hidden() => name,
            _ => "hidden",
        }
    }
}

impl fmt::Display for EnvelopeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file={}, size={}B, PBKDF2={}, v={}, tag={}bit",
            self.display_name(),
            self.plaintext_size,
            self.iterations,
            self.version,
            self.tag_bits
        )
    }
}

/// Seal `plaintext` under `password`.
///
/// The plaintext buffer is taken by value and scrubbed before return.
pub fn seal_file(
    plaintext: Vec<u8>,
    password: &SecretString,
    options: &SealOptions,
) -> Result<Vec<u8>, EnvelopeError> {
    seal_file_with(plaintext, password, options, &Hooks::default())
}

/// [`seal_file`] with progress reporting and cancellation.
pub fn seal_file_with(
    plaintext: Vec<u8>,
    password: &SecretString,
    options: &SealOptions,
    hooks: &Hooks,
) -> Result<Vec<u8>, EnvelopeError> {
    let plaintext = Zeroizing::new(plaintext);

    hooks.report(Stage::Validating, 10);
    validation::check_iterations(options.iterations)?;
    let filename = options.header_filename().as_bytes();
    validation::check_filename_len(filename.len())?;
    let plaintext_size = plaintext.len() as u64;
    validation::check_payload_size(plaintext_size)?;
    hooks.checkpoint()?;

    let kdf = KdfParams::generate(options.iterations)?;
    let nonce = random_array::<NONCE_SIZE>()?;

    hooks.report(Stage::DerivingKey, 15);
    let key = kdf.derive(password);
    hooks.checkpoint()?;

    let mut container = header::encode(&HeaderParams {
        salt: &*kdf.salt,
        nonce: &*nonce,
        iterations: kdf.iterations,
        tag_bits: TAG_BITS,
        plaintext_size,
        filename,
    });

    hooks.report(Stage::Encrypting, 50);
    let sealed = cipher::encrypt(&key, &nonce, &container, &plaintext)?;

    let total = header::container_len(plaintext.len(), filename.len());
    container.reserve_exact(total.saturating_sub(container.len()));
    container.extend_from_slice(&sealed);
    debug_assert_eq!(container.len(), total);

    hooks.report(Stage::Done, 100);
    info!(
        plaintext_bytes = plaintext_size,
        container_bytes = container.len(),
        iterations = kdf.iterations,
        hidden_name = filename.is_empty(),
        "sealed envelope"
    );
    Ok(container)
}

/// Open a sealed container. The returned plaintext is scrubbed on drop.
pub fn open_file(
    container: &[u8],
    password: &SecretString,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    open_file_with(container, password, &Hooks::default())
}

/// [`open_file`] with progress reporting and cancellation.
pub fn open_file_with(
    container: &[u8],
    password: &SecretString,
    hooks: &Hooks,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    hooks.report(Stage::Validating, 15);
    let envelope = header::decode(container)?;
    hooks.checkpoint()?;

    let kdf = KdfParams::from_envelope(&envelope);
    let nonce = Zeroizing::new(*envelope.nonce);

    hooks.report(Stage::DerivingKey, 40);
    let key = kdf.derive(password);
    hooks.checkpoint()?;

    hooks.report(Stage::Decrypting, 60);
    let result = cipher::decrypt(&key, &nonce, envelope.header, envelope.ciphertext);

    // scrub before any error leaves this frame
    drop(key);
    drop(kdf);
    drop(nonce);

    let plaintext = result?;
    hooks.report(Stage::Done, 100);
    info!(
        plaintext_bytes = plaintext.len(),
        iterations = envelope.iterations,
        "opened envelope"
    );
    Ok(plaintext)
}

/// Parse and validate the header only. No key derivation, no decryption.
pub fn inspect_only(container: &[u8]) -> Result<EnvelopeMetadata, EnvelopeError> {
    let envelope = header::decode(container)?;
    let metadata = EnvelopeMetadata::from_envelope(&envelope);
    debug!(
        version = metadata.version,
        salt_len = metadata.salt_len,
        nonce_len = metadata.nonce_len,
        tag_bits = metadata.tag_bits,
        "inspected header"
    );
    Ok(metadata)
}
