//! Envelope header codec
//!
//! Header format (binary, big-endian):
//! ```text
//! offset  size  field
//!      0     7  magic "A256GCM"
//!      7     1  version (1)
//!      8     1  salt length (16)
//!      9     1  nonce length (12)
//!     10     1  tag length in bits (128)
//!     11     4  PBKDF2 iterations
//!     15     8  plaintext size
//!     23     2  filename length (<= 1024)
//!     25     -  salt | nonce | filename
//! ```
//!
//! The encoded header is the AES-GCM associated data. Decoding borrows from
//! the input: the ciphertext is never copied.

use std::borrow::Cow;

use crate::error::FormatError;
use crate::validation;
use crate::{FIXED_HEADER_SIZE, FORMAT_VERSION, MAGIC, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// The fixed 25-byte prefix of a header, read but not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFields {
    pub version: u8,
    pub salt_len: u8,
    pub nonce_len: u8,
    pub tag_bits: u8,
    pub iterations: u32,
    pub plaintext_size: u64,
    pub filename_len: u16,
}

impl FixedFields {
    /// Read the fields after the magic. `bytes` must hold at least
    /// [`FIXED_HEADER_SIZE`] bytes.
    fn read(bytes: &[u8]) -> Self {
        Self {
            version: bytes[7],
            salt_len: bytes[8],
            nonce_len: bytes[9],
            tag_bits: bytes[10],
            iterations: u32::from_be_bytes(be_array(bytes, 11)),
            plaintext_size: u64::from_be_bytes(be_array(bytes, 15)),
            filename_len: u16::from_be_bytes(be_array(bytes, 23)),
        }
    }

    /// Total header length these fields declare.
    fn header_len(&self) -> usize {
        FIXED_HEADER_SIZE
            + usize::from(self.salt_len)
            + usize::from(self.nonce_len)
            + usize::from(self.filename_len)
    }
}

fn be_array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// Everything needed to write a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderParams<'a> {
    pub salt: &'a [u8; SALT_SIZE],
    pub nonce: &'a [u8; NONCE_SIZE],
    pub iterations: u32,
    pub tag_bits: u8,
    pub plaintext_size: u64,
    /// UTF-8 filename, empty when hidden. At most 1024 bytes.
    pub filename: &'a [u8],
}

/// A parsed, validated envelope borrowing from the container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub version: u8,
    pub salt: &'a [u8; SALT_SIZE],
    pub nonce: &'a [u8; NONCE_SIZE],
    pub tag_bits: u8,
    pub iterations: u32,
    pub plaintext_size: u64,
    pub filename: &'a [u8],
    /// Header prefix: every byte before the ciphertext (the AAD).
    pub header: &'a [u8],
    /// Ciphertext with the 16-byte tag appended.
    pub ciphertext: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// The parameters this envelope was encoded from.
    pub fn params(&self) -> HeaderParams<'a> {
        HeaderParams {
            salt: self.salt,
            nonce: self.nonce,
            iterations: self.iterations,
            tag_bits: self.tag_bits,
            plaintext_size: self.plaintext_size,
            filename: self.filename,
        }
    }

    pub fn filename_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.filename)
    }

    pub fn tag_len(&self) -> usize {
        usize::from(self.tag_bits / 8)
    }
}

/// Encode a header. Callers validate the parameters beforehand; the
/// filename must already be within [`crate::MAX_FILENAME_LEN`].
pub fn encode(params: &HeaderParams<'_>) -> Vec<u8> {
    let total = FIXED_HEADER_SIZE + SALT_SIZE + NONCE_SIZE + params.filename.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out.push(SALT_SIZE as u8);
    out.push(NONCE_SIZE as u8);
    out.push(params.tag_bits);
    out.extend_from_slice(&params.iterations.to_be_bytes());
    out.extend_from_slice(&params.plaintext_size.to_be_bytes());
    out.extend_from_slice(&(params.filename.len() as u16).to_be_bytes());
    out.extend_from_slice(params.salt);
    out.extend_from_slice(params.nonce);
    out.extend_from_slice(params.filename);
    out
}

/// Parse and validate a complete container.
pub fn decode(bytes: &[u8]) -> Result<Envelope<'_>, FormatError> {
    validation::check_min_length(bytes.len())?;
    validation::check_magic(bytes)?;

    let fields = FixedFields::read(bytes);
    validation::check_fixed_fields(&fields)?;

    let header_len = fields.header_len();
    validation::check_declared_length(header_len, bytes.len())?;

    let (header, ciphertext) = bytes.split_at(header_len);
    let (salt, rest) = header[FIXED_HEADER_SIZE..].split_at(SALT_SIZE);
    let (nonce, filename) = rest.split_at(NONCE_SIZE);

    validation::check_ciphertext_len(fields.plaintext_size, ciphertext.len())?;

    let truncated = || FormatError::Truncated {
        declared: header_len,
        actual: bytes.len(),
    };

    Ok(Envelope {
        version: fields.version,
        salt: salt.try_into().map_err(|_| truncated())?,
        nonce: nonce.try_into().map_err(|_| truncated())?,
        tag_bits: fields.tag_bits,
        iterations: fields.iterations,
        plaintext_size: fields.plaintext_size,
        filename,
        header,
        ciphertext,
    })
}

/// Size of a complete container for the given payload and filename lengths.
pub(crate) fn container_len(plaintext_size: usize, filename_len: usize) -> usize {
    FIXED_HEADER_SIZE + SALT_SIZE + NONCE_SIZE + filename_len + plaintext_size + TAG_SIZE
}
