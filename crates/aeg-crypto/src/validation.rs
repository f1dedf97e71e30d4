//! Format invariants, checked before any cryptography runs.
//!
//! Header decoding calls these in wire order so the first violated field is
//! the one reported. Sealing reuses the same bounds for caller parameters.

use crate::error::FormatError;
use crate::header::FixedFields;
use crate::{
    FIXED_HEADER_SIZE, FORMAT_VERSION, MAGIC, MAX_FILENAME_LEN, MAX_ITERATIONS, MIN_ITERATIONS,
    NONCE_SIZE, SALT_SIZE, TAG_BITS, TAG_SIZE,
};

/// AES-GCM refuses messages longer than 2^36 - 32 bytes under one nonce.
pub const MAX_PAYLOAD_SIZE: u64 = (1 << 36) - 32;

pub fn check_min_length(len: usize) -> Result<(), FormatError> {
    if len < FIXED_HEADER_SIZE {
        return Err(FormatError::TooShort {
            len,
            min: FIXED_HEADER_SIZE,
        });
    }
    Ok(())
}

pub fn check_magic(bytes: &[u8]) -> Result<(), FormatError> {
    if bytes.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
        return Err(FormatError::BadMagic);
    }
    Ok(())
}

pub fn check_iterations(iterations: u32) -> Result<(), FormatError> {
    if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
        return Err(FormatError::IterationsOutOfRange {
            got: iterations,
            min: MIN_ITERATIONS,
            max: MAX_ITERATIONS,
        });
    }
    Ok(())
}

pub fn check_filename_len(len: usize) -> Result<(), FormatError> {
    if len > MAX_FILENAME_LEN {
        return Err(FormatError::FilenameTooLong(len));
    }
    Ok(())
}

pub fn check_payload_size(len: u64) -> Result<(), FormatError> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(FormatError::PayloadTooLarge(len));
    }
    Ok(())
}

/// Validate the fixed-size fields in the order they appear on the wire.
pub fn check_fixed_fields(fields: &FixedFields) -> Result<(), FormatError> {
    if fields.version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(fields.version));
    }
    if usize::from(fields.salt_len) != SALT_SIZE {
        return Err(FormatError::SaltLength(fields.salt_len));
    }
    if usize::from(fields.nonce_len) != NONCE_SIZE {
        return Err(FormatError::NonceLength(fields.nonce_len));
    }
    if fields.tag_bits != TAG_BITS {
        return Err(FormatError::TagLength(fields.tag_bits));
    }
    check_iterations(fields.iterations)?;
    check_filename_len(usize::from(fields.filename_len))
}

pub fn check_declared_length(declared: usize, actual: usize) -> Result<(), FormatError> {
    if actual < declared {
        return Err(FormatError::Truncated { declared, actual });
    }
    Ok(())
}

/// `ciphertext_len` must equal `plaintext_size` plus the tag.
pub fn check_ciphertext_len(plaintext_size: u64, ciphertext_len: usize) -> Result<(), FormatError> {
    let actual = ciphertext_len as u64;
    let tag = TAG_SIZE as u64;
    if actual < tag || actual - tag != plaintext_size {
        return Err(FormatError::CiphertextLength {
            expected: plaintext_size.saturating_add(tag),
            actual,
        });
    }
    Ok(())
}
