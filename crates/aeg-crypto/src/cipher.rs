//! AES-256-GCM with the envelope header as associated data
//!
//! Output format: `[ciphertext][16-byte tag]`. The nonce is carried in the
//! header, not prepended here.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::error::EnvelopeError;
use crate::kdf::DerivedKey;
use crate::NONCE_SIZE;

/// Encrypt `plaintext`, authenticating `aad` alongside it.
///
/// The nonce must never repeat under the same key; the envelope pipeline
/// draws a fresh one (and a fresh key) per call.
pub fn encrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| EnvelopeError::Environment(format!("AES-256-GCM encryption failed: {e}")))
}

/// Decrypt and verify. Either the whole plaintext comes back or nothing does.
///
/// Every failure is [`EnvelopeError::Authentication`], whatever the cause.
pub fn decrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| EnvelopeError::Authentication)
}
