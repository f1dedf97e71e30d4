//! Key derivation: PBKDF2-SHA256 passphrase → AES-256 key, plus iteration autotuning

use std::time::{Duration, Instant};

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, Zeroizing};

use crate::error::EnvelopeError;
use crate::header::Envelope;
use crate::random::random_array;
use crate::validation;
use crate::{AUTOTUNE_MAX_ITERATIONS, KEY_SIZE, MIN_ITERATIONS, SALT_SIZE};

/// Iteration count of the autotune calibration run
pub const CALIBRATION_ITERATIONS: u32 = 100_000;

/// Derivation latency the autotuner aims for
pub const AUTOTUNE_TARGET: Duration = Duration::from_millis(500);

const CALIBRATION_PASSWORD: &[u8] = b"test-password-123!@#";

/// A 256-bit AES key derived from a passphrase.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key derivation algorithms understood by the format. Version 1 has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum KdfAlgorithm {
    #[serde(rename = "PBKDF2-SHA256")]
    Pbkdf2Sha256,
}

/// Salt and work factor for one derivation. The salt is scrubbed on drop.
#[derive(Clone)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    pub salt: Zeroizing<[u8; SALT_SIZE]>,
    pub iterations: u32,
}

impl KdfParams {
    /// Fresh parameters for a new envelope: validated iteration count and a
    /// random salt.
    pub fn generate(iterations: u32) -> Result<Self, EnvelopeError> {
        validation::check_iterations(iterations)?;
        Ok(Self {
            algorithm: KdfAlgorithm::Pbkdf2Sha256,
            salt: random_array()?,
            iterations,
        })
    }

    /// Parameters carried by a parsed envelope (salt copied out of the container).
    pub fn from_envelope(envelope: &Envelope<'_>) -> Self {
        Self {
            algorithm: KdfAlgorithm::Pbkdf2Sha256,
            salt: Zeroizing::new(*envelope.salt),
            iterations: envelope.iterations,
        }
    }

    /// Derive the key for `passphrase` under these parameters.
    pub fn derive(&self, passphrase: &SecretString) -> DerivedKey {
        let password = normalize_passphrase(passphrase);
        derive_key(password.as_bytes(), &self.salt, self.iterations)
    }
}

impl std::fmt::Debug for KdfParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdfParams")
            .field("algorithm", &self.algorithm)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

/// NFKC-normalize a passphrase so every Unicode composition of the same text
/// yields the same bytes.
///
/// The output is sized up front; it must never reallocate, since a freed
/// intermediate buffer would not be scrubbed.
pub fn normalize_passphrase(passphrase: &SecretString) -> Zeroizing<String> {
    let raw = passphrase.expose_secret();
    let len: usize = raw.nfkc().map(char::len_utf8).sum();
    let mut out = Zeroizing::new(String::with_capacity(len));
    out.extend(raw.nfkc());
    out
}

/// Derive a 256-bit key with PBKDF2-HMAC-SHA256.
///
/// `password` must already be the normalized UTF-8 encoding of the passphrase.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_SIZE], iterations: u32) -> DerivedKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    derived
}

/// Result of an autotune calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autotune {
    pub recommended: u32,
    pub baseline: u32,
    pub elapsed: Duration,
}

/// Time one derivation at [`CALIBRATION_ITERATIONS`] and recommend an
/// iteration count that should take about [`AUTOTUNE_TARGET`] on this host.
///
/// This bounds interactive latency; it says nothing about absolute security.
pub fn autotune() -> Result<Autotune, EnvelopeError> {
    let password = Zeroizing::new(CALIBRATION_PASSWORD.to_vec());
    let salt = random_array::<SALT_SIZE>()?;

    let start = Instant::now();
    let key = derive_key(&password, &salt, CALIBRATION_ITERATIONS);
    let elapsed = start.elapsed();

    drop(key);
    drop(password);
    drop(salt);

    let recommended = recommend_iterations(elapsed);
    debug!(
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        recommended, "autotune calibration finished"
    );

    Ok(Autotune {
        recommended,
        baseline: CALIBRATION_ITERATIONS,
        elapsed,
    })
}

/// Scale the calibration baseline to the target latency, rounded to the
/// nearest thousand and clamped to `[MIN_ITERATIONS, AUTOTUNE_MAX_ITERATIONS]`.
pub fn recommend_iterations(elapsed: Duration) -> u32 {
    let elapsed_ms = (elapsed.as_secs_f64() * 1000.0).max(1.0);
    let target_ms = AUTOTUNE_TARGET.as_secs_f64() * 1000.0;
    let factor = target_ms / elapsed_ms;

    let mut estimate = ((f64::from(CALIBRATION_ITERATIONS) * factor) / 1000.0).round() * 1000.0;
    if !estimate.is_finite() {
        estimate = f64::from(CALIBRATION_ITERATIONS);
    }

    estimate.clamp(f64::from(MIN_ITERATIONS), f64::from(AUTOTUNE_MAX_ITERATIONS)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use proptest::prelude::*;

    #[test]
    fn test_kdf_deterministic() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key(b"test-passphrase-123", &salt, MIN_ITERATIONS);
        let key2 = derive_key(b"test-passphrase-123", &salt, MIN_ITERATIONS);

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "KDF must be deterministic"
        );
    }

    #[test]
    fn test_kdf_known_vector() {
        // RFC 7914 section 11 PBKDF2-HMAC-SHA256 vector (c = 1)
        let mut out = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(
            &out[..8],
            &[0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let key1 = derive_key(b"same-passphrase", &[1u8; SALT_SIZE], MIN_ITERATIONS);
        let key2 = derive_key(b"same-passphrase", &[2u8; SALT_SIZE], MIN_ITERATIONS);

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_iterations() {
        let salt = [3u8; SALT_SIZE];
        let key1 = derive_key(b"pw", &salt, MIN_ITERATIONS);
        let key2 = derive_key(b"pw", &salt, MIN_ITERATIONS + 1);
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_normalization_unifies_compositions() {
        // "é" precomposed vs. "e" + combining acute
        let composed = SecretString::from("caf\u{00e9}");
        let decomposed = SecretString::from("cafe\u{0301}");
        assert_eq!(
            *normalize_passphrase(&composed),
            *normalize_passphrase(&decomposed)
        );

        let params = KdfParams {
            algorithm: KdfAlgorithm::Pbkdf2Sha256,
            salt: Zeroizing::new([9u8; SALT_SIZE]),
            iterations: MIN_ITERATIONS,
        };
        assert_eq!(
            params.derive(&composed).as_bytes(),
            params.derive(&decomposed).as_bytes()
        );
    }

    #[test]
    fn test_normalization_is_nfkc() {
        // fullwidth "Ａ" folds to ASCII "A" under compatibility normalization
        let fullwidth = SecretString::from("\u{FF21}bc");
        assert_eq!(normalize_passphrase(&fullwidth).as_str(), "Abc");
    }

    #[test]
    fn test_generate_rejects_bad_iterations() {
        let err = KdfParams::generate(MIN_ITERATIONS - 1).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Format(FormatError::IterationsOutOfRange { .. })
        ));
    }

    #[test]
    fn test_generate_fresh_salts() {
        let a = KdfParams::generate(MIN_ITERATIONS).unwrap();
        let b = KdfParams::generate(MIN_ITERATIONS).unwrap();
        assert_ne!(*a.salt, *b.salt);
    }

    #[test]
    fn test_debug_redacts() {
        let key = DerivedKey::from_bytes([0xAB; KEY_SIZE]);
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("171"));

        let params = KdfParams::generate(MIN_ITERATIONS).unwrap();
        assert!(!format!("{params:?}").contains("salt"));
    }

    #[test]
    fn test_recommend_examples() {
        // 100k iterations in 50 ms → 1,000,000 for 500 ms
        assert_eq!(recommend_iterations(Duration::from_millis(50)), 1_000_000);
        // 100k in 250 ms → 200,000
        assert_eq!(recommend_iterations(Duration::from_millis(250)), 200_000);
        // very fast host is capped
        assert_eq!(
            recommend_iterations(Duration::from_millis(1)),
            AUTOTUNE_MAX_ITERATIONS
        );
        // zero elapsed is treated as 1 ms
        assert_eq!(recommend_iterations(Duration::ZERO), AUTOTUNE_MAX_ITERATIONS);
        // very slow host is floored
        assert_eq!(
            recommend_iterations(Duration::from_secs(10)),
            MIN_ITERATIONS
        );
    }

    #[test]
    fn test_recommend_floor_when_estimate_rounds_to_zero() {
        // 100k in 200 s scales to 250 iterations, which rounds to 0
        assert_eq!(recommend_iterations(Duration::from_secs(60)), MIN_ITERATIONS);
        assert_eq!(recommend_iterations(Duration::from_secs(200)), MIN_ITERATIONS);
        assert_eq!(recommend_iterations(Duration::from_secs(86_400)), MIN_ITERATIONS);
    }

    #[test]
    fn test_normalize_preallocates_exact_length() {
        // U+FDFA expands to 18 characters under NFKC
        let normalized = normalize_passphrase(&SecretString::from("\u{fdfa}\u{fb01}"));
        assert_eq!(normalized.capacity(), normalized.len());
        assert_eq!(normalized.chars().count(), 20);
    }

    #[test]
    fn test_autotune_within_bounds() {
        let result = autotune().unwrap();
        assert!(result.recommended >= MIN_ITERATIONS);
        assert!(result.recommended <= AUTOTUNE_MAX_ITERATIONS);
        assert_eq!(result.recommended % 1000, 0);
        assert_eq!(result.baseline, CALIBRATION_ITERATIONS);
    }

    proptest! {
        #[test]
        fn recommendation_is_monotonic(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let (fast, slow) = if a <= b { (a, b) } else { (b, a) };
            let r_fast = recommend_iterations(Duration::from_millis(fast));
            let r_slow = recommend_iterations(Duration::from_millis(slow));
            prop_assert!(r_slow <= r_fast, "slower calibration must not recommend more iterations");
        }

        #[test]
        fn recommendation_in_bounds(ms in 0u64..1_000_000) {
            let r = recommend_iterations(Duration::from_millis(ms));
            prop_assert!((MIN_ITERATIONS..=AUTOTUNE_MAX_ITERATIONS).contains(&r));
        }
    }
}
