use thiserror::Error;

/// Structural problems with an envelope or with sealing parameters.
///
/// These are always detected before any key derivation or cipher work runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("container too short: {len} bytes (header needs at least {min})")]
    TooShort { len: usize, min: usize },

    #[error("magic mismatch: not an AegCrypt container")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported salt length {0} (only 16 bytes supported)")]
    SaltLength(u8),

    #[error("unsupported nonce length {0} (only 12 bytes supported)")]
    NonceLength(u8),

    #[error("unsupported tag length {0} bits (only 128 supported)")]
    TagLength(u8),

    #[error("PBKDF2 iteration count {got} outside [{min}, {max}]")]
    IterationsOutOfRange { got: u32, min: u32, max: u32 },

    #[error("filename is {0} bytes (maximum 1024)")]
    FilenameTooLong(usize),

    #[error("header declares {declared} bytes but only {actual} are present")]
    Truncated { declared: usize, actual: usize },

    #[error("ciphertext is {actual} bytes, header implies {expected}")]
    CiphertextLength { expected: u64, actual: u64 },

    #[error("plaintext of {0} bytes exceeds the AES-GCM per-message limit")]
    PayloadTooLarge(u64),
}

/// Every way sealing, opening or inspecting an envelope can fail.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid container: {0}")]
    Format(#[from] FormatError),

    /// Wrong password, corrupted ciphertext and edited header all land here.
    #[error("decryption failed: wrong password or corrupted data")]
    Authentication,

    #[error("crypto environment unavailable: {0}")]
    Environment(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl EnvelopeError {
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}
