//! aeg-crypto: password-based authenticated encryption for single files
//!
//! Architecture: one self-describing envelope per sealed file
//!
//! Pipeline: plaintext → PBKDF2-SHA256 (fresh salt) → AES-256-GCM (fresh nonce, AAD = header) → header ‖ ciphertext ‖ tag
//!
//! Envelope layout (all integers big-endian):
//! ```text
//! magic "A256GCM" (7) | version (1) | salt_len (1) | nonce_len (1) | tag_bits (1)
//! | iterations (4) | plaintext_size (8) | filename_len (2)
//! | salt | nonce | filename | ciphertext | tag (16)
//! ```
//!
//! Every byte before the ciphertext is bound to the tag as associated data,
//! so editing any header field invalidates the container.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod header;
pub mod kdf;
pub mod passphrase;
mod random;
pub mod task;
pub mod validation;

pub use envelope::{
    inspect_only, open_file, open_file_with, seal_file, seal_file_with, EnvelopeMetadata, Hooks,
    ProgressFn, SealOptions, Stage,
};
pub use error::{EnvelopeError, FormatError};
pub use header::{decode, encode, Envelope, HeaderParams};
pub use kdf::{autotune, derive_key, recommend_iterations, Autotune, DerivedKey, KdfAlgorithm, KdfParams};
pub use passphrase::{estimate_entropy_bits, generate_password, Strength};
pub use task::{autotune_in_background, open_in_background, seal_in_background};

/// Magic tag at the start of every envelope
pub const MAGIC: &[u8; 7] = b"A256GCM";

/// The only envelope format version this crate reads or writes
pub const FORMAT_VERSION: u8 = 1;

/// Size of the PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// AES-GCM authentication tag length in bits
pub const TAG_BITS: u8 = 128;

/// AES-GCM authentication tag length in bytes
pub const TAG_SIZE: usize = 16;

/// Size of the fixed part of the header (everything before the salt)
pub const FIXED_HEADER_SIZE: usize = 25;

/// Longest filename the header may carry, in UTF-8 bytes
pub const MAX_FILENAME_LEN: usize = 1024;

/// Lowest accepted PBKDF2 iteration count
pub const MIN_ITERATIONS: u32 = 50_000;

/// Highest accepted PBKDF2 iteration count
pub const MAX_ITERATIONS: u32 = 5_000_000;

/// Ceiling for iteration counts recommended by [`autotune`]
pub const AUTOTUNE_MAX_ITERATIONS: u32 = 2_000_000;

/// Iteration count used when the caller does not choose one
pub const DEFAULT_ITERATIONS: u32 = 1_000_000;
