//! Random passphrase generation and a rough strength estimate

use std::fmt;

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use secrecy::SecretString;
use zeroize::Zeroizing;

/// Symbols used by [`generate_password`].
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.@#$%*!?~";

pub const DEFAULT_PASSWORD_LEN: usize = 20;

/// Draw `len` symbols uniformly from [`PASSWORD_ALPHABET`] using the OS CSPRNG.
pub fn generate_password(len: usize) -> SecretString {
    let mut out = Zeroizing::new(String::with_capacity(len));
    for _ in 0..len {
        if let Some(&c) = PASSWORD_ALPHABET.choose(&mut OsRng) {
            out.push(char::from(c));
        }
    }
    SecretString::from(out.as_str())
}

/// Pool size × length estimate. Counts lowercase (26), uppercase (26),
/// digits (10) and everything else (33) as separate pools.
pub fn estimate_entropy_bits(password: &str) -> f64 {
    if password.is_empty() {
        return 0.0;
    }

    let mut pool = 0u32;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        pool += 26;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        pool += 10;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        pool += 33;
    }

    f64::from(pool.max(1)).log2() * password.chars().count() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Weak,
    Fair,
    Strong,
    VeryStrong,
}

impl Strength {
    pub fn from_bits(bits: f64) -> Self {
        if bits < 40.0 {
            Strength::Weak
        } else if bits < 60.0 {
            Strength::Fair
        } else if bits < 80.0 {
            Strength::Strong
        } else {
            Strength::VeryStrong
        }
    }

    pub fn of(password: &str) -> Self {
        Self::from_bits(estimate_entropy_bits(password))
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strength::Weak => "weak",
            Strength::Fair => "fair",
            Strength::Strong => "strong",
            Strength::VeryStrong => "very strong",
        })
    }
}
