//! OS CSPRNG access. A failing random source is fatal, never retried.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::EnvelopeError;

/// Fill a fresh zeroizing array from the OS random source.
pub(crate) fn random_array<const N: usize>() -> Result<Zeroizing<[u8; N]>, EnvelopeError> {
    let mut bytes = Zeroizing::new([0u8; N]);
    OsRng
        .try_fill_bytes(bytes.as_mut())
        .map_err(|e| EnvelopeError::Environment(format!("secure random source failed: {e}")))?;
    Ok(bytes)
}
