//! Async boundary: run CPU-bound pipeline calls on tokio's blocking pool.
//!
//! Dropping one of these futures does not stop the work already handed to
//! the pool; cancel through the [`Hooks`] token instead.

use secrecy::SecretString;
use tokio::task::JoinError;
use zeroize::Zeroizing;

use crate::envelope::{open_file_with, seal_file_with, Hooks, SealOptions};
use crate::error::EnvelopeError;
use crate::kdf::{autotune, Autotune};

fn lost_task(e: JoinError) -> EnvelopeError {
    EnvelopeError::Environment(format!("background task failed: {e}"))
}

/// Seal on the blocking pool. See [`crate::seal_file`].
pub async fn seal_in_background(
    plaintext: Vec<u8>,
    password: SecretString,
    options: SealOptions,
    hooks: Hooks,
) -> Result<Vec<u8>, EnvelopeError> {
    tokio::task::spawn_blocking(move || seal_file_with(plaintext, &password, &options, &hooks))
        .await
        .map_err(lost_task)?
}

/// Open on the blocking pool. See [`crate::open_file`].
pub async fn open_in_background(
    container: Vec<u8>,
    password: SecretString,
    hooks: Hooks,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    tokio::task::spawn_blocking(move || open_file_with(&container, &password, &hooks))
        .await
        .map_err(lost_task)?
}

/// Run the autotune calibration on the blocking pool.
pub async fn autotune_in_background() -> Result<Autotune, EnvelopeError> {
    tokio::task::spawn_blocking(autotune)
        .await
        .map_err(lost_task)?
}
