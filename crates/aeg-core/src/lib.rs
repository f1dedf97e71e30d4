pub mod config;
pub mod error;

pub use config::AegConfig;
pub use error::{AegError, AegResult};
