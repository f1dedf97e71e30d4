use thiserror::Error;

pub type AegResult<T> = Result<T, AegError>;

#[derive(Debug, Error)]
pub enum AegError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
