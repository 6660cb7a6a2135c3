use thiserror::Error;

/// Errors from the I/O-bearing parts of the crate (journal export, config loading).
/// Queue operations themselves never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("journal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid queue config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
