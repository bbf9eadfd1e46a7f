use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single record could not be decoded. Readers stay usable afterwards.
    #[error("line {line}: {reason}")]
    Decode { line: usize, reason: String },

    #[error(transparent)]
    Core(#[from] telemflow_core::error::Error),
}

impl Error {
    /// Whether the reader can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}
