//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Socket or file failure in a backend or the session logger.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSC encode error: {0}")]
    Osc(#[from] rosc::OscError),

    #[error(transparent)]
    Token(#[from] ParseTokenError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A note token that does not follow `<Letter>[b|#]<Octave> <Duration>` or `- <Duration>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTokenError {
    #[error("empty note token")]
    Empty,

    #[error("note token {0:?} has no duration field")]
    MissingDuration(String),

    #[error("unknown pitch {0:?}")]
    Pitch(String),

    #[error("unknown duration code {0:?}")]
    Duration(String),

    #[error("note token {0:?} has trailing fields")]
    Trailing(String),
}
