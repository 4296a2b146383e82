//! Error types for session store operations

/// Errors from session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied a malformed argument
    #[error("validation error: {0}")]
    Validation(String),

    /// No record exists for the session key on retrieve.
    /// The one lookup miss surfaced as an error: callers need to tell
    /// "never logged in" from "session exists but corrupted".
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend I/O or protocol failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend selection or credentials problem at startup; fatal
    #[error("configuration error: {0}")]
    Config(String),

    /// Cipher failure on the stored envelope (format or integrity)
    #[error(transparent)]
    Cipher(#[from] sheetledger_auth::Error),
}

/// Result alias for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
