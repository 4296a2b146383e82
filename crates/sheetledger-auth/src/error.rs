//! Error types for the stateless security primitives
//!
//! The taxonomy matters to callers: `Format` means a wire value is
//! structurally wrong ("malformed"), `Integrity` means an AEAD tag rejected
//! the payload ("tampered"). The two must stay distinguishable so a caller
//! can tell corruption from an attack, even though both are ultimately
//! treated as unauthenticated.

/// Errors from PKCE, cipher, and cookie operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied a malformed argument (empty, wrong length, bad charset)
    #[error("validation error: {0}")]
    Validation(String),

    /// Well-typed but structurally wrong wire value
    #[error("format error: {0}")]
    Format(String),

    /// Authenticated tamper/corruption detection (AEAD tag mismatch)
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Missing or malformed secret at startup; fatal
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
