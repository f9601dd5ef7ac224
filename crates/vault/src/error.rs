//! Vault client error types.

use thiserror::Error;

/// Vault client error type.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid vault address: {0}")]
    InvalidAddress(String),

    #[error("vault request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The vault answered with an error status. The message joins the
    /// entries of the response's `errors` array.
    #[error("vault returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The vault's response omitted a field the API contract requires.
    #[error("vault contract violation: {0}")]
    Contract(String),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;
