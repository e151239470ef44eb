//! Error types for the DocuSign client.

use thiserror::Error;

/// DocuSign client error variants.
#[derive(Debug, Error)]
pub enum DocuSignError {
    /// The configured RSA private key could not be loaded.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The provider rejected the JWT grant credential exchange.
    #[error("Token exchange rejected (status {status}): {body}")]
    Credential { status: u16, body: String },

    /// The provider rejected the envelope creation call.
    #[error("Envelope creation rejected (status {status}, {reason}): {body}")]
    Provider {
        status: u16,
        reason: String,
        body: String,
    },

    /// Transport-level failure talking to the provider.
    #[error("Request to signing provider failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal client error.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DocuSignResult<T> = Result<T, DocuSignError>;
