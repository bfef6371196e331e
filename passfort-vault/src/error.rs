//! Vault error types.

use thiserror::Error;
use uuid::Uuid;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in the local vault store.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("a vault file already exists at this path")]
    AlreadyExists,

    #[error("no vault file exists at this path")]
    NotInitialized,

    #[error("vault is locked")]
    Locked,

    #[error("credential not found: {0}")]
    NotFound(Uuid),

    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] passfort_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
