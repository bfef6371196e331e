//! Cloud sync error types.

use thiserror::Error;

use crate::types::CloudType;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur in authorization, transport, and sync.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The user declined the provider consent step.
    #[error("authorization denied by user")]
    AuthorizationDenied,

    /// The OAuth2 exchange failed at the protocol level.
    #[error("authorization failed: {0}")]
    AuthorizationFailure(String),

    /// The refresh token is gone or no longer accepted; the caller must
    /// re-run the authorization flow.
    #[error("re-authorization required")]
    ReauthorizationRequired,

    /// The provider rejected a request. Status code preserved for
    /// diagnostics.
    #[error("transport failure (HTTP {status}): {message}")]
    TransportFailure { status: u16, message: String },

    /// The caller cancelled. Expected outcome, not a fault; surfaced
    /// separately so it is never rendered as an error.
    #[error("operation cancelled")]
    Cancelled,

    /// Another synchronize/upload is already in flight for this vault.
    #[error("a sync operation is already in progress")]
    SyncInFlight,

    #[error("no cloud service registered for {0}")]
    UnknownProvider(CloudType),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("token persistence failed: {0}")]
    TokenStore(#[from] std::io::Error),

    #[error("vault error: {0}")]
    Vault(#[from] passfort_vault::VaultError),

    #[error("crypto error: {0}")]
    Crypto(#[from] passfort_crypto::CryptoError),
}
