//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during encryption, decryption, or key derivation.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrong password or tampered ciphertext. The AEAD cannot tell these
    /// apart, so neither can callers.
    #[error("authentication failure: wrong password or corrupted data")]
    AuthenticationFailure,

    /// The blob is not a PassFort vault blob, or is truncated.
    #[error("invalid blob format: {0}")]
    InvalidFormat(String),

    /// A future blob version this build does not understand.
    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u8),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),
}
