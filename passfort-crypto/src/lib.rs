//! Encryption layer for PassFort.
//!
//! Provides vault encryption using:
//! - Argon2id for key derivation from the master password
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Secure key management with zeroization
//!
//! # Architecture
//!
//! The master key is derived from the user's password with Argon2id and a
//! per-vault random salt. The key is never stored; it is derived on every
//! unlock and held only in memory.
//!
//! A sealed vault blob carries everything needed to open it again with just
//! the password: `magic | version | salt | nonce | ciphertext`. The AEAD tag
//! makes a wrong password and a tampered blob indistinguishable: both fail
//! with [`CryptoError::AuthenticationFailure`], never garbage plaintext.

mod blob;
mod cipher;
mod error;
mod key;

pub use blob::{open, open_with, read_salt, seal, seal_with, BLOB_VERSION};
pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
