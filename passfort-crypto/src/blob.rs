//! Self-contained vault blob format.
//!
//! Layout: `magic "PFVT" | version u8 | salt 16 | nonce 12 | ciphertext..`
//!
//! The salt travels inside the blob so the password is the only input needed
//! to open it; the same format is written to disk and uploaded to the cloud.
//! The version byte is reserved for format migrations.

use crate::cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, DerivedKey, KdfParams, Salt, SALT_SIZE};

const MAGIC: &[u8; 4] = b"PFVT";

/// Current blob format version.
///
/// Version 1 does not record the KDF parameters: opening a blob requires
/// the same parameters it was sealed with. Changing the application
/// defaults means a new version that carries them in the header.
pub const BLOB_VERSION: u8 = 1;

const HEADER_SIZE: usize = MAGIC.len() + 1 + SALT_SIZE + NONCE_SIZE;

/// Seals plaintext under a password with a fresh salt.
pub fn seal(plaintext: &[u8], password: &str, params: &KdfParams) -> CryptoResult<Vec<u8>> {
    let salt = Salt::random();
    let key = derive_key(password, &salt, params)?;
    seal_with(&key, &salt, plaintext)
}

/// Seals plaintext under an already-derived key.
///
/// The salt must be the one the key was derived from, so that `open` with
/// the original password still works. Used by the vault store, which derives
/// the key once at unlock and re-seals on every persist.
pub fn seal_with(key: &DerivedKey, salt: &Salt, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let encrypted = encrypt(key, plaintext)?;

    let mut blob = Vec::with_capacity(HEADER_SIZE + encrypted.ciphertext.len());
    blob.extend_from_slice(MAGIC);
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(salt.as_bytes());
    blob.extend_from_slice(&encrypted.nonce);
    blob.extend_from_slice(&encrypted.ciphertext);
    Ok(blob)
}

/// Opens a sealed blob with a password.
pub fn open(blob: &[u8], password: &str, params: &KdfParams) -> CryptoResult<Vec<u8>> {
    let (salt, encrypted) = parse(blob)?;
    let key = derive_key(password, &salt, params)?;
    decrypt(&key, &encrypted)
}

/// Opens a sealed blob with an already-derived key.
pub fn open_with(key: &DerivedKey, blob: &[u8]) -> CryptoResult<Vec<u8>> {
    let (_, encrypted) = parse(blob)?;
    decrypt(key, &encrypted)
}

/// Reads the salt from a blob header without decrypting.
pub fn read_salt(blob: &[u8]) -> CryptoResult<Salt> {
    let (salt, _) = parse(blob)?;
    Ok(salt)
}

fn parse(blob: &[u8]) -> CryptoResult<(Salt, EncryptedData)> {
    // The ciphertext always ends with the AEAD tag, so anything shorter
    // than header + tag cannot be a valid blob.
    if blob.len() < HEADER_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidFormat(format!(
            "blob too short: {} bytes",
            blob.len()
        )));
    }
    if &blob[..MAGIC.len()] != MAGIC {
        return Err(CryptoError::InvalidFormat("bad magic".into()));
    }
    let version = blob[MAGIC.len()];
    if version != BLOB_VERSION {
        return Err(CryptoError::UnsupportedVersion(version));
    }

    let salt_start = MAGIC.len() + 1;
    let nonce_start = salt_start + SALT_SIZE;

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&blob[salt_start..nonce_start]);

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&blob[nonce_start..HEADER_SIZE]);

    Ok((
        Salt::from_bytes(salt),
        EncryptedData {
            nonce,
            ciphertext: blob[HEADER_SIZE..].to_vec(),
        },
    ))
}
