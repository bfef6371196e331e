//! Encrypted vault store with atomic persistence.
//!
//! The on-disk form is always a sealed blob of the serialized in-memory
//! credential list. Persist stages the new blob in a temp file next to the
//! vault and atomically replaces the target, so memory and disk never
//! diverge and no partial write is observable. Mutations roll the in-memory
//! state back if the replace cannot complete.

use crate::credential::Credential;
use crate::error::{VaultError, VaultResult};
use passfort_crypto::{
    derive_key, open_with, read_salt, seal_with, CryptoError, DerivedKey, KdfParams, Salt,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

/// Vault session state.
///
/// `Locked` is terminal for a session; re-entering `Unlocked` requires a
/// fresh [`VaultStore::unlock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Unlocked,
    Locked,
}

/// Owns the local encrypted vault file and the authoritative in-memory copy.
pub struct VaultStore {
    path: PathBuf,
    kdf: KdfParams,
    state: VaultState,
    key: Option<DerivedKey>,
    salt: Option<Salt>,
    entries: Vec<Credential>,
}

impl VaultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_kdf(path, KdfParams::default())
    }

    /// Overrides the KDF parameters (tests use cheap ones).
    pub fn with_kdf(path: impl Into<PathBuf>, kdf: KdfParams) -> Self {
        Self {
            path: path.into(),
            kdf,
            state: VaultState::Uninitialized,
            key: None,
            salt: None,
            entries: Vec::new(),
        }
    }

    /// Whether a vault file is present on disk. Needs no password.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// KDF parameters this vault derives keys with. Remote copies produced
    /// by the same application use the same parameters.
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// The in-memory credential list. Empty unless unlocked.
    pub fn credentials(&self) -> &[Credential] {
        &self.entries
    }

    /// Creates a fresh empty vault and transitions to `Unlocked`.
    pub fn create_new(&mut self, password: &str) -> VaultResult<()> {
        if self.exists() {
            return Err(VaultError::AlreadyExists);
        }

        let salt = Salt::random();
        let key = derive_key(password, &salt, &self.kdf)?;

        self.entries.clear();
        self.write_blob(&key, &salt, &self.entries)?;

        self.key = Some(key);
        self.salt = Some(salt);
        self.state = VaultState::Unlocked;
        debug!("created new vault at {}", self.path.display());
        Ok(())
    }

    /// Attempts to unlock with the given password.
    ///
    /// Returns `Ok(false)` on a wrong password so callers can re-prompt;
    /// the store stays in its previous state with nothing decrypted.
    pub fn unlock(&mut self, password: &str) -> VaultResult<bool> {
        if !self.exists() {
            return Err(VaultError::NotInitialized);
        }

        let blob = std::fs::read(&self.path)?;
        let salt = read_salt(&blob)?;
        let key = derive_key(password, &salt, &self.kdf)?;

        let payload = match open_with(&key, &blob) {
            Ok(payload) => payload,
            Err(CryptoError::AuthenticationFailure) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        self.entries = serde_json::from_slice(&payload)?;
        self.key = Some(key);
        self.salt = Some(salt);
        self.state = VaultState::Unlocked;
        debug!("vault unlocked, {} credentials loaded", self.entries.len());
        Ok(true)
    }

    /// Discards the key and in-memory credentials.
    pub fn lock(&mut self) {
        self.key = None;
        self.salt = None;
        self.entries.clear();
        self.state = VaultState::Locked;
    }

    /// Adds a credential and persists. Rolls back on persist failure.
    pub fn add(&mut self, credential: Credential) -> VaultResult<()> {
        self.ensure_unlocked()?;
        self.entries.push(credential);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the credential with the same id and persists.
    pub fn edit(&mut self, credential: Credential) -> VaultResult<()> {
        self.ensure_unlocked()?;
        let index = self
            .entries
            .iter()
            .position(|c| c.id == credential.id)
            .ok_or(VaultError::NotFound(credential.id))?;

        let previous = std::mem::replace(&mut self.entries[index], credential);
        if let Err(e) = self.persist() {
            self.entries[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Removes a credential by id and persists.
    pub fn delete(&mut self, id: Uuid) -> VaultResult<()> {
        self.ensure_unlocked()?;
        let index = self
            .entries
            .iter()
            .position(|c| c.id == id)
            .ok_or(VaultError::NotFound(id))?;

        let removed = self.entries.remove(index);
        if let Err(e) = self.persist() {
            self.entries.insert(index, removed);
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the whole credential set (the sync write-back path).
    pub fn replace_all(&mut self, credentials: Vec<Credential>) -> VaultResult<()> {
        self.ensure_unlocked()?;
        let previous = std::mem::replace(&mut self.entries, credentials);
        if let Err(e) = self.persist() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Re-encrypts the vault under a new password.
    ///
    /// The new blob is staged and verified before the replace, so a failed
    /// write can never leave the file under a mixed old/new key.
    pub fn change_password(&mut self, new_password: &str) -> VaultResult<()> {
        self.ensure_unlocked()?;

        let new_salt = Salt::random();
        let new_key = derive_key(new_password, &new_salt, &self.kdf)?;

        let payload = serde_json::to_vec(&self.entries)?;
        let blob = seal_with(&new_key, &new_salt, &payload)?;

        // Verify the staged bytes decrypt under the new key before replacing.
        open_with(&new_key, &blob)?;
        self.replace_file(&blob)?;

        self.key = Some(new_key);
        self.salt = Some(new_salt);
        debug!("vault password changed");
        Ok(())
    }

    /// The current credential set sealed under the held master key.
    ///
    /// These are the exact bytes the sync engine uploads; a remote copy is
    /// opened with the same master password.
    pub fn encrypted_snapshot(&self) -> VaultResult<Vec<u8>> {
        let (key, salt) = self.held_key()?;
        let payload = serde_json::to_vec(&self.entries)?;
        Ok(seal_with(key, salt, &payload)?)
    }

    fn ensure_unlocked(&self) -> VaultResult<()> {
        match self.state {
            VaultState::Unlocked => Ok(()),
            VaultState::Uninitialized => Err(VaultError::NotInitialized),
            VaultState::Locked => Err(VaultError::Locked),
        }
    }

    fn held_key(&self) -> VaultResult<(&DerivedKey, &Salt)> {
        match (&self.key, &self.salt) {
            (Some(key), Some(salt)) => Ok((key, salt)),
            _ => Err(VaultError::Locked),
        }
    }

    fn persist(&self) -> VaultResult<()> {
        let (key, salt) = self.held_key()?;
        self.write_blob(key, salt, &self.entries)
    }

    fn write_blob(&self, key: &DerivedKey, salt: &Salt, entries: &[Credential]) -> VaultResult<()> {
        let payload = serde_json::to_vec(entries)?;
        let blob = seal_with(key, salt, &payload)?;
        self.replace_file(&blob)
    }

    /// Stage-then-replace: write to a temp file in the vault's directory,
    /// then atomically rename over the target.
    fn replace_file(&self, blob: &[u8]) -> VaultResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(blob)?;
        staged.flush()?;
        staged.persist(&self.path).map_err(|e| {
            warn!("atomic replace of vault file failed: {}", e.error);
            VaultError::Persistence(e.error)
        })?;
        Ok(())
    }
}
