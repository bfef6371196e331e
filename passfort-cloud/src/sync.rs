//! Sync orchestration.
//!
//! [`SyncEngine`] drives the whole synchronize flow against a registered
//! [`CloudService`]: discover the remote vault file, download and decrypt
//! it, reconcile with the local set, persist locally, and push the merged
//! result back up. The UI supplies passwords and merge decisions through
//! injected callback traits and gets a typed [`SyncResult`] back.
//!
//! At most one sync or upload runs per engine at a time; overlapping calls
//! fail fast with [`CloudError::SyncInFlight`].

use crate::broker::{AuthState, AuthorizationBroker, ConsentFlow};
use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::merge::{merge, MergeOutcome};
use crate::token::TokenHolder;
use crate::transport::{CloudTransport, GoogleDriveTransport};
use crate::types::{CloudType, MergeChoice, SyncResult, UserProfile};
use async_trait::async_trait;
use passfort_crypto::{open, CryptoError};
use passfort_vault::{Credential, VaultState, VaultStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// UI-side password entry for decrypting a downloaded vault copy.
///
/// Called again with an incremented attempt count after a wrong password.
/// Returning `None` cancels the sync.
#[async_trait]
pub trait PasswordPrompt: Send + Sync {
    async fn request_password(&self, attempt: u32) -> Option<String>;
}

/// UI-side decision when a remote vault file was found.
#[async_trait]
pub trait MergeConfirmation: Send + Sync {
    async fn choose(&self) -> MergeChoice;
}

/// One registered cloud provider: its authorization broker plus transport.
pub struct CloudService {
    provider: CloudType,
    broker: Arc<AuthorizationBroker>,
    transport: Box<dyn CloudTransport>,
}

impl CloudService {
    /// Wires up a Google Drive service from config and a token file path.
    pub fn google_drive(config: CloudConfig, token_path: impl AsRef<Path>) -> Self {
        let holder = TokenHolder::new(token_path.as_ref());
        let broker = Arc::new(AuthorizationBroker::new(
            CloudType::GoogleDrive,
            config.clone(),
            holder,
        ));
        let transport = Box::new(GoogleDriveTransport::new(config, Arc::clone(&broker)));
        Self {
            provider: CloudType::GoogleDrive,
            broker,
            transport,
        }
    }

    /// Assembles a service from parts (tests inject transports here).
    pub fn with_transport(
        provider: CloudType,
        broker: Arc<AuthorizationBroker>,
        transport: Box<dyn CloudTransport>,
    ) -> Self {
        Self {
            provider,
            broker,
            transport,
        }
    }

    pub fn provider(&self) -> CloudType {
        self.provider
    }

    pub fn auth_state(&self) -> AuthState {
        self.broker.state()
    }

    /// Restores a persisted session from disk, if one exists.
    pub async fn restore_session(&self) -> CloudResult<bool> {
        self.broker.restore_session().await
    }

    /// Runs the interactive authorization flow.
    pub async fn sign_in(
        &self,
        consent: &dyn ConsentFlow,
        cancel: &CancellationToken,
    ) -> CloudResult<()> {
        self.broker.authorize(consent, cancel).await
    }

    /// Revokes the token and clears the stored session.
    pub async fn sign_out(&self, cancel: &CancellationToken) -> CloudResult<()> {
        self.broker.revoke_token(cancel).await
    }

    /// Profile of the signed-in account.
    pub async fn user_profile(&self, cancel: &CancellationToken) -> CloudResult<UserProfile> {
        self.transport.user_profile(cancel).await
    }
}

/// Orchestrates vault synchronization across registered cloud services.
pub struct SyncEngine {
    services: HashMap<CloudType, CloudService>,
    busy: AtomicBool,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, service: CloudService) {
        self.services.insert(service.provider(), service);
    }

    pub fn service(&self, provider: CloudType) -> CloudResult<&CloudService> {
        self.services
            .get(&provider)
            .ok_or(CloudError::UnknownProvider(provider))
    }

    /// Whether a sync or upload is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Full synchronize: reconcile the local vault with the remote copy and
    /// push the result back up.
    ///
    /// When no remote file exists there is nothing to merge and the call is
    /// a clean success; pushing a first copy is [`SyncEngine::upload`]'s
    /// job. When one exists, it is downloaded, decrypted with a password
    /// from `prompt` (re-prompting on a wrong one), reconciled per the
    /// `confirm` choice, persisted locally, and re-uploaded. A failed
    /// re-upload after a successful local persist is reported in the result
    /// rather than as an error, since the local vault already holds the
    /// reconciled set.
    pub async fn synchronize(
        &self,
        provider: CloudType,
        vault: &mut VaultStore,
        prompt: &dyn PasswordPrompt,
        confirm: &dyn MergeConfirmation,
        cancel: &CancellationToken,
    ) -> CloudResult<SyncResult> {
        let _busy = self.enter_busy()?;
        let service = self.service(provider)?;
        ensure_unlocked(vault)?;

        let remote_file = service.transport.find_file(cancel).await?;
        let Some(remote_file) = remote_file else {
            info!("no remote vault on {provider}, nothing to merge");
            return Ok(SyncResult::nothing_to_merge());
        };

        let blob = service.transport.download(&remote_file, cancel).await?;
        let remote_entries = decrypt_remote(vault, &blob, prompt, cancel).await?;

        let (reconciled, outcome) = match confirm.choose().await {
            MergeChoice::Cancel => return Err(CloudError::Cancelled),
            MergeChoice::Replace => {
                debug!("replacing local vault with remote copy");
                let outcome = MergeOutcome {
                    added: remote_entries.len(),
                    ..MergeOutcome::default()
                };
                (remote_entries, outcome)
            }
            MergeChoice::Merge => merge(vault.credentials(), &remote_entries),
        };

        if outcome.is_clean() && reconciled == vault.credentials() {
            debug!("vault already in sync with {provider}");
            return Ok(SyncResult {
                success: true,
                added: 0,
                updated: 0,
                conflicts_kept_local: 0,
                conflicts_kept_remote: 0,
                summary: "already in sync, nothing changed".into(),
            });
        }

        // Local persist comes first: the reconciled set must survive even if
        // the re-upload fails.
        vault.replace_all(reconciled)?;

        let snapshot = vault.encrypted_snapshot()?;
        let upload = service
            .transport
            .upload(Some(&remote_file), snapshot, cancel)
            .await;

        let success = match upload {
            Ok(_) => true,
            Err(CloudError::Cancelled) => return Err(CloudError::Cancelled),
            Err(e) => {
                warn!("re-upload after merge failed: {e}");
                false
            }
        };

        let summary = summarize(&outcome, success);
        info!("sync with {provider} finished: {summary}");
        Ok(SyncResult {
            success,
            added: outcome.added,
            updated: outcome.updated,
            conflicts_kept_local: outcome.conflicts_kept_local,
            conflicts_kept_remote: outcome.conflicts_kept_remote,
            summary,
        })
    }

    /// Pushes the current vault to the provider, creating or overwriting
    /// the remote file. Never touches the local vault.
    pub async fn upload(
        &self,
        provider: CloudType,
        vault: &VaultStore,
        cancel: &CancellationToken,
    ) -> CloudResult<()> {
        let _busy = self.enter_busy()?;
        let service = self.service(provider)?;
        ensure_unlocked(vault)?;

        let existing = service.transport.find_file(cancel).await?;
        let snapshot = vault.encrypted_snapshot()?;
        service
            .transport
            .upload(existing.as_ref(), snapshot, cancel)
            .await?;
        info!("uploaded vault to {provider}");
        Ok(())
    }

    fn enter_busy(&self) -> CloudResult<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CloudError::SyncInFlight);
        }
        Ok(BusyGuard { flag: &self.busy })
    }
}

/// Clears the busy flag when the operation ends, success or not.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn ensure_unlocked(vault: &VaultStore) -> CloudResult<()> {
    match vault.state() {
        VaultState::Unlocked => Ok(()),
        VaultState::Uninitialized => Err(passfort_vault::VaultError::NotInitialized.into()),
        VaultState::Locked => Err(passfort_vault::VaultError::Locked.into()),
    }
}

/// Decrypts a downloaded vault blob, re-prompting on wrong passwords.
async fn decrypt_remote(
    vault: &VaultStore,
    blob: &[u8],
    prompt: &dyn PasswordPrompt,
    cancel: &CancellationToken,
) -> CloudResult<Vec<Credential>> {
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }
        let password = prompt
            .request_password(attempt)
            .await
            .ok_or(CloudError::Cancelled)?;

        match open(blob, &password, vault.kdf()) {
            Ok(payload) => return Ok(serde_json::from_slice(&payload)?),
            Err(CryptoError::AuthenticationFailure) => {
                debug!("remote vault password rejected on attempt {attempt}");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn summarize(outcome: &MergeOutcome, uploaded: bool) -> String {
    let mut parts = Vec::new();
    if outcome.added > 0 {
        parts.push(format!("{} added", outcome.added));
    }
    if outcome.updated > 0 {
        parts.push(format!("{} updated", outcome.updated));
    }
    if outcome.conflicts_kept_local > 0 {
        parts.push(format!("{} conflicts kept local", outcome.conflicts_kept_local));
    }
    if outcome.conflicts_kept_remote > 0 {
        parts.push(format!(
            "{} conflicts kept remote",
            outcome.conflicts_kept_remote
        ));
    }
    let mut summary = if parts.is_empty() {
        "local changes pushed".to_string()
    } else {
        parts.join(", ")
    };
    if !uploaded {
        summary.push_str("; saved locally but the re-upload failed");
    }
    summary
}
