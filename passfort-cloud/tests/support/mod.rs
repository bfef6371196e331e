//! Shared helpers for the cloud integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use passfort_cloud::{
    CloudType, ConsentFlow, MergeChoice, MergeConfirmation, OAuthToken, PasswordPrompt,
    TokenHolder,
};
use passfort_crypto::{seal, KdfParams};
use passfort_vault::{Credential, VaultStore};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "passfort_cloud=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn fast_kdf() -> KdfParams {
    KdfParams::fast_insecure()
}

/// A fresh unlocked vault in `dir` with the given credentials.
pub fn vault_with(dir: &Path, password: &str, creds: Vec<Credential>) -> VaultStore {
    let mut vault = VaultStore::with_kdf(dir.join("vault.pfv"), fast_kdf());
    vault
        .create_new(password)
        .expect("create vault");
    for cred in creds {
        vault.add(cred).expect("add credential");
    }
    vault
}

/// Bytes of a remote vault blob holding `creds`, sealed under `password`.
pub fn remote_blob(password: &str, creds: &[Credential]) -> Vec<u8> {
    let payload = serde_json::to_vec(creds).expect("serialize credentials");
    seal(&payload, password, &fast_kdf()).expect("seal remote blob")
}

/// Writes a valid, far-from-expiry token file and returns its path.
pub async fn seeded_token_file(dir: &Path) -> PathBuf {
    seeded_token_file_expiring(dir, Utc::now() + Duration::hours(1)).await
}

pub async fn seeded_token_file_expiring(
    dir: &Path,
    expires_at: chrono::DateTime<Utc>,
) -> PathBuf {
    let path = dir.join("token.json");
    let holder = TokenHolder::new(&path);
    holder
        .set_and_save(OAuthToken {
            access_token: "test-access-token".into(),
            refresh_token: Some("test-refresh-token".into()),
            expires_at,
            provider: CloudType::GoogleDrive,
        })
        .await
        .expect("seed token file");
    path
}

/// Consent flow that immediately hands back a fixed code, or declines.
pub struct StubConsent(pub Option<String>);

#[async_trait]
impl ConsentFlow for StubConsent {
    async fn obtain_code(&self, _consent_url: &str) -> Option<String> {
        self.0.clone()
    }
}

/// Password prompt fed from a fixed answer list, one per attempt.
/// Runs out of answers by returning `None` (cancel).
pub struct ScriptedPrompt {
    answers: Mutex<Vec<Option<String>>>,
    pub attempts: AtomicU32,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<Option<&str>>) -> Self {
        Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .rev()
                    .map(|a| a.map(str::to_string))
                    .collect(),
            ),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn always(password: &str) -> Self {
        Self::new(vec![Some(password)])
    }
}

#[async_trait]
impl PasswordPrompt for ScriptedPrompt {
    async fn request_password(&self, _attempt: u32) -> Option<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.len() == 1 {
            // Keep replaying the last answer so `always` never runs dry.
            return answers[0].clone();
        }
        answers.pop().flatten()
    }
}

/// Fixed merge decision.
pub struct FixedChoice(pub MergeChoice);

#[async_trait]
impl MergeConfirmation for FixedChoice {
    async fn choose(&self) -> MergeChoice {
        self.0
    }
}
