//! Shared types for cloud sync operations.

use serde::{Deserialize, Serialize};

/// Supported cloud identity providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudType {
    GoogleDrive,
}

impl std::fmt::Display for CloudType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudType::GoogleDrive => f.write_str("Google Drive"),
        }
    }
}

/// A file handle on the provider side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Account profile for the signed-in cloud identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_name: String,
    pub profile_url: Option<String>,
}

/// What the UI chose when a remote vault file was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeChoice {
    /// Reconcile remote and local by identity and recency.
    Merge,
    /// Adopt the remote set wholesale, discarding local-only entries.
    Replace,
    Cancel,
}

/// Outcome of one synchronize call. Created per call, never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct SyncResult {
    pub success: bool,
    /// Entries that existed only remotely and were unioned in.
    pub added: usize,
    /// Entries where the remote copy was newer and won.
    pub updated: usize,
    /// Conflicts resolved in favor of the local copy (remote change lost).
    pub conflicts_kept_local: usize,
    /// Conflicts resolved in favor of the remote copy (local change lost).
    pub conflicts_kept_remote: usize,
    pub summary: String,
}

impl SyncResult {
    /// No remote file existed: nothing to merge, trivially successful.
    pub(crate) fn nothing_to_merge() -> Self {
        Self {
            success: true,
            added: 0,
            updated: 0,
            conflicts_kept_local: 0,
            conflicts_kept_remote: 0,
            summary: "no remote vault file found, nothing to merge".into(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.added == 0
            && self.updated == 0
            && self.conflicts_kept_local == 0
            && self.conflicts_kept_remote == 0
    }
}

impl std::fmt::Display for SyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary)
    }
}
