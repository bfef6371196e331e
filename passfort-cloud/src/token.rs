//! OAuth token state and persistence.
//!
//! One [`TokenHolder`] per cloud identity. The token is saved after every
//! mutation so a restart restores the session without re-authorizing.

use crate::error::CloudResult;
use crate::types::CloudType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One OAuth2 token set for a cloud identity.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    /// Absent means the token cannot be renewed; expiry is terminal.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub provider: CloudType,
}

impl OAuthToken {
    /// True when the access token is past or within `margin_secs` of expiry.
    pub fn refresh_required(&self, margin_secs: i64) -> bool {
        Utc::now() + chrono::Duration::seconds(margin_secs) >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True when a refresh token is available for renewal.
    pub fn is_renewable(&self) -> bool {
        self.refresh_token.is_some()
    }
}

// Token material stays out of debug output.
impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Holds and persists one token per cloud identity.
pub struct TokenHolder {
    path: PathBuf,
    token: RwLock<Option<OAuthToken>>,
}

impl TokenHolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            token: RwLock::new(None),
        }
    }

    /// Loads a persisted token if one exists. Returns whether one was found.
    pub async fn load(&self) -> CloudResult<bool> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let token: OAuthToken = serde_json::from_slice(&bytes)?;
                debug!("restored {} token from disk", token.provider);
                *self.token.write().await = Some(token);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn token(&self) -> Option<OAuthToken> {
        self.token.read().await.clone()
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Stores the token and persists it immediately.
    pub async fn set_and_save(&self, token: OAuthToken) -> CloudResult<()> {
        let bytes = serde_json::to_vec_pretty(&token)?;
        tokio::fs::write(&self.path, bytes).await?;
        *self.token.write().await = Some(token);
        Ok(())
    }

    /// Drops the in-memory token and removes the persisted file.
    ///
    /// Local removal never depends on the file delete succeeding.
    pub async fn clear(&self) {
        *self.token.write().await = None;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove persisted token: {e}");
            }
        }
    }
}
