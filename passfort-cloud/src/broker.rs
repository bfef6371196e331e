//! OAuth2 authorization-code lifecycle for one cloud identity.
//!
//! The broker drives authorize, refresh, and revoke against the provider's
//! endpoints and owns the [`TokenHolder`]. Refresh is serialized per broker:
//! concurrent callers that both observe an expiring token await a single
//! HTTP refresh instead of racing the provider's token rotation.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::token::{OAuthToken, TokenHolder};
use crate::types::CloudType;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Authorization lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authorizing,
    Authorized,
    Refreshing,
    Revoked,
}

/// UI-side consent step: present the URL, hand back the redirect code.
///
/// Returning `None` means the user declined.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn obtain_code(&self, consent_url: &str) -> Option<String>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Drives the OAuth2 lifecycle for one provider identity.
pub struct AuthorizationBroker {
    client: Client,
    config: CloudConfig,
    provider: CloudType,
    holder: TokenHolder,
    state: RwLock<AuthState>,
    /// Serializes refresh exchanges so only one HTTP refresh is in flight.
    refresh_lock: Mutex<()>,
    /// Bumped on every successful refresh so waiters can detect that a
    /// concurrent refresh already renewed the token.
    refresh_generation: AtomicU64,
}

impl AuthorizationBroker {
    pub fn new(provider: CloudType, config: CloudConfig, holder: TokenHolder) -> Self {
        Self {
            client: Client::new(),
            config,
            provider,
            holder,
            state: RwLock::new(AuthState::Unauthenticated),
            refresh_lock: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> CloudType {
        self.provider
    }

    pub fn holder(&self) -> &TokenHolder {
        &self.holder
    }

    pub fn state(&self) -> AuthState {
        *self.state.read().unwrap()
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write().unwrap() = state;
    }

    /// Restores a persisted session, if any, and reflects it in the state.
    pub async fn restore_session(&self) -> CloudResult<bool> {
        let found = self.holder.load().await?;
        if found {
            self.set_state(AuthState::Authorized);
        }
        Ok(found)
    }

    /// Runs the authorization-code flow.
    ///
    /// Opens the consent step through the injected [`ConsentFlow`],
    /// exchanges the returned code for tokens, and persists them.
    /// Cancellation aborts the pending exchange and leaves the broker
    /// `Unauthenticated`.
    pub async fn authorize(
        &self,
        consent: &dyn ConsentFlow,
        cancel: &CancellationToken,
    ) -> CloudResult<()> {
        self.set_state(AuthState::Authorizing);

        let result = self.authorize_inner(consent, cancel).await;
        match &result {
            Ok(()) => {
                info!("authorization to {} complete", self.provider);
                self.set_state(AuthState::Authorized);
            }
            Err(e) => {
                debug!("authorization to {} did not complete: {e}", self.provider);
                self.set_state(AuthState::Unauthenticated);
            }
        }
        result
    }

    async fn authorize_inner(
        &self,
        consent: &dyn ConsentFlow,
        cancel: &CancellationToken,
    ) -> CloudResult<()> {
        let consent_url = self.consent_url()?;

        let code = tokio::select! {
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            code = consent.obtain_code(consent_url.as_str()) => code,
        };
        let code = code.ok_or(CloudError::AuthorizationDenied)?;

        let request = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            resp = request => resp?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::AuthorizationFailure(format!(
                "code exchange failed with {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        self.holder
            .set_and_save(OAuthToken {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
                provider: self.provider,
            })
            .await?;

        Ok(())
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// A rejected refresh token demotes to `Unauthenticated` and returns
    /// [`CloudError::ReauthorizationRequired`]; it is never silently retried.
    pub async fn refresh_access_token(&self, cancel: &CancellationToken) -> CloudResult<String> {
        // Capture the generation before acquiring the lock so we can detect
        // a concurrent refresh that already completed while we waited.
        let pre_gen = self.refresh_generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        if self.refresh_generation.load(Ordering::Acquire) > pre_gen {
            if let Some(token) = self.holder.token().await {
                return Ok(token.access_token);
            }
        }

        let current = self
            .holder
            .token()
            .await
            .ok_or(CloudError::ReauthorizationRequired)?;
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(CloudError::ReauthorizationRequired)?;

        self.set_state(AuthState::Refreshing);

        let request = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                self.set_state(AuthState::Authorized);
                return Err(CloudError::Cancelled);
            }
            resp = request => resp,
        };

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                // Network failure: token state is unchanged, stay authorized.
                self.set_state(AuthState::Authorized);
                return Err(e.into());
            }
        };

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!(
                "{} rejected the refresh token, re-authorization required",
                self.provider
            );
            self.holder.clear().await;
            self.set_state(AuthState::Unauthenticated);
            return Err(CloudError::ReauthorizationRequired);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            self.set_state(AuthState::Authorized);
            return Err(CloudError::TransportFailure { status, message });
        }

        let renewed: TokenResponse = response.json().await?;
        let access_token = renewed.access_token.clone();
        self.holder
            .set_and_save(OAuthToken {
                access_token: renewed.access_token,
                // Providers may omit the refresh token on renewal.
                refresh_token: renewed.refresh_token.or(Some(refresh_token)),
                expires_at: Utc::now() + chrono::Duration::seconds(renewed.expires_in),
                provider: self.provider,
            })
            .await?;

        self.refresh_generation.fetch_add(1, Ordering::Release);
        self.set_state(AuthState::Authorized);
        debug!("refreshed {} access token", self.provider);
        Ok(access_token)
    }

    /// Revokes the token at the provider and clears local state.
    ///
    /// Local revocation never depends on the remote call succeeding.
    pub async fn revoke_token(&self, cancel: &CancellationToken) -> CloudResult<()> {
        self.set_state(AuthState::Revoked);

        if let Some(token) = self.holder.token().await {
            let request = self
                .client
                .post(&self.config.revoke_url)
                .form(&[("token", token.access_token.as_str())])
                .send();

            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                resp = request => Some(resp),
            };
            match outcome {
                Some(Ok(resp)) if !resp.status().is_success() => {
                    warn!(
                        "{} revoke endpoint returned {}, clearing locally anyway",
                        self.provider,
                        resp.status()
                    );
                }
                Some(Err(e)) => {
                    warn!("revoke call to {} failed: {e}, clearing locally anyway", self.provider);
                }
                _ => {}
            }
        }

        self.holder.clear().await;
        self.set_state(AuthState::Unauthenticated);
        info!("signed out of {}", self.provider);
        Ok(())
    }

    /// Pre-flight for every authenticated call: returns an access token
    /// guaranteed not to be past its refresh margin, refreshing first when
    /// needed. A request is never sent with a token known to be expired.
    pub async fn ensure_fresh(&self, cancel: &CancellationToken) -> CloudResult<String> {
        let token = self
            .holder
            .token()
            .await
            .ok_or(CloudError::ReauthorizationRequired)?;

        if token.refresh_required(self.config.refresh_margin_secs) {
            return self.refresh_access_token(cancel).await;
        }
        Ok(token.access_token)
    }

    fn consent_url(&self) -> CloudResult<Url> {
        Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.config.scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| CloudError::AuthorizationFailure(format!("invalid auth URL: {e}")))
    }
}
