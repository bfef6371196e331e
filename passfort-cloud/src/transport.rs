//! Provider file transport.
//!
//! [`CloudTransport`] is the seam between the sync engine and a concrete
//! provider API. [`GoogleDriveTransport`] implements it over the Drive v3
//! REST surface. Every call obtains a fresh access token from the broker
//! first, so a request is never sent with a token known to be expired.

use crate::broker::AuthorizationBroker;
use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::types::{RemoteFile, UserProfile};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// File operations against one cloud provider.
#[async_trait]
pub trait CloudTransport: Send + Sync {
    /// Finds the vault file by its well-known name. `None` when absent.
    async fn find_file(&self, cancel: &CancellationToken) -> CloudResult<Option<RemoteFile>>;

    /// Downloads the file content as raw bytes.
    async fn download(&self, file: &RemoteFile, cancel: &CancellationToken)
    -> CloudResult<Vec<u8>>;

    /// Uploads content, creating the file or overwriting the existing one.
    /// Returns the handle of the resulting remote file.
    async fn upload(
        &self,
        existing: Option<&RemoteFile>,
        content: Vec<u8>,
        cancel: &CancellationToken,
    ) -> CloudResult<RemoteFile>;

    /// Fetches the signed-in account's profile.
    async fn user_profile(&self, cancel: &CancellationToken) -> CloudResult<UserProfile>;
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct DriveUserInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Drive v3 implementation of [`CloudTransport`].
pub struct GoogleDriveTransport {
    client: Client,
    config: CloudConfig,
    broker: Arc<AuthorizationBroker>,
}

impl GoogleDriveTransport {
    pub fn new(config: CloudConfig, broker: Arc<AuthorizationBroker>) -> Self {
        Self {
            client: Client::new(),
            config,
            broker,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> CloudResult<Response> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            resp = request.send() => resp?,
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("provider rejected the access token mid-session");
            return Err(CloudError::ReauthorizationRequired);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CloudError::TransportFailure { status, message });
        }
        Ok(response)
    }
}

#[async_trait]
impl CloudTransport for GoogleDriveTransport {
    async fn find_file(&self, cancel: &CancellationToken) -> CloudResult<Option<RemoteFile>> {
        let access_token = self.broker.ensure_fresh(cancel).await?;

        let query = format!(
            "name='{}' and trashed=false",
            self.config.remote_file_name.replace('\'', "\\'")
        );
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(&self.config.files_url)
                .bearer_auth(&access_token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken,files(id,name)"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self.send(request, cancel).await?;

            let listing: DriveFileList = response.json().await?;
            // First exact name match wins; Drive can hold several files with
            // the same name.
            let found = listing
                .files
                .into_iter()
                .find(|f| f.name == self.config.remote_file_name)
                .map(|f| RemoteFile {
                    id: f.id,
                    name: f.name,
                });
            if found.is_some() {
                debug!("remote vault file found");
                return Ok(found);
            }

            // An absent file is only absent once every page has been walked.
            match listing.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    debug!("remote vault file absent");
                    return Ok(None);
                }
            }
        }
    }

    async fn download(
        &self,
        file: &RemoteFile,
        cancel: &CancellationToken,
    ) -> CloudResult<Vec<u8>> {
        let access_token = self.broker.ensure_fresh(cancel).await?;

        let request = self
            .client
            .get(format!("{}/{}", self.config.files_url, file.id))
            .bearer_auth(&access_token)
            .query(&[("alt", "media")]);
        let response = self.send(request, cancel).await?;

        let bytes = response.bytes().await?;
        debug!("downloaded {} bytes from {}", bytes.len(), file.name);
        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        existing: Option<&RemoteFile>,
        content: Vec<u8>,
        cancel: &CancellationToken,
    ) -> CloudResult<RemoteFile> {
        let access_token = self.broker.ensure_fresh(cancel).await?;

        let metadata = serde_json::json!({ "name": self.config.remote_file_name });
        let body = multipart_related(&serde_json::to_vec(&metadata)?, &content);

        // Create is a POST to the upload endpoint; overwrite is a PATCH to
        // the specific file id.
        let request = match existing {
            Some(file) => self
                .client
                .patch(format!("{}/{}", self.config.upload_url, file.id)),
            None => self.client.post(&self.config.upload_url),
        };
        let request = request
            .bearer_auth(&access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body);
        let response = self.send(request, cancel).await?;

        let file: DriveFile = response.json().await?;
        debug!("uploaded vault file as {} ({})", file.name, file.id);
        Ok(RemoteFile {
            id: file.id,
            name: file.name,
        })
    }

    async fn user_profile(&self, cancel: &CancellationToken) -> CloudResult<UserProfile> {
        let access_token = self.broker.ensure_fresh(cancel).await?;

        let request = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&access_token);
        let response = self.send(request, cancel).await?;

        let info: DriveUserInfo = response.json().await?;
        let user_name = info
            .name
            .or(info.email)
            .unwrap_or_else(|| "Unknown account".to_string());
        Ok(UserProfile {
            user_name,
            profile_url: info.picture,
        })
    }
}

const MULTIPART_BOUNDARY: &str = "passfort_vault_boundary";

/// Builds a `multipart/related` body: JSON metadata part, then the raw
/// content part.
fn multipart_related(metadata: &[u8], content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
