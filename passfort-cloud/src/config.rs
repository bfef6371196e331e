//! Cloud sync configuration.
//!
//! OAuth client credentials and provider endpoints are supplied externally;
//! defaults carry the Google Drive endpoints.

use serde::{Deserialize, Serialize};

/// Configuration for one cloud provider's OAuth surface and file API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudConfig {
    /// OAuth2 client id issued by the provider.
    pub client_id: String,

    /// OAuth2 client secret issued by the provider.
    pub client_secret: String,

    /// Redirect URI registered for the authorization-code flow.
    pub redirect_uri: String,

    /// Space-separated OAuth scopes.
    pub scope: String,

    /// Consent page URL (authorization-code acquisition).
    pub auth_url: String,

    /// Token exchange and refresh endpoint.
    pub token_url: String,

    /// Token revocation endpoint.
    pub revoke_url: String,

    /// Userinfo endpoint returning display name and avatar URL.
    pub userinfo_url: String,

    /// File metadata/listing endpoint.
    pub files_url: String,

    /// Multipart upload endpoint.
    pub upload_url: String,

    /// Refresh the access token this many seconds before expiry.
    pub refresh_margin_secs: i64,

    /// Well-known name of the vault file on the provider.
    pub remote_file_name: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:48771/callback".to_string(),
            scope: "https://www.googleapis.com/auth/drive.file profile".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            files_url: "https://www.googleapis.com/drive/v3/files".to_string(),
            upload_url: "https://www.googleapis.com/upload/drive/v3/files".to_string(),
            refresh_margin_secs: 300, // 5 minutes before expiry
            remote_file_name: "passfort.vault".to_string(),
        }
    }
}

impl CloudConfig {
    /// Points every endpoint at a single base URL (mock servers in tests).
    pub fn with_base_url(base: &str) -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            auth_url: format!("{base}/o/oauth2/auth"),
            token_url: format!("{base}/token"),
            revoke_url: format!("{base}/revoke"),
            userinfo_url: format!("{base}/userinfo"),
            files_url: format!("{base}/drive/v3/files"),
            upload_url: format!("{base}/upload/drive/v3/files"),
            ..Self::default()
        }
    }
}
