//! Cloud sync engine for PassFort.
//!
//! Provides encrypted vault synchronization with:
//! - OAuth2 authorization-code lifecycle (authorize, refresh, revoke)
//! - Persistent token storage per cloud identity
//! - Provider file transport (Google Drive) behind a capability trait
//! - Last-modified-wins merge of local and remote credential sets
//! - A busy-guarded sync orchestrator the UI layer drives
//!
//! Nothing here renders UI: the consent flow, password prompt, and
//! merge confirmation are injected callback traits, and every outcome is a
//! typed result the caller decides how to present.

pub mod broker;
pub mod config;
pub mod error;
pub mod merge;
pub mod sync;
pub mod token;
pub mod transport;
pub mod types;

pub use broker::{AuthState, AuthorizationBroker, ConsentFlow};
pub use config::CloudConfig;
pub use error::{CloudError, CloudResult};
pub use sync::{CloudService, MergeConfirmation, PasswordPrompt, SyncEngine};
pub use token::{OAuthToken, TokenHolder};
pub use transport::{CloudTransport, GoogleDriveTransport};
pub use types::{CloudType, MergeChoice, RemoteFile, SyncResult, UserProfile};
