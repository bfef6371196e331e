//! Local encrypted credential store.
//!
//! The vault is a single binary blob on disk: the sealed encryption of a
//! serialized, ordered credential list (see `passfort-crypto` for the blob
//! layout). [`VaultStore`] owns the authoritative in-memory copy while the
//! process runs and persists with stage-then-replace so a partial write is
//! never observable.

mod credential;
mod error;
mod store;

pub use credential::Credential;
pub use error::{VaultError, VaultResult};
pub use store::{VaultState, VaultStore};
