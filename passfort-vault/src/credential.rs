//! Credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single stored credential.
///
/// The `id` is assigned once at creation and never changes; it is the
/// identity the sync merge reconciles on. `modified_at` decides merge
/// conflicts, so every mutation must go through [`Credential::touch`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub name: String,
    pub login: String,
    pub secret: String,
    pub note: String,
    pub modified_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(name: impl Into<String>, login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            login: login.into(),
            secret: secret.into(),
            note: String::new(),
            modified_at: Utc::now(),
        }
    }

    /// Refreshes the last-modified timestamp.
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

// The secret never appears in logs or debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .field("note", &self.note)
            .field("modified_at", &self.modified_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_unique_ids() {
        let a = Credential::new("github", "alice", "hunter2");
        let b = Credential::new("github", "alice", "hunter2");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn touch_advances_modified_at() {
        let mut cred = Credential::new("github", "alice", "hunter2");
        let before = cred.modified_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        cred.touch();
        assert!(cred.modified_at > before);
    }

    #[test]
    fn debug_redacts_secret() {
        let cred = Credential::new("github", "alice", "hunter2");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
