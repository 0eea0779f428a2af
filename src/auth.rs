//! Admin credential held for the lifetime of a dashboard session.
//!
//! The session is an explicit value handed to every request-issuing call
//! rather than ambient state. Storage problems never surface as errors: a
//! failed read means "no stored credential", a failed write leaves the
//! in-memory credential valid for the rest of the session.

use sha2::{Digest, Sha256};

use crate::logging::{debug, info, obj, v_str, warn, Domain};
use crate::storage::{CredentialStore, MemoryCredentialStore};

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
}

pub struct AdminSession {
    state: SessionState,
    admin_key: String,
    store: Box<dyn CredentialStore>,
}

impl AdminSession {
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        Self {
            state: SessionState::Uninitialized,
            admin_key: String::new(),
            store,
        }
    }

    /// Session with no durable backing.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryCredentialStore::new()))
    }

    /// Loads any stored credential. Runs once; later calls do nothing.
    pub fn initialize(&mut self) {
        if self.state == SessionState::Initialized {
            return;
        }
        match self.store.load() {
            Ok(Some(stored)) => {
                self.admin_key = stored.trim().to_string();
                let fields = obj(&[("fingerprint", v_str(&self.fingerprint()))]);
                debug(Domain::Auth, "credential_restored", fields);
            }
            Ok(None) => {}
            Err(err) => {
                let fields = obj(&[("error", v_str(&err.to_string()))]);
                warn(Domain::Auth, "credential_read_failed", fields);
            }
        }
        self.state = SessionState::Initialized;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn admin_key(&self) -> &str {
        &self.admin_key
    }

    pub fn has_admin_access(&self) -> bool {
        !self.admin_key.is_empty()
    }

    pub fn set_admin_key(&mut self, value: &str) {
        self.admin_key = value.trim().to_string();
        let persisted = if self.admin_key.is_empty() {
            self.store.remove()
        } else {
            self.store.save(&self.admin_key)
        };
        if let Err(err) = persisted {
            let fields = obj(&[("error", v_str(&err.to_string()))]);
            warn(Domain::Auth, "credential_write_failed", fields);
        }
        info(
            Domain::Auth,
            "credential_updated",
            obj(&[
                ("has_access", serde_json::Value::Bool(self.has_admin_access())),
                ("fingerprint", v_str(&self.fingerprint())),
            ]),
        );
    }

    pub fn clear_admin_key(&mut self) {
        self.set_admin_key("");
    }

    /// Header pair to attach to outbound requests, if a credential is held.
    pub fn credential_header(&self) -> Option<(&'static str, String)> {
        if self.has_admin_access() {
            Some((ADMIN_KEY_HEADER, self.admin_key.clone()))
        } else {
            None
        }
    }

    /// First 12 hex chars of the SHA-256 of the credential; empty when none
    /// is held. Safe to log.
    pub fn fingerprint(&self) -> String {
        if self.admin_key.is_empty() {
            return String::new();
        }
        let digest = Sha256::digest(self.admin_key.as_bytes());
        hex::encode(digest)[..12].to_string()
    }
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("state", &self.state)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
