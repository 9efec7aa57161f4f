use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::storage::{read_json, write_json, KeyValueStore, StorageError};
use crate::workflows::consult::chat::CHATS_KEY;

pub const AUTH_KEY: &str = "auth";
pub const PATIENT_ROLE: &str = "patient";
/// Where unauthenticated callers are sent before the wizard is entered.
pub const LOGIN_ROUTE: &str = "/auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// The stored login has not been read yet.
    Loading,
    Authenticated,
    Anonymous,
}

/// The "is authenticated" signal the screening wizard waits on.
pub trait AuthGate: Send + Sync {
    fn status(&self) -> AuthStatus;
}

impl AuthGate for AuthStatus {
    fn status(&self) -> AuthStatus {
        *self
    }
}

/// Login record as kept in the client's local storage area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRecord {
    pub is_logged_in: bool,
    pub role: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl AuthRecord {
    pub fn display_name(&self) -> Option<&str> {
        self.data.get("fullName").map(String::as_str)
    }
}

/// Auth gate backed by the `auth` entry of a local store.
#[derive(Debug)]
pub struct StoredAuth<S> {
    store: Arc<S>,
}

impl<S> Clone for StoredAuth<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> StoredAuth<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn login(&self, data: BTreeMap<String, String>) -> Result<AuthRecord, StorageError> {
        let record = AuthRecord {
            is_logged_in: true,
            role: PATIENT_ROLE.to_string(),
            data,
        };
        write_json(self.store.as_ref(), AUTH_KEY, &record)?;
        Ok(record)
    }

    /// Drop the login and the chat history that belongs to it.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.store.remove_item(AUTH_KEY)?;
        self.store.remove_item(CHATS_KEY)
    }

    /// Current login, discarding records written for any role other than patient.
    pub fn current(&self) -> Result<Option<AuthRecord>, StorageError> {
        let record: Option<AuthRecord> = match read_json(self.store.as_ref(), AUTH_KEY) {
            Ok(record) => record,
            Err(StorageError::Corrupt { source, .. }) => {
                warn!(error = %source, "ignoring unreadable auth record");
                None
            }
            Err(err) => return Err(err),
        };

        match record {
            Some(record) if record.role == PATIENT_ROLE => Ok(Some(record)),
            Some(_) => {
                self.store.remove_item(AUTH_KEY)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl<S: KeyValueStore> AuthGate for StoredAuth<S> {
    fn status(&self) -> AuthStatus {
        match self.current() {
            Ok(Some(record)) if record.is_logged_in => AuthStatus::Authenticated,
            Ok(_) => AuthStatus::Anonymous,
            Err(err) => {
                warn!(error = %err, "auth record unavailable; treating caller as anonymous");
                AuthStatus::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryKeyValueStore;

    fn patient_data() -> BTreeMap<String, String> {
        BTreeMap::from([("fullName".to_string(), "John Doe".to_string())])
    }

    #[test]
    fn login_then_logout_toggles_status() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let auth = StoredAuth::new(store.clone());
        assert_eq!(auth.status(), AuthStatus::Anonymous);

        let record = auth.login(patient_data()).expect("login persists");
        assert_eq!(record.display_name(), Some("John Doe"));
        assert_eq!(auth.status(), AuthStatus::Authenticated);

        store
            .set_item(CHATS_KEY, "[]".to_string())
            .expect("seed chats");
        auth.logout().expect("logout clears");
        assert_eq!(auth.status(), AuthStatus::Anonymous);
        assert!(store.is_empty());
    }

    #[test]
    fn foreign_roles_are_discarded() {
        let store = Arc::new(MemoryKeyValueStore::default());
        store
            .set_item(
                AUTH_KEY,
                r#"{"isLoggedIn":true,"role":"doctor","data":{}}"#.to_string(),
            )
            .expect("raw write");

        let auth = StoredAuth::new(store.clone());
        assert_eq!(auth.status(), AuthStatus::Anonymous);
        assert_eq!(store.get_item(AUTH_KEY).expect("read"), None);
    }

    #[test]
    fn unreadable_record_is_anonymous() {
        let store = Arc::new(MemoryKeyValueStore::default());
        store
            .set_item(AUTH_KEY, "garbage".to_string())
            .expect("raw write");
        assert_eq!(StoredAuth::new(store).status(), AuthStatus::Anonymous);
    }
}
