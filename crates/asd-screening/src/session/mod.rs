//! Browser-style storage collaborators: per-session key-value stores, the stored login
//! record that gates the screening wizard, and the registry handing both out by session id.

pub mod auth;
pub mod registry;
pub mod router;
pub mod storage;

pub use auth::{AuthGate, AuthRecord, AuthStatus, StoredAuth, AUTH_KEY, LOGIN_ROUTE, PATIENT_ROLE};
pub use registry::{
    BrowserSession, SessionId, SessionRegistry, DEFAULT_SESSION_IDLE_TIMEOUT, SESSION_HEADER,
};
pub use router::{auth_router, authenticated_session, LoginRequest};
pub use storage::{
    read_json, update_json, write_json, KeyValueStore, MemoryKeyValueStore, StorageError,
};
