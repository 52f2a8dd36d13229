//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: the process-wide slot for the access token, user
//!   snapshot and push token, with memory, file and OS-keyring backends
//! - `AuthData`: claims decoded from the stored access token, used to
//!   decide whether someone is logged in and with which role

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialError, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, StoredSession,
};
pub use session::{current_auth, AuthData};
