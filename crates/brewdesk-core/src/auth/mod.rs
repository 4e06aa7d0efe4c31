//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionManager`: login/register/logout/profile refresh and the
//!   session state machine
//! - `CredentialStore`: durable secret storage, backed by the OS keychain
//!   (`KeyringStore`), an encrypted file (`VaultStore`) or memory
//!
//! The token and user record live under two independent keys,
//! `auth_token` and `user_data`.

pub mod credentials;
pub mod error;
pub mod session;
pub mod vault;

pub use credentials::{CredentialStore, KeyringStore, MemoryStore, TOKEN_KEY, USER_KEY};
pub use error::{AuthAction, AuthError};
pub use session::{SessionManager, SessionSnapshot, SessionState, SessionStatus};
pub use vault::VaultStore;
