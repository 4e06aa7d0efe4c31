use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::events::{EventBus, SessionEvent};
use crate::models::{Credentials, LoginRequest, RegisterRequest, UserProfile};

use super::credentials::{CredentialStore, TOKEN_KEY, USER_KEY};
use super::AuthError;

/// Coarse session status, derived from `SessionState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Bootstrap has not finished yet
    Unknown,
    Unauthenticated,
    Authenticated,
}

/// In-memory session. Only the `SessionManager` mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_loading: bool,
    /// When this process signed in. `None` for a session restored from
    /// storage, whose original sign-in time is not recorded.
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    fn signed_out() -> Self {
        Self::default()
    }

    fn signed_in(token: String, user: UserProfile, signed_in_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_loading: false,
            signed_in_at,
        }
    }

    /// Token and user must both be present; a token alone is not a session.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_loading {
            SessionStatus::Unknown
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            is_authenticated: self.is_authenticated(),
            is_loading: self.is_loading,
        }
    }
}

/// What screens consume: who is signed in and whether the answer is known yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// Owns the session: restores it at startup, signs in, registers, signs
/// out and refreshes the profile.
///
/// State is published on a `watch` channel and every transition emits a
/// `SessionEvent`. Login, register and refresh are serialized by one
/// in-flight guard; a second call while one runs fails with `Busy`.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    events: EventBus,
    op_lock: Mutex<()>,
    bootstrapped: AtomicBool,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            api,
            store,
            state,
            events: EventBus::new(),
            op_lock: Mutex::new(()),
            bootstrapped: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Get the bearer token if signed in
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    /// Observe every state change
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Navigation port: one event per transition
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Restore a persisted session. Runs once; storage failures are logged
    /// and leave the session signed out.
    pub fn bootstrap(&self) -> SessionStatus {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            warn!("Session bootstrap requested twice, ignoring");
            return self.status();
        }

        let restored = match self.read_stored_session() {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "Failed to load stored session");
                None
            }
        };

        match restored {
            Some((token, user)) => {
                info!(user_id = %user.id, "Restored stored session");
                self.set_authenticated(token, user, None);
            }
            None => {
                debug!("No stored session");
                self.set_unauthenticated();
            }
        }
        self.status()
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let _guard = self.op_lock.try_lock().map_err(|_| AuthError::Busy)?;
        info!(email = %email, "Signing in");

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let credentials = self.api.login(&request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            AuthError::from(e)
        })?;

        self.establish(credentials).await
    }

    /// Create an account and sign straight into it
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, AuthError> {
        let _guard = self.op_lock.try_lock().map_err(|_| AuthError::Busy)?;
        info!(email = %email, "Registering");

        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        let credentials = self.api.register(&request).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            AuthError::from(e)
        })?;

        self.establish(credentials).await
    }

    /// Sign out. Always ends signed out, even if storage cleanup fails.
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;
        self.clear_session();
    }

    /// Re-fetch the profile for the current token. Any failure is treated as
    /// an invalid session and signs out.
    pub async fn refresh_profile(&self) -> Result<UserProfile, AuthError> {
        let _guard = self.op_lock.try_lock().map_err(|_| AuthError::Busy)?;
        let token = self.token().ok_or(AuthError::NotAuthenticated)?;

        let refreshed: Result<UserProfile, AuthError> = async {
            let user = self.api.profile(&token).await?;
            self.persist_user(&user)?;
            Ok(user)
        }
        .await;

        match refreshed {
            Ok(user) => {
                debug!(user_id = %user.id, "Profile refreshed");
                let updated = user.clone();
                self.state.send_modify(|state| state.user = Some(updated));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Profile refresh failed, signing out");
                self.clear_session();
                Err(e)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read_stored_session(&self) -> anyhow::Result<Option<(String, UserProfile)>> {
        let token = self.store.load(TOKEN_KEY)?;
        let user = self.store.load(USER_KEY)?;
        debug!(
            has_token = token.is_some(),
            has_user = user.is_some(),
            "Loaded stored credentials"
        );

        match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                let user: UserProfile = serde_json::from_str(&user)?;
                Ok(Some((token, user)))
            }
            _ => Ok(None),
        }
    }

    /// Persist a fresh token and user, then flip to `Authenticated`.
    /// On failure the in-memory state is untouched and the stored token is
    /// put back the way it was.
    async fn establish(&self, credentials: Credentials) -> Result<UserProfile, AuthError> {
        let previous_token = self.token();
        let Credentials { token, user } = credentials;

        self.store.save(TOKEN_KEY, &token).map_err(AuthError::Storage)?;

        let resolved: Result<UserProfile, AuthError> = async {
            let user = match user {
                Some(user) => user,
                None => {
                    debug!("No user in auth response, fetching profile");
                    self.api.profile(&token).await?
                }
            };
            self.persist_user(&user)?;
            Ok(user)
        }
        .await;

        match resolved {
            Ok(user) => {
                info!(user_id = %user.id, "Signed in");
                self.set_authenticated(token, user.clone(), Some(Utc::now()));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Could not complete sign-in");
                self.restore_token(previous_token);
                Err(e)
            }
        }
    }

    fn persist_user(&self, user: &UserProfile) -> Result<(), AuthError> {
        let json = serde_json::to_string(user).map_err(|e| AuthError::Storage(e.into()))?;
        self.store.save(USER_KEY, &json).map_err(AuthError::Storage)
    }

    fn restore_token(&self, previous: Option<String>) {
        let result = match previous {
            Some(token) => self.store.save(TOKEN_KEY, &token),
            None => self.store.delete(TOKEN_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to restore stored token");
        }
    }

    fn clear_session(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.delete(key) {
                warn!(key, error = %e, "Failed to delete stored credential");
            }
        }
        info!("Signed out");
        self.set_unauthenticated();
    }

    fn set_authenticated(
        &self,
        token: String,
        user: UserProfile,
        signed_in_at: Option<DateTime<Utc>>,
    ) {
        self.state
            .send_replace(SessionState::signed_in(token, user.clone(), signed_in_at));
        self.events.emit(SessionEvent::Authenticated { user });
    }

    fn set_unauthenticated(&self) {
        self.state.send_replace(SessionState::signed_out());
        self.events.emit(SessionEvent::Unauthenticated);
    }
}
