//! Read-only inspection of the stored session, for `brewdesk diagnose`.

use std::fmt;

use crate::api::ApiClient;
use crate::auth::{CredentialStore, TOKEN_KEY, USER_KEY};
use crate::config::is_loopback;
use crate::models::UserProfile;
use crate::utils::mask_token;

/// What the credential store holds under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue<T> {
    Missing,
    Present(T),
    /// Reading (or decoding) the value failed
    Unreadable(String),
}

impl<T> StoredValue<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, StoredValue::Present(_))
    }
}

/// Outcome of calling the profile endpoint with the stored token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Valid(UserProfile),
    Rejected(String),
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub api_url: String,
    pub loopback: bool,
    /// Masked token, never the raw value
    pub token: StoredValue<String>,
    pub user: StoredValue<UserProfile>,
    pub probe: Option<ProbeOutcome>,
}

impl DiagnosticReport {
    /// Exactly one of token and user is stored. Bootstrap treats this as
    /// signed out.
    pub fn is_partial(&self) -> bool {
        self.token.is_present() != self.user.is_present()
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.loopback {
            warnings.push(format!(
                "{} only works from this machine; other devices need the server's LAN address",
                self.api_url
            ));
        }
        if self.is_partial() {
            warnings.push(
                "Stored session is incomplete and will be ignored; sign in again".to_string(),
            );
        }
        warnings
    }
}

/// Inspect `store` without changing it. The raw token is only kept long
/// enough to run the optional probe.
pub async fn collect(
    api: &ApiClient,
    store: &dyn CredentialStore,
    probe: bool,
) -> DiagnosticReport {
    let raw_token = match store.load(TOKEN_KEY) {
        Ok(Some(token)) if !token.is_empty() => StoredValue::Present(token),
        Ok(_) => StoredValue::Missing,
        Err(e) => StoredValue::Unreadable(format!("{:#}", e)),
    };

    let user = match store.load(USER_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<UserProfile>(&json) {
            Ok(user) => StoredValue::Present(user),
            Err(e) => StoredValue::Unreadable(format!("corrupt user record: {}", e)),
        },
        Ok(None) => StoredValue::Missing,
        Err(e) => StoredValue::Unreadable(format!("{:#}", e)),
    };

    let probe = match (probe, &raw_token) {
        (false, _) => None,
        (true, StoredValue::Present(token)) => Some(match api.profile(token).await {
            Ok(user) => ProbeOutcome::Valid(user),
            Err(e) => ProbeOutcome::Rejected(e.to_string()),
        }),
        (true, _) => Some(ProbeOutcome::Skipped),
    };

    let token = match raw_token {
        StoredValue::Present(token) => StoredValue::Present(mask_token(&token)),
        StoredValue::Missing => StoredValue::Missing,
        StoredValue::Unreadable(e) => StoredValue::Unreadable(e),
    };

    DiagnosticReport {
        api_url: api.base_url().to_string(),
        loopback: is_loopback(api.base_url()),
        token,
        user,
        probe,
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API URL:      {}", self.api_url)?;
        match &self.token {
            StoredValue::Present(masked) => writeln!(f, "Stored token: {}", masked)?,
            StoredValue::Missing => writeln!(f, "Stored token: none")?,
            StoredValue::Unreadable(e) => writeln!(f, "Stored token: unreadable ({})", e)?,
        }
        match &self.user {
            StoredValue::Present(user) => {
                writeln!(f, "Stored user:  {} <{}> (id {})", user.display_name(), user.email, user.id)?
            }
            StoredValue::Missing => writeln!(f, "Stored user:  none")?,
            StoredValue::Unreadable(e) => writeln!(f, "Stored user:  unreadable ({})", e)?,
        }
        match &self.probe {
            Some(ProbeOutcome::Valid(user)) => {
                writeln!(f, "Probe:        token accepted for {}", user.email)?
            }
            Some(ProbeOutcome::Rejected(reason)) => writeln!(f, "Probe:        failed: {}", reason)?,
            Some(ProbeOutcome::Skipped) => writeln!(f, "Probe:        skipped, no token stored")?,
            None => {}
        }
        for warning in self.warnings() {
            writeln!(f, "Warning:      {}", warning)?;
        }
        Ok(())
    }
}
