use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Credential storage failed: {0:#}")]
    Storage(anyhow::Error),

    #[error("Another session request is already in progress")]
    Busy,

    #[error("Not signed in")]
    NotAuthenticated,
}

/// The user-initiated operation an error is being reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    Register,
    RefreshProfile,
}

impl AuthAction {
    pub fn failure_title(&self) -> &'static str {
        match self {
            AuthAction::SignIn => "Sign-in failed",
            AuthAction::Register => "Registration failed",
            AuthAction::RefreshProfile => "Profile refresh failed",
        }
    }
}

const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

impl AuthError {
    /// Message suitable for showing to the person at the keyboard.
    ///
    /// Network-class failures return step-by-step guidance; server errors
    /// carry the server's own wording when it sent one.
    pub fn user_message(&self, action: AuthAction) -> String {
        let title = action.failure_title();
        match self {
            AuthError::Api(err) if err.is_network() => err.to_string(),
            AuthError::Api(err) => match err.server_provided_message() {
                Some(message) => format!("{}: {}", title, message),
                None if err.status() == Some(401) && action == AuthAction::SignIn => {
                    format!("{}: Invalid email or password", title)
                }
                None if err.status() == Some(401) => {
                    format!("{}: Your session has expired. Please sign in again.", title)
                }
                None => format!("{}: {}", title, GENERIC_FAILURE),
            },
            AuthError::Storage(_) => format!(
                "{}: Could not access secure storage on this device. {}",
                title, GENERIC_FAILURE
            ),
            AuthError::Busy => format!("{}: {}", title, self),
            AuthError::NotAuthenticated => "You are not signed in.".to_string(),
        }
    }
}
