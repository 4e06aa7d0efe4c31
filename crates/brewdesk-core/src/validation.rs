//! Sign-in and registration form checks, run before any request is sent.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length for email input (RFC 5321 path limit)
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Minimum password length the account service accepts
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Per-field problems; `None` means the field is fine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
    }

    /// All messages in form order
    pub fn messages(&self) -> Vec<&str> {
        [
            &self.name,
            &self.email,
            &self.password,
            &self.confirm_password,
        ]
        .into_iter()
        .filter_map(|m| m.as_deref())
        .collect()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_email(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() {
        Some("Please enter your email".to_string())
    } else if !EMAIL_PATTERN.is_match(email) {
        Some("Email is not valid".to_string())
    } else {
        None
    }
}

fn check_password(password: &str) -> Option<String> {
    if password.is_empty() {
        Some("Please enter your password".to_string())
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ))
    } else {
        None
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    ValidationErrors {
        email: check_email(email),
        password: check_password(password),
        ..ValidationErrors::default()
    }
    .into_result()
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationErrors> {
    let confirm = if confirm_password.is_empty() {
        Some("Please confirm your password".to_string())
    } else if password != confirm_password {
        Some("Passwords do not match".to_string())
    } else {
        None
    };

    ValidationErrors {
        name: name
            .trim()
            .is_empty()
            .then(|| "Please enter your name".to_string()),
        email: check_email(email),
        password: check_password(password),
        confirm_password: confirm,
    }
    .into_result()
}

// ============================================================================
// Input guards
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}
