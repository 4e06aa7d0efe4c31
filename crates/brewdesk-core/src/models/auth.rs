use serde::{Deserialize, Serialize};

use super::UserProfile;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Body returned by `/auth/login` and `/auth/register`.
///
/// Backends disagree on the token field name, so both `token` and
/// `accessToken` (or `access_token`) are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "accessToken", alias = "access_token")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl AuthResponse {
    /// The session token: `accessToken` first, then `token`. Blank values
    /// count as missing.
    pub fn normalized_token(&self) -> Option<&str> {
        [self.access_token.as_deref(), self.token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

/// A login/register result with its token already normalized.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: String,
    pub user: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AuthResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalized_token_prefers_access_token() {
        let resp = parse(r#"{"accessToken":"tok1","token":"tok2"}"#);
        assert_eq!(resp.normalized_token(), Some("tok1"));
    }

    #[test]
    fn test_normalized_token_accepts_snake_case() {
        let resp = parse(r#"{"access_token":"tok1"}"#);
        assert_eq!(resp.normalized_token(), Some("tok1"));
    }

    #[test]
    fn test_normalized_token_falls_back_to_token() {
        let resp = parse(r#"{"token":"tok2"}"#);
        assert_eq!(resp.normalized_token(), Some("tok2"));

        let resp = parse(r#"{"accessToken":"  ","token":"tok2"}"#);
        assert_eq!(resp.normalized_token(), Some("tok2"));
    }

    #[test]
    fn test_normalized_token_missing() {
        assert_eq!(parse("{}").normalized_token(), None);
        assert_eq!(parse(r#"{"token":""}"#).normalized_token(), None);
        assert_eq!(parse(r#"{"token":null,"accessToken":null}"#).normalized_token(), None);
    }

    #[test]
    fn test_auth_response_embedded_user() {
        let resp = parse(r#"{"accessToken":"tok1","user":{"id":"1","email":"a@b.com","name":"A"}}"#);
        let user = resp.user.unwrap();
        assert_eq!(user.email, "a@b.com");
    }
}
