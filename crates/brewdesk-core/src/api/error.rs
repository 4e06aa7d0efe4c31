use thiserror::Error;

use super::client::REQUEST_TIMEOUT_SECS;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(
        "Request timed out: the server did not respond within {} seconds. \
         Check that the server is running.",
        REQUEST_TIMEOUT_SECS
    )]
    Timeout,

    #[error("{}", network_guidance(.base_url))]
    NetworkUnreachable { base_url: String },

    #[error("{}", status_message(.status, .message))]
    HttpStatus {
        status: u16,
        message: Option<String>,
    },

    #[error("Invalid response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Server-provided message, or a generic one naming the status.
fn status_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => {
            let reason = reqwest::StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown status");
            format!("HTTP error {}: {}", status, reason)
        }
    }
}

/// Multi-step guidance shown when the server cannot be reached at all.
pub fn network_guidance(base_url: &str) -> String {
    let port = reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.port_or_known_default())
        .map(|p| p.to_string())
        .unwrap_or_else(|| "the API".to_string());

    format!(
        "Cannot connect to the server!\n\n\
         Please check:\n\
         1. Is the API server running? ({base_url})\n\
         2. Are this device and the server on the same network?\n\
         3. Is a firewall blocking port {port}?\n\
         4. Try opening {base_url} in a browser on this device\n\
         5. Is BREWDESK_API_URL set to the right address?"
    )
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an `HttpStatus` error, preferring the server's own `message`.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::HttpStatus {
            status: status.as_u16(),
            message: Self::server_message(body),
        }
    }

    /// Pull `message` out of a JSON error body. Validation errors arrive as
    /// an array of strings.
    fn server_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let message = match value.get("message")? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            _ => return None,
        };
        let message = message.trim();
        (!message.is_empty()).then(|| Self::truncate_body(message))
    }

    /// Classify a transport failure from reqwest.
    pub fn from_transport(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::NetworkUnreachable {
                base_url: base_url.to_string(),
            }
        } else if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::Unknown(err.to_string())
        }
    }

    /// The message the server itself supplied, if any.
    pub fn server_provided_message(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts and unreachable servers get guidance rather than a bare error.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::NetworkUnreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_server_message() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid credentials","statusCode":401}"#,
        );
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.server_provided_message(), Some("Invalid credentials"));
    }

    #[test]
    fn test_from_status_joins_message_array() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":["email must be an email","password too short"]}"#,
        );
        assert_eq!(err.to_string(), "email must be an email; password too short");
    }

    #[test]
    fn test_from_status_falls_back_for_non_json() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP error 502: Bad Gateway");
        assert_eq!(err.server_provided_message(), None);
    }

    #[test]
    fn test_from_status_falls_back_without_message_field() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error":"nope"}"#);
        assert_eq!(err.to_string(), "HTTP error 404: Not Found");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_network_guidance_mentions_url_and_port() {
        let text = network_guidance("http://192.168.1.43:3000");
        assert!(text.contains("http://192.168.1.43:3000"));
        assert!(text.contains("port 3000"));
        assert!(text.contains("same network"));
    }

    #[test]
    fn test_is_network() {
        assert!(ApiError::Timeout.is_network());
        assert!(ApiError::NetworkUnreachable {
            base_url: "http://localhost:3000".into()
        }
        .is_network());
        assert!(!ApiError::Unknown("boom".into()).is_network());
    }
}
