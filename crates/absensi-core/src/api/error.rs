use serde::Deserialize;
use thiserror::Error;

use crate::auth::CredentialError;

/// Server message that marks an access token as expired (and only that).
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token telah expired";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {}", Self::truncate_body(.body))]
    Http { status: u16, body: String },

    /// The refresh call failed and the local session was torn down.
    /// Carries the refresh call's own error, unmodified; callers that need
    /// it rather than the teardown marker use [`ApiError::refresh_failure`].
    #[error("Session expired and could not be renewed: {0}")]
    RecoveryFailed(Box<ApiError>),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rejected locally before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential store error: {0}")]
    CredentialStore(#[from] CredentialError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
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

    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::RecoveryFailed(inner) => inner.status(),
            _ => None,
        }
    }

    /// The `message` field of a JSON error body, if there is one.
    pub fn message(&self) -> Option<String> {
        match self {
            ApiError::Http { body, .. } => serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.message),
            _ => None,
        }
    }

    /// 401 with exactly the expired-token message. Any other 401 is terminal.
    pub fn is_token_expired(&self) -> bool {
        self.status() == Some(401)
            && matches!(self, ApiError::Http { .. })
            && self.message().as_deref() == Some(TOKEN_EXPIRED_MESSAGE)
    }

    /// The refresh failure behind a forced teardown.
    pub fn refresh_failure(&self) -> Option<&ApiError> {
        match self {
            ApiError::RecoveryFailed(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn is_session_terminated(&self) -> bool {
        matches!(self, ApiError::RecoveryFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_signature_requires_exact_message() {
        let expired = ApiError::from_status(401, r#"{"message":"Token telah expired"}"#);
        assert!(expired.is_token_expired());

        let invalid = ApiError::from_status(401, r#"{"message":"Token tidak valid"}"#);
        assert!(!invalid.is_token_expired());

        let not_json = ApiError::from_status(401, "Token telah expired");
        assert!(!not_json.is_token_expired());

        let forbidden = ApiError::from_status(403, r#"{"message":"Token telah expired"}"#);
        assert!(!forbidden.is_token_expired());

        assert!(!ApiError::Network("connection refused".into()).is_token_expired());
    }

    #[test]
    fn test_message_extraction() {
        let err = ApiError::from_status(422, r#"{"message":"Anda sudah clock in hari ini"}"#);
        assert_eq!(err.message().as_deref(), Some("Anda sudah clock in hari ini"));
        assert_eq!(err.status(), Some(422));

        let err = ApiError::from_status(500, "<html>oops</html>");
        assert_eq!(err.message(), None);
    }

    #[test]
    fn test_recovery_failed_exposes_refresh_error() {
        let refresh = ApiError::from_status(401, r#"{"message":"Refresh token tidak ditemukan"}"#);
        let err = ApiError::RecoveryFailed(Box::new(refresh));
        assert!(err.is_session_terminated());
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_token_expired());
        assert!(matches!(
            err.refresh_failure(),
            Some(ApiError::Http { status: 401, .. })
        ));
    }

    #[test]
    fn test_long_body_is_truncated_in_display() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(500, body);
        let shown = err.to_string();
        assert!(shown.contains("truncated, 2000 total bytes"));
        assert!(shown.len() < 700);
    }
}
