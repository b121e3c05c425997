//! Error types for the try-on workflow.

use std::time::Duration;

/// Signature of the remote failure that means the selected key no longer
/// resolves to a usable project.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

/// Maximum length of an error message surfaced from a remote response.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while preparing or running a try-on generation.
#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The key resolved to a project or model the remote could not find.
    #[error("{0}")]
    EntityNotFound(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the remote, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The user backed out of an interactive flow.
    #[error("cancelled")]
    Cancelled,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode an uploaded image or a base64 payload.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading an upload or saving a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote answered successfully but without a usable image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl TryOnError {
    /// Returns true if this error signals that the selected credential has
    /// gone stale and should be re-selected.
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound(_)) || self.to_string().contains(ENTITY_NOT_FOUND)
    }

    /// Text suitable for the failed state of the result view.
    ///
    /// Returns `None` when the remote gave no description at all.
    pub fn user_message(&self) -> Option<String> {
        let detail = match self {
            Self::Api { message, .. } if message.trim().is_empty() => return None,
            Self::RateLimited {
                retry_after: Some(delay),
            } => format!(
                "Too many requests, try again in {} seconds.",
                delay.as_secs().max(1)
            ),
            Self::RateLimited { retry_after: None } => {
                "Too many requests, try again shortly.".to_string()
            }
            Self::Auth(msg)
            | Self::ContentBlocked(msg)
            | Self::InvalidRequest(msg)
            | Self::UnexpectedResponse(msg)
            | Self::EntityNotFound(msg)
                if msg.trim().is_empty() =>
            {
                return None
            }
            other => other.to_string(),
        };
        Some(detail)
    }
}

/// Result type alias for try-on operations.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Reduces a raw error body to something fit for a user.
///
/// Google APIs wrap failures as `{"error": {"message": ...}}`; the inner
/// message is preferred when present. Long bodies are truncated.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

/// Reads a `Retry-After` header expressed in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_not_found_variant_and_substring() {
        assert!(TryOnError::EntityNotFound("gone".into()).is_entity_not_found());
        assert!(TryOnError::Api {
            status: 404,
            message: "Requested entity was not found.".into(),
        }
        .is_entity_not_found());
        assert!(!TryOnError::Auth("bad key".into()).is_entity_not_found());
        assert!(!TryOnError::Cancelled.is_entity_not_found());
    }

    #[test]
    fn test_user_message_falls_back_on_empty_detail() {
        let empty = TryOnError::Api {
            status: 500,
            message: "  ".into(),
        };
        assert_eq!(empty.user_message(), None);

        let blocked = TryOnError::ContentBlocked("nsfw".into());
        assert_eq!(
            blocked.user_message().as_deref(),
            Some("content blocked: nsfw")
        );

        let limited = TryOnError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        };
        assert_eq!(
            limited.user_message().as_deref(),
            Some("Too many requests, try again in 12 seconds.")
        );
        let limited = TryOnError::RateLimited { retry_after: None };
        assert_eq!(
            limited.user_message().as_deref(),
            Some("Too many requests, try again shortly.")
        );
    }

    #[test]
    fn test_error_display() {
        let err = TryOnError::Api {
            status: 500,
            message: "Internal".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - Internal");

        let err = TryOnError::EntityNotFound("Requested entity was not found.".into());
        assert_eq!(err.to_string(), "Requested entity was not found.");
    }

    #[test]
    fn test_sanitize_extracts_google_message() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        assert_eq!(
            sanitize_error_message(body),
            "Requested entity was not found."
        );
        assert_eq!(sanitize_error_message("  plain text \n"), "plain text");
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let sanitized = sanitize_error_message(&body);
        assert!(sanitized.ends_with("..."));
        assert_eq!(sanitized.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}
