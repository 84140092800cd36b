//! Error handling utilities for HTTP responses and error context formatting.

use crate::errors::OpencodeError;
use serde::de::DeserializeOwned;

/// Maximum characters of a response body to include in log lines
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// Checks if an HTTP response is successful, returning it if so or an error otherwise.
///
/// # Errors
///
/// Returns [`OpencodeError::Api`] with the status code and full body on non-success status.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, OpencodeError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status_code = response.status().as_u16();
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error body: {e}"));

    Err(api_error(status_code, url, &body))
}

/// Blocking counterpart of [`check_response`].
pub fn check_blocking_response(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, OpencodeError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status_code = response.status().as_u16();
    let url = response.url().to_string();
    let body = response
        .text()
        .unwrap_or_else(|e| format!("Failed to read error body: {e}"));

    Err(api_error(status_code, url, &body))
}

fn api_error(status_code: u16, url: String, body: &str) -> OpencodeError {
    tracing::debug!(
        status_code,
        %url,
        body = %truncate_for_context(body, ERROR_BODY_PREVIEW_LENGTH),
        "Request failed with non-success status"
    );
    OpencodeError::Api {
        status_code,
        message: body.to_string(),
        url,
    }
}

/// Deserializes a response body, logging a preview of the payload on failure.
pub fn deserialize_with_context<T: DeserializeOwned>(
    body: &str,
    type_name: &str,
) -> Result<T, OpencodeError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(
            "Failed to deserialize {}: {} | Context: {}",
            type_name,
            e,
            truncate_for_context(body, ERROR_BODY_PREVIEW_LENGTH)
        );
        OpencodeError::Json(e)
    })
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Uses character-boundary-aware slicing to prevent panics on multi-byte UTF-8 characters.
pub fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_context_short_string() {
        assert_eq!(truncate_for_context("Short", 100), "Short");
    }

    #[test]
    fn test_truncate_for_context_long_string() {
        let long_str = "a".repeat(300);
        let result = truncate_for_context(&long_str, 200);
        assert_eq!(result.len(), 203);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_for_context_utf8_boundary() {
        // 198 + 4 = 202 bytes; the emoji would straddle the cut
        let emoji_str = "x".repeat(198) + "🎉";
        let result = truncate_for_context(&emoji_str, 200);
        assert_eq!(result.len(), 201);
        assert!(!result.contains('🎉'));
    }

    #[test]
    fn test_truncate_for_context_exactly_at_boundary() {
        let exact = "a".repeat(200);
        assert_eq!(truncate_for_context(&exact, 200), exact);
    }

    #[test]
    fn test_api_error_preserves_status_and_url() {
        let err = api_error(503, "http://test/config".to_string(), "down");
        match err {
            OpencodeError::Api {
                status_code,
                message,
                url,
            } => {
                assert_eq!(status_code, 503);
                assert_eq!(message, "down");
                assert_eq!(url, "http://test/config");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_keeps_long_body_intact() {
        let body = format!("{{\"error\":\"{}\"}}", "é".repeat(150));
        assert!(body.len() > ERROR_BODY_PREVIEW_LENGTH);

        let err = api_error(500, "http://test/session".to_string(), &body);
        match err {
            OpencodeError::Api { message, .. } => assert_eq!(message, body),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_with_context_error() {
        let result = deserialize_with_context::<serde_json::Value>("{invalid", "Config");
        assert!(matches!(result, Err(OpencodeError::Json(_))));
    }
}
