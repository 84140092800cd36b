use std::collections::BTreeSet;

use thiserror::Error;

/// Defines errors that can occur when talking to an opencode server.
///
/// # Example: Handling API Errors
///
/// ```ignore
/// match client.get_config(None).await {
///     Err(OpencodeError::Api { status_code: 404, url, .. }) => {
///         tracing::warn!("No config at {url}");
///     }
///     Err(OpencodeError::Api { status_code, message, .. }) => {
///         tracing::error!("API error {}: {}", status_code, message);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpencodeError {
    /// Failure reported by reqwest: usually transport (DNS, connect, reset,
    /// timeout or body read), or a status error from `error_for_status`.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    ///
    /// The status code drives retry decisions; the message holds the response
    /// body as received. Every non-success status surfaces here: there is no
    /// sentinel value for unexpected statuses.
    #[error("API error (HTTP {status_code}) from {url}: {message}")]
    Api {
        /// HTTP status code (e.g., 404, 429, 503)
        status_code: u16,
        /// The response body
        message: String,
        /// The URL that produced the error
        url: String,
    },
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading the body of a blocking event stream failed.
    #[error("I/O error while reading stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Failed to build the HTTP client.
    ///
    /// This typically only occurs in exceptional circumstances such as
    /// TLS backend initialization failures.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl OpencodeError {
    /// Returns the HTTP status code of an [`OpencodeError::Api`] error, or of a
    /// reqwest error that carries one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            OpencodeError::Api { status_code, .. } => Some(*status_code),
            OpencodeError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this error is a transient transport failure.
    ///
    /// Request-construction, body-decoding, redirect and status errors are
    /// excluded: the server did answer, or the request can never be sent.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            OpencodeError::Http(e) => {
                !e.is_builder() && !e.is_decode() && !e.is_redirect() && !e.is_status()
            }
            _ => false,
        }
    }

    /// Returns `true` if the request that produced this error may succeed on retry.
    ///
    /// - **Transport errors** are always retryable.
    /// - **API errors**, and reqwest status errors such as those from
    ///   `Response::error_for_status`, are retryable only when the status is
    ///   in `retryable_statuses`.
    /// - Everything else is permanent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opencode_sdk::OpencodeError;
    /// use std::collections::BTreeSet;
    ///
    /// let statuses: BTreeSet<u16> = [429, 503].into_iter().collect();
    ///
    /// let throttled = OpencodeError::Api {
    ///     status_code: 429,
    ///     message: "slow down".to_string(),
    ///     url: "http://localhost:4096/session".to_string(),
    /// };
    /// assert!(throttled.is_retryable(&statuses));
    ///
    /// let missing = OpencodeError::Api {
    ///     status_code: 404,
    ///     message: "not found".to_string(),
    ///     url: "http://localhost:4096/session".to_string(),
    /// };
    /// assert!(!missing.is_retryable(&statuses));
    /// ```
    #[must_use]
    pub fn is_retryable(&self, retryable_statuses: &BTreeSet<u16>) -> bool {
        match self {
            OpencodeError::Http(e) => match e.status() {
                Some(status) if e.is_status() => retryable_statuses.contains(&status.as_u16()),
                _ => self.is_transport(),
            },
            OpencodeError::Api { status_code, .. } => retryable_statuses.contains(status_code),
            OpencodeError::Json(_)
            | OpencodeError::Io(_)
            | OpencodeError::InvalidInput(_)
            | OpencodeError::ClientBuild(_) => false,
        }
    }
}
