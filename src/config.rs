//! Construction-time configuration shared by the async and blocking clients.

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::errors::OpencodeError;
use crate::http::common::DEFAULT_BASE_URL;
use crate::retry::RetryPolicy;

/// Header carrying the bearer token unless configured otherwise.
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";

/// Scheme prefix placed before the token unless configured otherwise.
pub const DEFAULT_AUTH_PREFIX: &str = "Bearer";

/// Builder for [`Client`](crate::Client) and [`blocking::Client`](crate::blocking::Client).
///
/// # Example
///
/// ```
/// use opencode_sdk::Client;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), opencode_sdk::OpencodeError> {
/// let client = Client::builder()
///     .base_url("http://127.0.0.1:4096")
///     .token("secret")
///     .timeout(Duration::from_secs(30))
///     .max_retries(3)
///     .build()?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    token: Option<String>,
    auth_header_name: String,
    auth_prefix: String,
    timeout: Option<Duration>,
    verify_tls: bool,
    retry: RetryPolicy,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: Vec::new(),
            token: None,
            auth_header_name: DEFAULT_AUTH_HEADER.to_string(),
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            timeout: None,
            verify_tls: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientBuilder {
    /// Sets the server base URL. Defaults to `http://localhost:4096`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds several headers sent with every request.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the token sent as `"{prefix} {token}"` in the auth header.
    ///
    /// An empty token is ignored.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    #[must_use]
    pub fn auth_header_name(mut self, name: impl Into<String>) -> Self {
        self.auth_header_name = name.into();
        self
    }

    /// Sets the scheme before the token. An empty prefix sends the bare token.
    #[must_use]
    pub fn auth_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auth_prefix = prefix.into();
        self
    }

    /// Sets the network timeout.
    ///
    /// Applies to connecting and to each read, never to a whole response, so
    /// an idle event stream is cut only after a full `timeout` of silence.
    /// If not set, requests never time out.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables TLS certificate verification. Enabled by default.
    #[must_use]
    pub const fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Sets how many times a failed call is retried. Defaults to 0.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry; later retries double it.
    #[must_use]
    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.retry.backoff_base = backoff_base;
        self
    }

    /// Sets the HTTP statuses that are retried.
    #[must_use]
    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry.retryable_statuses = statuses.into_iter().collect::<BTreeSet<_>>();
        self
    }

    /// Replaces the whole retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Builds the async [`Client`](crate::Client).
    ///
    /// # Errors
    ///
    /// Returns [`OpencodeError::InvalidInput`] for an invalid header name or
    /// value, or [`OpencodeError::ClientBuild`] if the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<crate::Client, OpencodeError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(self.default_headers()?)
            .danger_accept_invalid_certs(!self.verify_tls);

        if let Some(timeout) = self.timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| OpencodeError::ClientBuild(e.to_string()))?;

        Ok(crate::Client {
            base_url: self.base_url,
            http_client,
            retry: self.retry,
        })
    }

    /// Builds the [`blocking::Client`](crate::blocking::Client).
    ///
    /// Must not be called from within an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`ClientBuilder::build`].
    pub fn build_blocking(self) -> Result<crate::blocking::Client, OpencodeError> {
        let http_client = reqwest::blocking::Client::builder()
            .default_headers(self.default_headers()?)
            .danger_accept_invalid_certs(!self.verify_tls)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| OpencodeError::ClientBuild(e.to_string()))?;

        Ok(crate::blocking::Client {
            base_url: self.base_url,
            http_client,
            retry: self.retry,
        })
    }

    /// Assembles the headers attached to every request, auth header last.
    fn default_headers(&self) -> Result<HeaderMap, OpencodeError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            map.insert(parse_name(name)?, parse_value(value)?);
        }
        if let Some(token) = &self.token {
            let credential = format!("{} {}", self.auth_prefix, token);
            let mut value = parse_value(credential.trim())?;
            value.set_sensitive(true);
            map.insert(parse_name(&self.auth_header_name)?, value);
        }
        Ok(map)
    }
}

fn parse_name(name: &str) -> Result<HeaderName, OpencodeError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| OpencodeError::InvalidInput(format!("invalid header name {name:?}: {e}")))
}

fn parse_value(value: &str) -> Result<HeaderValue, OpencodeError> {
    HeaderValue::from_str(value)
        .map_err(|e| OpencodeError::InvalidInput(format!("invalid header value: {e}")))
}
