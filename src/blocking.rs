//! A blocking client for an opencode server.
//!
//! Same surface as the async [`Client`](crate::Client), built from the same
//! [`ClientBuilder`]. Calls block the current thread, including while sleeping
//! between retries and while waiting for the next event.
//!
//! Do not use it from inside an async runtime.
//!
//! ```no_run
//! use opencode_sdk::blocking::Client;
//!
//! # fn main() -> Result<(), opencode_sdk::OpencodeError> {
//! let client = Client::builder().max_retries(2).build_blocking()?;
//! println!("{}", client.get_path(None)?.directory);
//!
//! for event in client.subscribe_events(None)? {
//!     println!("{}", event?["type"]);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::BufReader;

use reqwest::blocking::Client as ReqwestClient;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientBuilder;
use crate::errors::OpencodeError;
use crate::events::Event;
use crate::http::common::{EVENT_STREAM_MEDIA_TYPE, Endpoint, construct_endpoint_url};
use crate::http::error_helpers::{check_blocking_response, deserialize_with_context};
use crate::http::loud_wire;
use crate::http::sse_parser::{SseEvents, parse_sse_lines};
use crate::models::PathInfo;
use crate::retry::RetryPolicy;

/// Iterator of raw events from `/event`. Dropping it closes the connection.
pub type EventIter = SseEvents<BufReader<reqwest::blocking::Response>>;

/// Blocking client for an opencode server.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) base_url: String,
    #[allow(clippy::struct_field_names)]
    pub(crate) http_client: ReqwestClient,
    pub(crate) retry: RetryPolicy,
}

impl Client {
    /// Creates a new builder; finish it with [`ClientBuilder::build_blocking`].
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Creates a client for `http://localhost:4096` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`OpencodeError::ClientBuild`] if the HTTP client cannot be created.
    pub fn new() -> Result<Self, OpencodeError> {
        Self::builder().build_blocking()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The underlying HTTP client, with auth and custom headers preconfigured.
    #[must_use]
    pub fn http_client(&self) -> &ReqwestClient {
        &self.http_client
    }

    /// Runs `operation` under this client's retry policy.
    ///
    /// # Errors
    ///
    /// Returns the last error once it is not retryable or retries run out.
    pub fn call_with_retries<T, F>(&self, operation: F) -> Result<T, OpencodeError>
    where
        F: FnMut() -> Result<T, OpencodeError>,
    {
        self.retry.call(operation)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        directory: Option<&str>,
        type_name: &str,
    ) -> Result<T, OpencodeError> {
        let url = construct_endpoint_url(&self.base_url, endpoint, directory);
        self.retry.call(|| self.fetch_json(&url, type_name))
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str, type_name: &str) -> Result<T, OpencodeError> {
        let request_id = loud_wire::next_request_id();
        loud_wire::log_request(request_id, "GET", url);

        let response = self.http_client.get(url).send()?;
        loud_wire::log_response_status(request_id, response.status().as_u16());

        let body = check_blocking_response(response)?.text()?;
        loud_wire::log_response_body(request_id, &body);

        deserialize_with_context(&body, type_name)
    }

    /// Lists sessions in the current project (`GET /session`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn list_sessions(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListSessions, directory, "sessions")
    }

    /// Returns the configuration for the current project (`GET /config`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn get_config(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::GetConfig, directory, "config")
    }

    /// Lists configured agents (`GET /agent`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn list_agents(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListAgents, directory, "agents")
    }

    /// Lists known projects (`GET /project`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn list_projects(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListProjects, directory, "projects")
    }

    /// Returns the current project (`GET /project/current`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn current_project(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::CurrentProject, directory, "project")
    }

    /// Returns the status of changed files (`GET /file/status`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn file_status(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::FileStatus, directory, "file status")
    }

    /// Returns the server's working paths (`GET /path`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body does
    /// not match [`PathInfo`].
    pub fn get_path(&self, directory: Option<&str>) -> Result<PathInfo, OpencodeError> {
        self.get_json(Endpoint::GetPath, directory, "PathInfo")
    }

    /// Returns configured providers (`GET /config/providers`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn config_providers(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ConfigProviders, directory, "providers")
    }

    /// Returns the identifiers of available tools (`GET /experimental/tool/ids`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn tool_ids(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ToolIds, directory, "tool ids")
    }

    /// Lists commands (`GET /command`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub fn list_commands(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListCommands, directory, "commands")
    }

    /// Opens the `/event` stream and returns an iterator of decoded events.
    ///
    /// Each `next()` blocks until an event completes, the body ends, or a read
    /// fails. Not retried, and never reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`OpencodeError::Http`] if the connection fails and
    /// [`OpencodeError::Api`] on a non-success status.
    pub fn subscribe_events(&self, directory: Option<&str>) -> Result<EventIter, OpencodeError> {
        let url = construct_endpoint_url(&self.base_url, Endpoint::Event, directory);

        let request_id = loud_wire::next_request_id();
        loud_wire::log_request(request_id, "GET (stream)", &url);

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, EVENT_STREAM_MEDIA_TYPE)
            .send()?;
        loud_wire::log_response_status(request_id, response.status().as_u16());

        let response = check_blocking_response(response)?;
        debug!(%url, request_id, "Event stream connected");

        Ok(parse_sse_lines(BufReader::new(response), request_id))
    }

    /// Like [`Client::subscribe_events`], decoding each event into [`Event`].
    ///
    /// # Errors
    ///
    /// Same as [`Client::subscribe_events`].
    pub fn subscribe_typed_events(
        &self,
        directory: Option<&str>,
    ) -> Result<impl Iterator<Item = Result<Event, OpencodeError>> + use<>, OpencodeError> {
        let events = self.subscribe_events(directory)?;
        Ok(events.map(|item| item.map(Event::from_value)))
    }
}
