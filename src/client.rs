use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client as ReqwestClient;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientBuilder;
use crate::errors::OpencodeError;
use crate::events::Event;
use crate::http::common::{EVENT_STREAM_MEDIA_TYPE, Endpoint, construct_endpoint_url};
use crate::http::error_helpers::{check_response, deserialize_with_context};
use crate::http::loud_wire;
use crate::http::sse_parser::parse_sse_stream;
use crate::models::PathInfo;
use crate::retry::RetryPolicy;

/// Stream of raw events from `/event`. Dropping it closes the connection.
pub type EventStream = BoxStream<'static, Result<Value, OpencodeError>>;

/// Stream of typed events from `/event`. Dropping it closes the connection.
pub type TypedEventStream = BoxStream<'static, Result<Event, OpencodeError>>;

/// Async client for an opencode server.
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
    /// Creates a new builder for `Client` instances.
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
        Self::builder().build()
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
    /// Use this to wrap calls this crate does not provide itself.
    ///
    /// # Errors
    ///
    /// Returns the last error once it is not retryable or retries run out.
    pub async fn call_with_retries<T, F, Fut>(&self, operation: F) -> Result<T, OpencodeError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, OpencodeError>>,
    {
        self.retry.call_async(operation).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        directory: Option<&str>,
        type_name: &str,
    ) -> Result<T, OpencodeError> {
        let url = construct_endpoint_url(&self.base_url, endpoint, directory);
        self.retry
            .call_async(|| self.fetch_json(&url, type_name))
            .await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        type_name: &str,
    ) -> Result<T, OpencodeError> {
        let request_id = loud_wire::next_request_id();
        loud_wire::log_request(request_id, "GET", url);

        let response = self.http_client.get(url).send().await?;
        loud_wire::log_response_status(request_id, response.status().as_u16());

        let response = check_response(response).await?;
        let body = response.text().await?;
        loud_wire::log_response_body(request_id, &body);

        deserialize_with_context(&body, type_name)
    }

    /// Lists sessions in the current project (`GET /session`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn list_sessions(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListSessions, directory, "sessions")
            .await
    }

    /// Returns the configuration for the current project (`GET /config`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn get_config(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::GetConfig, directory, "config").await
    }

    /// Lists configured agents (`GET /agent`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn list_agents(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListAgents, directory, "agents").await
    }

    /// Lists known projects (`GET /project`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn list_projects(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListProjects, directory, "projects")
            .await
    }

    /// Returns the current project (`GET /project/current`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn current_project(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::CurrentProject, directory, "project")
            .await
    }

    /// Returns the status of changed files (`GET /file/status`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn file_status(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::FileStatus, directory, "file status")
            .await
    }

    /// Returns the server's working paths (`GET /path`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body does
    /// not match [`PathInfo`].
    pub async fn get_path(&self, directory: Option<&str>) -> Result<PathInfo, OpencodeError> {
        self.get_json(Endpoint::GetPath, directory, "PathInfo").await
    }

    /// Returns configured providers (`GET /config/providers`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn config_providers(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ConfigProviders, directory, "providers")
            .await
    }

    /// Returns the identifiers of available tools (`GET /experimental/tool/ids`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn tool_ids(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ToolIds, directory, "tool ids").await
    }

    /// Lists commands (`GET /command`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the body is not JSON.
    pub async fn list_commands(&self, directory: Option<&str>) -> Result<Value, OpencodeError> {
        self.get_json(Endpoint::ListCommands, directory, "commands")
            .await
    }

    /// Opens the `/event` stream and yields each decoded event as raw JSON.
    ///
    /// The connection is established before this returns, so a non-success
    /// status is reported here and never as a stream item. The stream then runs
    /// until the server closes the body or a read fails; a read failure is the
    /// last item. There is no reconnection: call again to resubscribe.
    ///
    /// This call is not retried.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use opencode_sdk::Client;
    ///
    /// # async fn example() -> Result<(), opencode_sdk::OpencodeError> {
    /// let client = Client::new()?;
    /// let mut events = client.subscribe_events(None).await?;
    /// while let Some(event) = events.next().await {
    ///     let event = event?;
    ///     println!("{}", event["type"]);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`OpencodeError::Http`] if the connection fails and
    /// [`OpencodeError::Api`] on a non-success status.
    pub async fn subscribe_events(
        &self,
        directory: Option<&str>,
    ) -> Result<EventStream, OpencodeError> {
        let url = construct_endpoint_url(&self.base_url, Endpoint::Event, directory);

        let request_id = loud_wire::next_request_id();
        loud_wire::log_request(request_id, "GET (stream)", &url);

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, EVENT_STREAM_MEDIA_TYPE)
            .send()
            .await?;
        loud_wire::log_response_status(request_id, response.status().as_u16());

        let response = check_response(response).await?;
        debug!(%url, request_id, "Event stream connected");

        Ok(parse_sse_stream(response.bytes_stream(), request_id).boxed())
    }

    /// Like [`Client::subscribe_events`], decoding each event into [`Event`].
    ///
    /// # Errors
    ///
    /// Same as [`Client::subscribe_events`].
    pub async fn subscribe_typed_events(
        &self,
        directory: Option<&str>,
    ) -> Result<TypedEventStream, OpencodeError> {
        let events = self.subscribe_events(directory).await?;
        Ok(events.map(|item| item.map(Event::from_value)).boxed())
    }
}
