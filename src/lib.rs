//! Client conveniences for the opencode server API.
//!
//! - [`Client`] and [`blocking::Client`]: configured HTTP clients with the
//!   common read-only endpoints and the `/event` subscription.
//! - [`RetryPolicy`]: exponential backoff for transport failures and
//!   retryable HTTP statuses.
//! - [`SseFrameParser`] and friends: the SSE framing used for `/event`,
//!   usable on any line source.
//! - [`Event`]: typed view of event payloads, with an unknown-type fallback.
//!
//! # Quick start
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use opencode_sdk::{Client, Event};
//!
//! # async fn example() -> Result<(), opencode_sdk::OpencodeError> {
//! let client = Client::builder()
//!     .base_url("http://localhost:4096")
//!     .max_retries(3)
//!     .build()?;
//!
//! let sessions = client.list_sessions(None).await?;
//! println!("{sessions}");
//!
//! let mut events = client.subscribe_typed_events(None).await?;
//! while let Some(event) = events.next().await {
//!     match event? {
//!         Event::SessionIdle(idle) => println!("idle: {}", idle.session_id),
//!         other => println!("{}", other.event_type()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Debugging
//!
//! Set `LOUD_WIRE=1` to print every request, response and streamed event to
//! stderr. Structured logs go through [`tracing`].

pub mod blocking;
mod client;
mod config;
mod errors;
pub mod events;
mod http;
mod models;
mod retry;

pub use client::{Client, EventStream, TypedEventStream};
pub use config::{ClientBuilder, DEFAULT_AUTH_HEADER, DEFAULT_AUTH_PREFIX};
pub use errors::OpencodeError;
pub use events::{Event, SessionErrorKind};
pub use http::common::DEFAULT_BASE_URL;
pub use http::sse_parser::{
    SseEvents, SseFrameParser, parse_sse_lines, parse_sse_reader, parse_sse_stream,
};
pub use models::PathInfo;
pub use retry::{DEFAULT_BACKOFF_BASE, DEFAULT_RETRYABLE_STATUSES, RetryPolicy};
