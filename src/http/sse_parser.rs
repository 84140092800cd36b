//! SSE (Server-Sent Events) framing for the opencode `/event` stream.
//!
//! Lines are accumulated into a per-connection buffer until a blank line ends
//! the frame. Each `data:` line of a finished frame is decoded as one JSON
//! event. Comment lines (`:` prefix) never reach the buffer, and a payload that
//! is not valid JSON is dropped without interrupting the stream. Lines are
//! decoded lossily, so bytes that are not UTF-8 only spoil their own frame.
//!
//! [`SseFrameParser`] holds the framing rules. [`parse_sse_lines`] drives it
//! from a blocking [`BufRead`], [`parse_sse_reader`] and [`parse_sse_stream`]
//! from async readers, so both execution models share one algorithm.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::BufRead;

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tracing::debug;

use super::loud_wire;
use crate::errors::OpencodeError;

const DATA_PREFIX: &str = "data:";

/// Incremental SSE frame assembler.
///
/// Feed it one line at a time (without the line terminator). The buffer only
/// ever holds the lines of the frame in progress: every blank line flushes and
/// resets it, whatever it contained.
#[derive(Debug, Default, Clone)]
pub struct SseFrameParser {
    buffer: String,
}

impl SseFrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one line and returns the events completed by it, in wire order.
    ///
    /// Only a blank line can complete events; every other line returns an
    /// empty vector.
    pub fn push_line(&mut self, line: &str) -> Vec<Value> {
        if line.starts_with(':') {
            return Vec::new();
        }
        if line.is_empty() {
            return self.flush();
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
        Vec::new()
    }

    /// Returns `true` when no partial frame is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    fn flush(&mut self) -> Vec<Value> {
        let frame = std::mem::take(&mut self.buffer);
        frame
            .split('\n')
            .filter_map(|part| part.strip_prefix(DATA_PREFIX))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .filter_map(|data| match serde_json::from_str(data) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(error = %e, payload_len = data.len(), "Dropping malformed SSE payload");
                    None
                }
            })
            .collect()
    }
}

/// Blocking iterator over the events of an SSE body.
///
/// Yields `Ok(event)` per decoded payload. A read failure is yielded once as
/// `Err`, after which the iterator is exhausted. Dropping the iterator drops the
/// reader, which for an HTTP body closes the connection.
#[derive(Debug)]
pub struct SseEvents<R> {
    reader: R,
    line: Vec<u8>,
    parser: SseFrameParser,
    pending: VecDeque<Value>,
    finished: bool,
    request_id: usize,
}

impl<R: BufRead> Iterator for SseEvents<R> {
    type Item = Result<Value, OpencodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                loud_wire::log_sse_event(self.request_id, &event);
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.finished = true;
                    debug!(
                        partial_frame = !self.parser.is_idle(),
                        "Event stream closed"
                    );
                }
                Ok(_) => {
                    let events = self.parser.push_line(&decode_line(&self.line));
                    self.pending.extend(events);
                }
                Err(e) => {
                    self.finished = true;
                    debug!(error = %e, "Event stream read failed");
                    return Some(Err(read_error(e)));
                }
            }
        }
    }
}

/// Parses a blocking line reader into an iterator of decoded events.
pub fn parse_sse_lines<R: BufRead>(reader: R, request_id: usize) -> SseEvents<R> {
    SseEvents {
        reader,
        line: Vec::new(),
        parser: SseFrameParser::new(),
        pending: VecDeque::new(),
        finished: false,
        request_id,
    }
}

/// Parses an async line reader into a stream of decoded events.
///
/// The stream ends when the reader reaches end of input, or right after
/// yielding the first read error.
pub fn parse_sse_reader<R>(
    reader: R,
    request_id: usize,
) -> impl Stream<Item = Result<Value, OpencodeError>> + Send
where
    R: AsyncBufRead + Unpin + Send,
{
    try_stream! {
        let mut segments = reader.split(b'\n');
        let mut parser = SseFrameParser::new();

        while let Some(segment) = segments.next_segment().await.map_err(read_error)? {
            let events = parser.push_line(&decode_line(&segment));
            for event in events {
                loud_wire::log_sse_event(request_id, &event);
                yield event;
            }
        }

        debug!(partial_frame = !parser.is_idle(), "Event stream closed");
    }
}

/// Parses an HTTP body byte stream into a stream of decoded events.
///
/// Chunk boundaries are irrelevant: bytes are re-split into lines before
/// framing.
pub fn parse_sse_stream<S>(
    byte_stream: S,
    request_id: usize,
) -> impl Stream<Item = Result<Value, OpencodeError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send,
{
    let byte_stream = Box::pin(byte_stream.map(|chunk| chunk.map_err(std::io::Error::other)));
    parse_sse_reader(StreamReader::new(byte_stream), request_id)
}

/// Decodes one raw line, dropping its terminator.
///
/// Invalid UTF-8 is replaced rather than rejected, so a garbled line only
/// spoils the frame it belongs to.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

/// Maps a body read failure back to the transport error that caused it, if any.
fn read_error(e: std::io::Error) -> OpencodeError {
    if !e
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>())
    {
        return OpencodeError::Io(e);
    }
    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(transport)) => OpencodeError::Http(*transport),
        Some(Err(other)) => OpencodeError::Io(std::io::Error::new(kind, other)),
        None => OpencodeError::Io(kind.into()),
    }
}
