//! Property-based tests for `/event` framing.
//!
//! These check that what comes out of the parser depends only on the well-formed
//! `data:` frames that went in: not on keep-alive comments, not on malformed
//! neighbours, and not on how the bytes were split across network reads.

use std::io::Cursor;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use opencode_sdk::{parse_sse_lines, parse_sse_stream};
use proptest::prelude::*;
use serde_json::Value;

// =============================================================================
// Strategy Generators
// =============================================================================

/// Strategy for event-shaped JSON objects.
fn arb_event() -> impl Strategy<Value = Value> {
    (
        "[a-z]{1,10}\\.[a-z]{1,10}",
        prop::collection::btree_map("[a-zA-Z][a-zA-Z0-9]{0,8}", ".{0,40}", 0..4),
        any::<i64>(),
    )
        .prop_map(|(event_type, props, n)| {
            let mut properties: serde_json::Map<String, Value> = props
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            properties.insert("n".to_string(), n.into());
            serde_json::json!({"type": event_type, "properties": properties})
        })
}

/// Strategy for keep-alive comment lines.
fn arb_comment() -> impl Strategy<Value = String> {
    "[^\r\n]{0,30}".prop_map(|text| format!(":{text}"))
}

/// Strategy for `data:` payloads that are never valid JSON.
fn arb_garbage() -> impl Strategy<Value = String> {
    "[^\r\n]{0,30}".prop_map(|text| format!("{{{{{text}"))
}

fn frame(event: &Value) -> String {
    format!("data: {event}\n\n")
}

fn parse_blocking(body: &str) -> Vec<Value> {
    parse_sse_lines(Cursor::new(body.as_bytes().to_vec()), 0)
        .map(|item| item.expect("in-memory reads never fail"))
        .collect()
}

fn parse_chunked(body: &str, cuts: &[usize]) -> Vec<Value> {
    let bytes = body.as_bytes();
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points.into_iter().chain(std::iter::once(bytes.len())) {
        chunks.push(Bytes::copy_from_slice(&bytes[start..point]));
        start = point;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime");
    runtime.block_on(async {
        let byte_stream = stream::iter(chunks.into_iter().map(Ok::<_, reqwest::Error>));
        parse_sse_stream(byte_stream, 0)
            .map(|item| item.expect("in-memory reads never fail"))
            .collect()
            .await
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_events_come_out_in_wire_order(events in prop::collection::vec(arb_event(), 0..20)) {
        let body: String = events.iter().map(frame).collect();
        prop_assert_eq!(parse_blocking(&body), events);
    }

    #[test]
    fn prop_comments_are_neutral(
        events in prop::collection::vec(arb_event(), 1..10),
        comments in prop::collection::vec((arb_comment(), any::<bool>()), 1..10),
    ) {
        let mut body = String::new();
        for (i, event) in events.iter().enumerate() {
            let (comment, inside) = &comments[i % comments.len()];
            if *inside {
                body.push_str(&format!("data: {event}\n{comment}\n\n"));
            } else {
                body.push_str(&format!("{comment}\n{}", frame(event)));
            }
        }
        prop_assert_eq!(parse_blocking(&body), events);
    }

    #[test]
    fn prop_malformed_frames_are_isolated(
        items in prop::collection::vec(prop_oneof![
            arb_event().prop_map(Ok::<Value, String>),
            arb_garbage().prop_map(Err::<Value, String>),
        ], 0..20),
    ) {
        let mut body = String::new();
        let mut expected = Vec::new();
        for item in &items {
            match item {
                Ok(event) => {
                    body.push_str(&frame(event));
                    expected.push(event.clone());
                }
                Err(garbage) => body.push_str(&format!("data: {garbage}\n\n")),
            }
        }
        prop_assert_eq!(parse_blocking(&body), expected);
    }

    #[test]
    fn prop_chunking_does_not_change_events(
        events in prop::collection::vec(arb_event(), 0..10),
        cuts in prop::collection::vec(any::<usize>(), 0..30),
        crlf in any::<bool>(),
    ) {
        let mut body: String = events.iter().map(frame).collect();
        if crlf {
            body = body.replace('\n', "\r\n");
        }
        prop_assert_eq!(parse_chunked(&body, &cuts), events);
    }

    #[test]
    fn prop_unterminated_tail_is_dropped(
        events in prop::collection::vec(arb_event(), 0..10),
        tail in arb_event(),
    ) {
        let mut body: String = events.iter().map(frame).collect();
        body.push_str(&format!("data: {tail}\n"));
        prop_assert_eq!(parse_blocking(&body), events);
    }
}
