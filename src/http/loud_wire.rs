//! Wire-level debugging via LOUD_WIRE environment variable.
//!
//! When `LOUD_WIRE` is set to any value, prints requests, response statuses,
//! JSON bodies and SSE payloads to stderr with pretty formatting and colors.
//!
//! ```bash
//! LOUD_WIRE=1 cargo test --test event_stream_tests
//! ```
//!
//! - Green `>>>` for outgoing requests
//! - Red `<<<` for incoming responses
//! - Blue `SSE` for decoded stream payloads
//!
//! Long string values (file contents, diffs) are cut to keep output readable.

use colored::Colorize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

static ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if LOUD_WIRE debugging is enabled.
///
/// Cached on first call; setting `LOUD_WIRE` afterwards has no effect.
#[must_use]
pub fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next request ID for correlation.
#[must_use]
pub fn next_request_id() -> usize {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

const TRUNCATE_THRESHOLD: usize = 500;

fn truncate_long_strings(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) if s.len() > TRUNCATE_THRESHOLD => {
            let mut cut = TRUNCATE_THRESHOLD;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            s.truncate(cut);
            s.push_str("...");
        }
        serde_json::Value::Object(map) => map.values_mut().for_each(truncate_long_strings),
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(truncate_long_strings),
        _ => {}
    }
}

fn prefix(request_id: usize) -> String {
    let ts = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .dimmed();
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        ts,
        format!("[REQ#{request_id}]").cyan()
    )
}

fn print_json(prefix: &str, value: &serde_json::Value) {
    let rendered = colored_json::to_colored_json_auto(value)
        .ok()
        .or_else(|| serde_json::to_string_pretty(value).ok());
    if let Some(rendered) = rendered {
        for line in rendered.lines() {
            eprintln!("{prefix} {line}");
        }
    }
}

/// Log an outgoing HTTP request.
pub fn log_request(request_id: usize, method: &str, url: &str) {
    if !is_enabled() {
        return;
    }
    let direction = ">>>".green().bold();
    eprintln!("{} {direction} {method} {url}", prefix(request_id));
}

/// Log an incoming HTTP response status.
pub fn log_response_status(request_id: usize, status: u16) {
    if !is_enabled() {
        return;
    }
    let direction = "<<<".red().bold();
    let status_text = if status < 300 {
        format!("{status} OK").green()
    } else {
        format!("{status} ERROR").red()
    };
    eprintln!("{} {direction} {status_text}", prefix(request_id));
}

/// Log an incoming HTTP response body.
pub fn log_response_body(request_id: usize, body: &str) {
    if !is_enabled() {
        return;
    }
    let prefix = prefix(request_id);
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(mut parsed) => {
            truncate_long_strings(&mut parsed);
            eprintln!("{prefix} {}:", "Response".red());
            print_json(&prefix, &parsed);
        }
        Err(_) => {
            let mut shown = body.chars().take(1000).collect::<String>();
            if shown.len() < body.len() {
                shown.push_str("...");
            }
            eprintln!("{prefix} {}: {shown}", "Response".red());
        }
    }
}

/// Log one decoded SSE payload.
pub fn log_sse_event(request_id: usize, event: &serde_json::Value) {
    if !is_enabled() {
        return;
    }
    let prefix = prefix(request_id);
    let label = "SSE".blue().bold();
    let mut shown = event.clone();
    truncate_long_strings(&mut shown);
    eprintln!("{prefix} {label}:");
    print_json(&prefix, &shown);
}

/// Log a retry decision.
pub fn log_retry(attempt: u32, delay: std::time::Duration, error: &dyn std::fmt::Display) {
    if !is_enabled() {
        return;
    }
    eprintln!(
        "{} {} {} attempt={} delay={:?}: {}",
        "[LOUD_WIRE]".bold(),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string().dimmed(),
        "RETRY".yellow().bold(),
        attempt,
        delay,
        error
    );
}
