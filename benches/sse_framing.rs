//! Benchmarks for `/event` stream framing throughput.
//!
//! - Different network chunk sizes for the async byte-stream path
//! - Keep-alive comment density
//! - The blocking line-reader path against the same payloads

use std::io::Cursor;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::{StreamExt, pin_mut, stream};
use opencode_sdk::{SseFrameParser, parse_sse_lines, parse_sse_stream};
use tokio::runtime::Runtime;

/// Generate a session's worth of `message.part.updated` events
fn generate_event_stream(count: usize, text_size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * (text_size + 160));
    data.extend_from_slice(b"data: {\"type\":\"server.connected\",\"properties\":{}}\n\n");
    for i in 0..count {
        data.extend_from_slice(
            format!(
                "data: {{\"type\":\"message.part.updated\",\"properties\":{{\"part\":{{\"id\":\"prt_{}\",\"sessionID\":\"ses_1\",\"type\":\"text\",\"text\":\"{}\"}}}}}}\n\n",
                i,
                "x".repeat(text_size)
            )
            .as_bytes(),
        );
    }
    data
}

/// Interleave a keep-alive comment before every event
fn with_keepalives(data: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(data);
    text.split_inclusive("\n\n")
        .flat_map(|frame| [": keep-alive\n", frame])
        .collect::<String>()
        .into_bytes()
}

fn chunk_data(data: &[u8], chunk_size: usize) -> Vec<Bytes> {
    data.chunks(chunk_size)
        .map(|c| Bytes::from(c.to_vec()))
        .collect()
}

/// Benchmark the async path with different network chunk sizes
fn bench_chunk_sizes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("event_chunk_sizes");

    let data = generate_event_stream(50, 200);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk_size in [16, 256, 1024, 16384] {
        group.bench_with_input(
            BenchmarkId::new("chunk_bytes", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.to_async(&rt).iter(|| async {
                    let chunks = chunk_data(&data, chunk_size);
                    let byte_stream =
                        stream::iter(chunks.into_iter().map(Ok::<_, reqwest::Error>));
                    let parsed = parse_sse_stream(byte_stream, 0);
                    pin_mut!(parsed);

                    let mut count = 0;
                    while let Some(result) = parsed.next().await {
                        criterion::black_box(result.unwrap());
                        count += 1;
                    }
                    assert_eq!(count, 51);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the blocking reader with and without keep-alive comments
fn bench_blocking_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_blocking_reader");

    let plain = generate_event_stream(100, 100);
    let noisy = with_keepalives(&plain);

    for (name, data) in [("plain", &plain), ("keepalives", &noisy)] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("events", name), data, |b, data| {
            b.iter(|| {
                let count = parse_sse_lines(Cursor::new(data.as_slice()), 0)
                    .map(Result::unwrap)
                    .count();
                assert_eq!(count, 101);
            });
        });
    }

    group.finish();
}

/// Benchmark the frame parser alone, one line at a time
fn bench_frame_parser(c: &mut Criterion) {
    let data = String::from_utf8(generate_event_stream(100, 100)).unwrap();
    let lines: Vec<&str> = data.lines().collect();

    let mut group = c.benchmark_group("event_frame_parser");
    group.throughput(Throughput::Elements(101));
    group.bench_function("push_line", |b| {
        b.iter(|| {
            let mut parser = SseFrameParser::new();
            let mut count = 0;
            for line in &lines {
                count += parser.push_line(line).len();
            }
            criterion::black_box(count)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_sizes,
    bench_blocking_reader,
    bench_frame_parser
);
criterion_main!(benches);
