// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// NDJSON decoding for streaming generations.
//
// Upstream chunking is arbitrary: a line may span several chunks and a chunk
// may hold several lines. Lines are `\n`-terminated; blank lines (the
// double-newline form) and `\r` are ignored. Lines that fail to parse, or
// outgrow `MAX_LINE_BYTES`, are logged and skipped.

use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};

use super::{EventStream, GenerationEvent, UpstreamError};

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed upstream chunk: {reason} (raw: {raw})")]
    MalformedChunk { raw: String, reason: String },

    #[error("upstream line exceeds {limit} bytes, dropped")]
    LineTooLong { limit: usize },
}

/// Incremental line splitter and parser.
///
/// Bytes already searched for a newline are not searched again. A line longer
/// than the limit is reported once and dropped up to its newline.
#[derive(Debug)]
pub struct NdjsonDecoder {
    buf: Vec<u8>,
    scanned: usize,
    max_line: usize,
    discarding: bool,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    /// Append a chunk and parse every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<GenerationEvent, DecodeError>> {
        let mut out = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            let Some(pos) = chunk.iter().position(|&b| b == b'\n') else {
                return out;
            };
            self.discarding = false;
            chunk = &chunk[pos + 1..];
        }
        self.buf.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            if end - start > self.max_line {
                out.push(Err(DecodeError::LineTooLong {
                    limit: self.max_line,
                }));
            } else if let Some(parsed) = parse_line(&self.buf[start..end]) {
                out.push(parsed);
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line {
            out.push(Err(DecodeError::LineTooLong {
                limit: self.max_line,
            }));
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        out
    }

    /// Parse whatever remains after the final chunk.
    pub fn finish(&mut self) -> Option<Result<GenerationEvent, DecodeError>> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<GenerationEvent, DecodeError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line).map_err(|e| DecodeError::MalformedChunk {
            raw: String::from_utf8_lossy(line).into_owned(),
            reason: e.to_string(),
        }),
    )
}

/// Turn a raw byte stream into a stream of generation events.
///
/// Malformed lines are skipped. An in-band `error` event is surfaced as
/// `UpstreamError::Generation`. Transport errors are passed through.
pub fn decode_events<S, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = NdjsonDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(UpstreamError::Stream(e.to_string()));
                    return;
                }
            };
            for parsed in decoder.push(&chunk) {
                if let Some(item) = surface(parsed) {
                    yield item;
                }
            }
        }

        if let Some(item) = decoder.finish().and_then(surface) {
            yield item;
        }
    })
}

fn surface(
    parsed: Result<GenerationEvent, DecodeError>,
) -> Option<Result<GenerationEvent, UpstreamError>> {
    match parsed {
        Ok(event) => match &event.error {
            Some(message) => Some(Err(UpstreamError::Generation(message.clone()))),
            None => Some(Ok(event)),
        },
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed upstream chunk");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        let items: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        futures_util::stream::iter(items)
    }

    async fn collect(stream: EventStream) -> Vec<Result<GenerationEvent, UpstreamError>> {
        stream.collect().await
    }

    #[test]
    fn decoder_joins_line_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(br#"{"response":"he"#).is_empty());
        let out = decoder.push(b"llo\"}\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().response, "hello");
    }

    #[test]
    fn decoder_splits_multiple_lines_in_one_chunk() {
        let mut decoder = NdjsonDecoder::new();
        let out = decoder.push(b"{\"response\":\"a\"}\n\n{\"response\":\"b\"}\r\n");
        let texts: Vec<_> = out.into_iter().map(|r| r.unwrap().response).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn decoder_reports_malformed_line() {
        let mut decoder = NdjsonDecoder::new();
        let out = decoder.push(b"not json\n");
        assert!(matches!(
            &out[0],
            Err(DecodeError::MalformedChunk { raw, .. }) if raw == "not json"
        ));
    }

    #[test]
    fn decoder_finish_parses_unterminated_tail() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(br#"{"response":"tail","done":true}"#).is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert!(last.done);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_drops_overlong_line_and_resumes() {
        let mut decoder = NdjsonDecoder::with_max_line(32);
        assert!(decoder.push(b"{\"response\":\"").is_empty());
        let out = decoder.push(&[b'x'; 40]);
        assert_eq!(out, vec![Err(DecodeError::LineTooLong { limit: 32 })]);
        assert_eq!(decoder.buf.len(), 0);

        // Still inside the dropped line until its newline arrives.
        assert!(decoder.push(&[b'y'; 100]).is_empty());
        assert!(decoder.buf.is_empty());
        let out = decoder.push(b"zz\"}\n{\"response\":\"ok\"}\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().response, "ok");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_rejects_overlong_complete_line() {
        let mut decoder = NdjsonDecoder::with_max_line(16);
        let out = decoder.push(b"{\"response\":\"far too long for the limit\"}\n{\"done\":true}\n");
        assert_eq!(out[0], Err(DecodeError::LineTooLong { limit: 16 }));
        assert!(out[1].as_ref().unwrap().done);
    }

    #[test]
    fn decoder_unterminated_overlong_tail_is_not_parsed() {
        let mut decoder = NdjsonDecoder::with_max_line(8);
        decoder.push(b"{\"response\":\"abcdefgh\"}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_resumes_scan_after_many_small_chunks() {
        let mut decoder = NdjsonDecoder::new();
        let line = br#"{"response":"slow","done":false}"#;
        for byte in line.iter() {
            assert!(decoder.push(std::slice::from_ref(byte)).is_empty());
        }
        assert_eq!(decoder.scanned, line.len());
        let out = decoder.push(b"\n");
        assert_eq!(out[0].as_ref().unwrap().response, "slow");
        assert_eq!(decoder.scanned, 0);
    }

    #[test]
    fn decoder_handles_multibyte_split() {
        let mut decoder = NdjsonDecoder::new();
        let line = "{\"response\":\"🦀\"}\n".as_bytes();
        assert!(decoder.push(&line[..15]).is_empty());
        let out = decoder.push(&line[15..]);
        assert_eq!(out[0].as_ref().unwrap().response, "🦀");
    }

    #[tokio::test]
    async fn stream_skips_malformed_and_keeps_order() {
        let events = collect(decode_events(chunks(&[
            "{\"response\":\"<think>a\"}\n{bro",
            "ken\n{\"response\":\"b\"}\n",
            "{\"response\":\"\",\"done\":true}\n",
        ])))
        .await;

        let texts: Vec<_> = events
            .iter()
            .map(|e| e.as_ref().unwrap().response.clone())
            .collect();
        assert_eq!(texts, vec!["<think>a", "b", ""]);
        assert!(events[2].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn stream_surfaces_in_band_error() {
        let events = collect(decode_events(chunks(&[
            "{\"response\":\"x\"}\n",
            "{\"error\":\"model not found\"}\n",
        ])))
        .await;
        assert_eq!(
            events[1],
            Err(UpstreamError::Generation("model not found".into()))
        );
    }

    #[tokio::test]
    async fn stream_stops_on_transport_error() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"response\":\"x\"}\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"{\"response\":\"never\"}\n")),
        ];
        let events = collect(decode_events(futures_util::stream::iter(items))).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], Err(UpstreamError::Stream(msg)) if msg.contains("reset")));
    }
}
