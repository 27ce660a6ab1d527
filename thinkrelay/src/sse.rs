// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Outbound SSE framing.
//
// Every frame is a single `data: <payload>\n\n` event. Payloads are JSON
// except the terminal `[DONE]` sentinel.

use axum::http::{header, HeaderMap, HeaderValue};
use bytes::Bytes;
use serde::Serialize;

use crate::thinking::OutputRecord;

/// Literal payload of the normal-completion frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// First frame of every streamed request.
    RequestId(String),
    /// Classified generation output.
    Record(OutputRecord),
    /// Terminal failure.
    Error(String),
    /// Terminal normal completion.
    Done,
}

#[derive(Serialize)]
struct RequestIdPayload<'a> {
    #[serde(rename = "requestId")]
    request_id: &'a str,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
}

impl Frame {
    /// Whether the stream must end after this frame.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Error(_) | Frame::Done)
    }

    /// The frame payload, without SSE framing.
    pub fn payload(&self) -> String {
        let json = match self {
            Frame::RequestId(id) => serde_json::to_string(&RequestIdPayload { request_id: id }),
            Frame::Record(record) => serde_json::to_string(record),
            Frame::Error(message) => serde_json::to_string(&ErrorPayload { error: message }),
            Frame::Done => return DONE_SENTINEL.to_string(),
        };
        // These payloads only hold strings and enums; serialization cannot fail.
        json.unwrap_or_else(|e| format!(r#"{{"error":"frame serialization failed: {e}"}}"#))
    }

    /// Encode as a complete SSE event.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("data: {}\n\n", self.payload()))
    }
}

/// Headers for a server-push event stream.
pub fn event_stream_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Parse the payloads back out of an encoded SSE body.
#[cfg(test)]
pub(crate) fn parse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|event| event.trim_start_matches('\n').strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}
